//! Orchestration for the table compaction and point lookup handlers.
//!
//! Both handlers follow the same steps: stage the referenced tables from the
//! object store into a private scratch directory, run an external executable
//! over them, classify how it exited, then write changed tables back and shape
//! a JSON response.

pub mod compaction;
pub mod error;
pub mod lookup;
pub mod process;
pub mod response;
pub mod runtime;
pub mod staging;
pub mod table;

pub use error::{HandlerError, HandlerResult};
pub use runtime::Runtime;
