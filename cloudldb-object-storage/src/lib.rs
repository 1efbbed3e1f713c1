use std::sync::Arc;

use cloudldb_config::InvocationConfig;
use object_store::{aws::AmazonS3Builder, local::LocalFileSystem, ObjectStore};

pub mod error;
pub mod table_store;

pub use error::StorageError;
pub use table_store::{ObjectTableStore, TableStore};

pub type StorageResult<T> = Result<T, StorageError>;

/// Builds the object store holding the table files for this invocation.
///
/// When `LEVELDB_LOCAL_STORE_DIR` is set the tables are served from that
/// directory; otherwise an S3 store is built from the configured region and
/// bucket, with credentials taken from the environment.
pub fn open_object_store(config: &InvocationConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match &config.local_store_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "Using LocalFileSystem object store for tables");
            let store = LocalFileSystem::new_with_prefix(dir).map_err(|e| {
                StorageError::InitializationError(format!(
                    "Failed to open local table store at {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!(
                region = %config.region,
                bucket = %config.bucket,
                "Using S3 object store for tables"
            );
            let store = AmazonS3Builder::from_env()
                .with_region(&config.region)
                .with_bucket_name(&config.bucket)
                .build()
                .map_err(|e| {
                    StorageError::InitializationError(format!(
                        "Failed to build S3 object store: {}",
                        e
                    ))
                })?;
            Ok(Arc::new(store))
        }
    }
}
