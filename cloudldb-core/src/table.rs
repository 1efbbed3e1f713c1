//! Table identifiers and the descriptors exchanged with the merge executable.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::HandlerError;

pub const TABLE_FILE_EXTENSION: &str = "ldb";

/// Identifier of a sorted table file.
///
/// Renders as six zero-padded digits plus the `.ldb` extension. That name is both
/// the object key in the bucket and the file name inside a staging area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableNumber(u32);

impl TableNumber {
    pub const MAX: u64 = 999_999;

    pub fn new(number: u64) -> Result<Self, HandlerError> {
        if number > Self::MAX {
            return Err(HandlerError::TableNumberOutOfRange(number));
        }
        Ok(Self(number as u32))
    }

    pub fn get(&self) -> u64 {
        self.0 as u64
    }

    pub fn file_name(&self) -> String {
        format!("{:06}.{}", self.0, TABLE_FILE_EXTENSION)
    }

    /// Parse a canonical table file name. Anything but exactly six digits followed
    /// by `.ldb` is rejected.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let digits = name.strip_suffix(TABLE_FILE_EXTENSION)?.strip_suffix('.')?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u32>().ok().map(Self)
    }
}

impl Display for TableNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.file_name())
    }
}

impl FromStr for TableNumber {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_file_name(s)
            .ok_or_else(|| HandlerError::InvalidEvent(format!("not a table file name: {s}")))
    }
}

/// A table file entry as produced by the database and the merge executable.
///
/// Only `number` is interpreted here. Every other field (sizes, key bounds and
/// so on) is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub number: u64,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl TableDescriptor {
    pub fn table_number(&self) -> Result<TableNumber, HandlerError> {
        TableNumber::new(self.number)
    }
}

/// Map descriptors to table numbers, preserving order and duplicates.
pub fn table_numbers<'a>(
    descriptors: impl IntoIterator<Item = &'a TableDescriptor>,
) -> Result<Vec<TableNumber>, HandlerError> {
    descriptors
        .into_iter()
        .map(TableDescriptor::table_number)
        .collect()
}
