//! Whole-object transfers between the table bucket and local staging files.

use std::{path::Path, sync::Arc};

use object_store::{ObjectStore, PutPayload};

use crate::{StorageError, StorageResult};

/// Moves complete table objects between the store and the local filesystem.
///
/// Transfers are blind: a fetch overwrites the local file and a send overwrites
/// whatever object already lives under `key`.
#[async_trait::async_trait]
pub trait TableStore: Send + Sync + std::fmt::Debug {
    /// Download the object stored under `key` into `dest`. Returns the byte count.
    async fn fetch(&self, key: &str, dest: &Path) -> StorageResult<u64>;

    /// Upload the file at `src` under `key`. Returns the byte count.
    async fn send(&self, src: &Path, key: &str) -> StorageResult<u64>;
}

#[derive(Debug, Clone)]
pub struct ObjectTableStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectTableStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<dyn ObjectStore> {
        &self.inner
    }
}

#[async_trait::async_trait]
impl TableStore for ObjectTableStore {
    async fn fetch(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        let location = object_store::path::Path::from(key);
        let store_error = |source| StorageError::ObjectStoreError {
            key: key.to_string(),
            source,
        };

        let bytes = self
            .inner
            .get(&location)
            .await
            .map_err(store_error)?
            .bytes()
            .await
            .map_err(store_error)?;

        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|source| StorageError::LocalFileError {
                path: dest.to_path_buf(),
                source,
            })?;

        tracing::debug!(key, dest = %dest.display(), size = bytes.len(), "fetched table");
        Ok(bytes.len() as u64)
    }

    async fn send(&self, src: &Path, key: &str) -> StorageResult<u64> {
        let contents = tokio::fs::read(src)
            .await
            .map_err(|source| StorageError::LocalFileError {
                path: src.to_path_buf(),
                source,
            })?;
        let size = contents.len() as u64;

        self.inner
            .put(
                &object_store::path::Path::from(key),
                PutPayload::from(bytes::Bytes::from(contents)),
            )
            .await
            .map_err(|source| StorageError::ObjectStoreError {
                key: key.to_string(),
                source,
            })?;

        tracing::debug!(key, src = %src.display(), size, "sent table");
        Ok(size)
    }
}
