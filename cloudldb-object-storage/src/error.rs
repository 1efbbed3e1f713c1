#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("Object store error for `{key}`: {source}")]
    ObjectStoreError {
        key: String,
        #[source]
        source: object_store::Error,
    },
    #[error("Local file error for `{path}`: {source}")]
    LocalFileError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Initialization error: {0}")]
    InitializationError(String),
}

impl StorageError {
    /// True when the store reported that the requested object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ObjectStoreError {
                source: object_store::Error::NotFound { .. },
                ..
            }
        )
    }
}
