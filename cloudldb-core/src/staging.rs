use std::path::{Path, PathBuf};

use cloudldb_object_storage::TableStore;
use tempfile::TempDir;

use crate::{
    error::{HandlerError, HandlerResult},
    table::TableNumber,
};

/// Name of the raw compaction payload record inside a staging area.
pub const MERGE_INPUT_FILE: &str = "leveldb_merge.input";
/// Name of the raw lookup event record inside a staging area.
pub const GET_INPUT_FILE: &str = "leveldb_get.input";

/// Scratch directory owned by exactly one invocation.
///
/// Tables are staged under their canonical file names, which is the layout the
/// external executables expect. The directory and everything in it is removed
/// when the area is dropped.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    pub fn create(parent: &Path) -> HandlerResult<Self> {
        let staging_error = |source| HandlerError::Staging {
            path: parent.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(parent).map_err(staging_error)?;
        let dir = tempfile::Builder::new()
            .prefix("cloudldb-")
            .tempdir_in(parent)
            .map_err(staging_error)?;

        tracing::debug!(dir = %dir.path().display(), "created staging area");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn table_path(&self, table: TableNumber) -> PathBuf {
        self.path().join(table.file_name())
    }

    /// Keep a verbatim copy of the invocation payload next to the tables.
    pub async fn record_payload(&self, name: &str, payload: &str) -> HandlerResult<PathBuf> {
        let path = self.path().join(name);
        tokio::fs::write(&path, payload)
            .await
            .map_err(|source| HandlerError::Staging {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Download every table in order, one at a time. The first failure aborts.
    pub async fn fetch_tables(
        &self,
        store: &dyn TableStore,
        tables: &[TableNumber],
    ) -> HandlerResult<u64> {
        let mut total = 0;
        for table in tables {
            let key = table.file_name();
            total += store.fetch(&key, &self.table_path(*table)).await?;
        }
        tracing::info!(tables = tables.len(), bytes = total, "staged tables");
        Ok(total)
    }

    /// Upload the staged copy of every table in order, overwriting the stored
    /// object. Existence is not checked up front: a missing file fails the upload.
    pub async fn send_tables(
        &self,
        store: &dyn TableStore,
        tables: &[TableNumber],
    ) -> HandlerResult<u64> {
        let mut total = 0;
        for table in tables {
            let key = table.file_name();
            total += store.send(&self.table_path(*table), &key).await?;
        }
        tracing::info!(tables = tables.len(), bytes = total, "uploaded tables");
        Ok(total)
    }
}
