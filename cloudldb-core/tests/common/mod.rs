#![allow(dead_code)]

use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use cloudldb_config::InvocationConfig;
use cloudldb_object_storage::{ObjectTableStore, StorageResult, TableStore};
use object_store::{memory::InMemory, path::Path as ObjectPath, ObjectStore, PutPayload};

/// Table store over an in-memory bucket that remembers every transfer.
#[derive(Debug)]
pub struct RecordingStore {
    inner: ObjectTableStore,
    pub fetched: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub async fn with_tables(tables: &[(&str, &str)]) -> Arc<Self> {
        let bucket = Arc::new(InMemory::new());
        for (key, body) in tables {
            bucket
                .put(&ObjectPath::from(*key), PutPayload::from(body.as_bytes().to_vec()))
                .await
                .expect("seed table");
        }
        Arc::new(Self {
            inner: ObjectTableStore::new(bucket),
            fetched: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub async fn object(&self, key: &str) -> String {
        let bytes = self
            .inner
            .inner()
            .get(&ObjectPath::from(key))
            .await
            .expect("object exists")
            .bytes()
            .await
            .expect("object body");
        String::from_utf8(bytes.to_vec()).expect("utf8 object")
    }
}

#[async_trait::async_trait]
impl TableStore for RecordingStore {
    async fn fetch(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        self.fetched.lock().unwrap().push(key.to_string());
        self.inner.fetch(key, dest).await
    }

    async fn send(&self, src: &Path, key: &str) -> StorageResult<u64> {
        self.sent.lock().unwrap().push(key.to_string());
        self.inner.send(src, key).await
    }
}

/// Write an executable shell script standing in for an external binary.
pub fn mock_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

pub fn config(scratch: &Path, merger: &Path, reader: &Path) -> InvocationConfig {
    InvocationConfig {
        region: "us-east-1".to_string(),
        bucket: "tables".to_string(),
        merger_bin: merger.to_path_buf(),
        table_reader_bin: reader.to_path_buf(),
        scratch_dir: Some(scratch.to_path_buf()),
        local_store_dir: None,
        report_timings: false,
    }
}

/// Number of entries left behind in the scratch directory.
pub fn leftover_staging_areas(scratch: &Path) -> usize {
    std::fs::read_dir(scratch).map(|d| d.count()).unwrap_or(0)
}
