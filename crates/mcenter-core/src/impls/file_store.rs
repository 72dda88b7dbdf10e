//! FileStore - one JSON document per bucket under a directory.
//!
//! `<dir>/<bucket>.json` holds `{ id: record }`. Every mutation rewrites the
//! whole document through a temp file and a rename, so a crash mid-write
//! leaves the previous document in place. Access is serialized within the
//! process; the store is not meant to be shared between processes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::ports::{StoreClient, StoreError};

pub struct FileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates `dir` if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn bucket_path(&self, bucket: &str) -> PathBuf {
        let file: String = bucket
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }

    async fn read(&self, bucket: &str) -> Result<HashMap<String, String>, StoreError> {
        match tokio::fs::read(self.bucket_path(bucket)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, bucket: &str, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let path = self.bucket_path(bucket);
        if entries.is_empty() {
            return match tokio::fs::remove_file(&path).await {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(entries)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl StoreClient for FileStore {
    async fn set(&self, bucket: &str, id: &str, record: String) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read(bucket).await?;
        entries.insert(id.to_string(), record);
        self.write(bucket, &entries).await
    }

    async fn delete(&self, bucket: &str, id: &str) -> Result<u64, StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read(bucket).await?;
        if entries.remove(id).is_none() {
            return Ok(0);
        }
        self.write(bucket, &entries).await?;
        Ok(1)
    }

    async fn get_all(&self, bucket: &str) -> Result<HashMap<String, String>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read(bucket).await
    }
}
