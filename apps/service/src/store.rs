#![allow(dead_code)]
//! Record storage shared with the API layer.
//!
//! Records are kept as one JSON file per record under
//! `<base>/<category>/<id>.json`. The monitoring engine only lists, reads
//! and updates the `checks` category; create and delete belong to the API
//! layer that shares the store.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Durable key-value storage of records, keyed by category + record ID.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// IDs of every record in `category`.
    async fn list(&self, category: &str) -> Result<Vec<String>>;

    /// Read one record as raw JSON.
    async fn read(&self, category: &str, id: &str) -> Result<Value>;

    /// Create a record; fails if it already exists.
    async fn create(&self, category: &str, id: &str, record: &Value) -> Result<()>;

    /// Overwrite an existing record; fails if it does not exist.
    async fn update(&self, category: &str, id: &str, record: &Value) -> Result<()>;

    /// Remove a record.
    async fn delete(&self, category: &str, id: &str) -> Result<()>;
}

/// Filesystem-backed [`RecordStore`].
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn record_path(&self, category: &str, id: &str) -> PathBuf {
        self.base_dir.join(category).join(format!("{id}.json"))
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn list(&self, category: &str) -> Result<Vec<String>> {
        let dir = self.base_dir.join(category);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // A category nothing has written to yet is just empty.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to list {}", dir.display()));
            }
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    async fn read(&self, category: &str, id: &str) -> Result<Value> {
        let path = self.record_path(category, id);
        let contents = fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read record {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("record {} is not valid JSON", path.display()))
    }

    async fn create(&self, category: &str, id: &str, record: &Value) -> Result<()> {
        let path = self.record_path(category, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("could not create record {}, it may already exist", id))?;
        file.write_all(serde_json::to_string(record)?.as_bytes()).await?;
        Ok(())
    }

    async fn update(&self, category: &str, id: &str, record: &Value) -> Result<()> {
        let path = self.record_path(category, id);
        if !exists(&path).await {
            bail!("could not update record {id}, it may not exist yet");
        }
        fs::write(&path, serde_json::to_string(record)?)
            .await
            .with_context(|| format!("failed to write record {}", path.display()))
    }

    async fn delete(&self, category: &str, id: &str) -> Result<()> {
        let path = self.record_path(category, id);
        fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to delete record {}", path.display()))
    }
}

async fn exists(path: &Path) -> bool {
    fs::metadata(path).await.is_ok()
}
