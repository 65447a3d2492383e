//! Append-only per-check audit logs with rotation.
//!
//! Every probe appends one JSON line to `<base>/<id>.log`. Rotation
//! compresses each live log into an immutable `<id>-<unix-secs>.gz.b64`
//! archive (gzip, then base64 text) and truncates the live file in place.
//! Appending to a truncated or missing file reopens/recreates it, so
//! append-after-rotation is well-defined; a compress racing an in-flight
//! append is accepted, matching the engine's weak-consistency stance.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::monitoring::types::LogEntry;

const LIVE_SUFFIX: &str = ".log";
const ARCHIVE_SUFFIX: &str = ".gz.b64";

pub struct AuditLog {
    base_dir: PathBuf,
}

impl AuditLog {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn live_path(&self, id: &str) -> PathBuf {
        self.base_dir.join(format!("{id}{LIVE_SUFFIX}"))
    }

    fn archive_path(&self, id: &str) -> PathBuf {
        self.base_dir.join(format!("{id}{ARCHIVE_SUFFIX}"))
    }

    /// Append one entry to the check's live log, creating the file (and the
    /// log directory) if needed.
    pub async fn append(&self, id: &str, entry: &LogEntry) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await?;

        let line = serde_json::to_string(entry)?;
        let path = self.live_path(id);
        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .await
            .with_context(|| format!("could not open log file {}", path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }

    /// Basenames of log files: live logs always, archives when asked.
    pub async fn list(&self, include_compressed: bool) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to list {}", self.base_dir.display()));
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name.strip_suffix(LIVE_SUFFIX) {
                names.push(id.to_string());
            } else if include_compressed {
                if let Some(id) = name.strip_suffix(ARCHIVE_SUFFIX) {
                    names.push(id.to_string());
                }
            }
        }
        Ok(names)
    }

    /// Compress the live log `id` into a new archive `dest_id`. The archive
    /// is created exclusively; an existing archive of the same name fails.
    pub async fn compress(&self, id: &str, dest_id: &str) -> Result<()> {
        let source = self.live_path(id);
        let contents = fs::read(&source)
            .await
            .with_context(|| format!("failed to read log file {}", source.display()))?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&contents)?;
        let encoded = BASE64.encode(encoder.finish()?);

        let dest = self.archive_path(dest_id);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest)
            .await
            .with_context(|| format!("could not create archive {}", dest.display()))?;
        file.write_all(encoded.as_bytes()).await?;
        Ok(())
    }

    /// Read an archive back into its original newline-delimited content.
    pub async fn decompress(&self, dest_id: &str) -> Result<String> {
        let path = self.archive_path(dest_id);
        let encoded = fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read archive {}", path.display()))?;

        let compressed = BASE64.decode(encoded.trim_end())?;
        let mut contents = String::new();
        GzDecoder::new(compressed.as_slice()).read_to_string(&mut contents)?;
        Ok(contents)
    }

    /// Truncate a live log to zero bytes. Fails if the file does not exist.
    pub async fn truncate(&self, id: &str) -> Result<()> {
        let path = self.live_path(id);
        fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .await
            .with_context(|| format!("could not truncate log file {}", path.display()))?;
        Ok(())
    }

    /// Rotate every live log: compress into a dated archive, then truncate
    /// the source. A failure at either step is logged and does not affect
    /// the rest of the batch. Returns the number of logs rotated.
    pub async fn rotate_all(&self) -> Result<usize> {
        let ids = self.list(false).await?;
        let mut rotated = 0;

        for id in ids {
            if is_empty(&self.live_path(&id)).await {
                debug!(log = %id, "skipping rotation of empty log");
                continue;
            }

            let dest_id = format!("{id}-{}", chrono::Utc::now().timestamp());
            if let Err(e) = self.compress(&id, &dest_id).await {
                warn!(log = %id, "failed to compress log: {e:#}");
                continue;
            }
            if let Err(e) = self.truncate(&id).await {
                warn!(log = %id, "failed to truncate log after compressing: {e:#}");
                continue;
            }
            rotated += 1;
        }
        Ok(rotated)
    }
}

async fn is_empty(path: &Path) -> bool {
    fs::metadata(path).await.map(|meta| meta.len() == 0).unwrap_or(true)
}
