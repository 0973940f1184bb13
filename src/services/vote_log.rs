//! Vote log
//!
//! Each accepted ballot appends one JSON line to `<dir>/<period>.log`:
//!
//! ```text
//! {"time":"2026-10-15T08:00:00+00:00","level":"INFO","msg":"Budi with NIM 2207411001 from Teknik Informatika has voted"}
//! ```
//!
//! The line says who voted, never for whom. Changed files are pushed to
//! object storage by [`spawn_sync_task`] so admins can download them.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::storage::DynObjectStorage;
use crate::models::User;

#[derive(Debug, Serialize)]
struct VoteLogLine<'a> {
    time: String,
    level: &'a str,
    msg: String,
}

/// Append-only per-period log of who has voted
pub struct VoteLog {
    dir: PathBuf,
    /// Periods written since the last sync. Also serializes file access.
    dirty: Mutex<BTreeSet<i32>>,
}

impl VoteLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dirty: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn path_for(&self, period: i32) -> PathBuf {
        self.dir.join(format!("{}.log", period))
    }

    /// Record that `user` voted in `period`
    pub async fn append(&self, period: i32, user: &User) -> Result<()> {
        let line = VoteLogLine {
            time: Utc::now().to_rfc3339(),
            level: "INFO",
            msg: format!(
                "{} with NIM {} from {} has voted",
                user.full_name, user.nim, user.study_program
            ),
        };
        let mut bytes = serde_json::to_vec(&line).context("Failed to encode vote log line")?;
        bytes.push(b'\n');

        let mut dirty = self.dirty.lock().await;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create vote log directory: {:?}", self.dir))?;

        let path = self.path_for(period);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open vote log: {:?}", path))?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("Failed to write vote log: {:?}", path))?;
        file.flush().await?;

        dirty.insert(period);
        Ok(())
    }

    /// Upload every log written since the last sync. Failed uploads stay
    /// pending for the next round. Returns how many files were uploaded.
    pub async fn sync(&self, storage: &DynObjectStorage, log_prefix: &str) -> Result<usize> {
        let pending: Vec<i32> = {
            let mut dirty = self.dirty.lock().await;
            std::mem::take(&mut *dirty).into_iter().collect()
        };

        let mut uploaded = 0;
        let mut first_error = None;
        for period in pending {
            let body = {
                let _guard = self.dirty.lock().await;
                tokio::fs::read(self.path_for(period)).await
            };
            let result = match body {
                Ok(body) => {
                    storage
                        .put_object(&object_key(log_prefix, period), body, "application/x-ndjson")
                        .await
                }
                Err(e) => Err(anyhow::Error::new(e).context("Failed to read vote log")),
            };

            match result {
                Ok(()) => uploaded += 1,
                Err(e) => {
                    self.dirty.lock().await.insert(period);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(uploaded),
        }
    }
}

/// Object key a period's log is stored under
pub fn object_key(log_prefix: &str, period: i32) -> String {
    format!("{}/{}", log_prefix.trim_end_matches('/'), period)
}

/// Periodically push changed vote logs to object storage
pub fn spawn_sync_task(
    log: Arc<VoteLog>,
    storage: DynObjectStorage,
    log_prefix: String,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match log.sync(&storage, &log_prefix).await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "Uploaded vote logs"),
                Err(e) => tracing::error!(error = %format!("{:#}", e), "Failed to upload vote logs"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::services::storage::ObjectStorage;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingStorage {
        puts: StdMutex<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    #[async_trait]
    impl ObjectStorage for RecordingStorage {
        async fn presign_get(&self, key: &str, _expires_in: u64) -> Result<String> {
            Ok(format!("https://storage.test/{}", key))
        }

        async fn presign_put(&self, key: &str, _expires_in: u64) -> Result<String> {
            Ok(format!("https://storage.test/{}", key))
        }

        async fn put_object(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<()> {
            if self.fail {
                anyhow::bail!("storage offline");
            }
            self.puts.lock().unwrap().push((key.to_string(), body));
            Ok(())
        }
    }

    fn voter() -> User {
        User::new("2207411001", "Budi Santoso", "Teknik Informatika", UserRole::Student, "x")
    }

    #[tokio::test]
    async fn test_append_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = VoteLog::new(dir.path());

        log.append(2026, &voter()).await.unwrap();
        log.append(2026, &voter()).await.unwrap();

        let content = std::fs::read_to_string(log.path_for(2026)).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(
            parsed["msg"],
            "Budi Santoso with NIM 2207411001 from Teknik Informatika has voted"
        );
        assert!(chrono::DateTime::parse_from_rfc3339(parsed["time"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_sync_uploads_only_changed_periods() {
        let dir = tempfile::tempdir().unwrap();
        let log = VoteLog::new(dir.path().join("nested"));
        let recording = Arc::new(RecordingStorage::default());
        let storage: DynObjectStorage = recording.clone();

        log.append(2026, &voter()).await.unwrap();
        assert_eq!(log.sync(&storage, "logs/vote/").await.unwrap(), 1);
        assert_eq!(log.sync(&storage, "logs/vote/").await.unwrap(), 0);

        let puts = recording.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].0, "logs/vote/2026");
        assert!(String::from_utf8_lossy(&puts[0].1).contains("has voted"));
    }

    #[tokio::test]
    async fn test_failed_sync_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let log = VoteLog::new(dir.path());
        let failing: DynObjectStorage = Arc::new(RecordingStorage {
            fail: true,
            ..Default::default()
        });

        log.append(2026, &voter()).await.unwrap();
        assert!(log.sync(&failing, "logs").await.is_err());

        let working: DynObjectStorage = Arc::new(RecordingStorage::default());
        assert_eq!(log.sync(&working, "logs").await.unwrap(), 1);
    }
}
