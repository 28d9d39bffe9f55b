//! Append-only line store backed by a single text file.
//!
//! Lines are never rewritten or removed here. Appends are serialized behind a
//! write guard so two sessions can never interleave inside one line; reads
//! share the guard and see a consistent snapshot of whole lines.

use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::RwLock};
use tracing::{debug, info};

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file not found at {path}")]
    Missing { path: PathBuf },

    #[error("I/O error while {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line must not contain a newline")]
    EmbeddedNewline,
}

#[derive(Debug)]
pub struct LineStore {
    path: PathBuf,
    guard: RwLock<()>,
}

impl LineStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the backing file with `seed` if it does not exist yet.
    ///
    /// Returns `true` when the file was created. An existing file is left
    /// untouched, so calling this repeatedly is harmless.
    pub async fn initialize(&self, seed: &[&str]) -> Result<bool, StoreError> {
        let _guard = self.guard.write().await;

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %self.path.display(), "store already present");
                return Ok(false);
            }
            Err(source) => return Err(self.io_error("creating", source)),
        };

        let mut contents = String::new();
        for line in seed {
            contents.push_str(line);
            contents.push_str(LINE_ENDING);
        }
        file.write_all(contents.as_bytes())
            .await
            .map_err(|source| self.io_error("seeding", source))?;
        file.flush()
            .await
            .map_err(|source| self.io_error("seeding", source))?;

        info!(path = %self.path.display(), lines = seed.len(), "created store with sample data");
        Ok(true)
    }

    /// Returns every line currently in the store, in file order.
    ///
    /// The returned vector is an owned snapshot; later appends do not affect it.
    pub async fn read_all(&self) -> Result<Vec<String>, StoreError> {
        let _guard = self.guard.read().await;

        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::Missing {
                    path: self.path.clone(),
                });
            }
            Err(source) => return Err(self.io_error("reading", source)),
        };

        Ok(String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_owned)
            .collect())
    }

    /// Appends one line in a single write. The file is created if another
    /// process removed it since startup.
    pub async fn append(&self, line: &str) -> Result<(), StoreError> {
        if line.contains('\n') {
            return Err(StoreError::EmbeddedNewline);
        }

        let mut record = String::with_capacity(line.len() + LINE_ENDING.len());
        record.push_str(line);
        record.push_str(LINE_ENDING);

        let _guard = self.guard.write().await;
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await
            .map_err(|source| self.io_error("opening", source))?;
        file.write_all(record.as_bytes())
            .await
            .map_err(|source| self.io_error("appending to", source))?;
        file.flush()
            .await
            .map_err(|source| self.io_error("appending to", source))?;

        Ok(())
    }

    fn io_error(&self, operation: &'static str, source: io::Error) -> StoreError {
        StoreError::Io {
            operation,
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn scratch_store() -> (tempfile::TempDir, LineStore) {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = LineStore::new(dir.path().join("lines.txt"));
        (dir, store)
    }

    #[tokio::test]
    async fn initialize_seeds_missing_file_once() {
        let (dir, store) = scratch_store();
        assert_eq!(store.path(), dir.path().join("lines.txt"));

        assert!(store.initialize(&["first", "second"]).await.unwrap());
        store.append("third").await.unwrap();
        assert!(!store.initialize(&["ignored"]).await.unwrap());

        assert_eq!(store.read_all().await.unwrap(), ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn initialize_with_empty_seed_creates_empty_store() {
        let (_dir, store) = scratch_store();

        assert!(store.initialize(&[]).await.unwrap());
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_all_reports_missing_file() {
        let (_dir, store) = scratch_store();

        let err = store.read_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }

    #[tokio::test]
    async fn read_all_keeps_crlf_lines_intact() {
        let (dir, store) = scratch_store();
        std::fs::write(dir.path().join("lines.txt"), "alpha\r\nbeta\r\n").unwrap();

        assert_eq!(store.read_all().await.unwrap(), ["alpha", "beta"]);
    }

    #[tokio::test]
    async fn append_rejects_embedded_newline() {
        let (_dir, store) = scratch_store();
        store.initialize(&[]).await.unwrap();

        let err = store.append("one\ntwo").await.unwrap_err();
        assert!(matches!(err, StoreError::EmbeddedNewline));
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_fails_when_directory_is_missing() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = LineStore::new(dir.path().join("absent").join("lines.txt"));

        let err = store.append("line").await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[tokio::test]
    async fn concurrent_appends_never_interleave() {
        let (_dir, store) = scratch_store();
        store.initialize(&[]).await.unwrap();
        let store = Arc::new(store);

        let mut tasks = tokio::task::JoinSet::new();
        for writer in 0..8 {
            let store = Arc::clone(&store);
            tasks.spawn(async move {
                for n in 0..50 {
                    let line = format!("writer-{writer}-entry-{n}-{}", "x".repeat(256));
                    store.append(&line).await.unwrap();
                }
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        let lines = store.read_all().await.unwrap();
        assert_eq!(lines.len(), 400);
        for writer in 0..8 {
            for n in 0..50 {
                let expected = format!("writer-{writer}-entry-{n}-{}", "x".repeat(256));
                assert_eq!(lines.iter().filter(|line| **line == expected).count(), 1);
            }
        }
    }
}
