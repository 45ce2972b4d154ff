//! On-disk cache of the store state.
//!
//! Two files are kept in the cache directory: `course-data.json`, which is read back at
//! startup, and an indented copy `course-data-pretty.json` for humans. Both are replaced
//! atomically by writing to a uniquely named temporary file and renaming it into place. Saves
//! through clones of one [`CacheFile`] never interleave.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::store::{CourseStore, PersistedState};

pub const CACHE_FILE_NAME: &str = "course-data.json";
pub const PRETTY_CACHE_FILE_NAME: &str = "course-data-pretty.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to access cache file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize course data: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("cache file {} is not valid course data: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cache write task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

type Result<T, E = CacheError> = std::result::Result<T, E>;

#[derive(Debug, Clone)]
pub struct CacheFile {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CacheFile {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }

    pub fn pretty_path(&self) -> PathBuf {
        self.dir.join(PRETTY_CACHE_FILE_NAME)
    }

    /// Read the cached state, or `None` if nothing has been cached yet
    pub async fn load(&self) -> Result<Option<PersistedState>> {
        let path = self.path();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no course data cache file");
                return Ok(None);
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        let state = serde_json::from_slice(&bytes)
            .map_err(|source| CacheError::Malformed { path, source })?;
        Ok(Some(state))
    }

    /// Save the current state of `store`.
    ///
    /// The state is read only once earlier saves have finished, so the file on disk never goes
    /// back to an older state than one already written.
    pub async fn save_store(&self, store: &CourseStore) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(&store.persisted_state()).await
    }

    async fn write(&self, state: &PersistedState) -> Result<()> {
        let compact = serde_json::to_vec(state).map_err(CacheError::Serialize)?;
        let pretty = serde_json::to_vec_pretty(state).map_err(CacheError::Serialize)?;
        let bytes = compact.len();

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::Io {
                path: self.dir.clone(),
                source,
            })?;
        write_atomic(self.path(), compact).await?;
        write_atomic(self.pretty_path(), pretty).await?;

        info!(path = %self.path().display(), bytes, "wrote course data cache");
        Ok(())
    }
}

async fn write_atomic(path: PathBuf, contents: Vec<u8>) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        let dir = path.parent().map(PathBuf::from).unwrap_or_default();
        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_error(&dir))?;
        tmp.write_all(&contents).map_err(io_error(&path))?;
        tmp.as_file().sync_all().map_err(io_error(&path))?;
        tmp.persist(&path).map_err(|e| CacheError::Io {
            path,
            source: e.error,
        })?;
        Ok(())
    })
    .await?
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError {
    let path = path.to_path_buf();
    move |source| CacheError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::test_util::course;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn missing_cache_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheFile::new(dir.path());
        assert!(cache.load().await.unwrap().is_none());
    }

    #[test_log::test(tokio::test)]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheFile::new(dir.path().join("out"));

        let store = CourseStore::new();
        store
            .apply_refresh(100, vec![course("CS", 5, "HM", 1)], vec![])
            .unwrap();
        store
            .apply_refresh(
                200,
                vec![course("CS", 5, "HM", 1), course("CS", 5, "HM", 1)],
                vec!["BAD".to_string()],
            )
            .unwrap();
        let state = store.persisted_state();

        cache.save_store(&store).await.unwrap();
        assert!(cache.pretty_path().exists());
        assert_eq!(cache.load().await.unwrap(), Some(state));

        let pretty: PersistedState =
            serde_json::from_slice(&std::fs::read(cache.pretty_path()).unwrap()).unwrap();
        assert_eq!(pretty.timestamp, Some(200));
    }

    #[tokio::test]
    async fn malformed_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheFile::new(dir.path());
        std::fs::write(cache.path(), b"{\"current\": 7").unwrap();
        let err = cache.load().await.unwrap_err();
        assert!(matches!(err, CacheError::Malformed { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheFile::new(dir.path());

        let store = Arc::new(CourseStore::new());
        let courses = (0..2000)
            .map(|n| course("CS", n, "HM", 1))
            .collect::<Vec<_>>();
        store.apply_refresh(100, courses, vec![]).unwrap();

        for _ in 0..5 {
            let saves = (0..8)
                .map(|_| {
                    let cache = cache.clone();
                    let store = Arc::clone(&store);
                    tokio::spawn(async move { cache.save_store(&store).await })
                })
                .collect::<Vec<_>>();
            for save in saves {
                save.await.unwrap().unwrap();
            }
            assert_eq!(cache.load().await.unwrap(), Some(store.persisted_state()));
        }

        // no temporary files are left behind
        let mut entries = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        entries.sort();
        assert_eq!(entries, vec![CACHE_FILE_NAME, PRETTY_CACHE_FILE_NAME]);
    }

    #[tokio::test]
    async fn save_store_writes_latest_state() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheFile::new(dir.path());
        let store = CourseStore::new();
        store
            .apply_refresh(100, vec![course("CS", 5, "HM", 1)], vec![])
            .unwrap();
        cache.save_store(&store).await.unwrap();

        store.reset();
        cache.save_store(&store).await.unwrap();
        assert_eq!(cache.load().await.unwrap(), Some(PersistedState::default()));
    }
}
