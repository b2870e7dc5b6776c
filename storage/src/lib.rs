use snoofeed_core::{CoreError, PersistedState, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};


/// Key-value style access to the `{ cursor, posts }` record carried between
/// runs.
pub trait StateStore {
    async fn load(&self) -> Result<PersistedState, CoreError>;

    /// Persist history and cursor as one unit.
    async fn save(&self, state: &PersistedState) -> Result<(), CoreError>;
}

/// JSON file on disk.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    async fn load(&self) -> Result<PersistedState, CoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "No state at {}, starting from the newest posts",
                    self.path.display()
                );
                return Ok(PersistedState::default());
            }
            Err(source) => {
                return Err(StorageError::ReadFailed {
                    path: self.path.display().to_string(),
                    source,
                }
                .into())
            }
        };

        let state: PersistedState =
            serde_json::from_str(&content).map_err(|source| StorageError::CorruptState {
                path: self.path.display().to_string(),
                source,
            })?;
        debug!(
            "Loaded state from {}: cursor {:?}, {} posts",
            self.path.display(),
            state.cursor,
            state.posts.len()
        );
        Ok(state)
    }

    async fn save(&self, state: &PersistedState) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec(state)?;
        write_atomic(&self.path, &bytes).await?;
        debug!(
            "Saved state to {}: cursor {:?}, {} posts",
            self.path.display(),
            state.cursor,
            state.posts.len()
        );
        Ok(())
    }
}

/// Process-local store, used by tests and dry runs.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<PersistedState>,
    saves: Mutex<usize>,
}

impl MemoryStateStore {
    pub fn new(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(state),
            saves: Mutex::new(0),
        }
    }

    pub fn snapshot(&self) -> PersistedState {
        self.state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|count| *count).unwrap_or_default()
    }
}

impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<PersistedState, CoreError> {
        Ok(self.snapshot())
    }

    async fn save(&self, state: &PersistedState) -> Result<(), CoreError> {
        let mut current = self.state.lock().map_err(|_| CoreError::Internal {
            message: "state lock poisoned".to_string(),
        })?;
        *current = state.clone();
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}

/// Write `bytes` next to `path` and rename over it, so readers never observe
/// a partially written file.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp_path = tmp_path_for(path);
    let write_failed = |source| StorageError::WriteFailed {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
