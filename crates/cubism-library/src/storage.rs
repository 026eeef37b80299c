use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

/// Directory under the library root that holds uncommitted artifacts.
const STAGING_DIR: &str = ".staging";

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Artifact not found: {0}")]
    NotFound(String),
    #[error("Invalid extension: {0}")]
    InvalidExtension(String),
    #[error("Source not found: {0}")]
    SourceMissing(String),
}

/// Library location, read from the environment.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub root: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./library"),
        }
    }
}

impl LibraryConfig {
    pub fn from_env() -> Self {
        let root = std::env::var("ASSET_LIBRARY_PATH").unwrap_or_else(|_| "./library".to_string());
        Self {
            root: PathBuf::from(root),
        }
    }
}

/// Operations every library backend must implement.
///
/// `stage_*` calls never touch live artifacts. `commit` swaps the staged set
/// in for the asset's previous artifacts; `discard` drops it.
#[async_trait]
pub trait LibraryBackend: Send + Sync {
    /// Path of a committed artifact.
    fn artifact_path(&self, uuid: Uuid, extension: &str) -> PathBuf;

    /// Stage a verbatim copy of `source` under `extension`.
    async fn stage_copy(
        &self,
        uuid: Uuid,
        extension: &str,
        source: &Path,
    ) -> Result<(), LibraryError>;

    /// Stage `data` under `extension`.
    async fn stage_write(&self, uuid: Uuid, extension: &str, data: &[u8])
        -> Result<(), LibraryError>;

    /// Replace the asset's live artifacts with the staged ones.
    /// Returns the committed extensions, sorted.
    async fn commit(&self, uuid: Uuid) -> Result<Vec<String>, LibraryError>;

    /// Drop everything staged for the asset.
    async fn discard(&self, uuid: Uuid) -> Result<(), LibraryError>;

    async fn read(&self, uuid: Uuid, extension: &str) -> Result<Vec<u8>, LibraryError>;

    async fn exists(&self, uuid: Uuid, extension: &str) -> bool;

    /// Extensions of the asset's live artifacts, sorted.
    async fn list(&self, uuid: Uuid) -> Result<Vec<String>, LibraryError>;

    /// Remove every live artifact of the asset.
    async fn remove(&self, uuid: Uuid) -> Result<(), LibraryError>;

    /// Drop staging left behind by an interrupted session.
    async fn purge_staging(&self) -> Result<usize, LibraryError>;

    async fn hash_artifact(&self, uuid: Uuid, extension: &str) -> Result<String, LibraryError> {
        let data = self.read(uuid, extension).await?;
        let hash = Sha256::digest(&data);
        Ok(format!("{:x}", hash))
    }
}

// ─── Local Filesystem Backend ──────────────────────────────────────

/// Library on the local filesystem.
///
/// Layout: `<root>/<first two uuid chars>/<uuid><ext>`, staging under
/// `<root>/.staging/<uuid>/<uuid><ext>`.
#[derive(Debug, Clone)]
pub struct LocalLibrary {
    root: PathBuf,
}

impl LocalLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &LibraryConfig) -> Self {
        Self::new(config.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn shard_dir(&self, uuid: Uuid) -> PathBuf {
        let id = uuid.to_string();
        self.root.join(&id[..2])
    }

    fn staging_dir(&self, uuid: Uuid) -> PathBuf {
        self.root.join(STAGING_DIR).join(uuid.to_string())
    }

    async fn staged_target(&self, uuid: Uuid, extension: &str) -> Result<PathBuf, LibraryError> {
        check_extension(extension)?;
        let dir = self.staging_dir(uuid);
        fs::create_dir_all(&dir).await?;
        Ok(dir.join(format!("{uuid}{extension}")))
    }
}

#[async_trait]
impl LibraryBackend for LocalLibrary {
    fn artifact_path(&self, uuid: Uuid, extension: &str) -> PathBuf {
        self.shard_dir(uuid).join(format!("{uuid}{extension}"))
    }

    async fn stage_copy(
        &self,
        uuid: Uuid,
        extension: &str,
        source: &Path,
    ) -> Result<(), LibraryError> {
        if fs::metadata(source).await.is_err() {
            return Err(LibraryError::SourceMissing(source.display().to_string()));
        }
        let target = self.staged_target(uuid, extension).await?;
        fs::copy(source, &target).await?;
        tracing::debug!(asset = %uuid, extension, "raw copy staged");
        Ok(())
    }

    async fn stage_write(
        &self,
        uuid: Uuid,
        extension: &str,
        data: &[u8],
    ) -> Result<(), LibraryError> {
        let target = self.staged_target(uuid, extension).await?;
        fs::write(&target, data).await?;
        tracing::debug!(asset = %uuid, extension, bytes = data.len(), "artifact staged");
        Ok(())
    }

    async fn commit(&self, uuid: Uuid) -> Result<Vec<String>, LibraryError> {
        let staging = self.staging_dir(uuid);
        if fs::metadata(&staging).await.is_err() {
            return Ok(Vec::new());
        }

        // The asset's previous artifacts are replaced wholesale so a re-import
        // that drops an extension doesn't leave a stale file behind.
        self.remove(uuid).await?;

        let shard = self.shard_dir(uuid);
        fs::create_dir_all(&shard).await?;

        let prefix = uuid.to_string();
        let mut committed = Vec::new();
        let mut entries = fs::read_dir(&staging).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(ext) = artifact_suffix(&name, &prefix) {
                fs::rename(entry.path(), shard.join(&name)).await?;
                committed.push(ext.to_string());
            }
        }
        fs::remove_dir_all(&staging).await?;

        committed.sort();
        tracing::debug!(asset = %uuid, artifacts = ?committed, "library commit");
        Ok(committed)
    }

    async fn discard(&self, uuid: Uuid) -> Result<(), LibraryError> {
        let staging = self.staging_dir(uuid);
        if fs::metadata(&staging).await.is_ok() {
            fs::remove_dir_all(&staging).await?;
            tracing::debug!(asset = %uuid, "staged artifacts discarded");
        }
        Ok(())
    }

    async fn read(&self, uuid: Uuid, extension: &str) -> Result<Vec<u8>, LibraryError> {
        check_extension(extension)?;
        let path = self.artifact_path(uuid, extension);
        fs::read(&path)
            .await
            .map_err(|_| LibraryError::NotFound(format!("{uuid}{extension}")))
    }

    async fn exists(&self, uuid: Uuid, extension: &str) -> bool {
        fs::metadata(self.artifact_path(uuid, extension))
            .await
            .is_ok()
    }

    async fn list(&self, uuid: Uuid) -> Result<Vec<String>, LibraryError> {
        let shard = self.shard_dir(uuid);
        let mut result = Vec::new();
        if fs::metadata(&shard).await.is_err() {
            return Ok(result);
        }
        let prefix = uuid.to_string();
        let mut entries = fs::read_dir(&shard).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(ext) = artifact_suffix(&name, &prefix) {
                result.push(ext.to_string());
            }
        }
        result.sort();
        Ok(result)
    }

    async fn remove(&self, uuid: Uuid) -> Result<(), LibraryError> {
        for ext in self.list(uuid).await? {
            fs::remove_file(self.artifact_path(uuid, &ext)).await?;
        }
        Ok(())
    }

    async fn purge_staging(&self) -> Result<usize, LibraryError> {
        let staging_root = self.root.join(STAGING_DIR);
        if fs::metadata(&staging_root).await.is_err() {
            return Ok(0);
        }
        let mut count = 0;
        let mut entries = fs::read_dir(&staging_root).await?;
        while let Some(entry) = entries.next_entry().await? {
            fs::remove_dir_all(entry.path()).await?;
            count += 1;
        }
        if count > 0 {
            tracing::warn!(count, "purged staging left by an interrupted import");
        }
        Ok(count)
    }
}

// ─── Helpers ───────────────────────────────────────────────────────

/// Extension of an artifact file name owned by `uuid`, `""` for the bare
/// `<uuid>` file.
fn artifact_suffix<'a>(name: &'a str, uuid: &str) -> Option<&'a str> {
    name.strip_prefix(uuid)
        .filter(|ext| ext.is_empty() || ext.starts_with('.'))
}

/// Check that an extension is safe to use as a file-name suffix.
///
/// The empty extension names the bare `<uuid>` artifact. Otherwise it must
/// start with `.`, be followed by at least one character, and contain only
/// ASCII alphanumerics, `.`, `_` or `-`. `..` is rejected.
pub fn check_extension(extension: &str) -> Result<(), LibraryError> {
    if extension.is_empty() {
        return Ok(());
    }
    let Some(rest) = extension.strip_prefix('.') else {
        return Err(LibraryError::InvalidExtension(extension.to_string()));
    };
    let valid = !rest.is_empty()
        && !extension.contains("..")
        && rest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(LibraryError::InvalidExtension(extension.to_string()))
    }
}

/// SHA-256 of a source file, hex encoded.
pub async fn hash_source(path: &Path) -> Result<String, LibraryError> {
    let data = fs::read(path)
        .await
        .map_err(|_| LibraryError::SourceMissing(path.display().to_string()))?;
    let hash = Sha256::digest(&data);
    Ok(format!("{:x}", hash))
}
