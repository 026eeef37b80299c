//! Asset handles given to importers.
//!
//! A `VirtualAsset` has no physical file of its own; an `Asset` is backed by
//! a source path. Both expose the two library channels an importer may write
//! through: the raw copy (`copy_to_library`) and the serialized meta
//! (`save_to_library`). Writes land in the library's staging area and only
//! become live when the host commits them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cubism_library::LibraryBackend;
use uuid::Uuid;

use crate::error::ImportError;

/// Lowercased extension of `path` including the leading dot, or `""`.
pub fn extname_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// An asset with no physical file.
#[derive(Clone)]
pub struct VirtualAsset {
    uuid: Uuid,
    extname: String,
    library: Arc<dyn LibraryBackend>,
}

impl std::fmt::Debug for VirtualAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualAsset")
            .field("uuid", &self.uuid)
            .field("extname", &self.extname)
            .finish_non_exhaustive()
    }
}

impl VirtualAsset {
    pub fn new(uuid: Uuid, extname: impl Into<String>, library: Arc<dyn LibraryBackend>) -> Self {
        Self {
            uuid,
            extname: extname.into(),
            library,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn extname(&self) -> &str {
        &self.extname
    }

    /// Copy `file` verbatim into the raw slot keyed by `extname`.
    pub async fn copy_to_library(&self, extname: &str, file: &Path) -> Result<(), ImportError> {
        self.library.stage_copy(self.uuid, extname, file).await?;
        Ok(())
    }

    /// Save serialized content into the slot keyed by `extname`.
    pub async fn save_to_library(
        &self,
        extname: &str,
        content: impl AsRef<[u8]>,
    ) -> Result<(), ImportError> {
        self.library
            .stage_write(self.uuid, extname, content.as_ref())
            .await?;
        Ok(())
    }
}

/// A file-backed asset.
#[derive(Debug, Clone)]
pub struct Asset {
    base: VirtualAsset,
    source: PathBuf,
    basename: String,
}

impl Asset {
    pub fn new(uuid: Uuid, source: impl Into<PathBuf>, library: Arc<dyn LibraryBackend>) -> Self {
        let source = source.into();
        let basename = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            base: VirtualAsset::new(uuid, extname_of(&source), library),
            source,
            basename,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.base.uuid
    }

    pub fn extname(&self) -> &str {
        &self.base.extname
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// File name without its extension.
    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub async fn is_directory(&self) -> Result<bool, ImportError> {
        let metadata = tokio::fs::metadata(&self.source).await?;
        Ok(metadata.is_dir())
    }

    pub async fn copy_to_library(&self, extname: &str, file: &Path) -> Result<(), ImportError> {
        self.base.copy_to_library(extname, file).await
    }

    pub async fn save_to_library(
        &self,
        extname: &str,
        content: impl AsRef<[u8]>,
    ) -> Result<(), ImportError> {
        self.base.save_to_library(extname, content).await
    }

    pub fn as_virtual(&self) -> &VirtualAsset {
        &self.base
    }
}

/// What the host hands to `validate` and `import`.
#[derive(Debug, Clone, Copy)]
pub enum AssetRef<'a> {
    Virtual(&'a VirtualAsset),
    Source(&'a Asset),
}

impl<'a> AssetRef<'a> {
    pub fn uuid(&self) -> Uuid {
        match self {
            Self::Virtual(v) => v.uuid(),
            Self::Source(a) => a.uuid(),
        }
    }

    pub fn extname(&self) -> &'a str {
        match *self {
            Self::Virtual(v) => v.extname(),
            Self::Source(a) => a.extname(),
        }
    }

    /// Virtual assets are never directories.
    pub async fn is_directory(&self) -> Result<bool, ImportError> {
        match self {
            Self::Virtual(_) => Ok(false),
            Self::Source(a) => a.is_directory().await,
        }
    }

    /// The concrete file-backed asset, if this is one.
    pub fn as_source(&self) -> Option<&'a Asset> {
        match *self {
            Self::Source(a) => Some(a),
            Self::Virtual(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubism_library::LocalLibrary;

    fn library() -> Arc<dyn LibraryBackend> {
        Arc::new(LocalLibrary::new("/nonexistent/library"))
    }

    #[test]
    fn test_extname_of() {
        assert_eq!(extname_of(Path::new("a/foo.live2d")), ".live2d");
        assert_eq!(extname_of(Path::new("a/Foo.LIVE2D")), ".live2d");
        assert_eq!(extname_of(Path::new("a/foo.model3.json")), ".json");
        assert_eq!(extname_of(Path::new("a/folder")), "");
        assert_eq!(extname_of(Path::new("a/LICENSE")), "");
        assert_eq!(extname_of(Path::new("a/trailing.")), "");
    }

    #[test]
    fn test_asset_fields() {
        let uuid = Uuid::new_v4();
        let asset = Asset::new(uuid, "assets/models/foo.live2d", library());
        assert_eq!(asset.uuid(), uuid);
        assert_eq!(asset.extname(), ".live2d");
        assert_eq!(asset.basename(), "foo");
        assert_eq!(asset.source(), Path::new("assets/models/foo.live2d"));
    }

    #[test]
    fn test_asset_ref_as_source() {
        let asset = Asset::new(Uuid::new_v4(), "foo.live2d", library());
        let virt = VirtualAsset::new(Uuid::new_v4(), ".live2d", library());

        assert!(AssetRef::Source(&asset).as_source().is_some());
        assert!(AssetRef::Virtual(&virt).as_source().is_none());
        assert_eq!(AssetRef::Virtual(&virt).extname(), ".live2d");
    }

    #[tokio::test]
    async fn test_is_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("foo.live2d");
        tokio::fs::write(&file, b"x").await.unwrap();

        let dir_asset = Asset::new(Uuid::new_v4(), tmp.path(), library());
        let file_asset = Asset::new(Uuid::new_v4(), &file, library());
        let virt = VirtualAsset::new(Uuid::new_v4(), "", library());

        assert!(AssetRef::Source(&dir_asset).is_directory().await.unwrap());
        assert!(!AssetRef::Source(&file_asset).is_directory().await.unwrap());
        assert!(!AssetRef::Virtual(&virt).is_directory().await.unwrap());
    }

    #[tokio::test]
    async fn test_is_directory_unreadable_source() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = Asset::new(Uuid::new_v4(), tmp.path().join("gone.live2d"), library());

        let err = AssetRef::Source(&missing).is_directory().await.unwrap_err();
        assert!(matches!(err, ImportError::Io(_)));
    }
}
