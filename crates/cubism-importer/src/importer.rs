//! The importer contract.
//!
//! The host discovers a file, asks the matching importer whether it applies
//! (`validate`), and if so asks it to `import`. The importer writes through
//! the asset's two library channels and reports success; it never touches
//! the host's imported flag.

use async_trait::async_trait;

use crate::asset::{Asset, AssetRef};
use crate::class::AssetClass;
use crate::error::ImportError;

/// Extension under which serialized meta records are saved.
pub const META_EXTNAME: &str = ".json";

#[async_trait]
pub trait Importer: Send + Sync {
    /// Changing this forces every asset previously imported by this importer
    /// to be imported again.
    fn version(&self) -> &str;

    /// Unique among registered importers.
    fn name(&self) -> &str;

    /// Runtime type the saved meta deserializes into.
    fn asset_type(&self) -> &str;

    /// Whether this importer applies. Must not write anything.
    async fn validate(&self, asset: AssetRef<'_>) -> bool;

    /// Import the asset. `Ok(true)` commits, `Ok(false)` leaves it
    /// unimported, `Err` is a write failure.
    async fn import(&self, asset: AssetRef<'_>) -> Result<bool, ImportError>;
}

/// Shared `validate` rule of the built-in importers: accept anything that is
/// not a directory. A source whose metadata cannot be read is rejected.
pub async fn is_importable_file(asset: AssetRef<'_>) -> bool {
    match asset.is_directory().await {
        Ok(is_dir) => !is_dir,
        Err(e) => {
            tracing::warn!(asset = %asset.uuid(), "cannot read source metadata, rejecting: {e}");
            false
        }
    }
}

/// Copy the raw bytes, build one `class` instance linked to them, and save
/// it as the meta record.
///
/// Returns only after both writes completed; either failing is propagated.
pub async fn import_raw_asset(asset: &Asset, class: &dyn AssetClass) -> Result<(), ImportError> {
    asset
        .copy_to_library(asset.extname(), asset.source())
        .await?;

    let mut object = class.instantiate();
    object.name = asset.basename().to_string();
    object.set_raw_asset(asset.extname());

    asset
        .save_to_library(META_EXTNAME, object.to_json()?)
        .await?;

    tracing::debug!(
        asset = %asset.uuid(),
        class = %class.type_name(),
        name = %object.name,
        "raw asset imported"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cubism_library::{LibraryBackend, LocalLibrary};
    use uuid::Uuid;

    use crate::asset::VirtualAsset;
    use crate::class::EngineAsset;

    #[tokio::test]
    async fn test_is_importable_file() {
        let tmp = tempfile::tempdir().unwrap();
        let library: Arc<dyn LibraryBackend> = Arc::new(LocalLibrary::new(tmp.path().join("lib")));
        let file = tmp.path().join("foo.live2d");
        tokio::fs::write(&file, b"x").await.unwrap();

        let file_asset = Asset::new(Uuid::new_v4(), &file, library.clone());
        let dir_asset = Asset::new(Uuid::new_v4(), tmp.path(), library.clone());
        let missing = Asset::new(Uuid::new_v4(), tmp.path().join("gone.live2d"), library.clone());
        let virt = VirtualAsset::new(Uuid::new_v4(), ".live2d", library);

        assert!(is_importable_file(AssetRef::Source(&file_asset)).await);
        assert!(!is_importable_file(AssetRef::Source(&dir_asset)).await);
        assert!(!is_importable_file(AssetRef::Source(&missing)).await);
        assert!(is_importable_file(AssetRef::Virtual(&virt)).await);
    }

    #[tokio::test]
    async fn test_import_raw_asset_without_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let library = Arc::new(LocalLibrary::new(tmp.path().join("lib")));
        let source = tmp.path().join("Makefile");
        tokio::fs::write(&source, b"all:").await.unwrap();

        let uuid = Uuid::new_v4();
        let asset = Asset::new(uuid, &source, library.clone());
        import_raw_asset(&asset, &EngineAsset).await.unwrap();
        library.commit(uuid).await.unwrap();

        assert_eq!(library.read(uuid, "").await.unwrap(), b"all:");
        let object = crate::class::SerializedAsset::from_json(
            &library.read(uuid, META_EXTNAME).await.unwrap(),
        )
        .unwrap();
        assert_eq!(object.name, "Makefile");
        assert_eq!(object.native, "");
    }
}
