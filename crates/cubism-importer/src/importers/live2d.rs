//! Importer for `.live2d` model files.

use std::sync::Arc;

use async_trait::async_trait;

use crate::asset::AssetRef;
use crate::class::AssetClass;
use crate::error::ImportError;
use crate::importer::{import_raw_asset, is_importable_file, Importer};
use crate::runtime::{CoreVersion, CubismRuntime};

pub const LIVE2D_EXTNAME: &str = ".live2d";

/// Type name the engine registers for Live2D model assets.
pub const LIVE2D_ASSET_TYPE: &str = "Live2DAsset";

/// The `Live2DAsset` class. It only exists once the Cubism core is up, so
/// it holds on to the core it was created with.
pub struct Live2dAssetClass {
    core: Arc<dyn CubismRuntime>,
}

impl Live2dAssetClass {
    pub fn new(core: Arc<dyn CubismRuntime>) -> Self {
        Self { core }
    }

    pub fn core_version(&self) -> CoreVersion {
        self.core.version()
    }
}

impl AssetClass for Live2dAssetClass {
    fn type_name(&self) -> &str {
        LIVE2D_ASSET_TYPE
    }
}

pub struct Live2dImporter {
    class: Arc<dyn AssetClass>,
}

impl Live2dImporter {
    pub const NAME: &'static str = "live2d";
    pub const VERSION: &'static str = "1.0.0";

    /// `class` is the constructor of the object saved as meta.
    pub fn new(class: Arc<dyn AssetClass>) -> Self {
        Self { class }
    }
}

#[async_trait]
impl Importer for Live2dImporter {
    fn version(&self) -> &str {
        Self::VERSION
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn asset_type(&self) -> &str {
        self.class.type_name()
    }

    async fn validate(&self, asset: AssetRef<'_>) -> bool {
        is_importable_file(asset).await
    }

    async fn import(&self, asset: AssetRef<'_>) -> Result<bool, ImportError> {
        let Some(asset) = asset.as_source() else {
            tracing::debug!(asset = %asset.uuid(), "virtual asset, skipping import");
            return Ok(true);
        };

        import_raw_asset(asset, self.class.as_ref()).await?;
        Ok(true)
    }
}
