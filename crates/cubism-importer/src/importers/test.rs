//! Catch-all importer that stores any file as a plain `cc.Asset`.

use async_trait::async_trait;

use crate::asset::AssetRef;
use crate::class::{AssetClass, EngineAsset};
use crate::error::ImportError;
use crate::importer::{import_raw_asset, is_importable_file, Importer};

pub struct TestImporter {
    version: String,
}

impl TestImporter {
    pub const NAME: &'static str = "test";
    pub const VERSION: &'static str = "1.0.0";

    pub fn new() -> Self {
        Self::with_version(Self::VERSION)
    }

    /// Same importer reporting a different version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl Default for TestImporter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Importer for TestImporter {
    fn version(&self) -> &str {
        &self.version
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn asset_type(&self) -> &str {
        EngineAsset.type_name()
    }

    async fn validate(&self, asset: AssetRef<'_>) -> bool {
        is_importable_file(asset).await
    }

    async fn import(&self, asset: AssetRef<'_>) -> Result<bool, ImportError> {
        // Virtual assets of unknown type have nothing to import.
        let Some(asset) = asset.as_source() else {
            tracing::debug!(asset = %asset.uuid(), "virtual asset, skipping import");
            return Ok(true);
        };

        import_raw_asset(asset, &EngineAsset).await?;
        Ok(true)
    }
}
