//! Editor extensions that contribute importers.
//!
//! An extension ships a manifest declaring which extnames each of its
//! importers claims, and hands the host the importer instances on request.

use std::sync::Arc;

use async_trait::async_trait;

use crate::class::AssetClass;
use crate::error::ImportError;
use crate::importer::Importer;
use crate::importers::{Live2dAssetClass, Live2dImporter, TestImporter};
use crate::manifest::ExtensionManifest;
use crate::runtime::CubismRuntime;

#[async_trait]
pub trait Extension: Send + Sync {
    fn manifest(&self) -> &ExtensionManifest;

    /// Importer instances backing the manifest's `[[importers]]` entries.
    fn importers(&self) -> Vec<Arc<dyn Importer>>;

    async fn load(&self) -> Result<(), ImportError> {
        Ok(())
    }

    async fn unload(&self) {}
}

/// Manifest shipped with the Cubism extension.
pub const CUBISM_MANIFEST: &str = r#"
[extension]
name = "cubism-importer"
version = "1.0.0"
description = "Imports Live2D Cubism models and stores unknown files as plain assets"

[[importers]]
name = "live2d"
extnames = [".live2d"]

[[importers]]
name = "test"
extnames = ["*"]

[[inspectors]]
importer = "test"
panel = "test"
"#;

/// The Live2D extension: the `live2d` importer backed by the Cubism core,
/// plus the catch-all `test` importer.
pub struct CubismExtension {
    manifest: ExtensionManifest,
    core: Arc<dyn CubismRuntime>,
    live2d_class: Arc<dyn AssetClass>,
}

impl CubismExtension {
    /// `core` must already be initialized.
    pub fn new(core: Arc<dyn CubismRuntime>) -> Result<Self, ImportError> {
        let manifest = ExtensionManifest::parse(CUBISM_MANIFEST)?;
        Self::with_manifest(manifest, core)
    }

    pub fn with_manifest(
        manifest: ExtensionManifest,
        core: Arc<dyn CubismRuntime>,
    ) -> Result<Self, ImportError> {
        manifest.validate()?;
        let live2d_class: Arc<dyn AssetClass> = Arc::new(Live2dAssetClass::new(core.clone()));
        Ok(Self {
            manifest,
            core,
            live2d_class,
        })
    }
}

#[async_trait]
impl Extension for CubismExtension {
    fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }

    fn importers(&self) -> Vec<Arc<dyn Importer>> {
        vec![
            Arc::new(Live2dImporter::new(self.live2d_class.clone())),
            Arc::new(TestImporter::new()),
        ]
    }

    async fn load(&self) -> Result<(), ImportError> {
        tracing::info!(
            extension = %self.manifest.extension.name,
            core_version = %self.core.version(),
            "extension loaded"
        );
        Ok(())
    }

    async fn unload(&self) {
        tracing::info!(extension = %self.manifest.extension.name, "extension unloaded");
    }
}
