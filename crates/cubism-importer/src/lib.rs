//! Cubism Importer
//!
//! Asset import pipeline for an editor host. Importers registered by editor
//! extensions turn source files into library artifacts; the host decides from
//! each asset's `.meta` sidecar when an import is due, stages the importer's
//! writes, and commits them only once the import reported success. The
//! bundled extension imports Live2D models through a sandboxed Cubism core.

pub mod asset;
pub mod class;
pub mod error;
pub mod extension;
pub mod importer;
pub mod importers;
pub mod inspector;
pub mod manifest;
pub mod meta;
pub mod pipeline;
pub mod registry;
pub mod runtime;

pub use asset::{extname_of, Asset, AssetRef, VirtualAsset};
pub use class::{AssetClass, EngineAsset, SerializedAsset, ENGINE_ASSET_TYPE};
pub use error::ImportError;
pub use extension::{CubismExtension, Extension, CUBISM_MANIFEST};
pub use importer::{import_raw_asset, Importer, META_EXTNAME};
pub use importers::{Live2dAssetClass, Live2dImporter, TestImporter};
pub use inspector::{InspectorPanel, TestInspector};
pub use manifest::{ExtensionManifest, WILDCARD_EXTNAME};
pub use meta::AssetMeta;
pub use pipeline::{ImportOutcome, ImportPipeline, InspectorOutcome, PassReport, PipelineConfig};
pub use registry::ImporterRegistry;
pub use runtime::{CoreConfig, CoreVersion, CubismCore, CubismRuntime};
