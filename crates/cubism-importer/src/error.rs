//! Importer extension error types.

use cubism_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("library error: {0}")]
    Library(#[from] LibraryError),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("importer not found: {0}")]
    NotFound(String),

    #[error("importer already registered: {0}")]
    AlreadyExists(String),

    #[error("invalid meta for {path}: {reason}")]
    InvalidMeta { path: String, reason: String },

    #[error("core error: {0}")]
    Core(String),

    #[error("WASM validation error: {0}")]
    WasmValidation(String),

    #[error("execution timeout: core call {0} exceeded fuel limit")]
    FuelExhausted(String),

    #[error("memory limit exceeded: core call {0}")]
    MemoryExceeded(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("semver error: {0}")]
    Semver(#[from] semver::Error),
}
