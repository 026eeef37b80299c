//! Live2D Cubism core, loaded as a sandboxed WASM module (Extism/wasmtime).
//!
//! The core is an opaque third-party binary. The host initializes it once
//! through [`CubismCore::initialize`] and passes the resulting handle to
//! whatever needs it; nothing here keeps a global instance.
//!
//! The binary must be packaged as an Extism module that exports
//! `csmGetVersion`, returning the packed version as 4 little-endian bytes.

use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::ImportError;

/// WASM magic bytes: `\0asm`
const WASM_MAGIC: &[u8; 4] = b"\0asm";

/// Exports the core must provide.
pub const REQUIRED_EXPORTS: &[&str] = &["csmGetVersion"];

// ─── Configuration ──────────────────────────────────────────────────────

/// Sandbox limits for the core module.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Maximum memory in bytes (default: 64 MB).
    pub memory_limit: usize,
    /// Maximum fuel (instructions) per call (default: 10_000_000).
    pub fuel_limit: u64,
    /// Largest binary accepted, in bytes (default: 16 MB).
    pub max_binary_size: u64,
    /// Whether to enable WASI (default: false).
    pub wasi_enabled: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            memory_limit: 64 * 1024 * 1024,
            fuel_limit: 10_000_000,
            max_binary_size: 16 * 1024 * 1024,
            wasi_enabled: false,
        }
    }
}

impl CoreConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Self {
        Self {
            memory_limit: std::env::var("CUBISM_CORE_MEMORY_LIMIT_MB")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(64)
                * 1024
                * 1024,
            fuel_limit: std::env::var("CUBISM_CORE_FUEL_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000_000),
            max_binary_size: std::env::var("CUBISM_CORE_MAX_SIZE_MB")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(16)
                * 1024
                * 1024,
            wasi_enabled: std::env::var("CUBISM_CORE_WASI_ENABLED")
                .unwrap_or_default()
                .eq_ignore_ascii_case("true"),
        }
    }
}

// ─── Version ────────────────────────────────────────────────────────────

/// Core version, packed as `0xMMmmpppp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u16,
    pub raw: u32,
}

impl CoreVersion {
    pub fn from_raw(raw: u32) -> Self {
        Self {
            major: ((raw & 0xff00_0000) >> 24) as u8,
            minor: ((raw & 0x00ff_0000) >> 16) as u8,
            patch: (raw & 0x0000_ffff) as u16,
            raw,
        }
    }
}

impl std::fmt::Display for CoreVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}.{:02}.{:04}", self.major, self.minor, self.patch)
    }
}

/// What consumers of the core rely on.
pub trait CubismRuntime: Send + Sync {
    fn version(&self) -> CoreVersion;
}

// ─── Binary validation ──────────────────────────────────────────────────

/// Check size, magic bytes and required exports of a core binary.
pub fn validate_core_binary(bytes: &[u8], config: &CoreConfig) -> Result<(), ImportError> {
    use wasmparser::{Parser, Payload};

    if bytes.len() as u64 > config.max_binary_size {
        return Err(ImportError::WasmValidation(format!(
            "core binary too large: {} bytes (max {})",
            bytes.len(),
            config.max_binary_size
        )));
    }

    if bytes.len() < WASM_MAGIC.len() || &bytes[..WASM_MAGIC.len()] != WASM_MAGIC {
        return Err(ImportError::WasmValidation(
            "invalid WASM magic bytes".into(),
        ));
    }

    let mut exports = Vec::new();
    for payload in Parser::new(0).parse_all(bytes) {
        let payload = payload
            .map_err(|e| ImportError::WasmValidation(format!("failed to parse WASM: {e}")))?;

        if let Payload::ExportSection(reader) = payload {
            for export in reader {
                let export = export.map_err(|e| {
                    ImportError::WasmValidation(format!("failed to read export: {e}"))
                })?;
                exports.push(export.name.to_string());
            }
        }
    }

    for required in REQUIRED_EXPORTS {
        if !exports.iter().any(|e| e == required) {
            return Err(ImportError::WasmValidation(format!(
                "core does not export '{required}'"
            )));
        }
    }

    Ok(())
}

// ─── Core ───────────────────────────────────────────────────────────────

/// An initialized Cubism core.
///
/// Calls into the module are synchronous; async callers go through
/// `spawn_blocking` the way [`CubismCore::initialize`] does.
pub struct CubismCore {
    plugin: Mutex<extism::Plugin>,
    version: CoreVersion,
    config: CoreConfig,
}

impl std::fmt::Debug for CubismCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CubismCore")
            .field("version", &self.version)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CubismCore {
    /// Read the core from disk and load it off the async executor.
    pub async fn initialize(wasm_path: &Path, config: CoreConfig) -> Result<Arc<Self>, ImportError> {
        tracing::info!(path = %wasm_path.display(), "initializing Live2D Cubism core");

        let wasm_bytes = tokio::fs::read(wasm_path).await?;
        let core = tokio::task::spawn_blocking(move || Self::load(wasm_bytes, config))
            .await
            .map_err(|e| ImportError::Core(format!("core load task failed: {e}")))??;

        tracing::info!(
            version = %core.version,
            raw = core.version.raw,
            "Live2D Cubism core initialized"
        );
        Ok(Arc::new(core))
    }

    /// Validate and instantiate the core, then probe its version.
    pub fn load(wasm_bytes: Vec<u8>, config: CoreConfig) -> Result<Self, ImportError> {
        validate_core_binary(&wasm_bytes, &config)?;

        let manifest = extism::Manifest::new([extism::Wasm::data(wasm_bytes)])
            .with_memory_max((config.memory_limit / 65536) as u32);

        let plugin = extism::PluginBuilder::new(manifest)
            .with_wasi(config.wasi_enabled)
            .with_fuel_limit(config.fuel_limit)
            .build()
            .map_err(|e| ImportError::Core(e.to_string()))?;

        let mut core = Self {
            plugin: Mutex::new(plugin),
            version: CoreVersion::from_raw(0),
            config,
        };
        core.version = core.probe_version()?;
        Ok(core)
    }

    fn probe_version(&self) -> Result<CoreVersion, ImportError> {
        let output = self.call("csmGetVersion", &[])?;
        let raw: [u8; 4] = output.as_slice().try_into().map_err(|_| {
            ImportError::Core(format!(
                "csmGetVersion returned {} bytes, expected 4",
                output.len()
            ))
        })?;
        Ok(CoreVersion::from_raw(u32::from_le_bytes(raw)))
    }

    /// Call a core export with raw byte input/output. Blocks.
    pub fn call(&self, function_name: &str, input: &[u8]) -> Result<Vec<u8>, ImportError> {
        let mut plugin = self
            .plugin
            .lock()
            .map_err(|_| ImportError::Core("core instance poisoned".to_string()))?;
        call_plugin(&mut plugin, function_name, input)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}

impl CubismRuntime for CubismCore {
    fn version(&self) -> CoreVersion {
        self.version
    }
}

/// Errors are classified into fuel exhaustion, memory exceeded, or general
/// core errors.
fn call_plugin(
    plugin: &mut extism::Plugin,
    function_name: &str,
    input: &[u8],
) -> Result<Vec<u8>, ImportError> {
    plugin
        .call::<&[u8], Vec<u8>>(function_name, input)
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("fuel") {
                ImportError::FuelExhausted(function_name.to_string())
            } else if msg.contains("memory") {
                ImportError::MemoryExceeded(function_name.to_string())
            } else {
                ImportError::Core(msg)
            }
        })
}

// ─── Tests ──────────────────────────────────────────────────────────────
