//! Extension manifest parsing and validation.
//!
//! Parses `extension.toml` files that declare the extension's metadata, the
//! file extensions each importer is registered for, and inspector panels.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// Pattern that matches any extension with no dedicated importer.
pub const WILDCARD_EXTNAME: &str = "*";

/// Extension manifest parsed from `extension.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub extension: ExtensionMeta,
    #[serde(default)]
    pub importers: Vec<ImporterEntry>,
    #[serde(default)]
    pub inspectors: Vec<InspectorEntry>,
}

/// Extension metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionMeta {
    pub name: String,
    pub version: String,
    pub description: String,
    #[serde(default)]
    pub author: Option<String>,
}

/// One `[[importers]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImporterEntry {
    /// Registered name of the importer.
    pub name: String,
    pub extnames: Vec<String>,
}

/// One `[[inspectors]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectorEntry {
    /// Importer whose assets the panel edits.
    pub importer: String,
    pub panel: String,
}

// ─── Validation helpers ─────────────────────────────────────────────

/// Validate a name against `^[a-z][a-z0-9-]{1,63}$`.
fn validate_name(name: &str, field_name: &str) -> Result<(), ImportError> {
    let len = name.len();
    if !(2..=64).contains(&len) {
        return Err(ImportError::InvalidManifest(format!(
            "{field_name} must be 2-64 characters, got {len}"
        )));
    }

    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        if !first.is_ascii_lowercase() {
            return Err(ImportError::InvalidManifest(format!(
                "{field_name} must start with a lowercase letter, got '{first}'"
            )));
        }
    }

    for ch in chars {
        if !ch.is_ascii_lowercase() && !ch.is_ascii_digit() && ch != '-' {
            return Err(ImportError::InvalidManifest(format!(
                "{field_name} contains invalid character '{ch}'"
            )));
        }
    }

    Ok(())
}

fn validate_extname(extname: &str) -> Result<(), ImportError> {
    if extname == WILDCARD_EXTNAME {
        return Ok(());
    }
    if extname.is_empty() {
        return Err(ImportError::InvalidManifest(
            "extname must not be empty; use '*' for a catch-all".to_string(),
        ));
    }
    cubism_library::check_extension(extname).map_err(|_| {
        ImportError::InvalidManifest(format!(
            "extname must look like '.ext' or be '*', got '{extname}'"
        ))
    })
}

impl ExtensionManifest {
    /// Parse a manifest from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ImportError> {
        let manifest: ExtensionManifest = toml::from_str(toml_str)?;
        Ok(manifest)
    }

    /// Read, parse and validate a manifest file.
    pub async fn load(path: &std::path::Path) -> Result<Self, ImportError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ImportError::Manifest(format!("failed to read {}: {e}", path.display()))
        })?;
        let manifest = Self::parse(&content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate all fields of a parsed manifest.
    pub fn validate(&self) -> Result<(), ImportError> {
        // ── Extension metadata ──────────────────────────────────────
        validate_name(&self.extension.name, "extension.name")?;

        semver::Version::parse(&self.extension.version).map_err(|_| {
            ImportError::InvalidManifest(format!(
                "extension.version is not valid semver: '{}'",
                self.extension.version
            ))
        })?;

        let desc_len = self.extension.description.len();
        if desc_len == 0 || desc_len > 500 {
            return Err(ImportError::InvalidManifest(format!(
                "extension.description must be 1-500 characters, got {desc_len}"
            )));
        }

        // ── Importers ───────────────────────────────────────────────
        let mut names = HashSet::new();
        for entry in &self.importers {
            validate_name(&entry.name, "importers.name")?;
            if !names.insert(entry.name.as_str()) {
                return Err(ImportError::InvalidManifest(format!(
                    "importer '{}' is declared more than once",
                    entry.name
                )));
            }
            if entry.extnames.is_empty() {
                return Err(ImportError::InvalidManifest(format!(
                    "importer '{}' declares no extnames",
                    entry.name
                )));
            }
            for extname in &entry.extnames {
                validate_extname(extname)?;
            }
        }

        // ── Inspectors ──────────────────────────────────────────────
        for entry in &self.inspectors {
            validate_name(&entry.importer, "inspectors.importer")?;
            validate_name(&entry.panel, "inspectors.panel")?;
            if !names.contains(entry.importer.as_str()) {
                return Err(ImportError::InvalidManifest(format!(
                    "inspector '{}' refers to undeclared importer '{}'",
                    entry.panel, entry.importer
                )));
            }
        }

        Ok(())
    }

    /// The manifest entry for a registered importer name.
    pub fn importer(&self, name: &str) -> Option<&ImporterEntry> {
        self.importers.iter().find(|e| e.name == name)
    }

    /// Panel name for assets handled by `importer`, if any.
    pub fn inspector_for(&self, importer: &str) -> Option<&str> {
        self.inspectors
            .iter()
            .find(|e| e.importer == importer)
            .map(|e| e.panel.as_str())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
