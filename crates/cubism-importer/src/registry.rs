//! Importer registry: maps file extensions to importers.
//!
//! The registry is what the host consults when it discovers a file: by
//! default the importer registered for the file's extension is used, unless
//! the asset is pinned to another registered importer by name. Registration
//! order decides between importers claiming the same extension.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::ImportError;
use crate::extension::Extension;
use crate::importer::Importer;
use crate::manifest::WILDCARD_EXTNAME;

/// Normalize an extension pattern: lowercase, leading dot added.
pub fn normalize_extname(extname: &str) -> String {
    let trimmed = extname.trim();
    if trimmed == WILDCARD_EXTNAME {
        return trimmed.to_string();
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

struct RegisteredImporter {
    importer: Arc<dyn Importer>,
    extnames: Vec<String>,
}

/// Central importer registry. Thread-safe via `RwLock`.
#[derive(Default)]
pub struct ImporterRegistry {
    /// Registered importers by name.
    importers: RwLock<HashMap<String, RegisteredImporter>>,
    /// Extension → importer names (in registration order).
    by_extname: RwLock<HashMap<String, Vec<String>>>,
}

impl ImporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `importer` for the given extension patterns.
    ///
    /// Fails if an importer with the same name is already registered.
    pub async fn register(
        &self,
        importer: Arc<dyn Importer>,
        extnames: &[String],
    ) -> Result<(), ImportError> {
        let name = importer.name().to_string();
        let extnames: Vec<String> = extnames.iter().map(|e| normalize_extname(e)).collect();

        {
            let mut importers = self.importers.write().await;
            if importers.contains_key(&name) {
                return Err(ImportError::AlreadyExists(name));
            }
            importers.insert(
                name.clone(),
                RegisteredImporter {
                    importer: importer.clone(),
                    extnames: extnames.clone(),
                },
            );
        }

        {
            let mut by_extname = self.by_extname.write().await;
            for extname in &extnames {
                by_extname.entry(extname.clone()).or_default().push(name.clone());
            }
        }

        tracing::info!(
            importer = %name,
            version = %importer.version(),
            asset_type = %importer.asset_type(),
            extnames = ?extnames,
            "importer registered"
        );
        Ok(())
    }

    /// Remove an importer and its extension mappings.
    pub async fn unregister(&self, name: &str) -> Result<(), ImportError> {
        let removed = {
            let mut importers = self.importers.write().await;
            importers
                .remove(name)
                .ok_or_else(|| ImportError::NotFound(name.to_string()))?
        };

        {
            let mut by_extname = self.by_extname.write().await;
            for extname in &removed.extnames {
                if let Some(names) = by_extname.get_mut(extname) {
                    names.retain(|n| n != name);
                    if names.is_empty() {
                        by_extname.remove(extname);
                    }
                }
            }
        }

        tracing::info!(importer = %name, "importer unregistered");
        Ok(())
    }

    /// Register every importer an extension declares in its manifest.
    ///
    /// Each manifest entry must be backed by an importer the extension
    /// provides. On failure the importers registered so far are rolled back.
    pub async fn install(&self, extension: &dyn Extension) -> Result<(), ImportError> {
        let manifest = extension.manifest();
        let provided = extension.importers();

        let mut registered: Vec<String> = Vec::new();
        for entry in &manifest.importers {
            let result = match provided.iter().find(|i| i.name() == entry.name) {
                Some(importer) => self.register(importer.clone(), &entry.extnames).await,
                None => Err(ImportError::NotFound(format!(
                    "{} (declared by extension {})",
                    entry.name, manifest.extension.name
                ))),
            };
            if let Err(e) = result {
                for name in &registered {
                    if let Err(rollback) = self.unregister(name).await {
                        tracing::warn!(importer = %name, "install rollback: {rollback}");
                    }
                }
                return Err(e);
            }
            registered.push(entry.name.clone());
        }

        tracing::info!(
            extension = %manifest.extension.name,
            version = %manifest.extension.version,
            importers = ?registered,
            "extension installed"
        );
        Ok(())
    }

    /// Unregister every importer an extension declares.
    pub async fn uninstall(&self, extension: &dyn Extension) {
        for entry in &extension.manifest().importers {
            if let Err(e) = self.unregister(&entry.name).await {
                tracing::warn!(importer = %entry.name, "uninstall: {e}");
            }
        }
    }

    /// Importer for a file, honouring a pinned importer name.
    ///
    /// A pin naming an unregistered importer is ignored. Without a pin the
    /// first importer registered for `extname` is used, then the first
    /// registered for `*`.
    pub async fn resolve(&self, extname: &str, pinned: Option<&str>) -> Option<Arc<dyn Importer>> {
        let importers = self.importers.read().await;

        if let Some(name) = pinned.filter(|n| !n.is_empty()) {
            if let Some(entry) = importers.get(name) {
                return Some(entry.importer.clone());
            }
            tracing::warn!(
                importer = %name,
                extname,
                "pinned importer is not registered, falling back to extension"
            );
        }

        let by_extname = self.by_extname.read().await;
        let candidates = [normalize_extname(extname), WILDCARD_EXTNAME.to_string()];
        let found = candidates
            .iter()
            .filter_map(|ext| by_extname.get(ext))
            .filter_map(|names| names.first())
            .find_map(|name| importers.get(name))
            .map(|entry| entry.importer.clone());
        found
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Importer>> {
        self.importers
            .read()
            .await
            .get(name)
            .map(|e| e.importer.clone())
    }

    pub async fn is_registered(&self, name: &str) -> bool {
        self.importers.read().await.contains_key(name)
    }

    /// All extension patterns with at least one importer, sorted.
    pub async fn extnames(&self) -> Vec<String> {
        let mut extnames: Vec<String> = self.by_extname.read().await.keys().cloned().collect();
        extnames.sort();
        extnames
    }

    pub async fn len(&self) -> usize {
        self.importers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.importers.read().await.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────
