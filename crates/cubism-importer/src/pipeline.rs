//! Host-side import pass.
//!
//! For every discovered file the pipeline picks an importer, decides from
//! the `.meta` sidecar whether an import is due, runs `validate` then
//! `import`, and owns the outcome: staged library writes are committed only
//! when the importer returned `Ok(true)`, and only then is the meta marked
//! imported. Anything else discards the staging and leaves the asset to be
//! retried on a later pass.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cubism_library::{hash_source, LibraryBackend};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::asset::{extname_of, Asset, AssetRef};
use crate::error::ImportError;
use crate::inspector::InspectorPanel;
use crate::meta::AssetMeta;
use crate::registry::ImporterRegistry;

// ─── Configuration ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the project's asset tree.
    pub assets_root: PathBuf,
    /// Drop staging left by an interrupted session on `start`.
    pub purge_staging_on_start: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            assets_root: PathBuf::from("./assets"),
            purge_staging_on_start: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            assets_root: PathBuf::from(
                std::env::var("ASSET_ROOT").unwrap_or_else(|_| "./assets".to_string()),
            ),
            purge_staging_on_start: std::env::var("ASSET_PURGE_STAGING")
                .map(|v| !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        }
    }
}

// ─── Outcomes ───────────────────────────────────────────────────────────

/// Result of one asset in one pass.
#[derive(Debug)]
pub enum ImportOutcome {
    /// No importer for the extension.
    Unhandled,
    /// `validate` returned false.
    Rejected,
    /// Meta matches importer and source; nothing ran.
    UpToDate,
    /// Import committed.
    Imported,
    /// The importer returned `Ok(false)`.
    NotImported,
    Failed(ImportError),
}

impl ImportOutcome {
    pub fn is_imported(&self) -> bool {
        matches!(self, Self::Imported)
    }
}

/// Counts of outcomes over a pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub imported: usize,
    pub up_to_date: usize,
    pub rejected: usize,
    pub not_imported: usize,
    pub failed: usize,
    pub unhandled: usize,
}

impl PassReport {
    pub fn record(&mut self, outcome: &ImportOutcome) {
        match outcome {
            ImportOutcome::Unhandled => self.unhandled += 1,
            ImportOutcome::Rejected => self.rejected += 1,
            ImportOutcome::UpToDate => self.up_to_date += 1,
            ImportOutcome::Imported => self.imported += 1,
            ImportOutcome::NotImported => self.not_imported += 1,
            ImportOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.imported
            + self.up_to_date
            + self.rejected
            + self.not_imported
            + self.failed
            + self.unhandled
    }
}

/// Result of an inspector apply/reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectorOutcome {
    /// `can_apply` refused the edit.
    Refused,
    /// The hook asked not to persist.
    Suppressed,
    /// Number of metas written.
    Saved(usize),
}

// ─── Pipeline ───────────────────────────────────────────────────────────

pub struct ImportPipeline {
    registry: Arc<ImporterRegistry>,
    library: Arc<dyn LibraryBackend>,
    config: PipelineConfig,
    /// Source path of every asset seen so far.
    sources: RwLock<HashMap<Uuid, PathBuf>>,
    /// Serializes `validate → import` per source path.
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl ImportPipeline {
    pub fn new(
        registry: Arc<ImporterRegistry>,
        library: Arc<dyn LibraryBackend>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            library,
            config,
            sources: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ImporterRegistry> {
        &self.registry
    }

    pub fn library(&self) -> &Arc<dyn LibraryBackend> {
        &self.library
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Prepare the library for a session.
    pub async fn start(&self) -> Result<(), ImportError> {
        if self.config.purge_staging_on_start {
            self.library.purge_staging().await?;
        }
        Ok(())
    }

    /// Import pass over the configured asset root.
    pub async fn import_all(&self) -> Result<PassReport, ImportError> {
        let root = self.config.assets_root.clone();
        self.import_pass(&root).await
    }

    /// Import pass over every entry under `root`, one asset at a time.
    pub async fn import_pass(&self, root: &Path) -> Result<PassReport, ImportError> {
        let mut entries = Vec::new();
        collect_entries(root, &mut entries).await?;
        entries.sort();

        let mut report = PassReport::default();
        for path in entries {
            let outcome = self.import_asset(&path).await;
            report.record(&outcome);
        }

        tracing::info!(
            root = %root.display(),
            imported = report.imported,
            up_to_date = report.up_to_date,
            rejected = report.rejected,
            not_imported = report.not_imported,
            failed = report.failed,
            unhandled = report.unhandled,
            "import pass complete"
        );
        Ok(report)
    }

    /// Import several assets concurrently. Distinct assets interleave; the
    /// same asset is still processed one request at a time.
    pub async fn import_many(self: &Arc<Self>, paths: Vec<PathBuf>) -> PassReport {
        let mut tasks = tokio::task::JoinSet::new();
        for path in paths {
            let pipeline = Arc::clone(self);
            tasks.spawn(async move { pipeline.import_asset(&path).await });
        }

        let mut report = PassReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    tracing::error!("import task panicked: {e}");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Run one asset through `Discovered → Validated → Imported`.
    pub async fn import_asset(&self, path: &Path) -> ImportOutcome {
        let lock = self.asset_lock(path).await;
        let result = {
            let _guard = lock.lock().await;
            self.import_locked(path).await
        };
        self.release_lock(path, lock).await;

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(path = %path.display(), "import failed: {e}");
                ImportOutcome::Failed(e)
            }
        }
    }

    async fn asset_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the path's lock once no other request holds it. Handles are only
    /// cloned under the map lock, so the count cannot grow during the check.
    async fn release_lock(&self, path: &Path, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // The map's handle plus ours.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(path);
        }
    }

    async fn remember_source(&self, uuid: Uuid, path: &Path) {
        self.sources.write().await.insert(uuid, path.to_path_buf());
    }

    async fn import_locked(&self, path: &Path) -> Result<ImportOutcome, ImportError> {
        let existing = AssetMeta::read(path).await?;
        let mut meta = existing
            .clone()
            .unwrap_or_else(|| AssetMeta::new(Uuid::new_v4()));
        let uuid = meta.uuid;
        // Only persisted identities are tracked; a fresh uuid becomes one
        // once its meta is written below.
        if existing.is_some() {
            self.remember_source(uuid, path).await;
        }

        let extname = extname_of(path);
        let pinned = Some(meta.importer.as_str());
        let Some(importer) = self.registry.resolve(&extname, pinned).await else {
            tracing::debug!(
                path = %path.display(),
                extname = %extname,
                "no importer registered"
            );
            return Ok(ImportOutcome::Unhandled);
        };

        let is_dir = tokio::fs::metadata(path).await?.is_dir();
        let source_hash = if is_dir {
            None
        } else {
            Some(hash_source(path).await?)
        };

        if let Some(existing) = &existing {
            let reason = existing.reimport_reason(
                importer.name(),
                importer.version(),
                source_hash.as_deref(),
            );
            match reason {
                None => return Ok(ImportOutcome::UpToDate),
                Some(reason) => tracing::info!(
                    asset = %uuid,
                    importer = %importer.name(),
                    reason,
                    "re-importing"
                ),
            }
        }

        let asset = Asset::new(uuid, path, self.library.clone());
        if !importer.validate(AssetRef::Source(&asset)).await {
            tracing::debug!(asset = %uuid, importer = %importer.name(), "validation rejected");
            return Ok(ImportOutcome::Rejected);
        }

        let result = importer.import(AssetRef::Source(&asset)).await;

        meta.importer = importer.name().to_string();
        meta.ver = importer.version().to_string();
        meta.source_hash = source_hash;

        let outcome = match result {
            Ok(true) => match self.library.commit(uuid).await {
                Ok(_) => {
                    meta.imported = true;
                    meta.files = self.library.list(uuid).await?;
                    meta.imported_at = Some(chrono::Utc::now());
                    tracing::info!(
                        asset = %uuid,
                        importer = %importer.name(),
                        files = ?meta.files,
                        "asset imported"
                    );
                    ImportOutcome::Imported
                }
                Err(e) => {
                    self.discard(uuid).await;
                    meta.imported = false;
                    tracing::error!(asset = %uuid, "library commit failed: {e}");
                    ImportOutcome::Failed(e.into())
                }
            },
            Ok(false) => {
                self.discard(uuid).await;
                meta.imported = false;
                tracing::warn!(asset = %uuid, importer = %importer.name(), "importer declined");
                ImportOutcome::NotImported
            }
            Err(e) => {
                self.discard(uuid).await;
                meta.imported = false;
                tracing::error!(asset = %uuid, importer = %importer.name(), "import failed: {e}");
                ImportOutcome::Failed(e)
            }
        };

        meta.write(path).await?;
        self.remember_source(uuid, path).await;
        Ok(outcome)
    }

    async fn discard(&self, uuid: Uuid) {
        if let Err(e) = self.library.discard(uuid).await {
            tracing::warn!(asset = %uuid, "failed to discard staged artifacts: {e}");
        }
    }

    // ── Metas & inspector ────────────────────────────────────────────

    pub async fn source_of(&self, uuid: Uuid) -> Option<PathBuf> {
        self.sources.read().await.get(&uuid).cloned()
    }

    /// Current on-disk metas for the given assets.
    pub async fn metas_for(&self, uuids: &[Uuid]) -> Result<Vec<AssetMeta>, ImportError> {
        let mut metas = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            let source = self
                .source_of(*uuid)
                .await
                .ok_or_else(|| ImportError::NotFound(format!("asset {uuid}")))?;
            let meta = AssetMeta::read(&source)
                .await?
                .ok_or_else(|| ImportError::NotFound(format!("meta of asset {uuid}")))?;
            metas.push(meta);
        }
        Ok(metas)
    }

    /// Persist the `userData` of edited metas. Every other field stays as
    /// the host last wrote it.
    async fn save_user_data(&self, edited: &[AssetMeta]) -> Result<usize, ImportError> {
        for edit in edited {
            let source = self
                .source_of(edit.uuid)
                .await
                .ok_or_else(|| ImportError::NotFound(format!("asset {}", edit.uuid)))?;
            let mut meta = AssetMeta::read(&source)
                .await?
                .unwrap_or_else(|| AssetMeta::new(edit.uuid));
            meta.user_data = edit.user_data.clone();
            meta.write(&source).await?;
        }
        Ok(edited.len())
    }

    /// Commit a pending inspector edit.
    pub async fn apply_inspector(
        &self,
        panel: &mut dyn InspectorPanel,
    ) -> Result<InspectorOutcome, ImportError> {
        if !panel.can_apply() {
            return Ok(InspectorOutcome::Refused);
        }
        if !panel.apply() {
            return Ok(InspectorOutcome::Suppressed);
        }
        let saved = self.save_user_data(panel.metas()).await?;
        Ok(InspectorOutcome::Saved(saved))
    }

    /// Drop pending inspector edits by reloading the metas from disk.
    pub async fn reset_inspector(
        &self,
        panel: &mut dyn InspectorPanel,
    ) -> Result<InspectorOutcome, ImportError> {
        let uuids: Vec<Uuid> = panel.metas().iter().map(|m| m.uuid).collect();
        let fresh = self.metas_for(&uuids).await?;
        panel.update(fresh);
        if !panel.reset() {
            return Ok(InspectorOutcome::Suppressed);
        }
        let saved = self.save_user_data(panel.metas()).await?;
        Ok(InspectorOutcome::Saved(saved))
    }
}

/// Every file and directory under `dir`, skipping dotfiles and sidecars.
async fn collect_entries(dir: &Path, result: &mut Vec<PathBuf>) -> Result<(), ImportError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || name.ends_with(".tmp") || AssetMeta::is_meta_path(&path) {
            continue;
        }
        let is_dir = entry.file_type().await?.is_dir();
        result.push(path.clone());
        if is_dir {
            Box::pin(collect_entries(&path, result)).await?;
        }
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────
