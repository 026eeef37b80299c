// Shared test utilities for integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cubism_importer::{
    CoreVersion, CubismExtension, CubismRuntime, ImportPipeline, ImporterRegistry, PipelineConfig,
};
use cubism_library::{LibraryBackend, LibraryError, LocalLibrary};
use uuid::Uuid;

/// Core stand-in reporting Cubism 5.0.0.
pub struct FakeCore;

impl CubismRuntime for FakeCore {
    fn version(&self) -> CoreVersion {
        CoreVersion::from_raw(0x0500_0000)
    }
}

/// Local library that records every write-path call and can be told to fail
/// raw copies.
pub struct RecordingLibrary {
    inner: LocalLibrary,
    calls: Mutex<Vec<String>>,
    fail_copy: AtomicBool,
}

impl RecordingLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: LocalLibrary::new(root),
            calls: Mutex::new(Vec::new()),
            fail_copy: AtomicBool::new(false),
        }
    }

    pub fn set_fail_copy(&self, fail: bool) {
        self.fail_copy.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl LibraryBackend for RecordingLibrary {
    fn artifact_path(&self, uuid: Uuid, extension: &str) -> PathBuf {
        self.inner.artifact_path(uuid, extension)
    }

    async fn stage_copy(
        &self,
        uuid: Uuid,
        extension: &str,
        source: &Path,
    ) -> Result<(), LibraryError> {
        self.record(format!("stage_copy:{extension}"));
        if self.fail_copy.load(Ordering::SeqCst) {
            return Err(LibraryError::Io(std::io::Error::other("disk full")));
        }
        self.inner.stage_copy(uuid, extension, source).await
    }

    async fn stage_write(
        &self,
        uuid: Uuid,
        extension: &str,
        data: &[u8],
    ) -> Result<(), LibraryError> {
        self.record(format!("stage_write:{extension}"));
        self.inner.stage_write(uuid, extension, data).await
    }

    async fn commit(&self, uuid: Uuid) -> Result<Vec<String>, LibraryError> {
        self.record("commit".to_string());
        self.inner.commit(uuid).await
    }

    async fn discard(&self, uuid: Uuid) -> Result<(), LibraryError> {
        self.record("discard".to_string());
        self.inner.discard(uuid).await
    }

    async fn read(&self, uuid: Uuid, extension: &str) -> Result<Vec<u8>, LibraryError> {
        self.inner.read(uuid, extension).await
    }

    async fn exists(&self, uuid: Uuid, extension: &str) -> bool {
        self.inner.exists(uuid, extension).await
    }

    async fn list(&self, uuid: Uuid) -> Result<Vec<String>, LibraryError> {
        self.inner.list(uuid).await
    }

    async fn remove(&self, uuid: Uuid) -> Result<(), LibraryError> {
        self.inner.remove(uuid).await
    }

    async fn purge_staging(&self) -> Result<usize, LibraryError> {
        self.inner.purge_staging().await
    }
}

/// A project on disk: an asset tree and a library next to it.
pub struct TestProject {
    pub dir: tempfile::TempDir,
    pub assets: PathBuf,
    pub library: Arc<RecordingLibrary>,
}

impl TestProject {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("assets");
        tokio::fs::create_dir_all(&assets).await.unwrap();
        let library = Arc::new(RecordingLibrary::new(dir.path().join("library")));
        Self {
            dir,
            assets,
            library,
        }
    }

    pub async fn write_asset(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.assets.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(&path, content).await.unwrap();
        path
    }

    pub fn pipeline(&self, registry: Arc<ImporterRegistry>) -> Arc<ImportPipeline> {
        let library: Arc<dyn LibraryBackend> = self.library.clone();
        Arc::new(ImportPipeline::new(
            registry,
            library,
            PipelineConfig {
                assets_root: self.assets.clone(),
                purge_staging_on_start: true,
            },
        ))
    }
}

/// Registry with the Cubism extension installed.
pub async fn cubism_registry() -> Arc<ImporterRegistry> {
    let extension = CubismExtension::new(Arc::new(FakeCore)).unwrap();
    let registry = ImporterRegistry::new();
    registry.install(&extension).await.unwrap();
    Arc::new(registry)
}
