//! `.meta` sidecar files the host keeps next to every source asset.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ImportError;

pub const META_SUFFIX: &str = ".meta";

/// Host-side record of an asset's import state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMeta {
    /// Version of the importer that last ran on the asset.
    pub ver: String,
    /// Name of that importer; also the pin used on the next pass.
    pub importer: String,
    /// Set by the host only, after a committed import.
    pub imported: bool,
    pub uuid: Uuid,
    /// Extensions of the committed library artifacts.
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(rename = "sourceHash", default, skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
    #[serde(rename = "importedAt", default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
    #[serde(rename = "userData", default)]
    pub user_data: serde_json::Map<String, serde_json::Value>,
}

impl AssetMeta {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            ver: String::new(),
            importer: String::new(),
            imported: false,
            uuid,
            files: Vec::new(),
            source_hash: None,
            imported_at: None,
            user_data: serde_json::Map::new(),
        }
    }

    /// Sidecar path for a source path: `foo.live2d` → `foo.live2d.meta`.
    pub fn path_for(source: &Path) -> PathBuf {
        let mut name = source.as_os_str().to_os_string();
        name.push(META_SUFFIX);
        PathBuf::from(name)
    }

    pub fn is_meta_path(path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(&META_SUFFIX[1..])
    }

    /// Read the sidecar of `source`, `None` if there is none yet.
    pub async fn read(source: &Path) -> Result<Option<Self>, ImportError> {
        let path = Self::path_for(source);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| ImportError::InvalidMeta {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Write the sidecar of `source` through a temp file and rename.
    pub async fn write(&self, source: &Path) -> Result<(), ImportError> {
        let path = Self::path_for(source);
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let data = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Why this meta calls for a new import by `importer`, or `None` when
    /// it is up to date.
    pub fn reimport_reason(
        &self,
        importer_name: &str,
        importer_version: &str,
        source_hash: Option<&str>,
    ) -> Option<&'static str> {
        if !self.imported {
            Some("not imported")
        } else if self.importer != importer_name {
            Some("importer changed")
        } else if self.ver != importer_version {
            Some("importer version changed")
        } else if self.source_hash.as_deref() != source_hash {
            Some("source changed")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imported_meta() -> AssetMeta {
        AssetMeta {
            ver: "1.0.0".into(),
            importer: "live2d".into(),
            imported: true,
            source_hash: Some("abc".into()),
            ..AssetMeta::new(Uuid::new_v4())
        }
    }

    #[test]
    fn test_path_for() {
        assert_eq!(
            AssetMeta::path_for(Path::new("assets/foo.live2d")),
            PathBuf::from("assets/foo.live2d.meta")
        );
        assert_eq!(
            AssetMeta::path_for(Path::new("assets/folder")),
            PathBuf::from("assets/folder.meta")
        );
    }

    #[test]
    fn test_is_meta_path() {
        assert!(AssetMeta::is_meta_path(Path::new("a/foo.live2d.meta")));
        assert!(!AssetMeta::is_meta_path(Path::new("a/foo.live2d")));
        assert!(!AssetMeta::is_meta_path(Path::new("a/meta")));
    }

    #[test]
    fn test_reimport_reason() {
        let meta = imported_meta();
        assert_eq!(meta.reimport_reason("live2d", "1.0.0", Some("abc")), None);
        assert_eq!(
            meta.reimport_reason("live2d", "1.0.1", Some("abc")),
            Some("importer version changed")
        );
        assert_eq!(
            meta.reimport_reason("test", "1.0.0", Some("abc")),
            Some("importer changed")
        );
        assert_eq!(
            meta.reimport_reason("live2d", "1.0.0", Some("def")),
            Some("source changed")
        );

        let pending = AssetMeta {
            imported: false,
            ..imported_meta()
        };
        assert_eq!(
            pending.reimport_reason("live2d", "1.0.0", Some("abc")),
            Some("not imported")
        );
    }

    #[test]
    fn test_json_field_names() {
        let mut meta = imported_meta();
        meta.user_data.insert("test".into(), serde_json::Value::Bool(true));
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["ver"], "1.0.0");
        assert_eq!(value["sourceHash"], "abc");
        assert_eq!(value["userData"]["test"], true);
        assert!(value.get("importedAt").is_none());
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let meta = AssetMeta::read(&dir.path().join("foo.live2d")).await.unwrap();
        assert!(meta.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("foo.live2d");
        let meta = imported_meta();

        meta.write(&source).await.unwrap();
        assert!(dir.path().join("foo.live2d.meta").exists());
        assert!(!dir.path().join("foo.live2d.meta.tmp").exists());

        let read = AssetMeta::read(&source).await.unwrap().unwrap();
        assert_eq!(read, meta);
    }

    #[tokio::test]
    async fn test_read_corrupt_meta() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("foo.live2d");
        tokio::fs::write(AssetMeta::path_for(&source), b"{ not json")
            .await
            .unwrap();

        let err = AssetMeta::read(&source).await.unwrap_err();
        assert!(matches!(err, ImportError::InvalidMeta { .. }));
    }

    #[test]
    fn test_minimal_meta_defaults() {
        let json = r#"{"ver":"1.0.0","importer":"test","imported":true,"uuid":"3fa85f64-5717-4562-b3fc-2c963f66afa6"}"#;
        let meta: AssetMeta = serde_json::from_str(json).unwrap();
        assert!(meta.files.is_empty());
        assert!(meta.user_data.is_empty());
        assert!(meta.source_hash.is_none());
    }
}
