//! Runtime asset classes and their serialized form.
//!
//! An importer never hard-codes the object it produces; it is handed an
//! `AssetClass` at construction and asks it for a fresh instance. The
//! instance is serialized to JSON in the layout the engine deserializer
//! expects (`__type__`, `_name`, `_objFlags`, `_native`).

use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// Type name of the engine's base asset class.
pub const ENGINE_ASSET_TYPE: &str = "cc.Asset";

/// Serialized asset object stored in the library's meta slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedAsset {
    #[serde(rename = "__type__")]
    pub type_name: String,
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(rename = "_objFlags", default)]
    pub obj_flags: u32,
    /// Extension of the raw artifact this object refers to, if any.
    #[serde(rename = "_native", default, skip_serializing_if = "String::is_empty")]
    pub native: String,
}

impl SerializedAsset {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: String::new(),
            obj_flags: 0,
            native: String::new(),
        }
    }

    /// Link this object to the raw artifact stored under `extname`.
    pub fn set_raw_asset(&mut self, extname: &str) {
        self.native = extname.to_string();
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ImportError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self, ImportError> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Constructor for the object an importer produces.
pub trait AssetClass: Send + Sync {
    fn type_name(&self) -> &str;

    fn instantiate(&self) -> SerializedAsset {
        SerializedAsset::new(self.type_name())
    }
}

/// The engine's plain `cc.Asset`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineAsset;

impl AssetClass for EngineAsset {
    fn type_name(&self) -> &str {
        ENGINE_ASSET_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_asset_instance() {
        let asset = EngineAsset.instantiate();
        assert_eq!(asset.type_name, "cc.Asset");
        assert!(asset.name.is_empty());
        assert!(asset.native.is_empty());
    }

    #[test]
    fn test_json_layout() {
        let mut asset = EngineAsset.instantiate();
        asset.name = "foo".into();
        asset.set_raw_asset(".live2d");

        let value: serde_json::Value = serde_json::from_slice(&asset.to_json().unwrap()).unwrap();
        assert_eq!(value["__type__"], "cc.Asset");
        assert_eq!(value["_name"], "foo");
        assert_eq!(value["_objFlags"], 0);
        assert_eq!(value["_native"], ".live2d");
    }

    #[test]
    fn test_native_omitted_when_unset() {
        let asset = SerializedAsset::new("cc.Asset");
        let value: serde_json::Value = serde_json::from_slice(&asset.to_json().unwrap()).unwrap();
        assert!(value.get("_native").is_none());
    }

    #[test]
    fn test_deserialize_engine_output() {
        let json = br#"{"__type__":"Live2DAsset","_name":"haru","_objFlags":0,"_native":".live2d"}"#;
        let asset = SerializedAsset::from_json(json).unwrap();
        assert_eq!(asset.type_name, "Live2DAsset");
        assert_eq!(asset.name, "haru");
        assert_eq!(asset.native, ".live2d");
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let mut asset = EngineAsset.instantiate();
        asset.name = "foo".into();
        assert_eq!(asset.to_json().unwrap(), asset.clone().to_json().unwrap());
    }
}
