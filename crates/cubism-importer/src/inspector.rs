//! Inspector panel contract.
//!
//! A panel edits the `userData` of the metas currently selected in the host.
//! The host asks `can_apply` before committing an edit; `apply` and `reset`
//! return whether the host should persist the metas afterwards.

use serde_json::Value;

use crate::meta::AssetMeta;

pub trait InspectorPanel: Send {
    /// Called whenever the selection or its metas change.
    fn update(&mut self, metas: Vec<AssetMeta>);

    /// Metas as edited by the panel.
    fn metas(&self) -> &[AssetMeta];

    fn can_apply(&mut self) -> bool {
        true
    }

    /// `false` suppresses the automatic meta save after apply.
    fn apply(&mut self) -> bool {
        true
    }

    /// `false` suppresses the automatic meta save after reset.
    fn reset(&mut self) -> bool {
        true
    }
}

/// Panel with a single `test` checkbox bound to `userData.test`.
///
/// Refuses every other apply attempt.
#[derive(Debug, Default)]
pub struct TestInspector {
    metas: Vec<AssetMeta>,
    checked: bool,
    attempts: u32,
}

impl TestInspector {
    pub const USER_DATA_KEY: &'static str = "test";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    /// The checkbox was confirmed with `value`.
    pub fn confirm(&mut self, value: bool) {
        self.checked = value;
        for meta in &mut self.metas {
            meta.user_data
                .insert(Self::USER_DATA_KEY.to_string(), Value::Bool(value));
        }
    }
}

impl InspectorPanel for TestInspector {
    fn update(&mut self, metas: Vec<AssetMeta>) {
        self.checked = metas
            .first()
            .and_then(|m| m.user_data.get(Self::USER_DATA_KEY))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        self.metas = metas;
    }

    fn metas(&self) -> &[AssetMeta] {
        &self.metas
    }

    fn can_apply(&mut self) -> bool {
        self.attempts += 1;
        if self.attempts % 2 == 0 {
            true
        } else {
            tracing::info!(attempt = self.attempts, "refuse to save");
            false
        }
    }
}
