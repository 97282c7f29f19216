//! Mapping between [`PanelLayoutState`] and durable documents.
//!
//! One JSON document per scope, stored under `"{key_prefix}{scope}"`:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "layout": { "kind": "split", "id": 1, "orientation": "horizontal", ... },
//!   "panels": { "2": { "id": 2, "content": { "type": "chat" }, ... } },
//!   "active_template_id": "split-h",
//!   "focused_panel_id": 2,
//!   "next_id": 5
//! }
//! ```
//!
//! Ephemeral fields (terminal handles, running flags) are stripped on both
//! write and read. Decoded documents are checked with the invariant report and
//! rejected when any error-level issue remains.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PersistenceError;
use crate::id::PanelId;
use crate::registry::PanelRegistry;
use crate::scope::ScopeKey;
use crate::state::PanelLayoutState;
use crate::storage::StorageBackend;
use crate::tree::LayoutNode;

/// Current persisted document version.
pub const LAYOUT_SCHEMA_VERSION: u16 = 1;

/// Prefix used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "panel-layout:";

/// On-disk shape of one scope's layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedLayout {
    pub schema_version: u16,
    pub layout: LayoutNode,
    pub panels: PanelRegistry,
    pub active_template_id: String,
    #[serde(default)]
    pub focused_panel_id: Option<PanelId>,
    #[serde(default)]
    pub next_id: u64,
}

impl PersistedLayout {
    /// Snapshot `state` with ephemerals removed.
    #[must_use]
    pub fn from_state(state: &PanelLayoutState) -> Self {
        let mut panels = state.panels().clone();
        panels.strip_ephemeral();
        Self {
            schema_version: LAYOUT_SCHEMA_VERSION,
            layout: state.layout().clone(),
            panels,
            active_template_id: state.active_template_id().to_owned(),
            focused_panel_id: state.focused_panel_id(),
            next_id: state.next_id(),
        }
    }

    /// Rebuild a sanitized state. Fails on error-level invariant issues.
    pub fn into_state(self) -> Result<PanelLayoutState, PersistenceError> {
        if self.schema_version != LAYOUT_SCHEMA_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: self.schema_version,
                expected: LAYOUT_SCHEMA_VERSION,
            });
        }
        let mut state = PanelLayoutState::from_parts(
            self.layout,
            self.panels,
            self.active_template_id,
            self.focused_panel_id,
            self.next_id,
        );
        state.strip_ephemeral();
        let report = state.invariant_report();
        if let Some(first) = report.first_error() {
            return Err(PersistenceError::Invalid {
                issue_count: report.issues.len(),
                first_issue: first.message.clone(),
            });
        }
        Ok(state)
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    schema_version: u16,
}

/// Encode `state` for `scope`.
pub fn encode(scope: &ScopeKey, state: &PanelLayoutState) -> Result<String, PersistenceError> {
    serde_json::to_string(&PersistedLayout::from_state(state)).map_err(|source| {
        PersistenceError::Encode {
            scope: scope.to_string(),
            source,
        }
    })
}

/// Decode and sanitize a document for `scope`.
///
/// The version is checked before the body so documents from a newer schema
/// report [`PersistenceError::UnsupportedVersion`] rather than a parse error.
pub fn decode(scope: &ScopeKey, raw: &str) -> Result<PanelLayoutState, PersistenceError> {
    let decode_err = |source| PersistenceError::Decode {
        scope: scope.to_string(),
        source,
    };
    let probe: VersionProbe = serde_json::from_str(raw).map_err(decode_err)?;
    if probe.schema_version != LAYOUT_SCHEMA_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: probe.schema_version,
            expected: LAYOUT_SCHEMA_VERSION,
        });
    }
    let document: PersistedLayout = serde_json::from_str(raw).map_err(decode_err)?;
    document.into_state()
}

/// Persistence adapter over a [`StorageBackend`].
pub struct LayoutPersistence {
    backend: Box<dyn StorageBackend>,
    key_prefix: String,
}

impl std::fmt::Debug for LayoutPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutPersistence")
            .field("backend", &self.backend.name())
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl LayoutPersistence {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self::from_boxed(Box::new(backend))
    }

    #[must_use]
    pub fn from_boxed(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
        }
    }

    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    #[must_use]
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    #[must_use]
    pub fn storage_key(&self, scope: &ScopeKey) -> String {
        format!("{}{scope}", self.key_prefix)
    }

    pub fn save(&self, scope: &ScopeKey, state: &PanelLayoutState) -> Result<(), PersistenceError> {
        let key = self.storage_key(scope);
        let json = encode(scope, state)?;
        self.backend.save(&key, &json)?;
        debug!(
            backend = self.backend.name(),
            key = %key,
            bytes = json.len(),
            "saved panel layout"
        );
        Ok(())
    }

    /// Load the stored layout of `scope`, `Ok(None)` when nothing is stored.
    pub fn load(&self, scope: &ScopeKey) -> Result<Option<PanelLayoutState>, PersistenceError> {
        let key = self.storage_key(scope);
        let Some(raw) = self.backend.load(&key)? else {
            return Ok(None);
        };
        let state = decode(scope, &raw)?;
        debug!(backend = self.backend.name(), key = %key, "loaded panel layout");
        Ok(Some(state))
    }

    pub fn remove(&self, scope: &ScopeKey) -> Result<(), PersistenceError> {
        self.backend.remove(&self.storage_key(scope))?;
        Ok(())
    }

    /// Scopes with a stored record. Keys that do not parse are skipped.
    pub fn stored_scopes(&self) -> Result<Vec<ScopeKey>, PersistenceError> {
        Ok(self
            .backend
            .keys()?
            .iter()
            .filter_map(|key| key.strip_prefix(self.key_prefix.as_str()))
            .filter_map(|scope| scope.parse().ok())
            .collect())
    }

    /// Remove every record under this adapter's prefix. Other keys in the
    /// backend are left alone.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        for key in self.backend.keys()? {
            if key.starts_with(self.key_prefix.as_str()) {
                self.backend.remove(&key)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::MAX_RAW_ID;
    use crate::registry::{PanelContent, PanelPatch};
    use crate::storage::MemoryStorage;
    use crate::template::TemplateCatalog;

    fn running_split_v() -> PanelLayoutState {
        let catalog = TemplateCatalog::builtin();
        let mut state = PanelLayoutState::from_template(catalog.get("split-v").unwrap());
        let [chat, terminal] = state.layout().leaf_panel_ids()[..] else {
            panic!("split-v has two leaves");
        };
        state.update_panel(chat, &PanelPatch::new().session_id("sess-7"));
        state.update_panel(
            terminal,
            &PanelPatch::new().handle("pty-42").cwd("/work").running(true),
        );
        state.focus(terminal);
        state
    }

    #[test]
    fn round_trip_strips_ephemerals_only() {
        let scope = ScopeKey::project("p");
        let original = running_split_v();
        let decoded = decode(&scope, &encode(&scope, &original).unwrap()).unwrap();

        let terminal = original.layout().leaf_panel_ids()[1];
        let panel = decoded.panel(terminal).unwrap();
        assert!(!panel.has_running_process);
        assert_eq!(
            panel.content,
            PanelContent::Terminal {
                handle: None,
                cwd: Some("/work".into()),
            }
        );

        let mut expected = original.clone();
        expected.strip_ephemeral();
        assert_eq!(decoded, expected);

        let again = decode(&scope, &encode(&scope, &decoded).unwrap()).unwrap();
        assert_eq!(again, decoded);
    }

    #[test]
    fn encoded_document_has_no_ephemeral_keys() {
        let scope = ScopeKey::project("p");
        let json = encode(&scope, &running_split_v()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert!(!json.contains("pty-42"));
        assert!(json.contains("sess-7"));
        for panel in value["panels"].as_object().unwrap().values() {
            assert_eq!(panel["has_running_process"], false);
        }
    }

    #[test]
    fn decode_forces_ephemerals_off_even_if_stored() {
        let scope = ScopeKey::project("p");
        let json = encode(&scope, &running_split_v()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for panel in value["panels"].as_object_mut().unwrap().values_mut() {
            panel["has_running_process"] = true.into();
            if panel["content"]["type"] == "terminal" {
                panel["content"]["handle"] = "stale-pty".into();
            }
        }
        let decoded = decode(&scope, &value.to_string()).unwrap();
        assert!(decoded.panels().iter().all(|p| !p.has_running_process));
        assert!(decoded.panels().iter().all(|p| p.content.handle().is_none()));
    }

    #[test]
    fn decode_rejects_other_versions() {
        let scope = ScopeKey::project("p");
        let err = decode(&scope, r#"{"schema_version": 7, "anything": true}"#).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::UnsupportedVersion { found: 7, expected: 1 }
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        let scope = ScopeKey::session("p", "s");
        let err = decode(&scope, "not json").unwrap_err();
        assert!(matches!(err, PersistenceError::Decode { ref scope, .. } if scope == "p:s"));
    }

    #[test]
    fn decode_rejects_dangling_leaf() {
        let scope = ScopeKey::project("p");
        let json = encode(&scope, &running_split_v()).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let panels = value["panels"].as_object_mut().unwrap();
        let first_key = panels.keys().next().cloned().unwrap();
        panels.remove(&first_key);
        let err = decode(&scope, &value.to_string()).unwrap_err();
        assert!(matches!(err, PersistenceError::Invalid { .. }));
    }

    fn one_leaf_document(node: u64, panel: u64, next_id: u64) -> String {
        serde_json::json!({
            "schema_version": 1,
            "layout": { "kind": "leaf", "id": node, "panel_id": panel },
            "panels": {
                panel.to_string(): { "id": panel, "content": { "type": "chat" }, "is_focused": true }
            },
            "active_template_id": "single",
            "focused_panel_id": panel,
            "next_id": next_id,
        })
        .to_string()
    }

    #[test]
    fn decode_accepts_hand_written_document() {
        let scope = ScopeKey::project("p");
        let state = decode(&scope, &one_leaf_document(1, 2, 3)).unwrap();
        assert_eq!(state.next_id(), 3);
        assert!(state.invariant_report().is_clean());
    }

    #[test]
    fn decode_rejects_ids_outside_range() {
        let scope = ScopeKey::project("p");
        for (node, panel) in [(u64::MAX - 1, u64::MAX), (1, 0), (0, 2)] {
            let err = decode(&scope, &one_leaf_document(node, panel, 3)).unwrap_err();
            assert!(matches!(err, PersistenceError::Decode { .. }), "{node}/{panel}: {err}");
        }
    }

    #[test]
    fn decode_rejects_exhausted_id_counter() {
        let scope = ScopeKey::project("p");
        for raw in [
            one_leaf_document(1, 2, u64::MAX),
            one_leaf_document(MAX_RAW_ID - 1, MAX_RAW_ID, 0),
        ] {
            let err = decode(&scope, &raw).unwrap_err();
            assert!(matches!(err, PersistenceError::Invalid { .. }), "{err}");
        }

        let near = decode(&scope, &one_leaf_document(MAX_RAW_ID - 2, MAX_RAW_ID - 1, 0)).unwrap();
        assert_eq!(near.next_id(), MAX_RAW_ID);
        assert!(near.invariant_report().is_clean());
    }

    #[test]
    fn adapter_keys_records_by_prefix() {
        let storage = MemoryStorage::new();
        let persistence = LayoutPersistence::new(storage.clone()).with_key_prefix("layout/");
        let scope = ScopeKey::session("proj", "s1");
        let state = running_split_v();

        persistence.save(&scope, &state).unwrap();
        storage.save("unrelated", "keep me").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["layout/proj:s1".to_owned(), "unrelated".to_owned()]);
        assert_eq!(persistence.stored_scopes().unwrap(), vec![scope.clone()]);

        let loaded = persistence.load(&scope).unwrap().unwrap();
        assert_eq!(loaded.layout(), state.layout());
        assert!(persistence.load(&ScopeKey::project("proj")).unwrap().is_none());

        persistence.clear().unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["unrelated".to_owned()]);
    }
}
