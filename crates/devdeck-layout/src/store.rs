//! Workspace store: the scope map and every public layout operation.
//!
//! # Lifecycle
//!
//! A scope is *uninitialized* until its first read or write. At that point the
//! store restores it from persistence when a valid record exists and otherwise
//! builds the default template. Once initialized a scope stays in memory until
//! [`LayoutStore::remove_scope`] or [`LayoutStore::reset`].
//!
//! # Snapshots
//!
//! Scope states are held as `Arc<PanelLayoutState>`. A mutator works on a
//! private copy and swaps it in only when the operation found its target and
//! actually changed something; the returned `Arc` is the new snapshot. Earlier
//! snapshots held by callers never change.
//!
//! # Failure policy
//!
//! - Unknown panel, node or template ids are no-ops, logged at `debug`.
//! - Storage failures are logged at `warn` and never reach the caller.
//! - Undecodable records fall back to the default template.
//!
//! The store takes `&mut self` for every mutation. Hosts that share it across
//! threads wrap it in a `Mutex`; the type is `Send + Sync`.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::config::LayoutConfig;
use crate::id::{NodeId, PanelId};
use crate::panel_type::{BuiltinPanelTypes, PanelType, PanelTypeInfo, PanelTypeRegistry};
use crate::persistence::LayoutPersistence;
use crate::registry::{PanelPatch, PanelState};
use crate::scope::ScopeKey;
use crate::state::PanelLayoutState;
use crate::storage::FileStorage;
use crate::template::{LayoutTemplate, TemplateCatalog};
use crate::tree::{Orientation, Placement};

/// Owner of every scope's layout.
pub struct LayoutStore {
    catalog: TemplateCatalog,
    config: LayoutConfig,
    default_template: LayoutTemplate,
    panel_types: Box<dyn PanelTypeRegistry>,
    persistence: Option<LayoutPersistence>,
    scopes: FxHashMap<ScopeKey, Arc<PanelLayoutState>>,
}

impl std::fmt::Debug for LayoutStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutStore")
            .field("default_template", &self.default_template.id())
            .field("persistence", &self.persistence)
            .field("scopes", &self.scopes.len())
            .finish_non_exhaustive()
    }
}

impl Default for LayoutStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutStore {
    /// In-memory store with the stock templates and panel types.
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalog(TemplateCatalog::builtin())
    }

    #[must_use]
    pub fn with_catalog(catalog: TemplateCatalog) -> Self {
        let config = LayoutConfig::default();
        let default_template = resolve_default(&catalog, &config);
        Self {
            catalog,
            config,
            default_template,
            panel_types: Box::new(BuiltinPanelTypes),
            persistence: None,
            scopes: FxHashMap::default(),
        }
    }

    /// Store configured from `config`, backed by a [`FileStorage`] when
    /// `storage_path` is set and persistence is enabled.
    #[must_use]
    pub fn from_config(config: LayoutConfig) -> Self {
        let persistence = match &config.storage_path {
            Some(path) if config.persist => Some(LayoutPersistence::new(FileStorage::new(path))),
            _ => None,
        };
        let store = Self::new().with_config(config);
        match persistence {
            Some(persistence) => store.with_persistence(persistence),
            None => store,
        }
    }

    /// Replace the configuration. Problems are logged; an unknown default
    /// template falls back to `single`. The configured key prefix is applied
    /// to the attached persistence adapter, if any.
    #[must_use]
    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        for problem in config.validate(&self.catalog) {
            warn!(%problem, "layout config problem");
        }
        self.default_template = resolve_default(&self.catalog, &config);
        self.persistence = self
            .persistence
            .take()
            .map(|persistence| persistence.with_key_prefix(config.storage_key_prefix.clone()));
        self.config = config;
        self
    }

    /// Attach a persistence adapter. Its key prefix is replaced by the
    /// configured `storage_key_prefix`.
    #[must_use]
    pub fn with_persistence(mut self, persistence: LayoutPersistence) -> Self {
        self.persistence =
            Some(persistence.with_key_prefix(self.config.storage_key_prefix.clone()));
        self
    }

    #[must_use]
    pub fn with_panel_types(mut self, panel_types: impl PanelTypeRegistry + 'static) -> Self {
        self.panel_types = Box::new(panel_types);
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    #[must_use]
    pub fn default_template_id(&self) -> &str {
        self.default_template.id()
    }

    #[must_use]
    pub fn persistence(&self) -> Option<&LayoutPersistence> {
        self.persistence.as_ref()
    }

    #[must_use]
    pub fn panel_type_info(&self, panel_type: PanelType) -> PanelTypeInfo {
        self.panel_types.info(panel_type)
    }

    // =====================================================================
    // Reads
    // =====================================================================

    /// State of `scope`, initializing it on first access.
    pub fn get(&mut self, scope: &ScopeKey) -> Arc<PanelLayoutState> {
        Arc::clone(self.entry(scope))
    }

    /// State of `scope` if it is already initialized.
    #[must_use]
    pub fn peek(&self, scope: &ScopeKey) -> Option<Arc<PanelLayoutState>> {
        self.scopes.get(scope).cloned()
    }

    /// Initialized scopes, in no particular order.
    pub fn scopes(&self) -> impl Iterator<Item = &ScopeKey> {
        self.scopes.keys()
    }

    /// Whether closing `panel_id` should be confirmed: its type is
    /// close-protected and a process is running in it.
    #[must_use]
    pub fn requires_close_confirmation(&self, scope: &ScopeKey, panel_id: PanelId) -> bool {
        self.scopes
            .get(scope)
            .and_then(|state| state.panel(panel_id))
            .is_some_and(|panel| self.is_protected(panel))
    }

    /// Whether switching `scope` to another template would discard a panel
    /// that requires close confirmation.
    #[must_use]
    pub fn template_switch_requires_confirmation(&self, scope: &ScopeKey) -> bool {
        self.scopes
            .get(scope)
            .is_some_and(|state| state.panels().iter().any(|panel| self.is_protected(panel)))
    }

    fn is_protected(&self, panel: &PanelState) -> bool {
        panel.has_running_process && self.panel_types.info(panel.panel_type()).requires_close_protection
    }

    // =====================================================================
    // Mutations
    // =====================================================================

    /// Rebuild `scope` from `template_id`, discarding every current panel.
    pub fn apply_template(&mut self, scope: &ScopeKey, template_id: &str) -> Arc<PanelLayoutState> {
        let Some(template) = self.catalog.get(template_id).cloned() else {
            debug!(%scope, template_id, "apply_template: unknown template");
            return self.get(scope);
        };
        self.mutate(scope, "apply_template", None, |state| {
            state.apply_template(&template);
            true
        })
    }

    pub fn update_panel(
        &mut self,
        scope: &ScopeKey,
        panel_id: PanelId,
        patch: &PanelPatch,
    ) -> Arc<PanelLayoutState> {
        self.mutate(scope, "update_panel", Some(panel_id.get()), |state| {
            state.update_panel(panel_id, patch)
        })
    }

    /// Switch a panel's type. The payload is reset and the panel marked idle.
    pub fn change_panel_type(
        &mut self,
        scope: &ScopeKey,
        panel_id: PanelId,
        panel_type: PanelType,
    ) -> Arc<PanelLayoutState> {
        self.mutate(scope, "change_panel_type", Some(panel_id.get()), |state| {
            state.change_panel_type(panel_id, panel_type)
        })
    }

    pub fn focus(&mut self, scope: &ScopeKey, panel_id: PanelId) -> Arc<PanelLayoutState> {
        self.mutate(scope, "focus", Some(panel_id.get()), |state| state.focus(panel_id))
    }

    /// Set a split's ratio, clamped to `[0.1, 0.9]`.
    pub fn set_split_ratio(
        &mut self,
        scope: &ScopeKey,
        node_id: NodeId,
        ratio: f64,
    ) -> Arc<PanelLayoutState> {
        self.mutate(scope, "set_split_ratio", Some(node_id.get()), |state| {
            state.set_split_ratio(node_id, ratio)
        })
    }

    /// Process-manager hook for reporting process lifecycle.
    pub fn set_process_running(
        &mut self,
        scope: &ScopeKey,
        panel_id: PanelId,
        running: bool,
    ) -> Arc<PanelLayoutState> {
        self.mutate(scope, "set_process_running", Some(panel_id.get()), |state| {
            state.set_process_running(panel_id, running)
        })
    }

    /// Split the leaf holding `panel_id` and focus a new `panel_type` panel.
    ///
    /// Refused when the type may not have multiple instances and the scope
    /// already has one.
    pub fn split_panel(
        &mut self,
        scope: &ScopeKey,
        panel_id: PanelId,
        orientation: Orientation,
        panel_type: PanelType,
        placement: Placement,
    ) -> Arc<PanelLayoutState> {
        let single_instance = !self.panel_types.info(panel_type).can_have_multiple;
        self.mutate(scope, "split_panel", Some(panel_id.get()), |state| {
            if single_instance && state.panels().iter().any(|p| p.panel_type() == panel_type) {
                debug!(%scope, %panel_type, "split_panel: type allows a single instance");
                return false;
            }
            state
                .split_panel(panel_id, orientation, panel_type, placement)
                .is_some()
        })
    }

    /// Close a panel and promote its sibling. The last panel stays.
    pub fn close_panel(&mut self, scope: &ScopeKey, panel_id: PanelId) -> Arc<PanelLayoutState> {
        self.mutate(scope, "close_panel", Some(panel_id.get()), |state| state.close_panel(panel_id))
    }

    /// Re-apply the default template.
    pub fn reset_layout(&mut self, scope: &ScopeKey) -> Arc<PanelLayoutState> {
        let template = self.default_template.clone();
        self.mutate(scope, "reset_layout", None, |state| {
            state.apply_template(&template);
            true
        })
    }

    /// Forget `scope` in memory and in storage. Returns whether it was
    /// initialized.
    pub fn remove_scope(&mut self, scope: &ScopeKey) -> bool {
        let existed = self.scopes.remove(scope).is_some();
        if let Some(persistence) = self.writable_persistence()
            && let Err(err) = persistence.remove(scope)
        {
            warn!(%scope, error = %err, "failed to remove persisted panel layout");
        }
        debug!(%scope, existed, "removed scope");
        existed
    }

    /// Forget every scope in memory and in storage.
    pub fn reset(&mut self) {
        let count = self.scopes.len();
        self.scopes.clear();
        if let Some(persistence) = self.writable_persistence()
            && let Err(err) = persistence.clear()
        {
            warn!(error = %err, "failed to clear persisted panel layouts");
        }
        debug!(count, "reset layout store");
    }

    // =====================================================================
    // Internals
    // =====================================================================

    fn entry(&mut self, scope: &ScopeKey) -> &mut Arc<PanelLayoutState> {
        let Self {
            scopes,
            persistence,
            default_template,
            ..
        } = self;
        scopes.entry(scope.clone()).or_insert_with(|| {
            Arc::new(initial_state(persistence.as_ref(), default_template, scope))
        })
    }

    /// Run `apply` on a copy of the scope's state and commit it if it
    /// reported a hit and changed something.
    fn mutate(
        &mut self,
        scope: &ScopeKey,
        op: &'static str,
        target: Option<u64>,
        apply: impl FnOnce(&mut PanelLayoutState) -> bool,
    ) -> Arc<PanelLayoutState> {
        let current = self.entry(scope);
        let mut next = PanelLayoutState::clone(current);
        if !apply(&mut next) {
            debug!(%scope, op, ?target, "target not found; layout unchanged");
            return Arc::clone(current);
        }
        if next == **current {
            debug!(%scope, op, "layout unchanged");
            return Arc::clone(current);
        }
        let next = Arc::new(next);
        *current = Arc::clone(&next);
        debug!(
            %scope,
            op,
            panels = next.panels().len(),
            focused = ?next.focused_panel_id().map(PanelId::get),
            "layout updated"
        );
        self.write_through(scope, &next);
        next
    }

    fn writable_persistence(&self) -> Option<&LayoutPersistence> {
        self.persistence.as_ref().filter(|_| self.config.persist)
    }

    fn write_through(&self, scope: &ScopeKey, state: &PanelLayoutState) {
        let Some(persistence) = self.writable_persistence() else {
            return;
        };
        if let Err(err) = persistence.save(scope, state) {
            warn!(%scope, error = %err, "failed to persist panel layout");
        }
    }
}

fn resolve_default(catalog: &TemplateCatalog, config: &LayoutConfig) -> LayoutTemplate {
    match catalog.get(&config.default_template) {
        Some(template) => template.clone(),
        None => {
            warn!(
                template = %config.default_template,
                "default template not in catalog; using single"
            );
            LayoutTemplate::single()
        }
    }
}

fn initial_state(
    persistence: Option<&LayoutPersistence>,
    default_template: &LayoutTemplate,
    scope: &ScopeKey,
) -> PanelLayoutState {
    if let Some(persistence) = persistence {
        match persistence.load(scope) {
            Ok(Some(state)) => {
                debug!(%scope, "restored panel layout");
                return state;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(%scope, error = %err, "discarding persisted panel layout");
            }
        }
    }
    debug!(%scope, template = default_template.id(), "initialized panel layout");
    PanelLayoutState::from_template(default_template)
}
