//! Per-scope layout tuple and its structural diagnostics.
//!
//! [`PanelLayoutState`] keeps the tree, the panel map, the active template and
//! the focused panel consistent with each other. Mutators report whether their
//! target existed; a miss changes nothing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::id::{IdAllocator, NodeId, PanelId};
use crate::panel_type::PanelType;
use crate::registry::{PanelPatch, PanelRegistry, PanelState};
use crate::template::LayoutTemplate;
use crate::tree::{LayoutNode, Orientation, Placement};

/// Layout of one scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelLayoutState {
    layout: LayoutNode,
    panels: PanelRegistry,
    active_template_id: String,
    focused_panel_id: Option<PanelId>,
    #[serde(rename = "next_id")]
    ids: IdAllocator,
}

impl PanelLayoutState {
    /// Fresh state built from `template`, focused on its first leaf.
    #[must_use]
    pub fn from_template(template: &LayoutTemplate) -> Self {
        let mut ids = IdAllocator::new();
        let (layout, panels) = template.instantiate(&mut ids);
        let mut state = Self {
            layout,
            panels: panels.into_iter().collect(),
            active_template_id: template.id().to_owned(),
            focused_panel_id: None,
            ids,
        };
        state.focus_first_leaf();
        state
    }

    /// Reassemble a state from persisted parts.
    ///
    /// The id counter is raised past every id in the tree and panel map, and
    /// focus flags are resynced with `focused_panel_id`. Structural problems
    /// are left for [`invariant_report`](Self::invariant_report) to find.
    #[must_use]
    pub fn from_parts(
        layout: LayoutNode,
        panels: PanelRegistry,
        active_template_id: String,
        focused_panel_id: Option<PanelId>,
        next_id: u64,
    ) -> Self {
        let mut ids = IdAllocator::starting_at(next_id);
        for node_id in layout.node_ids() {
            ids.observe(node_id.get());
        }
        for panel_id in panels.ids() {
            ids.observe(panel_id.get());
        }
        let mut state = Self {
            layout,
            panels,
            active_template_id,
            focused_panel_id,
            ids,
        };
        state.resync_focus();
        state
    }

    #[must_use]
    pub fn layout(&self) -> &LayoutNode {
        &self.layout
    }

    #[must_use]
    pub fn panels(&self) -> &PanelRegistry {
        &self.panels
    }

    #[must_use]
    pub fn panel(&self, id: PanelId) -> Option<&PanelState> {
        self.panels.get(id)
    }

    #[must_use]
    pub fn active_template_id(&self) -> &str {
        &self.active_template_id
    }

    #[must_use]
    pub fn focused_panel_id(&self) -> Option<PanelId> {
        self.focused_panel_id
    }

    /// Next id the scope will allocate.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.ids.peek()
    }

    /// Replace tree and panels with a fresh instance of `template`.
    ///
    /// The id counter keeps running, so stale references to discarded panels
    /// never resolve to new ones.
    pub fn apply_template(&mut self, template: &LayoutTemplate) {
        let (layout, panels) = template.instantiate(&mut self.ids);
        self.layout = layout;
        self.panels = panels.into_iter().collect();
        self.active_template_id = template.id().to_owned();
        self.focus_first_leaf();
    }

    pub fn focus(&mut self, id: PanelId) -> bool {
        if !self.panels.focus(id) {
            return false;
        }
        self.focused_panel_id = Some(id);
        true
    }

    pub fn update_panel(&mut self, id: PanelId, patch: &PanelPatch) -> bool {
        self.panels.update(id, patch)
    }

    pub fn change_panel_type(&mut self, id: PanelId, panel_type: PanelType) -> bool {
        self.panels.change_type(id, panel_type)
    }

    pub fn set_process_running(&mut self, id: PanelId, running: bool) -> bool {
        self.panels.set_process_running(id, running)
    }

    /// Set a split's ratio, clamped. Returns `false` unless `node_id` names a
    /// split in this tree.
    pub fn set_split_ratio(&mut self, node_id: NodeId, ratio: f64) -> bool {
        if self.layout.find(node_id).is_none_or(LayoutNode::is_leaf) {
            return false;
        }
        self.layout = self.layout.with_split_ratio(node_id, ratio);
        true
    }

    /// Split the leaf of `panel_id`, adding a focused panel of `panel_type`.
    ///
    /// Returns the new panel's id, or `None` when `panel_id` is unknown.
    pub fn split_panel(
        &mut self,
        panel_id: PanelId,
        orientation: Orientation,
        panel_type: PanelType,
        placement: Placement,
    ) -> Option<PanelId> {
        self.layout.leaf_for_panel(panel_id)?;
        let panel = PanelRegistry::create_default(&mut self.ids, panel_type);
        let new_id = panel.id;
        let leaf = LayoutNode::leaf(self.ids.node(), new_id);
        let split_id = self.ids.node();
        let layout = self
            .layout
            .split_leaf(panel_id, split_id, orientation, placement, leaf)?;
        self.layout = layout;
        self.panels.insert(panel);
        self.focus(new_id);
        Some(new_id)
    }

    /// Remove `panel_id` and its leaf. The last panel of a scope cannot be
    /// closed.
    pub fn close_panel(&mut self, panel_id: PanelId) -> bool {
        let Some(successor) = self
            .layout
            .sibling_of_panel(panel_id)
            .map(LayoutNode::first_panel_id)
        else {
            return false;
        };
        let Some(layout) = self.layout.remove_leaf(panel_id) else {
            return false;
        };
        self.layout = layout;
        self.panels.remove(panel_id);
        if self.focused_panel_id == Some(panel_id) {
            self.focus(successor);
        }
        true
    }

    /// Drop process handles and running flags.
    pub fn strip_ephemeral(&mut self) {
        self.panels.strip_ephemeral();
    }

    /// Make focus flags agree with `focused_panel_id`.
    ///
    /// A dangling `focused_panel_id` falls back to whichever panel carries the
    /// focus flag, if any.
    pub fn resync_focus(&mut self) {
        let target = self
            .focused_panel_id
            .filter(|id| self.panels.contains(*id))
            .or_else(|| self.panels.focused());
        match target {
            Some(id) => {
                self.focus(id);
            }
            None => {
                self.panels.clear_focus();
                self.focused_panel_id = None;
            }
        }
    }

    fn focus_first_leaf(&mut self) {
        let first = self.layout.first_panel_id();
        self.focus(first);
    }

    /// Inspect tree/registry invariants.
    #[must_use]
    pub fn invariant_report(&self) -> InvariantReport {
        build_invariant_report(self)
    }
}

// =========================================================================
// Invariant diagnostics
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantSeverity {
    Error,
    Warning,
}

/// Stable code for invariant findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantCode {
    DuplicateNodeId,
    DuplicatePanelReference,
    MissingPanel,
    OrphanPanel,
    PanelKeyMismatch,
    FocusMismatch,
    MultipleFocused,
    NextIdNotGreaterThanExisting,
    IdSpaceExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantIssue {
    pub code: InvariantCode,
    pub severity: InvariantSeverity,
    pub node_id: Option<NodeId>,
    pub panel_id: Option<PanelId>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvariantReport {
    pub issues: Vec<InvariantIssue>,
}

impl InvariantReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == InvariantSeverity::Error)
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// First error-level finding.
    #[must_use]
    pub fn first_error(&self) -> Option<&InvariantIssue> {
        self.issues
            .iter()
            .find(|issue| issue.severity == InvariantSeverity::Error)
    }

    fn push(
        &mut self,
        code: InvariantCode,
        severity: InvariantSeverity,
        node_id: Option<NodeId>,
        panel_id: Option<PanelId>,
        message: String,
    ) {
        self.issues.push(InvariantIssue {
            code,
            severity,
            node_id,
            panel_id,
            message,
        });
    }
}

fn build_invariant_report(state: &PanelLayoutState) -> InvariantReport {
    use InvariantCode as Code;
    use InvariantSeverity::{Error, Warning};

    let mut report = InvariantReport::default();
    let mut max_id = 0_u64;

    let mut seen_nodes = BTreeSet::new();
    let mut seen_panels = BTreeSet::new();
    state.layout.walk(&mut |node| {
        let node_id = node.id();
        max_id = max_id.max(node_id.get());
        if !seen_nodes.insert(node_id) {
            report.push(
                Code::DuplicateNodeId,
                Error,
                Some(node_id),
                None,
                format!("node id {node_id} appears more than once"),
            );
        }
        let Some(panel_id) = node.panel_id() else {
            return;
        };
        if !seen_panels.insert(panel_id) {
            report.push(
                Code::DuplicatePanelReference,
                Error,
                Some(node_id),
                Some(panel_id),
                format!("{panel_id} is referenced by more than one leaf"),
            );
        }
        if !state.panels.contains(panel_id) {
            report.push(
                Code::MissingPanel,
                Error,
                Some(node_id),
                Some(panel_id),
                format!("leaf {node_id} references missing {panel_id}"),
            );
        }
    });

    for (key, panel) in state.panels.ids().zip(state.panels.iter()) {
        max_id = max_id.max(key.get());
        if key != panel.id {
            report.push(
                Code::PanelKeyMismatch,
                Error,
                None,
                Some(key),
                format!("panel stored under {key} claims id {}", panel.id),
            );
        }
        if !seen_panels.contains(&key) {
            report.push(
                Code::OrphanPanel,
                Error,
                None,
                Some(key),
                format!("{key} is not referenced by any leaf"),
            );
        }
    }

    let focused: Vec<PanelId> = state
        .panels
        .iter()
        .filter(|p| p.is_focused)
        .map(|p| p.id)
        .collect();
    if focused.len() > 1 {
        report.push(
            Code::MultipleFocused,
            Error,
            None,
            focused.first().copied(),
            format!("{} panels are focused at once", focused.len()),
        );
    }
    let flagged = focused.first().copied();
    if flagged != state.focused_panel_id {
        report.push(
            Code::FocusMismatch,
            Warning,
            None,
            state.focused_panel_id.or(flagged),
            format!(
                "focused_panel_id {:?} disagrees with focus flag on {:?}",
                state.focused_panel_id.map(PanelId::get),
                flagged.map(PanelId::get)
            ),
        );
    }

    if state.ids.peek() <= max_id {
        report.push(
            Code::NextIdNotGreaterThanExisting,
            Error,
            None,
            None,
            format!(
                "next_id {} must be greater than max id {max_id}",
                state.ids.peek()
            ),
        );
    }
    if state.ids.is_exhausted() {
        report.push(
            Code::IdSpaceExhausted,
            Error,
            None,
            None,
            format!("next_id {} is past the id ceiling", state.ids.peek()),
        );
    }

    report
}
