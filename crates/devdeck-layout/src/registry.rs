//! Authoritative per-panel state for one scope.
//!
//! Type-specific fields live in [`PanelContent`], a sum type keyed by panel
//! type, so switching type drops the previous payload by construction. The
//! registry also owns the focus rule: at most one panel of a scope is focused.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::id::{IdAllocator, PanelId};
use crate::panel_type::PanelType;

/// Content payload of a panel, tagged by its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PanelContent {
    Terminal {
        /// PTY handle from the process manager. Valid for one process lifetime.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        handle: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,
    },
    FileBrowser {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        root: Option<PathBuf>,
    },
    FileViewer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
    Chat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    BrowserPreview {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    MarkdownViewer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
    Empty,
}

impl PanelContent {
    /// Empty payload for `panel_type`.
    #[must_use]
    pub fn empty_for(panel_type: PanelType) -> Self {
        match panel_type {
            PanelType::Terminal => Self::Terminal {
                handle: None,
                cwd: None,
            },
            PanelType::FileBrowser => Self::FileBrowser { root: None },
            PanelType::FileViewer => Self::FileViewer { path: None },
            PanelType::Chat => Self::Chat { session_id: None },
            PanelType::BrowserPreview => Self::BrowserPreview { url: None },
            PanelType::MarkdownViewer => Self::MarkdownViewer { path: None },
            PanelType::Empty => Self::Empty,
        }
    }

    #[must_use]
    pub const fn panel_type(&self) -> PanelType {
        match self {
            Self::Terminal { .. } => PanelType::Terminal,
            Self::FileBrowser { .. } => PanelType::FileBrowser,
            Self::FileViewer { .. } => PanelType::FileViewer,
            Self::Chat { .. } => PanelType::Chat,
            Self::BrowserPreview { .. } => PanelType::BrowserPreview,
            Self::MarkdownViewer { .. } => PanelType::MarkdownViewer,
            Self::Empty => PanelType::Empty,
        }
    }

    /// Terminal process handle, if any.
    #[must_use]
    pub fn handle(&self) -> Option<&str> {
        match self {
            Self::Terminal { handle, .. } => handle.as_deref(),
            _ => None,
        }
    }

    /// Document path of a file or markdown viewer.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::FileViewer { path } | Self::MarkdownViewer { path } => path.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::BrowserPreview { url } => url.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Chat { session_id } => session_id.as_deref(),
            _ => None,
        }
    }

    /// Merge the fields of `patch` this variant carries; others are ignored.
    fn apply(&mut self, patch: &PanelPatch) {
        match self {
            Self::Terminal { handle, cwd } => {
                merge(handle, &patch.handle);
                merge(cwd, &patch.cwd);
            }
            Self::FileBrowser { root } => merge(root, &patch.root),
            Self::FileViewer { path } | Self::MarkdownViewer { path } => merge(path, &patch.path),
            Self::Chat { session_id } => merge(session_id, &patch.session_id),
            Self::BrowserPreview { url } => merge(url, &patch.url),
            Self::Empty => {}
        }
    }

    fn strip_ephemeral(&mut self) {
        if let Self::Terminal { handle, .. } = self {
            *handle = None;
        }
    }
}

fn merge<T: Clone>(slot: &mut Option<T>, update: &Option<Option<T>>) {
    if let Some(value) = update {
        slot.clone_from(value);
    }
}

/// State of one arrangeable panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelState {
    pub id: PanelId,
    pub content: PanelContent,
    #[serde(default)]
    pub is_focused: bool,
    /// Reported by the process manager; never inferred by the engine.
    #[serde(default)]
    pub has_running_process: bool,
}

impl PanelState {
    /// Fresh, unfocused, idle panel of `panel_type` with an empty payload.
    #[must_use]
    pub fn new(id: PanelId, panel_type: PanelType) -> Self {
        Self {
            id,
            content: PanelContent::empty_for(panel_type),
            is_focused: false,
            has_running_process: false,
        }
    }

    #[must_use]
    pub const fn panel_type(&self) -> PanelType {
        self.content.panel_type()
    }

    /// Drop everything that is only meaningful inside the current process.
    pub fn strip_ephemeral(&mut self) {
        self.has_running_process = false;
        self.content.strip_ephemeral();
    }
}

/// Partial update for [`PanelRegistry::update`].
///
/// Outer `None` leaves a field alone; `Some(None)` clears it. Content fields
/// only apply when the panel's current type carries them. Focus is not
/// patchable here; use [`PanelRegistry::focus`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelPatch {
    pub has_running_process: Option<bool>,
    pub handle: Option<Option<String>>,
    pub cwd: Option<Option<PathBuf>>,
    pub root: Option<Option<PathBuf>>,
    pub path: Option<Option<PathBuf>>,
    pub session_id: Option<Option<String>>,
    pub url: Option<Option<String>>,
}

impl PanelPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn running(mut self, running: bool) -> Self {
        self.has_running_process = Some(running);
        self
    }

    #[must_use]
    pub fn handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(Some(handle.into()));
        self
    }

    #[must_use]
    pub fn clear_handle(mut self) -> Self {
        self.handle = Some(None);
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(Some(cwd.into()));
        self
    }

    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(Some(root.into()));
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(Some(path.into()));
        self
    }

    #[must_use]
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(Some(session_id.into()));
        self
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(Some(url.into()));
        self
    }
}

/// Panel map for one scope.
///
/// Methods returning `bool` report whether the target panel existed; an
/// unknown id leaves the registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelRegistry {
    panels: BTreeMap<PanelId, PanelState>,
}

impl PanelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id and build a default panel. Does not insert it.
    #[must_use]
    pub fn create_default(ids: &mut IdAllocator, panel_type: PanelType) -> PanelState {
        PanelState::new(ids.panel(), panel_type)
    }

    /// Insert or replace a panel, keyed by its id.
    pub fn insert(&mut self, panel: PanelState) {
        self.panels.insert(panel.id, panel);
    }

    pub fn remove(&mut self, id: PanelId) -> Option<PanelState> {
        self.panels.remove(&id)
    }

    #[must_use]
    pub fn get(&self, id: PanelId) -> Option<&PanelState> {
        self.panels.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: PanelId) -> bool {
        self.panels.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.panels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Panels in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PanelState> {
        self.panels.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = PanelId> + '_ {
        self.panels.keys().copied()
    }

    /// Merge `patch` into panel `id`.
    pub fn update(&mut self, id: PanelId, patch: &PanelPatch) -> bool {
        let Some(panel) = self.panels.get_mut(&id) else {
            return false;
        };
        if let Some(running) = patch.has_running_process {
            panel.has_running_process = running;
        }
        panel.content.apply(patch);
        true
    }

    /// Switch panel `id` to `panel_type`.
    ///
    /// Always resets the payload, even when the type is unchanged, and marks
    /// the panel idle: a process owned by the old content is orphaned and left
    /// to the process manager to tear down.
    pub fn change_type(&mut self, id: PanelId, panel_type: PanelType) -> bool {
        let Some(panel) = self.panels.get_mut(&id) else {
            return false;
        };
        panel.content = PanelContent::empty_for(panel_type);
        panel.has_running_process = false;
        true
    }

    /// Focus panel `id` and unfocus every other panel in one step.
    pub fn focus(&mut self, id: PanelId) -> bool {
        if !self.panels.contains_key(&id) {
            return false;
        }
        for panel in self.panels.values_mut() {
            panel.is_focused = panel.id == id;
        }
        true
    }

    pub fn clear_focus(&mut self) {
        for panel in self.panels.values_mut() {
            panel.is_focused = false;
        }
    }

    /// First focused panel in id order.
    #[must_use]
    pub fn focused(&self) -> Option<PanelId> {
        self.panels.values().find(|p| p.is_focused).map(|p| p.id)
    }

    pub fn set_process_running(&mut self, id: PanelId, running: bool) -> bool {
        let Some(panel) = self.panels.get_mut(&id) else {
            return false;
        };
        panel.has_running_process = running;
        true
    }

    pub fn strip_ephemeral(&mut self) {
        for panel in self.panels.values_mut() {
            panel.strip_ephemeral();
        }
    }
}

impl FromIterator<PanelState> for PanelRegistry {
    fn from_iter<I: IntoIterator<Item = PanelState>>(iter: I) -> Self {
        Self {
            panels: iter.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}
