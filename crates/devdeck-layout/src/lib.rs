#![forbid(unsafe_code)]

//! Panel layout engine for the devdeck workspace shell.
//!
//! A workspace is a full binary tree of splits whose leaves each show one
//! panel (terminal, file browser, chat, preview, ...). Layouts are kept per
//! [`ScopeKey`] (a project, or a session inside a project) by the
//! [`LayoutStore`], created lazily from a [`LayoutTemplate`] and written
//! through to a [`StorageBackend`] after every successful mutation.
//!
//! ```
//! use devdeck_layout::{LayoutStore, PanelType, ScopeKey};
//!
//! let mut store = LayoutStore::new();
//! let scope = ScopeKey::session("my-project", "session-1");
//!
//! let state = store.apply_template(&scope, "split-h");
//! let root = state.layout().id();
//! let viewer = state.layout().leaf_panel_ids()[1];
//!
//! let state = store.set_split_ratio(&scope, root, 1.5);
//! assert_eq!(state.layout().split_ratio().map(|r| r.get()), Some(0.9));
//!
//! let state = store.change_panel_type(&scope, viewer, PanelType::Terminal);
//! assert_eq!(state.panel(viewer).map(|p| p.panel_type()), Some(PanelType::Terminal));
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod panel_type;
pub mod persistence;
pub mod registry;
pub mod scope;
pub mod state;
pub mod storage;
pub mod store;
pub mod template;
pub mod tree;

pub use config::LayoutConfig;
pub use error::{ConfigError, PersistenceError, StorageError, TemplateError};
pub use id::{IdAllocator, IdRangeError, MAX_RAW_ID, NodeId, PanelId};
pub use panel_type::{
    BuiltinPanelTypes, PanelType, PanelTypeInfo, PanelTypeParseError, PanelTypeRegistry,
};
pub use persistence::{
    DEFAULT_KEY_PREFIX, LAYOUT_SCHEMA_VERSION, LayoutPersistence, PersistedLayout,
};
pub use registry::{PanelContent, PanelPatch, PanelRegistry, PanelState};
pub use scope::{ScopeKey, ScopeKeyParseError};
pub use state::{InvariantCode, InvariantIssue, InvariantReport, InvariantSeverity, PanelLayoutState};
pub use storage::{FileStorage, MemoryStorage, StorageBackend, StorageResult};
pub use store::LayoutStore;
pub use template::{DEFAULT_TEMPLATE_ID, LayoutTemplate, TemplateCatalog, TemplateShape};
pub use tree::{
    DEFAULT_SPLIT_RATIO, LayoutNode, MAX_SPLIT_RATIO, MIN_SPLIT_RATIO, NodePatch, Orientation,
    Placement, SplitRatio,
};
