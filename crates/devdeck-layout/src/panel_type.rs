//! Panel content types and their static capability table.
//!
//! The engine only consults [`PanelTypeInfo`] to decide whether closing or
//! retyping a panel deserves a confirmation prompt. Display metadata is carried
//! for the UI layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of content a panel hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanelType {
    Terminal,
    FileBrowser,
    FileViewer,
    Chat,
    BrowserPreview,
    MarkdownViewer,
    Empty,
}

impl PanelType {
    pub const ALL: [Self; 7] = [
        Self::Terminal,
        Self::FileBrowser,
        Self::FileViewer,
        Self::Chat,
        Self::BrowserPreview,
        Self::MarkdownViewer,
        Self::Empty,
    ];

    /// Wire name, as used in persisted documents and config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::FileBrowser => "file-browser",
            Self::FileViewer => "file-viewer",
            Self::Chat => "chat",
            Self::BrowserPreview => "browser-preview",
            Self::MarkdownViewer => "markdown-viewer",
            Self::Empty => "empty",
        }
    }
}

impl fmt::Display for PanelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized panel type name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown panel type `{0}`")]
pub struct PanelTypeParseError(pub String);

impl FromStr for PanelType {
    type Err = PanelTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| PanelTypeParseError(s.to_owned()))
    }
}

/// Static metadata for one panel type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelTypeInfo {
    pub display_name: &'static str,
    pub icon: &'static str,
    pub default_title: &'static str,
    /// More than one panel of this type may coexist in a scope.
    pub can_have_multiple: bool,
    /// Closing or retyping while busy should be confirmed by the user.
    pub requires_close_protection: bool,
}

/// Lookup table from panel type to its metadata.
pub trait PanelTypeRegistry: Send + Sync {
    fn info(&self, panel_type: PanelType) -> PanelTypeInfo;
}

/// Stock metadata table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinPanelTypes;

impl PanelTypeRegistry for BuiltinPanelTypes {
    fn info(&self, panel_type: PanelType) -> PanelTypeInfo {
        match panel_type {
            PanelType::Terminal => PanelTypeInfo {
                display_name: "Terminal",
                icon: "terminal",
                default_title: "Terminal",
                can_have_multiple: true,
                requires_close_protection: true,
            },
            PanelType::FileBrowser => PanelTypeInfo {
                display_name: "File Browser",
                icon: "folder",
                default_title: "Files",
                can_have_multiple: true,
                requires_close_protection: false,
            },
            PanelType::FileViewer => PanelTypeInfo {
                display_name: "File Viewer",
                icon: "file-code",
                default_title: "Viewer",
                can_have_multiple: true,
                requires_close_protection: false,
            },
            PanelType::Chat => PanelTypeInfo {
                display_name: "Chat",
                icon: "message-square",
                default_title: "Output",
                can_have_multiple: false,
                requires_close_protection: true,
            },
            PanelType::BrowserPreview => PanelTypeInfo {
                display_name: "Browser Preview",
                icon: "globe",
                default_title: "Preview",
                can_have_multiple: true,
                requires_close_protection: false,
            },
            PanelType::MarkdownViewer => PanelTypeInfo {
                display_name: "Markdown",
                icon: "book-open",
                default_title: "Markdown",
                can_have_multiple: true,
                requires_close_protection: false,
            },
            PanelType::Empty => PanelTypeInfo {
                display_name: "Empty",
                icon: "square",
                default_title: "Empty",
                can_have_multiple: true,
                requires_close_protection: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for ty in PanelType::ALL {
            assert_eq!(ty.as_str().parse::<PanelType>(), Ok(ty));
            assert_eq!(ty.to_string(), ty.as_str());
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        for ty in PanelType::ALL {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "spreadsheet".parse::<PanelType>().unwrap_err();
        assert!(err.to_string().contains("spreadsheet"));
    }

    #[test]
    fn only_process_hosts_are_protected() {
        let table = BuiltinPanelTypes;
        let protected: Vec<_> = PanelType::ALL
            .into_iter()
            .filter(|ty| table.info(*ty).requires_close_protection)
            .collect();
        assert_eq!(protected, vec![PanelType::Terminal, PanelType::Chat]);
    }
}
