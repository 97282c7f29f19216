//! Error types.
//!
//! Referential misses (unknown panel or node ids) are not errors: the store
//! treats them as no-ops. What remains are template shape bugs, substrate
//! failures, undecodable persisted documents and bad configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Template definition bugs, surfaced when a catalog is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template `{template}` declares {expected} leaves but {found} panel ids were supplied")]
    LeafCountMismatch {
        template: String,
        expected: usize,
        found: usize,
    },
    #[error("template `{0}` is defined more than once")]
    DuplicateTemplate(String),
    #[error("template id must not be empty")]
    EmptyTemplateId,
}

/// Failures of the key-value substrate.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("storage file {path} is corrupted: {source}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage file {path} has unsupported version {found} (expected {expected})")]
    UnsupportedVersion {
        path: PathBuf,
        found: u64,
        expected: u64,
    },
    #[error("failed to serialize storage contents: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Failures while writing or reading a persisted layout document.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to encode layout for scope `{scope}`: {source}")]
    Encode {
        scope: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode layout for scope `{scope}`: {source}")]
    Decode {
        scope: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported layout schema version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },
    #[error("persisted layout violates invariants: {issue_count} issue(s), first: {first_issue}")]
    Invalid {
        issue_count: usize,
        first_issue: String,
    },
}

/// Failures while loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}
