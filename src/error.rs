//! Error taxonomy for the generation engine.
//!
//! Fatal errors abort generation before any output is written. Everything else
//! is a [`Warning`]: recorded, surfaced alongside the primary output, and never
//! mixed into the generated documents themselves.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. Any of these means no compose or bake document is produced.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The project root does not exist or is not a directory.
    #[error("project root not found or not a directory: {0}")]
    RootNotFound(PathBuf),

    /// A forced type or accepted candidate names a technology the template
    /// registry does not know. Composition cannot proceed without a template.
    #[error("no service template registered for technology '{0}'")]
    TemplateNotFound(String),

    /// A post-merge invariant check failed. This indicates an engine defect,
    /// not bad input.
    #[error("composed document failed validation: {0}")]
    Composition(String),

    /// The validated document could not be serialized to YAML.
    #[error("failed to serialize compose document: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Non-fatal conditions recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A manifest or env file could not be parsed and was treated as empty.
    Parse { path: String, message: String },

    /// A subtree could not be read; it was skipped and scanning continued.
    SkippedSubtree { path: String, message: String },

    /// An optional tool candidate had no resolvable version and no default.
    DroppedTool { name: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Parse { path, message } => {
                write!(f, "failed to parse {}: {} (treated as empty)", path, message)
            }
            Warning::SkippedSubtree { path, message } => {
                write!(f, "skipped unreadable subtree {}: {}", path, message)
            }
            Warning::DroppedTool { name } => {
                write!(f, "dropped optional tool '{}' (no version, no default)", name)
            }
        }
    }
}
