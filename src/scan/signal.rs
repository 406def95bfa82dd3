//! Observed project facts, produced once by the scanner and immutable after.

use serde::Serialize;
use std::path::PathBuf;

/// The role a file plays in detection. Classified from the filename alone so
/// later stages never have to touch the file system again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalRole {
    /// Dependency manifest (package.json, requirements.txt, pom.xml, ...).
    Manifest,
    /// Lockfile; presence corroborates an ecosystem without being parsed.
    Lockfile,
    /// Environment file with KEY=VALUE lines.
    EnvFile,
    /// Single-purpose version pin (.nvmrc, .python-version, runtime.txt, ...).
    VersionFile,
    /// Framework or tool config file (manage.py, angular.json, nginx.conf, ...).
    ConfigFile,
    /// Plain source file kept for import-level hints.
    SourceFile,
}

/// One observed fact about the project tree: a file path, its role, and the
/// snapshotted content when the role warrants reading it.
#[derive(Debug, Clone)]
pub struct ProjectSignal {
    /// Path relative to the scanned root, with `/` separators.
    pub path: String,
    pub role: SignalRole,
    /// Snapshotted file content, capped at the scanner's size limit.
    /// `None` for roles where presence alone is the signal.
    pub content: Option<String>,
}

impl ProjectSignal {
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Depth below the root; root-level files are depth 0.
    pub fn depth(&self) -> usize {
        self.path.matches('/').count()
    }
}

/// The complete, deduplicated result of one scan. Owns the only copy of every
/// signal; later stages borrow from it and never re-read the tree.
#[derive(Debug)]
pub struct ScanSnapshot {
    pub root: PathBuf,
    pub signals: Vec<ProjectSignal>,
    pub warnings: Vec<crate::error::Warning>,
}

impl ScanSnapshot {
    /// Signals with a given role, in scan order.
    pub fn with_role(&self, role: SignalRole) -> impl Iterator<Item = &ProjectSignal> {
        self.signals.iter().filter(move |s| s.role == role)
    }

    /// First signal whose file name matches exactly.
    pub fn find(&self, file_name: &str) -> Option<&ProjectSignal> {
        self.signals.iter().find(|s| s.file_name() == file_name)
    }
}
