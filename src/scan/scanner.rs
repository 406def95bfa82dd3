//! Single-pass project tree scanner.
//!
//! Walks the tree once within a bounded depth, classifies files worth keeping
//! by filename, and snapshots the content of everything later stages will
//! parse. No other stage reads the file system; unreadable subtrees are
//! recorded as warnings and skipped.

use crate::error::{GeneratorError, Warning};
use crate::scan::signal::{ProjectSignal, ScanSnapshot, SignalRole};
use ignore::{overrides::OverrideBuilder, WalkBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Directories that never contain detection-relevant signals.
const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "target",
    "dist",
    "build",
    "out",
    "__pycache__",
    ".venv",
    "venv",
    "vendor",
    ".idea",
    ".vscode",
    "coverage",
    ".next",
    ".cache",
    "obj",
];

const MANIFESTS: &[&str] = &[
    "requirements.txt",
    "setup.py",
    "pyproject.toml",
    "package.json",
    "composer.json",
    "go.mod",
    "Gemfile",
    "Cargo.toml",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "build.sbt",
    "mix.exs",
    "CMakeLists.txt",
];

const LOCKFILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "poetry.lock",
    "Cargo.lock",
    "composer.lock",
    "Gemfile.lock",
];

const ENV_FILES: &[&str] = &[
    ".env",
    ".env.local",
    ".env.development",
    ".env.example",
    "docker-compose.env",
];

const VERSION_FILES: &[&str] = &[".nvmrc", ".python-version", ".ruby-version", "runtime.txt"];

const CONFIG_FILES: &[&str] = &[
    "manage.py",
    "wsgi.py",
    "asgi.py",
    "app.py",
    "artisan",
    "angular.json",
    "vue.config.js",
    "next.config.js",
    "gatsby-config.js",
    "tsconfig.json",
    "main.rs",
];

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub max_depth: usize,
    pub max_files: usize,
    /// Per-file read cap in bytes; larger files are truncated for parsing.
    pub max_file_size: usize,
    /// How many plain source files to snapshot for import-level hints.
    pub max_source_files: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_files: 2000,
            max_file_size: 256 * 1024,
            max_source_files: 10,
        }
    }
}

#[derive(Debug)]
pub struct Scanner {
    root: PathBuf,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(root: PathBuf) -> Result<Self, GeneratorError> {
        if !root.is_dir() {
            return Err(GeneratorError::RootNotFound(root));
        }
        let root = root.canonicalize().map_err(|_| {
            GeneratorError::RootNotFound(root.clone())
        })?;
        Ok(Self {
            root,
            config: ScanConfig::default(),
        })
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree once and produce the signal snapshot. An optional
    /// caller-supplied env file (possibly outside the root) is snapshotted
    /// here too so later stages stay off the file system.
    pub fn scan(&self, extra_env_file: Option<&Path>) -> Result<ScanSnapshot, GeneratorError> {
        let start = Instant::now();
        let mut signals = Vec::new();
        let mut warnings = Vec::new();
        let mut seen_paths = HashSet::new();
        let mut files_scanned = 0usize;
        let mut source_files = 0usize;

        let mut override_builder = OverrideBuilder::new(&self.root);
        for excluded in EXCLUDED_DIRS {
            override_builder.add(&format!("!{}/", excluded)).ok();
        }
        let overrides = override_builder
            .build()
            .unwrap_or_else(|_| OverrideBuilder::new(&self.root).build().unwrap());

        for result in WalkBuilder::new(&self.root)
            .max_depth(Some(self.config.max_depth))
            .hidden(false)
            .git_ignore(true)
            .overrides(overrides)
            .build()
        {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    let path = self.walk_error_path(&err);
                    warn!(error = %err, %path, "failed to read directory entry, skipping");
                    warnings.push(Warning::SkippedSubtree {
                        path,
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || self.is_excluded(path) {
                continue;
            }

            if files_scanned >= self.config.max_files {
                warn!(
                    files_scanned,
                    max_files = self.config.max_files,
                    "reached file limit, stopping scan"
                );
                break;
            }
            files_scanned += 1;

            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(role) = classify(file_name) else {
                continue;
            };
            if role == SignalRole::SourceFile {
                if source_files >= self.config.max_source_files {
                    continue;
                }
                source_files += 1;
            }

            let rel_path = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            if !seen_paths.insert(rel_path.clone()) {
                continue;
            }

            let content = if wants_content(role) {
                self.read_capped(path, &rel_path, &mut warnings)
            } else {
                None
            };

            debug!(path = %rel_path, role = ?role, "collected signal");
            signals.push(ProjectSignal {
                path: rel_path,
                role,
                content,
            });
        }

        if let Some(env_path) = extra_env_file {
            let rel_path = env_path.to_string_lossy().replace('\\', "/");
            if seen_paths.insert(rel_path.clone()) {
                let content = self.read_capped(env_path, &rel_path, &mut warnings);
                signals.push(ProjectSignal {
                    path: rel_path,
                    role: SignalRole::EnvFile,
                    content,
                });
            }
        }

        info!(
            signals = signals.len(),
            files_scanned,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "scan completed"
        );

        Ok(ScanSnapshot {
            root: self.root.clone(),
            signals,
            warnings,
        })
    }

    fn read_capped(
        &self,
        path: &Path,
        rel_path: &str,
        warnings: &mut Vec<Warning>,
    ) -> Option<String> {
        match std::fs::read(path) {
            Ok(mut bytes) => {
                if bytes.len() > self.config.max_file_size {
                    bytes.truncate(self.config.max_file_size);
                }
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(err) => {
                warn!(path = %rel_path, error = %err, "unreadable file, skipping");
                warnings.push(Warning::SkippedSubtree {
                    path: rel_path.to_string(),
                    message: err.to_string(),
                });
                None
            }
        }
    }

    /// The failing subtree a walk error refers to, falling back to the root
    /// when the error carries no path.
    fn walk_error_path(&self, err: &ignore::Error) -> String {
        match err {
            ignore::Error::WithPath { path, .. } => path.display().to_string(),
            _ => self.root.display().to_string(),
        }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        path.strip_prefix(&self.root)
            .map(|rel| {
                rel.components().any(|c| {
                    c.as_os_str()
                        .to_str()
                        .map(|name| EXCLUDED_DIRS.contains(&name))
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }
}

/// Filename classification. Returns `None` for files with no detection value.
fn classify(file_name: &str) -> Option<SignalRole> {
    if MANIFESTS.contains(&file_name) || file_name.ends_with(".csproj") {
        return Some(SignalRole::Manifest);
    }
    if LOCKFILES.contains(&file_name) {
        return Some(SignalRole::Lockfile);
    }
    if ENV_FILES.contains(&file_name) {
        return Some(SignalRole::EnvFile);
    }
    if VERSION_FILES.contains(&file_name) {
        return Some(SignalRole::VersionFile);
    }
    if CONFIG_FILES.contains(&file_name)
        || file_name.ends_with(".ipynb")
        || (file_name.starts_with("nginx") && file_name.ends_with(".conf"))
        || (file_name.starts_with("httpd") && file_name.ends_with(".conf"))
        || (file_name.starts_with("apache") && file_name.ends_with(".conf"))
    {
        return Some(SignalRole::ConfigFile);
    }
    if file_name.ends_with(".py") {
        return Some(SignalRole::SourceFile);
    }
    None
}

/// Whether the role requires the snapshotted content for later parsing.
fn wants_content(role: SignalRole) -> bool {
    matches!(
        role,
        SignalRole::Manifest
            | SignalRole::EnvFile
            | SignalRole::VersionFile
            | SignalRole::SourceFile
    )
}
