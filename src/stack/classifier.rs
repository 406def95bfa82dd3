//! Signal classification and candidate ranking.
//!
//! Maps scanned signals onto technology candidates via a fixed signature
//! table, then folds every evidence source (signatures, manifest entries,
//! env hints, forced overrides) into one ranked, deduplicated selection.

use crate::scan::{ProjectSignal, ScanSnapshot, SignalRole};
use crate::stack::candidate::{rank, SignalSource, TechnologyCandidate};
use crate::stack::technology_id::{TechKind, TechnologyId};
use crate::stack::versions::VersionConstraint;
use tracing::debug;

/// Signature files and filename heuristics, strongest first within a file.
/// One filename may map to multiple technologies over time; first match wins.
fn signature_for(file_name: &str) -> Option<(TechnologyId, SignalSource, f32)> {
    use SignalSource::*;
    use TechnologyId::*;
    let sig = match file_name {
        "package.json" => (Node, SignatureFile, 0.9),
        "requirements.txt" => (Python, SignatureFile, 0.9),
        "pyproject.toml" => (Python, SignatureFile, 0.9),
        "setup.py" => (Python, SignatureFile, 0.8),
        "pom.xml" | "build.gradle" | "build.gradle.kts" => (Spring, SignatureFile, 0.85),
        "composer.json" => (Php, SignatureFile, 0.9),
        "go.mod" => (Go, SignatureFile, 0.9),
        "CMakeLists.txt" => (Cpp, SignatureFile, 0.8),
        "Gemfile" => (Ruby, SignatureFile, 0.9),
        "Cargo.toml" => (Rust, SignatureFile, 0.9),
        "build.sbt" => (Scala, SignatureFile, 0.9),
        "mix.exs" => (Elixir, SignatureFile, 0.9),
        "artisan" => (Laravel, SignatureFile, 0.85),
        "manage.py" => (Django, SignatureFile, 0.85),
        "wsgi.py" | "asgi.py" => (Django, SignatureFile, 0.7),
        "angular.json" => (Angular, SignatureFile, 0.85),
        "vue.config.js" => (Vue, SignatureFile, 0.85),
        "next.config.js" => (React, SignatureFile, 0.85),
        "gatsby-config.js" => (React, SignatureFile, 0.8),
        "app.py" => (Flask, FilenameHeuristic, 0.5),
        "main.rs" => (Rust, FilenameHeuristic, 0.4),
        "tsconfig.json" => (Node, FilenameHeuristic, 0.5),
        "package-lock.json" | "yarn.lock" | "pnpm-lock.yaml" => (Node, FilenameHeuristic, 0.6),
        "poetry.lock" => (Python, FilenameHeuristic, 0.6),
        "Cargo.lock" => (Rust, FilenameHeuristic, 0.6),
        "composer.lock" => (Php, FilenameHeuristic, 0.6),
        "Gemfile.lock" => (Ruby, FilenameHeuristic, 0.6),
        _ => return None,
    };
    Some(sig)
}

/// Python import hints checked in snapshotted source files.
const IMPORT_HINTS: &[(&str, TechnologyId)] = &[
    ("flask", TechnologyId::Flask),
    ("django", TechnologyId::Django),
    ("fastapi", TechnologyId::FastApi),
];

/// The accepted, ranked selection across all evidence sources.
#[derive(Debug, Default)]
pub struct RankedCandidates {
    pub primary_language: Option<TechnologyCandidate>,
    pub frameworks: Vec<TechnologyCandidate>,
    pub databases: Vec<TechnologyCandidate>,
    pub tools: Vec<TechnologyCandidate>,
}

impl RankedCandidates {
    pub fn is_empty(&self) -> bool {
        self.primary_language.is_none()
            && self.frameworks.is_empty()
            && self.databases.is_empty()
            && self.tools.is_empty()
    }

    /// All accepted candidates in composition order: primary app first, then
    /// frameworks, databases, tools.
    pub fn iter(&self) -> impl Iterator<Item = &TechnologyCandidate> {
        self.primary_language
            .iter()
            .chain(self.frameworks.iter())
            .chain(self.databases.iter())
            .chain(self.tools.iter())
    }
}

pub struct Classifier;

impl Classifier {
    /// Produce signature-file and filename-heuristic candidates from the
    /// snapshot. Manifest-entry and env-hint candidates come from the
    /// dependency analyzer and environment inspector respectively.
    pub fn classify(snapshot: &ScanSnapshot) -> Vec<TechnologyCandidate> {
        let mut candidates = Vec::new();

        for signal in &snapshot.signals {
            let file_name = signal.file_name();
            if let Some((id, source, specificity)) = signature_for(file_name) {
                debug!(path = %signal.path, tech = %id, "signature match");
                candidates.push(TechnologyCandidate::new(id, source, specificity, &signal.path));
                continue;
            }
            match signal.role {
                SignalRole::VersionFile => {
                    if let Some(candidate) = version_file_candidate(signal) {
                        candidates.push(candidate);
                    }
                }
                SignalRole::ConfigFile => {
                    if file_name.ends_with(".ipynb") {
                        candidates.push(TechnologyCandidate::new(
                            TechnologyId::Jupyter,
                            SignalSource::FilenameHeuristic,
                            0.6,
                            &signal.path,
                        ));
                    } else if file_name.starts_with("nginx") && file_name.ends_with(".conf") {
                        candidates.push(TechnologyCandidate::new(
                            TechnologyId::Nginx,
                            SignalSource::FilenameHeuristic,
                            0.6,
                            &signal.path,
                        ));
                    } else if (file_name.starts_with("httpd") || file_name.starts_with("apache"))
                        && file_name.ends_with(".conf")
                    {
                        candidates.push(TechnologyCandidate::new(
                            TechnologyId::Apache,
                            SignalSource::FilenameHeuristic,
                            0.6,
                            &signal.path,
                        ));
                    }
                }
                SignalRole::SourceFile => {
                    if let Some(content) = &signal.content {
                        for (module, id) in IMPORT_HINTS {
                            if content.contains(&format!("import {}", module))
                                || content.contains(&format!("from {} ", module))
                            {
                                candidates.push(TechnologyCandidate::new(
                                    id.clone(),
                                    SignalSource::FilenameHeuristic,
                                    0.6,
                                    &signal.path,
                                ));
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        candidates
    }

    /// Fold all candidates into the final ranked selection.
    ///
    /// `forced` replaces automatic language selection outright; `includes`
    /// are force-added at override priority without suppressing anything.
    pub fn rank_all(
        mut candidates: Vec<TechnologyCandidate>,
        forced: Option<&TechnologyId>,
        includes: &[TechnologyId],
    ) -> RankedCandidates {
        for id in includes {
            candidates.push(TechnologyCandidate::new(
                id.clone(),
                SignalSource::ForcedType,
                0.9,
                "--include",
            ));
        }

        if let Some(forced_id) = forced {
            // The override suppresses conflicting language candidates: all of
            // them for a forced language, all but the base language for a
            // forced framework.
            let keep_language: Option<TechnologyId> = match forced_id.kind() {
                TechKind::Language => Some(forced_id.clone()),
                TechKind::Framework => forced_id.base_language(),
                _ => None,
            };
            if matches!(forced_id.kind(), TechKind::Language | TechKind::Framework) {
                candidates.retain(|c| {
                    c.kind() != TechKind::Language || Some(&c.id) == keep_language.as_ref()
                });
            }
            candidates.push(TechnologyCandidate::new(
                forced_id.clone(),
                SignalSource::ForcedType,
                1.0,
                "--force-type",
            ));
        }

        rank(&mut candidates);

        // Dedup keeping the highest-ranked occurrence; a duplicate may still
        // contribute the version constraint the winner lacks.
        let mut deduped: Vec<TechnologyCandidate> = Vec::new();
        for candidate in candidates {
            match deduped.iter_mut().find(|c| c.id == candidate.id) {
                Some(existing) => {
                    if existing.version_req.is_none() {
                        existing.version_req = candidate.version_req;
                    }
                }
                None => deduped.push(candidate),
            }
        }

        let mut selection = RankedCandidates::default();
        for candidate in deduped {
            match candidate.kind() {
                TechKind::Language => {
                    // At most one primary language; lower-ranked ones are
                    // dropped from the stack entirely.
                    if selection.primary_language.is_none() {
                        selection.primary_language = Some(candidate);
                    }
                }
                TechKind::Framework => selection.frameworks.push(candidate),
                TechKind::Database => selection.databases.push(candidate),
                TechKind::Tool => selection.tools.push(candidate),
            }
        }

        // FastAPI is a fallback guess from dependencies; a detected Flask or
        // Django app claims the Python service instead.
        let has_stronger_py_framework = selection
            .frameworks
            .iter()
            .any(|c| matches!(c.id, TechnologyId::Flask | TechnologyId::Django));
        if has_stronger_py_framework {
            selection.frameworks.retain(|c| {
                c.id != TechnologyId::FastApi || c.source == SignalSource::ForcedType
            });
        }

        selection
    }
}

fn version_file_candidate(signal: &ProjectSignal) -> Option<TechnologyCandidate> {
    let content = signal.content.as_deref()?.trim();
    let (id, version) = match signal.file_name() {
        ".nvmrc" => (TechnologyId::Node, content.trim_start_matches('v').to_string()),
        ".python-version" => (TechnologyId::Python, content.to_string()),
        ".ruby-version" => (TechnologyId::Ruby, content.to_string()),
        "runtime.txt" => (
            TechnologyId::Python,
            content.strip_prefix("python-")?.to_string(),
        ),
        _ => return None,
    };
    if version.is_empty() {
        return None;
    }
    Some(
        TechnologyCandidate::new(id, SignalSource::FilenameHeuristic, 0.5, &signal.path)
            .with_version(VersionConstraint::Exact(version)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn signal(path: &str, role: SignalRole, content: Option<&str>) -> ProjectSignal {
        ProjectSignal {
            path: path.to_string(),
            role,
            content: content.map(|c| c.to_string()),
        }
    }

    fn snapshot(signals: Vec<ProjectSignal>) -> ScanSnapshot {
        ScanSnapshot {
            root: PathBuf::from("."),
            signals,
            warnings: vec![],
        }
    }

    #[test]
    fn test_classify_signature_files() {
        let snap = snapshot(vec![
            signal("requirements.txt", SignalRole::Manifest, Some("flask==3.0.0")),
            signal("app.py", SignalRole::ConfigFile, None),
        ]);
        let candidates = Classifier::classify(&snap);

        assert!(candidates
            .iter()
            .any(|c| c.id == TechnologyId::Python && c.source == SignalSource::SignatureFile));
        assert!(candidates
            .iter()
            .any(|c| c.id == TechnologyId::Flask && c.source == SignalSource::FilenameHeuristic));
    }

    #[test]
    fn test_classify_import_hints() {
        let snap = snapshot(vec![signal(
            "server.py",
            SignalRole::SourceFile,
            Some("import fastapi\napp = fastapi.FastAPI()\n"),
        )]);
        let candidates = Classifier::classify(&snap);
        assert!(candidates.iter().any(|c| c.id == TechnologyId::FastApi));
    }

    #[test]
    fn test_classify_version_files_carry_constraint() {
        let snap = snapshot(vec![signal(".nvmrc", SignalRole::VersionFile, Some("v20\n"))]);
        let candidates = Classifier::classify(&snap);
        let node = candidates
            .iter()
            .find(|c| c.id == TechnologyId::Node)
            .unwrap();
        assert_eq!(
            node.version_req,
            Some(VersionConstraint::Exact("20".to_string()))
        );
    }

    #[test]
    fn test_rank_all_picks_single_primary_language() {
        let candidates = vec![
            TechnologyCandidate::new(
                TechnologyId::Node,
                SignalSource::SignatureFile,
                0.9,
                "package.json",
            ),
            TechnologyCandidate::new(
                TechnologyId::Python,
                SignalSource::FilenameHeuristic,
                0.6,
                "poetry.lock",
            ),
        ];
        let ranked = Classifier::rank_all(candidates, None, &[]);
        assert_eq!(
            ranked.primary_language.as_ref().map(|c| &c.id),
            Some(&TechnologyId::Node)
        );
    }

    #[test]
    fn test_forced_type_overrides_stronger_signals() {
        let candidates = vec![TechnologyCandidate::new(
            TechnologyId::Node,
            SignalSource::SignatureFile,
            0.9,
            "package.json",
        )];
        let ranked = Classifier::rank_all(candidates, Some(&TechnologyId::Python), &[]);
        assert_eq!(
            ranked.primary_language.as_ref().map(|c| &c.id),
            Some(&TechnologyId::Python)
        );
        // Conflicting language candidates are suppressed, not just outranked.
        assert!(ranked.iter().all(|c| c.id != TechnologyId::Node));
    }

    #[test]
    fn test_includes_are_added_as_candidates() {
        let ranked =
            Classifier::rank_all(vec![], None, &[TechnologyId::Postgres, TechnologyId::Nginx]);
        assert!(ranked.databases.iter().any(|c| c.id == TechnologyId::Postgres));
        assert!(ranked.tools.iter().any(|c| c.id == TechnologyId::Nginx));
    }

    #[test]
    fn test_flask_suppresses_fastapi_fallback() {
        let candidates = vec![
            TechnologyCandidate::new(
                TechnologyId::Flask,
                SignalSource::ManifestEntry,
                0.8,
                "requirements.txt",
            ),
            TechnologyCandidate::new(
                TechnologyId::FastApi,
                SignalSource::ManifestEntry,
                0.8,
                "requirements.txt",
            ),
        ];
        let ranked = Classifier::rank_all(candidates, None, &[]);
        assert!(ranked.frameworks.iter().any(|c| c.id == TechnologyId::Flask));
        assert!(ranked.frameworks.iter().all(|c| c.id != TechnologyId::FastApi));
    }

    #[test]
    fn test_dedup_merges_version_from_weaker_signal() {
        let candidates = vec![
            TechnologyCandidate::new(
                TechnologyId::Node,
                SignalSource::SignatureFile,
                0.9,
                "package.json",
            ),
            TechnologyCandidate::new(
                TechnologyId::Node,
                SignalSource::FilenameHeuristic,
                0.5,
                ".nvmrc",
            )
            .with_version(VersionConstraint::Exact("20".to_string())),
        ];
        let ranked = Classifier::rank_all(candidates, None, &[]);
        let primary = ranked.primary_language.unwrap();
        assert_eq!(primary.source, SignalSource::SignatureFile);
        assert_eq!(
            primary.version_req,
            Some(VersionConstraint::Exact("20".to_string()))
        );
    }
}
