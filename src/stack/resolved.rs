//! The final detected stack: accepted technologies with concrete versions.

use crate::error::Warning;
use crate::stack::classifier::RankedCandidates;
use crate::stack::environment::EnvReport;
use crate::stack::technology_id::{TechKind, TechnologyId};
use crate::stack::versions::VersionResolver;
use serde::Serialize;
use tracing::info;

/// One accepted technology with its resolved image tag.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedEntry {
    pub id: TechnologyId,
    pub kind: TechKind,
    pub version: String,
    /// The signal that produced the winning candidate.
    pub origin: String,
}

/// The accepted stack in composition order: primary app first, then
/// frameworks, databases, tools.
#[derive(Debug, Default, Serialize)]
pub struct ResolvedStack {
    pub entries: Vec<ResolvedEntry>,
    pub needs_gpu: bool,
}

impl ResolvedStack {
    /// Attach concrete versions to every ranked candidate. Tools that resolve
    /// to no version are dropped with a warning, unless the caller explicitly
    /// asked for them, in which case the failure surfaces later as a missing
    /// template instead of a silent drop.
    pub fn resolve(
        ranked: &RankedCandidates,
        env: &EnvReport,
        resolver: &VersionResolver,
        gpu_hint: bool,
        warnings: &mut Vec<Warning>,
    ) -> Self {
        let mut stack = ResolvedStack {
            needs_gpu: gpu_hint,
            ..Default::default()
        };

        for candidate in ranked.iter() {
            let env_override = env.overrides.get(&candidate.id).map(String::as_str);
            match resolver.resolve(&candidate.id, env_override, candidate.version_req.as_ref()) {
                Some(version) => {
                    info!(tech = %candidate.id, %version, origin = %candidate.origin, "accepted");
                    stack.entries.push(ResolvedEntry {
                        id: candidate.id.clone(),
                        kind: candidate.kind(),
                        version,
                        origin: candidate.origin.clone(),
                    });
                }
                None if candidate.source == crate::stack::candidate::SignalSource::ForcedType => {
                    // Keep the entry with a placeholder tag so the template
                    // lookup can reject it loudly with the caller's own name.
                    stack.entries.push(ResolvedEntry {
                        id: candidate.id.clone(),
                        kind: candidate.kind(),
                        version: "latest".to_string(),
                        origin: candidate.origin.clone(),
                    });
                }
                None => {
                    warnings.push(Warning::DroppedTool {
                        name: candidate.id.name().to_string(),
                    });
                }
            }
        }

        stack
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry the compose document treats as the primary application.
    pub fn primary(&self) -> Option<&ResolvedEntry> {
        self.entries.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::candidate::{SignalSource, TechnologyCandidate};
    use crate::stack::classifier::Classifier;

    fn ranked(candidates: Vec<TechnologyCandidate>) -> RankedCandidates {
        Classifier::rank_all(candidates, None, &[])
    }

    #[test]
    fn test_primary_is_first_entry() {
        let ranked = ranked(vec![
            TechnologyCandidate::new(
                TechnologyId::Python,
                SignalSource::SignatureFile,
                0.9,
                "requirements.txt",
            ),
            TechnologyCandidate::new(
                TechnologyId::Redis,
                SignalSource::ManifestEntry,
                0.8,
                "requirements.txt",
            ),
        ]);
        let mut warnings = Vec::new();
        let stack = ResolvedStack::resolve(
            &ranked,
            &EnvReport::default(),
            &VersionResolver::default(),
            false,
            &mut warnings,
        );
        assert_eq!(stack.primary().unwrap().id, TechnologyId::Python);
        assert_eq!(stack.entries.len(), 2);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_tool_dropped_with_warning() {
        let ranked = ranked(vec![
            TechnologyCandidate::new(
                TechnologyId::Python,
                SignalSource::SignatureFile,
                0.9,
                "requirements.txt",
            ),
            TechnologyCandidate::new(
                TechnologyId::Custom("mystery".to_string()),
                SignalSource::FilenameHeuristic,
                0.3,
                "mystery.conf",
            ),
        ]);
        let mut warnings = Vec::new();
        let stack = ResolvedStack::resolve(
            &ranked,
            &EnvReport::default(),
            &VersionResolver::default(),
            false,
            &mut warnings,
        );
        assert_eq!(stack.entries.len(), 1);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, Warning::DroppedTool { name } if name == "mystery")));
    }

    #[test]
    fn test_forced_unknown_survives_to_template_lookup() {
        let ranked = ranked(vec![TechnologyCandidate::new(
            TechnologyId::Custom("fortran".to_string()),
            SignalSource::ForcedType,
            1.0,
            "--force-type",
        )]);
        let mut warnings = Vec::new();
        let stack = ResolvedStack::resolve(
            &ranked,
            &EnvReport::default(),
            &VersionResolver::default(),
            false,
            &mut warnings,
        );
        assert_eq!(stack.entries.len(), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_env_override_applied() {
        let ranked = ranked(vec![
            TechnologyCandidate::new(
                TechnologyId::Node,
                SignalSource::SignatureFile,
                0.9,
                "package.json",
            ),
            TechnologyCandidate::new(
                TechnologyId::Postgres,
                SignalSource::EnvHint,
                0.7,
                ".env:DATABASE_URL",
            ),
        ]);
        let mut env = EnvReport::default();
        env.overrides
            .insert(TechnologyId::Postgres, "15-alpine".to_string());

        let mut warnings = Vec::new();
        let stack = ResolvedStack::resolve(
            &ranked,
            &env,
            &VersionResolver::default(),
            false,
            &mut warnings,
        );
        let pg = stack
            .entries
            .iter()
            .find(|e| e.id == TechnologyId::Postgres)
            .unwrap();
        assert_eq!(pg.version, "15-alpine");
    }
}
