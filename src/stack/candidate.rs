//! Technology candidates and the fixed ranking rules.
//!
//! Ranking is an explicit comparator over a closed priority table, not
//! dynamic dispatch: source tier first, then signal specificity, then
//! first-encountered order (sort stability provides the tie-break).

use crate::stack::technology_id::{TechKind, TechnologyId};
use crate::stack::versions::VersionConstraint;
use serde::Serialize;

/// Where a candidate's evidence came from. Declaration order is priority
/// order, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Caller override (`--force-type`); beats everything.
    ForcedType,
    /// An explicit signature file for the technology (manifest, framework
    /// config file with a fixed name).
    SignatureFile,
    /// Environment-variable or env-file hint (connection string, image tag).
    EnvHint,
    /// A named dependency inside a parsed manifest.
    ManifestEntry,
    /// A bare filename convention (app.py, *.ipynb, lockfile presence).
    FilenameHeuristic,
}

impl SignalSource {
    pub fn priority(self) -> u8 {
        match self {
            SignalSource::ForcedType => 4,
            SignalSource::SignatureFile => 3,
            SignalSource::EnvHint => 2,
            SignalSource::ManifestEntry => 1,
            SignalSource::FilenameHeuristic => 0,
        }
    }
}

/// One piece of evidence that a technology is in use.
#[derive(Debug, Clone)]
pub struct TechnologyCandidate {
    pub id: TechnologyId,
    pub source: SignalSource,
    /// Specificity within the same source tier, 0.0..=1.0. A manifest naming
    /// an exact dependency is more specific than a glob-style match.
    pub specificity: f32,
    /// The signal path or variable name that produced this candidate.
    pub origin: String,
    /// Version constraint carried by the evidence, when the source had one.
    pub version_req: Option<VersionConstraint>,
}

impl TechnologyCandidate {
    pub fn new(id: TechnologyId, source: SignalSource, specificity: f32, origin: &str) -> Self {
        Self {
            id,
            source,
            specificity,
            origin: origin.to_string(),
            version_req: None,
        }
    }

    pub fn with_version(mut self, req: VersionConstraint) -> Self {
        self.version_req = Some(req);
        self
    }

    pub fn kind(&self) -> TechKind {
        self.id.kind()
    }

    /// Comparator key: higher ranks first under a stable sort.
    fn rank_key(&self) -> (u8, f32) {
        (self.source.priority(), self.specificity)
    }

    pub fn outranks(&self, other: &Self) -> bool {
        let (sp, ss) = self.rank_key();
        let (op, os) = other.rank_key();
        sp > op || (sp == op && ss > os)
    }
}

/// Stable-sort candidates by the priority table; equal-ranked candidates keep
/// their first-encountered order.
pub fn rank(candidates: &mut [TechnologyCandidate]) {
    candidates.sort_by(|a, b| {
        let (ap, asp) = a.rank_key();
        let (bp, bsp) = b.rank_key();
        bp.cmp(&ap)
            .then(bsp.partial_cmp(&asp).unwrap_or(std::cmp::Ordering::Equal))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        forced_beats_signature = { SignalSource::ForcedType, SignalSource::SignatureFile },
        signature_beats_env = { SignalSource::SignatureFile, SignalSource::EnvHint },
        env_beats_manifest = { SignalSource::EnvHint, SignalSource::ManifestEntry },
        manifest_beats_filename = { SignalSource::ManifestEntry, SignalSource::FilenameHeuristic },
    )]
    fn priority_table(stronger: SignalSource, weaker: SignalSource) {
        assert!(stronger.priority() > weaker.priority());
    }

    #[test]
    fn test_specificity_breaks_ties_within_tier() {
        let strong = TechnologyCandidate::new(
            TechnologyId::Python,
            SignalSource::SignatureFile,
            0.9,
            "pyproject.toml",
        );
        let weak = TechnologyCandidate::new(
            TechnologyId::Node,
            SignalSource::SignatureFile,
            0.5,
            "tsconfig.json",
        );
        assert!(strong.outranks(&weak));
        assert!(!weak.outranks(&strong));
    }

    #[test]
    fn test_rank_is_stable_for_equal_candidates() {
        let mut candidates = vec![
            TechnologyCandidate::new(
                TechnologyId::Postgres,
                SignalSource::ManifestEntry,
                0.8,
                "requirements.txt",
            ),
            TechnologyCandidate::new(
                TechnologyId::Redis,
                SignalSource::ManifestEntry,
                0.8,
                "requirements.txt",
            ),
        ];
        rank(&mut candidates);
        // Equal rank: first-encountered order preserved.
        assert_eq!(candidates[0].id, TechnologyId::Postgres);
        assert_eq!(candidates[1].id, TechnologyId::Redis);
    }

    #[test]
    fn test_rank_orders_by_tier_first() {
        let mut candidates = vec![
            TechnologyCandidate::new(
                TechnologyId::Node,
                SignalSource::FilenameHeuristic,
                1.0,
                "yarn.lock",
            ),
            TechnologyCandidate::new(
                TechnologyId::Python,
                SignalSource::SignatureFile,
                0.2,
                "setup.py",
            ),
        ];
        rank(&mut candidates);
        assert_eq!(candidates[0].id, TechnologyId::Python);
    }
}
