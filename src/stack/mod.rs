//! Technology detection: candidates, ranking, and version resolution.

pub mod candidate;
pub mod classifier;
pub mod dependencies;
pub mod environment;
pub mod resolved;
pub mod technology_id;
pub mod versions;

pub use candidate::{SignalSource, TechnologyCandidate};
pub use classifier::{Classifier, RankedCandidates};
pub use dependencies::{DependencyAnalyzer, DependencyReport};
pub use environment::{EnvReport, EnvironmentInspector};
pub use resolved::{ResolvedEntry, ResolvedStack};
pub use technology_id::{TechKind, TechnologyId};
pub use versions::{VersionConstraint, VersionPrecedence, VersionResolver};
