//! composegen - docker-compose and docker-bake generation from project detection
//!
//! This library scans a project tree, detects the technology stack (languages,
//! frameworks, databases, tools) from manifests, signature files, dependencies,
//! and environment variables, resolves concrete image versions, and assembles a
//! ready-to-run docker-compose document plus an optional docker-bake build
//! definition. Detection is fully deterministic: one scan snapshot feeds every
//! stage, and two runs over an unchanged tree produce byte-identical output.
//!
//! # Pipeline
//!
//! - [`scan`]: one bounded walk over the tree producing an immutable snapshot
//! - [`stack`]: candidate classification, ranking, and version resolution
//! - [`templates`]: the built-in service template registry
//! - [`compose`]: document assembly, conflict resolution, and bake emission
//! - [`generator`]: the end-to-end facade the CLI drives
//!
//! # Example Usage
//!
//! ```no_run
//! use composegen::generator::{GenerateRequest, Generator};
//!
//! fn generate(path: &str) -> Result<(), composegen::GeneratorError> {
//!     let request = GenerateRequest::new(path);
//!     let report = Generator::with_defaults().generate(&request)?;
//!     println!("{}", report.compose);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod compose;
pub mod error;
pub mod generator;
pub mod scan;
pub mod stack;
pub mod templates;

pub use compose::{BakeGenerator, ComposeDocument, ComposeOptions, Composer, Platform};
pub use error::{GeneratorError, Warning};
pub use generator::{GenerateRequest, GenerationReport, Generator};
pub use scan::{ScanConfig, Scanner};
pub use stack::{ResolvedStack, TechKind, TechnologyId, VersionPrecedence};
pub use templates::TemplateRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_composegen() {
        assert_eq!(NAME, "composegen");
    }
}
