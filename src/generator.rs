//! The end-to-end generation pipeline.
//!
//! One [`GenerateRequest`] in, one [`GenerationReport`] out. Every stage reads
//! the same scan snapshot, so a run is a pure function of the snapshot, the
//! process environment, and the request; two runs over an unchanged tree
//! produce byte-identical documents.

use crate::compose::{BakeGenerator, ComposeOptions, Composer};
use crate::error::{GeneratorError, Warning};
use crate::scan::{ScanConfig, Scanner};
use crate::stack::{
    Classifier, DependencyAnalyzer, EnvironmentInspector, ResolvedStack, SignalSource,
    TechnologyId, VersionPrecedence, VersionResolver,
};
use crate::templates::TemplateRegistry;
use std::path::PathBuf;
use tracing::{debug, info};

/// Everything a generation run needs, assembled by the CLI layer.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub root: PathBuf,
    /// Overrides automatic language selection.
    pub force_type: Option<TechnologyId>,
    /// Force-added technologies that detection would not have picked.
    pub include: Vec<TechnologyId>,
    /// Extra env file to inspect alongside the ones found in the tree.
    pub env_file: Option<PathBuf>,
    pub options: ComposeOptions,
    /// Emit a bake document alongside the compose document.
    pub bake: bool,
    pub version_precedence: VersionPrecedence,
    pub scan_config: ScanConfig,
}

impl GenerateRequest {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            force_type: None,
            include: Vec::new(),
            env_file: None,
            options: ComposeOptions::default(),
            bake: true,
            version_precedence: VersionPrecedence::default(),
            scan_config: ScanConfig::default(),
        }
    }
}

/// The full result of one run.
#[derive(Debug)]
pub struct GenerationReport {
    /// Rendered compose document.
    pub compose: String,
    /// Rendered bake document; `None` when disabled or nothing is buildable.
    pub bake: Option<String>,
    pub stack: ResolvedStack,
    pub warnings: Vec<Warning>,
}

pub struct Generator {
    registry: TemplateRegistry,
}

impl Generator {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { registry }
    }

    pub fn with_defaults() -> Self {
        Self::new(TemplateRegistry::with_defaults())
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn generate(&self, request: &GenerateRequest) -> Result<GenerationReport, GeneratorError> {
        info!(root = %request.root.display(), "scanning project");
        let snapshot = Scanner::new(request.root.clone())?
            .with_config(request.scan_config.clone())
            .scan(request.env_file.as_deref())?;
        let mut warnings = snapshot.warnings.clone();
        debug!(signals = snapshot.signals.len(), "scan complete");

        let mut candidates = Classifier::classify(&snapshot);
        let deps = DependencyAnalyzer::analyze(&snapshot);
        warnings.extend(deps.warnings.iter().cloned());

        // An unparseable manifest is not trustworthy evidence; its signature
        // candidate is withdrawn so a valid manifest elsewhere wins instead.
        let failed_manifests: std::collections::HashSet<&str> = deps
            .warnings
            .iter()
            .filter_map(|w| match w {
                Warning::Parse { path, .. } => Some(path.as_str()),
                _ => None,
            })
            .collect();
        if !failed_manifests.is_empty() {
            candidates.retain(|c| {
                c.source != SignalSource::SignatureFile
                    || !failed_manifests.contains(c.origin.as_str())
            });
        }
        candidates.extend(deps.candidates);

        let env = EnvironmentInspector::inspect(&snapshot);
        warnings.extend(env.warnings.iter().cloned());
        candidates.extend(env.candidates.iter().cloned());

        let ranked = Classifier::rank_all(candidates, request.force_type.as_ref(), &request.include);

        let resolver = VersionResolver::new(request.version_precedence);
        let stack = ResolvedStack::resolve(&ranked, &env, &resolver, deps.gpu_hint, &mut warnings);
        info!(technologies = stack.entries.len(), "stack resolved");

        let document =
            Composer::new(&self.registry, request.options.clone()).compose(&stack)?;
        let compose = document.to_yaml()?;
        let bake = if request.bake {
            BakeGenerator::generate(&document, request.options.platform)
        } else {
            None
        };

        Ok(GenerationReport {
            compose,
            bake,
            stack,
            warnings,
        })
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::with_defaults()
    }
}
