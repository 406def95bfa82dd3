//! Assembles the compose document from resolved technologies and templates.
//!
//! The composer runs three phases in a fixed order. Collecting looks up a
//! template for every accepted technology and drops language services that a
//! detected framework already covers. Merging assigns final service names and
//! host ports, resolving conflicts deterministically. Finalizing unions the
//! named volumes and validates the document invariants.
//!
//! Option-driven blocks are applied per service in a fixed order: resource
//! limits, then platform, then watch rules, then the GPU reservation. The GPU
//! step augments the resource block the limits step may have created, so the
//! order is load-bearing.

use crate::compose::document::{
    BuildSpec, ComposeDocument, DeploySpec, DevelopSpec, DeviceReservation, ResourceLimits,
    ResourceReservations, ResourcesSpec, ServiceDefinition, WatchRuleSpec,
};
use crate::error::GeneratorError;
use crate::stack::{ResolvedEntry, ResolvedStack, TechKind};
use crate::templates::{ServiceTemplate, TemplateRegistry, WatchAction};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Target platform for emitted services and bake targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Amd64,
    Arm64,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Amd64 => "linux/amd64",
            Platform::Arm64 => "linux/arm64",
        }
    }

    /// The platform of the machine running the generator.
    pub fn host() -> Self {
        if cfg!(target_arch = "aarch64") {
            Platform::Arm64
        } else {
            Platform::Amd64
        }
    }
}

/// Output shaping flags, all orthogonal to detection.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub watch: bool,
    pub gpu: bool,
    pub resource_limits: bool,
    /// `Some` pins every service and bake target to one platform.
    pub platform: Option<Platform>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            watch: true,
            gpu: true,
            resource_limits: false,
            platform: None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Phase {
    Collecting,
    Merging,
    Finalizing,
    Done,
}

struct PendingService {
    entry: ResolvedEntry,
    template: ServiceTemplate,
}

pub struct Composer<'a> {
    registry: &'a TemplateRegistry,
    options: ComposeOptions,
    phase: Phase,
    pending: Vec<PendingService>,
    claimed_names: HashSet<String>,
    claimed_ports: BTreeSet<u16>,
}

impl<'a> Composer<'a> {
    pub fn new(registry: &'a TemplateRegistry, options: ComposeOptions) -> Self {
        Self {
            registry,
            options,
            phase: Phase::Collecting,
            pending: Vec::new(),
            claimed_names: HashSet::new(),
            claimed_ports: BTreeSet::new(),
        }
    }

    pub fn compose(mut self, stack: &ResolvedStack) -> Result<ComposeDocument, GeneratorError> {
        self.collect(stack)?;
        let mut document = self.merge(stack)?;
        self.finalize(&mut document)?;
        self.phase = Phase::Done;
        Ok(document)
    }

    /// Template lookup plus the framework-subsumes-language rule.
    fn collect(&mut self, stack: &ResolvedStack) -> Result<(), GeneratorError> {
        debug_assert_eq!(self.phase, Phase::Collecting);
        if stack.is_empty() {
            return Err(GeneratorError::Composition(
                "no technologies detected; nothing to compose".to_string(),
            ));
        }

        for entry in &stack.entries {
            if self.subsumed_by_framework(entry, stack) {
                debug!(tech = %entry.id, "language service covered by a framework");
                continue;
            }
            let template = self
                .registry
                .get(&entry.id)
                .ok_or_else(|| GeneratorError::TemplateNotFound(entry.id.name().to_string()))?
                .clone();
            self.pending.push(PendingService {
                entry: entry.clone(),
                template,
            });
        }
        self.phase = Phase::Merging;
        Ok(())
    }

    /// A bare language runtime adds nothing when a framework running on that
    /// language is also in the stack; the framework's service is the app.
    fn subsumed_by_framework(&self, entry: &ResolvedEntry, stack: &ResolvedStack) -> bool {
        entry.kind == TechKind::Language
            && stack.entries.iter().any(|other| {
                other.kind == TechKind::Framework
                    && other.id.base_language().as_ref() == Some(&entry.id)
            })
    }

    fn merge(&mut self, stack: &ResolvedStack) -> Result<ComposeDocument, GeneratorError> {
        debug_assert_eq!(self.phase, Phase::Merging);
        let mut document = ComposeDocument::default();
        let want_gpu = self.options.gpu && stack.needs_gpu;

        let pending = std::mem::take(&mut self.pending);
        for service in &pending {
            let name = self.claim_name(&service.template.service_name);
            let definition = self.render(service, want_gpu);
            document.insert_service(name, definition);
        }
        self.pending = pending;
        self.phase = Phase::Finalizing;
        Ok(document)
    }

    /// Earlier (higher-ranked) services keep their preferred name; later ones
    /// get a numeric suffix.
    fn claim_name(&mut self, preferred: &str) -> String {
        let mut name = preferred.to_string();
        let mut index = 2;
        while !self.claimed_names.insert(name.clone()) {
            name = format!("{preferred}-{index}");
            index += 1;
        }
        name
    }

    /// Earlier services keep their template port; later collisions walk up to
    /// the next free host port. Container ports are never rewritten.
    fn claim_port(&mut self, host: u16) -> u16 {
        let mut candidate = host;
        while self.claimed_ports.contains(&candidate) {
            candidate += 1;
        }
        self.claimed_ports.insert(candidate);
        candidate
    }

    fn render(&mut self, service: &PendingService, want_gpu: bool) -> ServiceDefinition {
        let template = &service.template;
        let mut definition = ServiceDefinition {
            image: Some(format!("{}:{}", template.image_repo, service.entry.version)),
            working_dir: template.working_dir.clone(),
            command: template.command.clone(),
            restart: template.restart.clone(),
            ..Default::default()
        };

        if template.buildable {
            let mut build = BuildSpec {
                context: ".".to_string(),
                ..Default::default()
            };
            build
                .args
                .insert("BUILDKIT_INLINE_CACHE".to_string(), "1".to_string());
            build.cache_from.push(format!(
                "{}:{}",
                template.image_repo, service.entry.version
            ));
            definition.build = Some(build);
        }

        for (host, container) in &template.ports {
            let host = self.claim_port(*host);
            definition.ports.push(format!("{host}:{container}"));
        }
        for (host_path, container_path) in &template.bind_mounts {
            definition
                .volumes
                .push(format!("{host_path}:{container_path}"));
        }
        for (volume, container_path) in &template.named_volumes {
            definition.volumes.push(format!("{volume}:{container_path}"));
        }
        for (key, value) in &template.environment {
            definition.environment.push(format!("{key}={value}"));
        }

        // Fixed flag order: limits, platform, watch, gpu.
        if self.options.resource_limits {
            definition.deploy = Some(DeploySpec {
                resources: ResourcesSpec {
                    limits: Some(ResourceLimits {
                        cpus: template.cpu_limit.clone(),
                        memory: template.memory_limit.clone(),
                    }),
                    reservations: None,
                },
            });
        }
        if let Some(platform) = self.options.platform {
            definition.platform = Some(platform.as_str().to_string());
        }
        if self.options.watch && !template.watch.is_empty() {
            definition.develop = Some(DevelopSpec {
                watch: template
                    .watch
                    .iter()
                    .map(|rule| WatchRuleSpec {
                        path: rule.path.clone(),
                        action: match rule.action {
                            WatchAction::Sync => "sync".to_string(),
                            WatchAction::Rebuild => "rebuild".to_string(),
                        },
                        target: rule.target.clone(),
                    })
                    .collect(),
            });
        }
        if want_gpu && template.gpu_eligible {
            let deploy = definition.deploy.get_or_insert(DeploySpec {
                resources: ResourcesSpec::default(),
            });
            deploy.resources.reservations = Some(ResourceReservations {
                devices: vec![DeviceReservation::nvidia_gpu()],
            });
        }

        definition
    }

    /// Union the named volumes into the top-level section and check the
    /// document invariants.
    fn finalize(&mut self, document: &mut ComposeDocument) -> Result<(), GeneratorError> {
        debug_assert_eq!(self.phase, Phase::Finalizing);
        for service in &self.pending {
            for (volume, _) in &service.template.named_volumes {
                document.declare_volume(volume);
            }
        }

        if document.is_empty() {
            return Err(GeneratorError::Composition(
                "composition produced no services".to_string(),
            ));
        }
        let names = document.service_names();
        let unique: HashSet<&&str> = names.iter().collect();
        if unique.len() != names.len() {
            return Err(GeneratorError::Composition(
                "duplicate service names in composition".to_string(),
            ));
        }
        let mut seen_ports = HashSet::new();
        for (name, service) in document.services() {
            if service.image.is_none() {
                return Err(GeneratorError::Composition(format!(
                    "service {name} has no image"
                )));
            }
            for port in &service.ports {
                let host = port.split(':').next().unwrap_or_default();
                if !seen_ports.insert(host.to_string()) {
                    return Err(GeneratorError::Composition(format!(
                        "host port {host} mapped twice"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::{ResolvedEntry, TechnologyId};

    fn entry(id: TechnologyId, version: &str) -> ResolvedEntry {
        ResolvedEntry {
            kind: id.kind(),
            id,
            version: version.to_string(),
            origin: "test".to_string(),
        }
    }

    fn stack_of(entries: Vec<ResolvedEntry>) -> ResolvedStack {
        ResolvedStack {
            entries,
            needs_gpu: false,
        }
    }

    fn compose(stack: &ResolvedStack, options: ComposeOptions) -> ComposeDocument {
        let registry = TemplateRegistry::with_defaults();
        Composer::new(&registry, options)
            .compose(stack)
            .expect("composition failed")
    }

    #[test]
    fn test_framework_subsumes_language_service() {
        let stack = stack_of(vec![
            entry(TechnologyId::Python, "3.12-slim"),
            entry(TechnologyId::Flask, "3.12-slim"),
        ]);
        let doc = compose(&stack, ComposeOptions::default());
        assert_eq!(doc.service_names(), vec!["web"]);
        let web = doc.get("web").unwrap();
        assert_eq!(web.image.as_deref(), Some("python:3.12-slim"));
        assert!(web.command.as_deref().unwrap().starts_with("flask run"));
    }

    #[test]
    fn test_name_conflict_gets_suffix() {
        // Two databases both prefer "db".
        let stack = stack_of(vec![
            entry(TechnologyId::Python, "3.12-slim"),
            entry(TechnologyId::Postgres, "16-alpine"),
            entry(TechnologyId::Mysql, "8.4"),
        ]);
        let doc = compose(&stack, ComposeOptions::default());
        assert_eq!(doc.service_names(), vec!["app", "db", "db-2"]);
        assert_eq!(
            doc.get("db-2").unwrap().image.as_deref(),
            Some("mysql:8.4")
        );
    }

    #[test]
    fn test_port_conflict_increments_host_port() {
        // Node app and Ruby app both want host port 3000.
        let stack = stack_of(vec![
            entry(TechnologyId::Node, "20-alpine"),
            entry(TechnologyId::Ruby, "3.3-alpine"),
        ]);
        let doc = compose(&stack, ComposeOptions::default());
        assert_eq!(doc.get("app").unwrap().ports, vec!["3000:3000"]);
        assert_eq!(doc.get("app-2").unwrap().ports, vec!["3001:3000"]);
    }

    #[test]
    fn test_databases_run_stock_images() {
        let stack = stack_of(vec![
            entry(TechnologyId::Node, "20-alpine"),
            entry(TechnologyId::Redis, "7.2-alpine"),
        ]);
        let doc = compose(&stack, ComposeOptions::default());
        let redis = doc.get("redis").unwrap();
        assert!(redis.build.is_none());
        assert_eq!(redis.restart.as_deref(), Some("unless-stopped"));
        let app = doc.get("app").unwrap();
        assert_eq!(app.build.as_ref().unwrap().context, ".");
    }

    #[test]
    fn test_volumes_are_unioned_at_top_level() {
        let stack = stack_of(vec![
            entry(TechnologyId::Python, "3.12-slim"),
            entry(TechnologyId::Postgres, "16-alpine"),
        ]);
        let doc = compose(&stack, ComposeOptions::default());
        assert_eq!(doc.volume_names(), vec!["pgdata", "pip-cache"]);
    }

    #[test]
    fn test_watch_disabled_removes_develop_section() {
        let stack = stack_of(vec![entry(TechnologyId::Node, "20-alpine")]);
        let doc = compose(
            &stack,
            ComposeOptions {
                watch: false,
                ..Default::default()
            },
        );
        assert!(doc.get("app").unwrap().develop.is_none());
    }

    #[test]
    fn test_gpu_reservation_only_with_hint_and_flag() {
        let registry = TemplateRegistry::with_defaults();
        let mut stack = stack_of(vec![entry(TechnologyId::Python, "3.12-slim")]);
        stack.needs_gpu = true;

        let doc = Composer::new(&registry, ComposeOptions::default())
            .compose(&stack)
            .unwrap();
        let reservations = &doc.get("app").unwrap().deploy.as_ref().unwrap().resources;
        assert!(reservations.reservations.is_some());

        let doc = Composer::new(
            &registry,
            ComposeOptions {
                gpu: false,
                ..Default::default()
            },
        )
        .compose(&stack)
        .unwrap();
        assert!(doc.get("app").unwrap().deploy.is_none());
    }

    #[test]
    fn test_gpu_augments_resource_limits() {
        let registry = TemplateRegistry::with_defaults();
        let mut stack = stack_of(vec![entry(TechnologyId::Python, "3.12-slim")]);
        stack.needs_gpu = true;

        let doc = Composer::new(
            &registry,
            ComposeOptions {
                resource_limits: true,
                ..Default::default()
            },
        )
        .compose(&stack)
        .unwrap();
        let resources = &doc.get("app").unwrap().deploy.as_ref().unwrap().resources;
        assert!(resources.limits.is_some());
        assert!(resources.reservations.is_some());
    }

    #[test]
    fn test_platform_pins_every_service() {
        let stack = stack_of(vec![
            entry(TechnologyId::Node, "20-alpine"),
            entry(TechnologyId::Postgres, "16-alpine"),
        ]);
        let doc = compose(
            &stack,
            ComposeOptions {
                platform: Some(Platform::Arm64),
                ..Default::default()
            },
        );
        for (_, service) in doc.services() {
            assert_eq!(service.platform.as_deref(), Some("linux/arm64"));
        }
    }

    #[test]
    fn test_empty_stack_is_an_error() {
        let registry = TemplateRegistry::with_defaults();
        let result =
            Composer::new(&registry, ComposeOptions::default()).compose(&stack_of(vec![]));
        assert!(matches!(result, Err(GeneratorError::Composition(_))));
    }

    #[test]
    fn test_unknown_technology_is_a_template_error() {
        let registry = TemplateRegistry::with_defaults();
        let stack = stack_of(vec![entry(
            TechnologyId::Custom("fortran".to_string()),
            "latest",
        )]);
        let result = Composer::new(&registry, ComposeOptions::default()).compose(&stack);
        assert!(
            matches!(result, Err(GeneratorError::TemplateNotFound(name)) if name == "fortran")
        );
    }
}
