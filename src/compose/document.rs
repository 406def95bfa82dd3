//! Serde model for the generated compose document.
//!
//! Field declaration order is emission order. Services serialize through a
//! hand-written map visitor because insertion order is part of the output
//! contract: primary app first, then databases, then tools, byte-identical
//! across runs.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Default)]
pub struct BuildSpec {
    pub context: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cache_from: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cache_to: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchRuleSpec {
    pub path: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DevelopSpec {
    pub watch: Vec<WatchRuleSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceLimits {
    pub cpus: String,
    pub memory: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceReservation {
    pub driver: String,
    pub count: String,
    pub capabilities: Vec<String>,
}

impl DeviceReservation {
    pub fn nvidia_gpu() -> Self {
        Self {
            driver: "nvidia".to_string(),
            count: "all".to_string(),
            capabilities: vec!["gpu".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceReservations {
    pub devices: Vec<DeviceReservation>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ResourcesSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceLimits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservations: Option<ResourceReservations>,
}

impl ResourcesSpec {
    pub fn is_empty(&self) -> bool {
        self.limits.is_none() && self.reservations.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploySpec {
    pub resources: ResourcesSpec,
}

/// One service entry. Every field is optional so each template contributes
/// only what it declares.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ServiceDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub develop: Option<DevelopSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeploySpec>,
}

/// The whole compose document with insertion-ordered services.
#[derive(Debug, Default)]
pub struct ComposeDocument {
    services: Vec<(String, ServiceDefinition)>,
    volumes: BTreeMap<String, Option<()>>,
}

impl ComposeDocument {
    pub fn insert_service(&mut self, name: String, service: ServiceDefinition) {
        debug_assert!(self.get(&name).is_none(), "duplicate service {name}");
        self.services.push((name, service));
    }

    pub fn declare_volume(&mut self, name: &str) {
        self.volumes.entry(name.to_string()).or_insert(None);
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDefinition> {
        self.services
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn services(&self) -> impl Iterator<Item = (&str, &ServiceDefinition)> {
        self.services.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn volume_names(&self) -> Vec<&str> {
        self.volumes.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

impl Serialize for ComposeDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Services<'a>(&'a [(String, ServiceDefinition)]);
        impl Serialize for Services<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (name, service) in self.0 {
                    map.serialize_entry(name, service)?;
                }
                map.end()
            }
        }

        let len = if self.volumes.is_empty() { 1 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("services", &Services(&self.services))?;
        if !self.volumes.is_empty() {
            map.serialize_entry("volumes", &self.volumes)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_service(image: &str) -> ServiceDefinition {
        ServiceDefinition {
            image: Some(image.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_service_order_is_preserved() {
        let mut doc = ComposeDocument::default();
        doc.insert_service("web".to_string(), minimal_service("python:3.12-slim"));
        doc.insert_service("db".to_string(), minimal_service("postgres:16-alpine"));
        doc.insert_service("redis".to_string(), minimal_service("redis:7.2-alpine"));

        let yaml = doc.to_yaml().unwrap();
        let web = yaml.find("web:").unwrap();
        let db = yaml.find("db:").unwrap();
        let redis = yaml.find("redis:").unwrap();
        assert!(web < db && db < redis);
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let mut doc = ComposeDocument::default();
        doc.insert_service("app".to_string(), minimal_service("node:20-alpine"));

        let yaml = doc.to_yaml().unwrap();
        assert!(!yaml.contains("ports"));
        assert!(!yaml.contains("environment"));
        assert!(!yaml.contains("volumes"));
        assert!(!yaml.contains("develop"));
    }

    #[test]
    fn test_volumes_section_emitted_when_declared() {
        let mut doc = ComposeDocument::default();
        let mut db = minimal_service("postgres:16-alpine");
        db.volumes.push("pgdata:/var/lib/postgresql/data".to_string());
        doc.insert_service("db".to_string(), db);
        doc.declare_volume("pgdata");

        let yaml = doc.to_yaml().unwrap();
        assert!(yaml.contains("volumes:\n  pgdata:"));
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let build = || {
            let mut doc = ComposeDocument::default();
            let mut app = minimal_service("python:3.12-slim");
            app.environment.push("PYTHONUNBUFFERED=1".to_string());
            app.ports.push("8000:8000".to_string());
            doc.insert_service("app".to_string(), app);
            doc.declare_volume("pip-cache");
            doc.to_yaml().unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_gpu_reservation_shape() {
        let mut doc = ComposeDocument::default();
        let mut app = minimal_service("python:3.12-slim");
        app.deploy = Some(DeploySpec {
            resources: ResourcesSpec {
                limits: None,
                reservations: Some(ResourceReservations {
                    devices: vec![DeviceReservation::nvidia_gpu()],
                }),
            },
        });
        doc.insert_service("app".to_string(), app);

        let yaml = doc.to_yaml().unwrap();
        assert!(yaml.contains("driver: nvidia"));
        assert!(yaml.contains("count: all"));
        assert!(yaml.contains("- gpu"));
    }
}
