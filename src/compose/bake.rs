//! docker-bake.hcl emission for the buildable services.
//!
//! Only services carrying a build context become targets; stock-image
//! databases and proxies are excluded. The file is plain HCL text written in
//! document order, so output is byte-stable for a given compose document.

use crate::compose::composer::Platform;
use crate::compose::document::ComposeDocument;
use std::fmt::Write;

pub struct BakeGenerator;

impl BakeGenerator {
    /// Render the bake document, or `None` when no service is buildable.
    pub fn generate(document: &ComposeDocument, platform: Option<Platform>) -> Option<String> {
        let targets: Vec<(&str, &str)> = document
            .services()
            .filter_map(|(name, service)| {
                service
                    .build
                    .as_ref()
                    .map(|build| (name, build.context.as_str()))
            })
            .collect();
        if targets.is_empty() {
            return None;
        }

        let mut out = String::new();
        let names = targets
            .iter()
            .map(|(name, _)| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(", ");
        // Writing to a String cannot fail.
        let _ = writeln!(out, "group \"default\" {{");
        let _ = writeln!(out, "  targets = [{names}]");
        let _ = writeln!(out, "}}");
        let _ = writeln!(out);
        let _ = writeln!(out, "variable \"TAG\" {{");
        let _ = writeln!(out, "  default = \"latest\"");
        let _ = writeln!(out, "}}");

        for (name, context) in targets {
            let _ = writeln!(out);
            let _ = writeln!(out, "target \"{name}\" {{");
            let _ = writeln!(out, "  context = \"{context}\"");
            let _ = writeln!(out, "  tags = [\"{name}:${{TAG}}\"]");
            let _ = writeln!(
                out,
                "  cache-from = [\"type=registry,ref={name}:buildcache\"]"
            );
            let _ = writeln!(
                out,
                "  cache-to = [\"type=registry,ref={name}:buildcache,mode=max\"]"
            );
            if let Some(platform) = platform {
                let _ = writeln!(out, "  platforms = [\"{}\"]", platform.as_str());
            }
            let _ = writeln!(out, "}}");
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::document::{BuildSpec, ServiceDefinition};

    fn buildable(image: &str) -> ServiceDefinition {
        ServiceDefinition {
            image: Some(image.to_string()),
            build: Some(BuildSpec {
                context: ".".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn stock(image: &str) -> ServiceDefinition {
        ServiceDefinition {
            image: Some(image.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_only_buildable_services_become_targets() {
        let mut doc = ComposeDocument::default();
        doc.insert_service("web".to_string(), buildable("python:3.12-slim"));
        doc.insert_service("db".to_string(), stock("postgres:16-alpine"));

        let hcl = BakeGenerator::generate(&doc, None).unwrap();
        assert!(hcl.contains("target \"web\""));
        assert!(!hcl.contains("target \"db\""));
        assert!(hcl.contains("targets = [\"web\"]"));
    }

    #[test]
    fn test_no_buildable_services_means_no_document() {
        let mut doc = ComposeDocument::default();
        doc.insert_service("db".to_string(), stock("postgres:16-alpine"));
        assert!(BakeGenerator::generate(&doc, None).is_none());
    }

    #[test]
    fn test_tag_variable_and_cache_hints() {
        let mut doc = ComposeDocument::default();
        doc.insert_service("app".to_string(), buildable("node:20-alpine"));

        let hcl = BakeGenerator::generate(&doc, None).unwrap();
        assert!(hcl.contains("variable \"TAG\""));
        assert!(hcl.contains("tags = [\"app:${TAG}\"]"));
        assert!(hcl.contains("cache-from = [\"type=registry,ref=app:buildcache\"]"));
        assert!(hcl.contains("mode=max"));
    }

    #[test]
    fn test_platform_pins_targets() {
        let mut doc = ComposeDocument::default();
        doc.insert_service("app".to_string(), buildable("node:20-alpine"));

        let hcl = BakeGenerator::generate(&doc, Some(Platform::Amd64)).unwrap();
        assert!(hcl.contains("platforms = [\"linux/amd64\"]"));
    }
}
