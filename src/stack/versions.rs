//! Version constraint narrowing against an embedded table of known image tags.
//!
//! Resolution never touches the network: constraints extracted from manifests
//! are narrowed to the highest known published tag that satisfies them, with a
//! hardcoded default per technology as the final fallback.

use crate::stack::technology_id::{TechKind, TechnologyId};

/// A version constraint extracted from a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// `==3.0.0`, `3.12`, `.nvmrc` pins.
    Exact(String),
    /// `>=3.8`.
    AtLeast(String),
    /// `^16.13`, `~3.1` (same major).
    Compatible(String),
    /// No usable version information.
    Any,
}

impl VersionConstraint {
    /// Parse the version part of a dependency spec (`==1.2`, `>=1.2,<2`,
    /// `^1.2`, `~1.2`, bare `1.2`). Unparseable input becomes `Any`.
    pub fn parse(spec: &str) -> Self {
        // Only the first comma-separated clause narrows; the rest would need a
        // full range solver for marginal benefit.
        let clause = spec.split(',').next().unwrap_or("").trim();
        if clause.is_empty() || clause == "*" {
            return Self::Any;
        }
        if let Some(v) = clause.strip_prefix("==") {
            return Self::Exact(v.trim().to_string());
        }
        if let Some(v) = clause.strip_prefix(">=") {
            return Self::AtLeast(v.trim().to_string());
        }
        if let Some(v) = clause.strip_prefix('^').or_else(|| clause.strip_prefix('~')) {
            return Self::Compatible(v.trim().to_string());
        }
        if clause.starts_with(['<', '>', '!']) {
            return Self::Any;
        }
        if clause.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return Self::Exact(clause.to_string());
        }
        Self::Any
    }

    fn satisfied_by(&self, version: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(want) => prefix_match(want, version),
            Self::AtLeast(min) => compare_versions(version, min) != std::cmp::Ordering::Less,
            Self::Compatible(base) => {
                major_of(version) == major_of(base)
                    && compare_versions(version, base) != std::cmp::Ordering::Less
            }
        }
    }
}

/// True when one dotted version is a component-wise prefix of the other
/// (`3.11` matches `3.11.4`, and vice versa).
fn prefix_match(a: &str, b: &str) -> bool {
    let a_parts: Vec<&str> = a.split('.').collect();
    let b_parts: Vec<&str> = b.split('.').collect();
    let n = a_parts.len().min(b_parts.len());
    a_parts[..n] == b_parts[..n]
}

fn major_of(v: &str) -> u64 {
    v.split('.')
        .next()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(0)
}

fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|p| {
                p.chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>()
                    .parse()
                    .unwrap_or(0)
            })
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let n = a.len().max(b.len());
    for i in 0..n {
        let (x, y) = (a.get(i).copied().unwrap_or(0), b.get(i).copied().unwrap_or(0));
        match x.cmp(&y) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }
    std::cmp::Ordering::Equal
}

/// A known published tag: the comparable version and the full image tag.
struct KnownTag {
    version: &'static str,
    tag: &'static str,
}

macro_rules! tags {
    ( $( $version:literal => $tag:literal ),* $(,)? ) => {
        &[ $( KnownTag { version: $version, tag: $tag }, )* ]
    };
}

/// Known published tags per technology, ascending by version.
fn known_tags(id: &TechnologyId) -> &'static [KnownTag] {
    use TechnologyId::*;
    match id {
        Node | React | Vue | Angular => tags![
            "18" => "18-alpine",
            "20" => "20-alpine",
            "22" => "22-alpine",
        ],
        Python | Django | Flask | FastApi => tags![
            "3.10" => "3.10-slim",
            "3.11" => "3.11-slim",
            "3.12" => "3.12-slim",
        ],
        Php => tags![
            "8.1" => "8.1-apache",
            "8.2" => "8.2-apache",
            "8.3" => "8.3-apache",
        ],
        Laravel => tags![
            "8.1" => "8.1-fpm",
            "8.2" => "8.2-fpm",
            "8.3" => "8.3-fpm",
        ],
        Go => tags!["1.21" => "1.21-alpine", "1.22" => "1.22-alpine"],
        Ruby => tags!["3.2" => "3.2-alpine", "3.3" => "3.3-alpine"],
        DotNet => tags!["6.0" => "6.0", "8.0" => "8.0"],
        Rust => tags!["1.77" => "1.77-slim"],
        Postgres => tags!["15" => "15-alpine", "16" => "16-alpine"],
        Mysql => tags!["8.0" => "8.0", "8.4" => "8.4"],
        _ => &[],
    }
}

/// Hardcoded default tag per technology. Languages, frameworks, and databases
/// always have one; tools may not.
fn default_tag(id: &TechnologyId) -> Option<&'static str> {
    use TechnologyId::*;
    Some(match id {
        Node | React | Vue | Angular => "20-alpine",
        Python | Django | Flask | FastApi => "3.12-slim",
        Php => "8.3-apache",
        Laravel => "8.3-fpm",
        Go => "1.22-alpine",
        Cpp => "14-bookworm",
        Ruby => "3.3-alpine",
        DotNet => "8.0",
        Rust => "1.77-slim",
        Scala => "eclipse-temurin-jammy-21.0.2_13_1.9.8",
        Elixir => "1.16-slim",
        Spring => "21-jre-jammy",
        Postgres => "16-alpine",
        Mysql => "8.4",
        MariaDb => "11",
        MongoDb => "7.0",
        Redis => "7.2-alpine",
        Elasticsearch => "8.12.0",
        Cassandra => "5",
        Jupyter => "latest",
        Nginx => "1.27-alpine",
        Apache => "2.4-alpine",
        Custom(_) => return None,
    })
}

/// Which of two disagreeing version sources wins. The original precedence is
/// unspecified when both exist, so it is configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionPrecedence {
    /// A caller-supplied environment override beats manifest constraints.
    #[default]
    Environment,
    /// Manifest constraints beat environment overrides.
    Manifest,
}

pub struct VersionResolver {
    precedence: VersionPrecedence,
}

impl VersionResolver {
    pub fn new(precedence: VersionPrecedence) -> Self {
        Self { precedence }
    }

    /// Resolve a concrete tag for one accepted candidate. Returns `None` only
    /// for Tool-kind candidates with no evidence and no default; those are
    /// dropped by the caller.
    pub fn resolve(
        &self,
        id: &TechnologyId,
        env_override: Option<&str>,
        manifest_req: Option<&VersionConstraint>,
    ) -> Option<String> {
        let from_env = || env_override.map(|v| v.to_string());
        let from_manifest = || manifest_req.and_then(|req| self.narrow(id, req));

        let resolved = match self.precedence {
            VersionPrecedence::Environment => from_env().or_else(from_manifest),
            VersionPrecedence::Manifest => from_manifest().or_else(from_env),
        };
        if let Some(v) = resolved {
            return Some(v);
        }
        match default_tag(id) {
            Some(tag) => Some(tag.to_string()),
            // Non-tools always fall back to "latest" rather than being
            // dropped; only optional tools may vanish.
            None if id.kind() != TechKind::Tool => Some("latest".to_string()),
            None => None,
        }
    }

    /// Narrow a constraint to the highest known tag satisfying it.
    fn narrow(&self, id: &TechnologyId, req: &VersionConstraint) -> Option<String> {
        if *req == VersionConstraint::Any {
            return None;
        }
        known_tags(id)
            .iter()
            .rev()
            .find(|k| req.satisfied_by(k.version))
            .map(|k| k.tag.to_string())
    }
}

impl Default for VersionResolver {
    fn default() -> Self {
        Self::new(VersionPrecedence::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_constraints() {
        assert_eq!(
            VersionConstraint::parse("==3.0.0"),
            VersionConstraint::Exact("3.0.0".to_string())
        );
        assert_eq!(
            VersionConstraint::parse(">=3.8,<4"),
            VersionConstraint::AtLeast("3.8".to_string())
        );
        assert_eq!(
            VersionConstraint::parse("^16.13.0"),
            VersionConstraint::Compatible("16.13.0".to_string())
        );
        assert_eq!(
            VersionConstraint::parse("~2.1"),
            VersionConstraint::Compatible("2.1".to_string())
        );
        assert_eq!(VersionConstraint::parse("*"), VersionConstraint::Any);
        assert_eq!(
            VersionConstraint::parse("3.11"),
            VersionConstraint::Exact("3.11".to_string())
        );
    }

    #[test]
    fn test_narrow_at_least_picks_highest() {
        let resolver = VersionResolver::default();
        let req = VersionConstraint::AtLeast("3.8".to_string());
        assert_eq!(
            resolver.resolve(&TechnologyId::Python, None, Some(&req)),
            Some("3.12-slim".to_string())
        );
    }

    #[test]
    fn test_narrow_exact_prefix() {
        let resolver = VersionResolver::default();
        let req = VersionConstraint::Exact("3.11.4".to_string());
        assert_eq!(
            resolver.resolve(&TechnologyId::Python, None, Some(&req)),
            Some("3.11-slim".to_string())
        );
    }

    #[test]
    fn test_unsatisfiable_constraint_falls_back_to_default() {
        let resolver = VersionResolver::default();
        // Framework's own version does not correspond to any runtime tag.
        let req = VersionConstraint::Exact("3.0.0".to_string());
        assert_eq!(
            resolver.resolve(&TechnologyId::Flask, None, Some(&req)),
            Some("3.12-slim".to_string())
        );
    }

    #[test]
    fn test_env_override_wins_by_default() {
        let resolver = VersionResolver::default();
        let req = VersionConstraint::AtLeast("18".to_string());
        assert_eq!(
            resolver.resolve(&TechnologyId::Node, Some("21-alpine"), Some(&req)),
            Some("21-alpine".to_string())
        );
    }

    #[test]
    fn test_manifest_precedence_flips_the_order() {
        let resolver = VersionResolver::new(VersionPrecedence::Manifest);
        let req = VersionConstraint::AtLeast("18".to_string());
        assert_eq!(
            resolver.resolve(&TechnologyId::Node, Some("21-alpine"), Some(&req)),
            Some("22-alpine".to_string())
        );
    }

    #[test]
    fn test_custom_tool_without_default_is_dropped() {
        let resolver = VersionResolver::default();
        assert_eq!(
            resolver.resolve(&TechnologyId::Custom("mystery".to_string()), None, None),
            None
        );
    }

    #[test]
    fn test_known_tools_have_defaults() {
        let resolver = VersionResolver::default();
        assert_eq!(
            resolver.resolve(&TechnologyId::Nginx, None, None),
            Some("1.27-alpine".to_string())
        );
        assert_eq!(
            resolver.resolve(&TechnologyId::Jupyter, None, None),
            Some("latest".to_string())
        );
    }

    #[test]
    fn test_known_tag_tables_narrow_across_technologies() {
        let resolver = VersionResolver::default();
        let cases = [
            (TechnologyId::Php, VersionConstraint::Compatible("8.1".to_string()), "8.3-apache"),
            (TechnologyId::Go, VersionConstraint::Exact("1.21".to_string()), "1.21-alpine"),
            (TechnologyId::Postgres, VersionConstraint::AtLeast("15".to_string()), "16-alpine"),
            (TechnologyId::Ruby, VersionConstraint::Exact("3.2.2".to_string()), "3.2-alpine"),
            (TechnologyId::DotNet, VersionConstraint::AtLeast("6.0".to_string()), "8.0"),
        ];
        for (id, req, expected) in cases {
            assert_eq!(
                resolver.resolve(&id, None, Some(&req)),
                Some(expected.to_string()),
                "narrowing failed for {id}"
            );
        }
    }

    #[test]
    fn test_compare_versions() {
        use std::cmp::Ordering;
        assert_eq!(compare_versions("3.12", "3.8"), Ordering::Greater);
        assert_eq!(compare_versions("3.8", "3.8.0"), Ordering::Equal);
        assert_eq!(compare_versions("20", "22"), Ordering::Less);
    }
}
