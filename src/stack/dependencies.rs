//! Manifest and lockfile analysis: one parser per ecosystem.
//!
//! Each parser turns a snapshotted manifest into name/constraint pairs, then
//! any entry matching a known framework or database-client name becomes a
//! candidate. A malformed manifest yields a parse warning and is treated as
//! empty; it never aborts detection for the rest of the project.

use crate::error::Warning;
use crate::scan::{ProjectSignal, ScanSnapshot, SignalRole};
use crate::stack::candidate::{SignalSource, TechnologyCandidate};
use crate::stack::technology_id::TechnologyId;
use crate::stack::versions::VersionConstraint;
use regex::Regex;
use tracing::debug;

/// Everything extracted from the project's manifests.
#[derive(Debug, Default)]
pub struct DependencyReport {
    pub candidates: Vec<TechnologyCandidate>,
    pub warnings: Vec<Warning>,
    /// A dependency implying CUDA (torch, tensorflow, nvidia-*) was found.
    pub gpu_hint: bool,
}

/// A parsed dependency entry.
#[derive(Debug, Clone)]
struct DependencyEntry {
    name: String,
    constraint: Option<String>,
}

pub struct DependencyAnalyzer;

impl DependencyAnalyzer {
    pub fn analyze(snapshot: &ScanSnapshot) -> DependencyReport {
        let mut report = DependencyReport::default();

        for signal in snapshot.with_role(SignalRole::Manifest) {
            let Some(content) = signal.content.as_deref() else {
                continue;
            };
            let entries = match parse_manifest(signal, content, &mut report) {
                Ok(entries) => entries,
                Err(message) => {
                    report.warnings.push(Warning::Parse {
                        path: signal.path.clone(),
                        message,
                    });
                    Vec::new()
                }
            };

            for entry in entries {
                let lowered = entry.name.to_lowercase();
                if is_gpu_dependency(&lowered) {
                    debug!(dep = %entry.name, "CUDA-requiring dependency");
                    report.gpu_hint = true;
                }
                if let Some(id) = match_dependency(&lowered) {
                    debug!(dep = %entry.name, tech = %id, path = %signal.path, "dependency match");
                    let mut candidate = TechnologyCandidate::new(
                        id,
                        SignalSource::ManifestEntry,
                        0.8,
                        &signal.path,
                    );
                    if let Some(constraint) = &entry.constraint {
                        candidate = candidate.with_version(VersionConstraint::parse(constraint));
                    }
                    report.candidates.push(candidate);
                }
            }
        }

        report
    }
}

/// Dispatch on manifest filename. Language-version constraints found along
/// the way (engines.node, requires-python, ...) are pushed straight into the
/// report as manifest-entry candidates for the language itself.
fn parse_manifest(
    signal: &ProjectSignal,
    content: &str,
    report: &mut DependencyReport,
) -> Result<Vec<DependencyEntry>, String> {
    let file_name = signal.file_name();
    match file_name {
        "requirements.txt" => Ok(parse_requirements(content)),
        "package.json" => parse_package_json(signal, content, report),
        "pyproject.toml" => parse_pyproject(signal, content, report),
        "composer.json" => parse_composer_json(signal, content, report),
        "go.mod" => Ok(parse_go_mod(signal, content, report)),
        "Gemfile" => Ok(parse_gemfile(signal, content, report)),
        "Cargo.toml" => parse_cargo_toml(content),
        "pom.xml" => parse_pom_xml(content),
        "build.gradle" | "build.gradle.kts" => Ok(parse_gradle(content)),
        _ if file_name.ends_with(".csproj") => parse_csproj(signal, content, report),
        // Recognized as a manifest for classification, but carries no
        // dependency evidence we use (build.sbt, mix.exs, CMakeLists.txt).
        _ => Ok(Vec::new()),
    }
}

fn push_language_constraint(
    report: &mut DependencyReport,
    id: TechnologyId,
    raw: &str,
    origin: &str,
) {
    let req = VersionConstraint::parse(raw);
    if req == VersionConstraint::Any {
        return;
    }
    report.candidates.push(
        TechnologyCandidate::new(id, SignalSource::ManifestEntry, 0.7, origin).with_version(req),
    );
}

fn parse_requirements(content: &str) -> Vec<DependencyEntry> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
                return None;
            }
            let split_at = line
                .find(['=', '<', '>', '~', '!', ';', '[', ' '])
                .unwrap_or(line.len());
            let name = line[..split_at].trim();
            if name.is_empty() {
                return None;
            }
            let constraint = line[split_at..]
                .trim_start_matches(['[', ' '])
                .split(';')
                .next()
                .map(str::trim)
                .filter(|c| !c.is_empty());
            Some(DependencyEntry {
                name: name.to_string(),
                constraint: constraint.map(|c| c.to_string()),
            })
        })
        .collect()
}

fn parse_package_json(
    signal: &ProjectSignal,
    content: &str,
    report: &mut DependencyReport,
) -> Result<Vec<DependencyEntry>, String> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let mut entries = Vec::new();
    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = value.get(section).and_then(|v| v.as_object()) {
            for (name, constraint) in deps {
                entries.push(DependencyEntry {
                    name: name.clone(),
                    constraint: constraint.as_str().map(|c| c.to_string()),
                });
            }
        }
    }
    if let Some(node_req) = value
        .get("engines")
        .and_then(|e| e.get("node"))
        .and_then(|v| v.as_str())
    {
        push_language_constraint(report, TechnologyId::Node, node_req, &signal.path);
    }
    Ok(entries)
}

fn parse_pyproject(
    signal: &ProjectSignal,
    content: &str,
    report: &mut DependencyReport,
) -> Result<Vec<DependencyEntry>, String> {
    let value: toml::Value = toml::from_str(content).map_err(|e| e.to_string())?;
    let mut entries = Vec::new();

    if let Some(project) = value.get("project") {
        if let Some(requires) = project.get("requires-python").and_then(|v| v.as_str()) {
            push_language_constraint(report, TechnologyId::Python, requires, &signal.path);
        }
        if let Some(deps) = project.get("dependencies").and_then(|v| v.as_array()) {
            for dep in deps.iter().filter_map(|d| d.as_str()) {
                entries.extend(parse_requirements(dep));
            }
        }
    }
    if let Some(poetry_deps) = value
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_table())
    {
        for (name, constraint) in poetry_deps {
            if name == "python" {
                if let Some(req) = constraint.as_str() {
                    push_language_constraint(report, TechnologyId::Python, req, &signal.path);
                }
                continue;
            }
            entries.push(DependencyEntry {
                name: name.clone(),
                constraint: constraint.as_str().map(|c| c.to_string()),
            });
        }
    }
    Ok(entries)
}

fn parse_composer_json(
    signal: &ProjectSignal,
    content: &str,
    report: &mut DependencyReport,
) -> Result<Vec<DependencyEntry>, String> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let mut entries = Vec::new();
    for section in ["require", "require-dev"] {
        if let Some(deps) = value.get(section).and_then(|v| v.as_object()) {
            for (name, constraint) in deps {
                if name == "php" {
                    if let Some(req) = constraint.as_str() {
                        let cleaned = req.trim_start_matches(['~', '^']);
                        push_language_constraint(
                            report,
                            TechnologyId::Php,
                            cleaned,
                            &signal.path,
                        );
                    }
                    continue;
                }
                entries.push(DependencyEntry {
                    name: name.clone(),
                    constraint: constraint.as_str().map(|c| c.to_string()),
                });
            }
        }
    }
    Ok(entries)
}

fn parse_go_mod(
    signal: &ProjectSignal,
    content: &str,
    report: &mut DependencyReport,
) -> Vec<DependencyEntry> {
    let go_re = Regex::new(r"(?m)^go\s+(\d+\.\d+)").expect("valid regex");
    if let Some(cap) = go_re.captures(content) {
        push_language_constraint(report, TechnologyId::Go, &cap[1], &signal.path);
    }

    let require_re = Regex::new(r"(?m)^\s*([\w./-]+)\s+v([\w.-]+)").expect("valid regex");
    content
        .lines()
        .filter(|l| l.contains('/'))
        .filter_map(|line| {
            require_re.captures(line.trim_start_matches("require").trim()).map(|cap| {
                DependencyEntry {
                    name: cap[1].to_string(),
                    constraint: Some(cap[2].to_string()),
                }
            })
        })
        .collect()
}

fn parse_gemfile(
    signal: &ProjectSignal,
    content: &str,
    report: &mut DependencyReport,
) -> Vec<DependencyEntry> {
    let ruby_re = Regex::new(r#"ruby\s+['"]([\d.]+)['"]"#).expect("valid regex");
    if let Some(cap) = ruby_re.captures(content) {
        push_language_constraint(report, TechnologyId::Ruby, &cap[1], &signal.path);
    }

    let gem_re = Regex::new(r#"(?m)^\s*gem\s+['"]([\w-]+)['"]"#).expect("valid regex");
    gem_re
        .captures_iter(content)
        .map(|cap| DependencyEntry {
            name: cap[1].to_string(),
            constraint: None,
        })
        .collect()
}

fn parse_cargo_toml(content: &str) -> Result<Vec<DependencyEntry>, String> {
    let value: toml::Value = toml::from_str(content).map_err(|e| e.to_string())?;
    let mut entries = Vec::new();
    for section in ["dependencies", "dev-dependencies"] {
        if let Some(deps) = value.get(section).and_then(|v| v.as_table()) {
            for (name, constraint) in deps {
                entries.push(DependencyEntry {
                    name: name.clone(),
                    constraint: constraint.as_str().map(|c| c.to_string()),
                });
            }
        }
    }
    Ok(entries)
}

fn parse_pom_xml(content: &str) -> Result<Vec<DependencyEntry>, String> {
    let doc = roxmltree::Document::parse(content).map_err(|e| e.to_string())?;
    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name("artifactId"))
        .filter_map(|n| n.text())
        .map(|artifact| DependencyEntry {
            name: artifact.trim().to_string(),
            constraint: None,
        })
        .collect())
}

fn parse_gradle(content: &str) -> Vec<DependencyEntry> {
    // Matches group:artifact[:version] inside quoted dependency strings.
    let dep_re =
        Regex::new(r#"['"]([\w.-]+):([\w.-]+)(?::([\w.-]+))?['"]"#).expect("valid regex");
    dep_re
        .captures_iter(content)
        .map(|cap| DependencyEntry {
            name: format!("{}:{}", &cap[1], &cap[2]),
            constraint: cap.get(3).map(|v| v.as_str().to_string()),
        })
        .collect()
}

fn parse_csproj(
    signal: &ProjectSignal,
    content: &str,
    report: &mut DependencyReport,
) -> Result<Vec<DependencyEntry>, String> {
    let doc = roxmltree::Document::parse(content).map_err(|e| e.to_string())?;

    if let Some(framework) = doc
        .descendants()
        .find(|n| n.has_tag_name("TargetFramework"))
        .and_then(|n| n.text())
    {
        if let Some(version) = framework.trim().strip_prefix("net") {
            if version.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                push_language_constraint(report, TechnologyId::DotNet, version, &signal.path);
            }
        }
    }

    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name("PackageReference"))
        .filter_map(|n| {
            n.attribute("Include").map(|name| DependencyEntry {
                name: name.to_string(),
                constraint: n.attribute("Version").map(|v| v.to_string()),
            })
        })
        .collect())
}

/// Known framework and database-client dependency names, lowercased.
/// Path-shaped names (go modules, maven coordinates) match by segment.
fn match_dependency(name: &str) -> Option<TechnologyId> {
    use TechnologyId::*;
    let exact = match name {
        "flask" => Some(Flask),
        "django" => Some(Django),
        "fastapi" => Some(FastApi),
        "react" | "react-dom" => Some(React),
        "vue" => Some(Vue),
        "@angular/core" => Some(Angular),
        "laravel/framework" => Some(Laravel),
        "psycopg2" | "psycopg2-binary" | "psycopg" | "pg" | "postgres" | "postgresql"
        | "tokio-postgres" | "npgsql" | "asyncpg" => Some(Postgres),
        "mysql" | "mysql2" | "pymysql" | "mysqlclient" | "mysql-connector-python" => Some(Mysql),
        "mariadb" => Some(MariaDb),
        "mongodb" | "mongoose" | "pymongo" | "motor" => Some(MongoDb),
        "redis" | "ioredis" | "predis/predis" => Some(Redis),
        "elasticsearch" | "@elastic/elasticsearch" => Some(Elasticsearch),
        "cassandra-driver" => Some(Cassandra),
        _ => None,
    };
    if exact.is_some() {
        return exact;
    }

    if name.contains("spring-boot") {
        return Some(Spring);
    }
    // Segment scan for everything else: go.mod module paths, maven
    // coordinates, and hyphenated client names (mysql-connector-j,
    // django-redis) all carry the database name as a segment.
    for (needle, id) in [
        ("postgres", Postgres),
        ("pgx", Postgres),
        ("mysql", Mysql),
        ("mongo", MongoDb),
        ("redis", Redis),
        ("elasticsearch", Elasticsearch),
        ("cassandra", Cassandra),
    ] {
        if name
            .split(['/', ':', '.', '-'])
            .any(|segment| segment.contains(needle))
        {
            return Some(id);
        }
    }
    None
}

fn is_gpu_dependency(name: &str) -> bool {
    matches!(name, "torch" | "tensorflow" | "tensorflow-gpu" | "cupy" | "jax")
        || name.starts_with("nvidia-")
        || name.starts_with("cuda")
}
