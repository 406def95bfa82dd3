//! Subcommand handlers. Each returns a process exit code; all user-facing
//! output happens here, never in the engine.

use crate::cli::commands::{GenerateArgs, PlatformArg};
use crate::compose::{ComposeOptions, Platform};
use crate::generator::{GenerateRequest, GenerationReport, Generator};
use crate::stack::{TechKind, TechnologyId};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::error;

pub fn handle_generate(args: &GenerateArgs, quiet: bool) -> i32 {
    match run_generate(args) {
        Ok(report) => {
            if !quiet {
                for warning in &report.warnings {
                    eprintln!("warning: {warning}");
                }
                summarize(&report);
            }
            0
        }
        Err(err) => {
            error!(error = %err, "generation failed");
            eprintln!("error: {err:#}");
            1
        }
    }
}

fn run_generate(args: &GenerateArgs) -> Result<GenerationReport> {
    let root = args
        .project_path
        .clone()
        .map_or_else(std::env::current_dir, Ok)
        .context("cannot determine current directory")?;

    let mut request = GenerateRequest::new(root);
    request.force_type = args.force_type.as_deref().map(TechnologyId::from_name);
    request.include = args
        .include
        .iter()
        .map(|name| TechnologyId::from_name(name))
        .collect();
    request.env_file = args.env_file.clone();
    request.bake = !args.no_bake;
    request.version_precedence = args.version_precedence.into();
    request.options = ComposeOptions {
        watch: !args.no_watch,
        gpu: !args.no_gpu,
        resource_limits: args.resource_limits,
        platform: match args.platform {
            PlatformArg::Auto => None,
            PlatformArg::Amd64 => Some(Platform::Amd64),
            PlatformArg::Arm64 => Some(Platform::Arm64),
        },
    };

    let report = Generator::with_defaults().generate(&request)?;

    if args.stdout {
        print!("{}", report.compose);
    } else {
        // Files are written only after the whole run succeeded; a failed run
        // leaves nothing behind.
        std::fs::write(&args.output, &report.compose)
            .with_context(|| format!("cannot write {}", args.output.display()))?;
        if let Some(bake) = &report.bake {
            let bake_path = bake_path(args);
            std::fs::write(&bake_path, bake)
                .with_context(|| format!("cannot write {}", bake_path.display()))?;
        }
    }
    Ok(report)
}

fn bake_path(args: &GenerateArgs) -> PathBuf {
    args.bake_output.clone().unwrap_or_else(|| {
        args.output
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("docker-bake.generated.hcl")
    })
}

fn summarize(report: &GenerationReport) {
    eprintln!("detected stack:");
    for entry in &report.stack.entries {
        eprintln!(
            "  {:<16} {:<10} {} ({})",
            entry.id.name(),
            format!("{:?}", entry.kind).to_lowercase(),
            entry.version,
            entry.origin
        );
    }
    if report.bake.is_some() {
        eprintln!("bake targets generated for buildable services");
    }
}

pub fn handle_list() -> i32 {
    let generator = Generator::with_defaults();
    for (kind, names) in generator.registry().list_supported() {
        let heading = match kind {
            TechKind::Language => "Languages",
            TechKind::Framework => "Frameworks",
            TechKind::Database => "Databases",
            TechKind::Tool => "Tools",
        };
        println!("{heading}:");
        for name in names {
            println!("  {name}");
        }
    }
    0
}
