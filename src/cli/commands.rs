use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Docker Compose and bake file generator driven by project detection
#[derive(Parser, Debug)]
#[command(
    name = "composegen",
    about = "Generate docker-compose and docker-bake files from project structure",
    version,
    author,
    long_about = "composegen scans a project tree, detects the languages, frameworks, \
                  databases, and tools in use from manifests, signature files, and \
                  environment variables, and generates a ready-to-run docker-compose \
                  file plus an optional docker-bake build definition."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Increase verbosity (can be used multiple times)"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Detect the project stack and generate compose files",
        long_about = "Scans the project tree, detects its technology stack, and writes a \
                      docker-compose file plus an optional docker-bake definition.\n\n\
                      Examples:\n  \
                      composegen generate\n  \
                      composegen generate /path/to/project\n  \
                      composegen generate --include redis --include nginx\n  \
                      composegen generate --force-type python --no-bake"
    )]
    Generate(GenerateArgs),

    #[command(
        about = "List supported technologies",
        long_about = "Prints every technology the built-in template registry supports, \
                      grouped by kind. These are the names accepted by --force-type and \
                      --include."
    )]
    List,
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to project root (defaults to current directory)"
    )]
    pub project_path: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        default_value = "docker-compose.generated.yml",
        help = "Compose output file"
    )]
    pub output: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        help = "Bake output file (defaults to docker-bake.generated.hcl next to the compose file)"
    )]
    pub bake_output: Option<PathBuf>,

    #[arg(
        short = 't',
        long,
        value_name = "TECH",
        help = "Force the primary technology instead of detecting it"
    )]
    pub force_type: Option<String>,

    #[arg(
        short = 'i',
        long,
        value_name = "TECH",
        help = "Add a technology the scan would not have picked (repeatable)"
    )]
    pub include: Vec<String>,

    #[arg(
        short = 'e',
        long,
        value_name = "FILE",
        help = "Extra env file to inspect for database hints and version overrides"
    )]
    pub env_file: Option<PathBuf>,

    #[arg(long, help = "Skip GPU device reservations even when CUDA deps are present")]
    pub no_gpu: bool,

    #[arg(long, help = "Do not generate a docker-bake file")]
    pub no_bake: bool,

    #[arg(long, help = "Do not emit develop.watch sections")]
    pub no_watch: bool,

    #[arg(
        long,
        value_enum,
        default_value = "auto",
        help = "Pin services and bake targets to a platform"
    )]
    pub platform: PlatformArg,

    #[arg(long, help = "Emit per-service CPU and memory limits")]
    pub resource_limits: bool,

    #[arg(
        long,
        value_enum,
        default_value = "environment",
        help = "Which source wins when environment and manifest disagree on a version"
    )]
    pub version_precedence: VersionPrecedenceArg,

    #[arg(long, help = "Print the compose document to stdout instead of writing files")]
    pub stdout: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformArg {
    /// No platform pin; images resolve for the running host.
    Auto,
    Amd64,
    Arm64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPrecedenceArg {
    Environment,
    Manifest,
}

impl From<VersionPrecedenceArg> for crate::stack::VersionPrecedence {
    fn from(arg: VersionPrecedenceArg) -> Self {
        match arg {
            VersionPrecedenceArg::Environment => Self::Environment,
            VersionPrecedenceArg::Manifest => Self::Manifest,
        }
    }
}
