mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::manifest::ManifestSubcommand;
use gsd_core::error::exit_code;
use gsd_core::platform::{Platform, Scope};
use gsd_core::preflight::ContentSelection;
use gsd_core::settings::Settings;
use gsd_core::InstallError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gsd-install",
    about = "Pre-install safety checks, manifests and legacy migration for get-shit-done",
    version,
    propagate_version = true
)]
struct Cli {
    /// Install target (default: project root for local scope, home for global)
    #[arg(long, global = true, env = "GSD_TARGET")]
    target: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log progress at info level
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    /// YAML settings file overriding retry, headroom and timeout defaults
    #[arg(long, global = true, env = "GSD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up and remove incompatible v1.x installations
    Migrate {
        /// Migrate without asking for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Check disk space, templates, permissions, paths and symlinks
    Preflight {
        /// Platforms to install for
        #[arg(long = "platform", required = true, num_args = 1..)]
        platforms: Vec<Platform>,

        #[arg(long, default_value = "local")]
        scope: Scope,

        /// Content to install: skills, agents, workflows or all
        #[arg(long, default_value = "all")]
        content: ContentSelection,

        /// Template source directory
        #[arg(long, default_value = "templates")]
        templates: PathBuf,

        /// Destination paths (relative to the target) to validate
        #[arg(long = "path", num_args = 1..)]
        paths: Vec<String>,
    },

    /// Report installed versions against this installer's version
    CheckUpdates {
        /// Only check one scope (default: both)
        #[arg(long)]
        scope: Option<Scope>,

        /// Manifest file or installation directory to check instead
        #[arg(long)]
        custom_path: Option<PathBuf>,
    },

    /// Inspect, rebuild or record an installation manifest
    Manifest {
        #[command(subcommand)]
        subcommand: ManifestSubcommand,
    },

    /// Show legacy installations and platform CLIs on PATH
    Detect {
        #[arg(long, default_value = "local")]
        scope: Scope,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = Settings::load_or_default(cli.config.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|settings| dispatch(cli, &settings));

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(exit_code_for(&e));
    }
}

fn dispatch(cli: Cli, settings: &Settings) -> anyhow::Result<()> {
    let target = cli.target.as_deref();
    match cli.command {
        Commands::Migrate { yes } => cmd::migrate::run(target, settings, yes, cli.json),
        Commands::Preflight {
            platforms,
            scope,
            content,
            templates,
            paths,
        } => cmd::preflight::run(
            target,
            settings,
            cmd::preflight::PreflightArgs {
                platforms,
                scope,
                content,
                templates,
                paths,
            },
            cli.json,
        ),
        Commands::CheckUpdates { scope, custom_path } => {
            cmd::check_updates::run(target, settings, scope, custom_path.as_deref(), cli.json)
        }
        Commands::Manifest { subcommand } => cmd::manifest::run(target, settings, subcommand, cli.json),
        Commands::Detect { scope } => cmd::detect::run(target, settings, scope, cli.json),
    }
}

/// Exit code of the first installer error in the chain, 1 otherwise.
fn exit_code_for(e: &anyhow::Error) -> i32 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<InstallError>())
        .map_or(exit_code::GENERAL_ERROR, InstallError::exit_code)
}
