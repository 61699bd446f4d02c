use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use appset::backend;
use appset::batch::{self, Options};
use appset::cmd::SystemRunner;
use appset::manifest::{self, Manifest, ManifestSource};
use appset::util::detect_privilege;

/// Install a desktop application set via pacman, the AUR, or flatpak
#[derive(Debug, Parser)]
#[command(name = "appset", version, about)]
struct Cli {
    /// Manifest path (yaml/yml/json/toml), http(s) URL, or "-" for stdin.
    /// Defaults to the built-in registry.
    manifest: Option<String>,

    /// Resolve without installing or provisioning anything
    #[arg(long)]
    dry_run: bool,

    /// Only process the entry whose name or flatpak id matches
    #[arg(long, value_name = "NAME")]
    only: Option<String>,

    /// Print the loaded registry and exit
    #[arg(long)]
    list: bool,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            let code = err
                .downcast_ref::<appset::Error>()
                .map(appset::Error::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let source = ManifestSource::from_arg(cli.manifest.as_deref());
    let mut manifest = manifest::load(&source)
        .with_context(|| format!("Failed to load manifest from {}", source.describe()))?;

    if let Some(query) = &cli.only {
        manifest::select_only(&mut manifest, query)?;
    }

    if cli.list {
        print_registry(&manifest);
        return Ok(());
    }

    let privilege = detect_privilege();
    tracing::debug!(privilege = privilege.name(), "detected privilege");

    let chain = backend::default_chain(Arc::new(SystemRunner), &manifest.settings, privilege);
    let opts = Options {
        dry_run: cli.dry_run,
        privilege,
    };

    if cli.dry_run {
        println!("{}", "Dry run: nothing will be installed".yellow());
    }

    let report = batch::run(&chain, &manifest.packages, &opts)?;
    batch::print_summary(&report, cli.dry_run);

    Ok(())
}

fn print_registry(manifest: &Manifest) {
    for request in &manifest.packages {
        let flatpak = match (request.sandbox_id(), request.force_sandbox) {
            (Some(id), true) => format!("{} (flatpak only)", id),
            (Some(id), false) => id.to_string(),
            (None, _) => "-".dimmed().to_string(),
        };
        println!("{:<28} {}", request.name, flatpak);
    }
}
