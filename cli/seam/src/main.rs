//! Seam CLI: diagnostics, manifest inspection and invariant harnesses.

mod commands;
mod logging;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use seam_core::config::{self, BridgeConfig};

use commands::harness::HarnessMode;

#[derive(Parser)]
#[command(name = "seam", version, about = "Seam boundary runtime tools")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Configuration file (default: nearest seam.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version, resolved configuration and ledger status
    Doctor,
    /// Show the marshal path of every position in a signature manifest
    Inspect {
        /// Manifest file (*.seam.toml)
        manifest: PathBuf,
        /// Only this function
        #[arg(long)]
        function: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the C layout of a struct declared in a manifest
    Layout {
        /// Manifest file (*.seam.toml)
        manifest: PathBuf,
        /// Struct name
        name: String,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Calibrate the baseline, then measure reference export overhead
    Bench {
        /// Calls per measurement
        #[arg(long, default_value_t = 100_000)]
        iterations: u32,
    },
    /// Run a harness for an invariant that ends the process when violated
    Harness {
        #[arg(value_enum)]
        mode: HarnessMode,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let source = install_config(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Doctor => commands::doctor::run(source.as_deref()),
        Commands::Inspect {
            manifest,
            function,
            json,
        } => commands::inspect::run(&manifest, function.as_deref(), json),
        Commands::Layout {
            manifest,
            name,
            json,
        } => commands::layout::run(&manifest, &name, json),
        Commands::Bench { iterations } => commands::bench::run(iterations),
        Commands::Harness { mode } => commands::harness::run(mode),
    }
}

/// Load and install the configuration; returns where it came from.
fn install_config(explicit: Option<&Path>, cwd: &Path) -> anyhow::Result<Option<PathBuf>> {
    let (config, source) = match explicit {
        Some(path) => {
            let config = BridgeConfig::load(path)
                .with_context(|| format!("loading configuration {}", path.display()))?;
            (config, Some(path.to_path_buf()))
        }
        None => match BridgeConfig::find_and_load(cwd).context("searching for seam.toml")? {
            Some((config, dir)) => (config, Some(dir.join(config::CONFIG_FILE))),
            None => (BridgeConfig::default(), None),
        },
    };
    config::install(config).context("installing configuration")?;
    tracing::debug!(source = ?source, "configuration installed");
    Ok(source)
}
