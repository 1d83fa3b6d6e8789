//! `seam doctor`: runtime diagnostics.

use std::path::Path;

use anyhow::{Context, Result};
use seam_core::{calibration, config, ledger};

/// Print version, the installed configuration and ledger status.
pub fn run(source: Option<&Path>) -> Result<()> {
    println!("=== Seam Doctor ===");
    println!();
    println!("Seam version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "Pointer width: {} bits",
        std::mem::size_of::<usize>() * 8
    );
    println!();

    println!("--- Configuration ---");
    match source {
        Some(path) => println!("  source: {}", path.display()),
        None => println!("  source: defaults ({} not found)", config::CONFIG_FILE),
    }
    let current = config::current();
    let rendered = toml::to_string_pretty(current).context("rendering configuration")?;
    for line in rendered.lines() {
        println!("  {line}");
    }
    println!(
        "  unchecked callback failure: {}",
        current.callbacks.unchecked_failure.name()
    );
    println!();

    println!("--- Runtime State ---");
    println!("  live allocations: {}", ledger::live_count());
    println!(
        "  calibrated:       {}",
        if calibration::is_calibrated() { "yes" } else { "no" }
    );

    Ok(())
}
