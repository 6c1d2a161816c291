//! Build and clean command implementations.

use std::time::{Instant, SystemTime};

use taskstrip_core::{Config, build_all};

use crate::colors;

/// Modification time of the running executable, if it can be determined.
///
/// A rebuilt `taskstrip` makes every tutorial stale, like a make rule that
/// lists the filter script as a prerequisite.
fn tool_mtime() -> Option<SystemTime> {
    let exe = std::env::current_exe().ok()?;
    std::fs::metadata(exe).ok()?.modified().ok()
}

/// Execute the build command.
pub fn execute(config: &Config) -> anyhow::Result<()> {
    let start = Instant::now();

    if !config.solutions_dir.is_dir() {
        anyhow::bail!(
            "Solutions directory not found: {}",
            config.solutions_dir.display()
        );
    }

    colors::header(
        "taskstrip build",
        &format!(
            "{} → {}",
            config.solutions_dir.display(),
            config.tutorials_dir.display()
        ),
    );

    let report = build_all(&config.solutions_dir, &config.tutorials_dir, tool_mtime())?;

    for (output, regions) in &report.built {
        println!(
            "  {}✓{} {} ({} regions)",
            colors::GREEN,
            colors::RESET,
            output.display(),
            regions
        );
    }
    for output in &report.skipped {
        println!(
            "  {}- {} (up to date){}",
            colors::DIM,
            output.display(),
            colors::RESET
        );
    }

    println!("{}", "─".repeat(50));
    println!(
        "Built {}, skipped {} in {:.2}ms",
        report.built.len(),
        report.skipped.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}

/// Execute the clean command.
pub fn clean(config: &Config) -> anyhow::Result<()> {
    if taskstrip_core::clean(&config.tutorials_dir)? {
        println!(
            "{}Removed{} {}",
            colors::GREEN,
            colors::RESET,
            config.tutorials_dir.display()
        );
    } else {
        println!("Nothing to clean: {} does not exist", config.tutorials_dir.display());
    }
    Ok(())
}
