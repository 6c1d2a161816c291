//! Load test command implementation.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use taskstrip_core::loadtest::{LoadTest, RunOutcome, Summary, run_load_test, write_logs};

use crate::colors;

/// Print one line as a run finishes.
fn print_progress(outcome: &RunOutcome) {
    if outcome.success {
        println!(
            "  {}✓{} Process {} completed successfully in {:.2}s",
            colors::GREEN,
            colors::RESET,
            outcome.test_id,
            outcome.duration.as_secs_f64()
        );
    } else {
        println!(
            "  {}✗{} Process {} failed: {}",
            colors::RED,
            colors::RESET,
            outcome.test_id,
            outcome.reason()
        );
    }
    colors::flush_stdout();
}

/// Execute the load test. Returns whether every run succeeded.
pub async fn execute(
    notebook: PathBuf,
    processes: usize,
    timeout_secs: u64,
    log_dir: &Path,
    runner: Option<Vec<String>>,
) -> anyhow::Result<bool> {
    if processes == 0 {
        anyhow::bail!("--processes must be at least 1");
    }

    let test = LoadTest {
        runner: runner.unwrap_or_else(LoadTest::default_runner),
        notebook,
        processes,
        timeout: Duration::from_secs(timeout_secs),
    };

    colors::header(
        "taskstrip loadtest",
        &format!("{} × {}", test.processes, test.notebook.display()),
    );
    println!(
        "{}Runner: {}{}",
        colors::DIM,
        test.runner.join(" "),
        colors::RESET
    );

    println!("Started at: {}", Local::now());

    let start = Instant::now();
    let outcomes = run_load_test(&test, print_progress).await?;
    let summary = Summary::from_outcomes(&outcomes, start.elapsed());

    println!("\n{}", "=".repeat(50));
    println!("{}LOAD TEST SUMMARY{}", colors::BOLD, colors::RESET);
    println!("{}", "=".repeat(50));
    println!("Total processes: {}", summary.total);
    println!("Successful: {}", summary.successful);
    println!("Failed: {}", summary.failed);
    println!("Success rate: {:.1}%", summary.success_rate);
    println!(
        "Average process duration: {:.2}s",
        summary.average_duration.as_secs_f64()
    );
    println!("Total test duration: {:.2}s", summary.total_duration.as_secs_f64());
    println!("Completed at: {}", Local::now());

    if summary.failed > 0 {
        println!("\n{}FAILED PROCESSES:{}", colors::YELLOW, colors::RESET);
        for outcome in outcomes.iter().filter(|o| !o.success) {
            println!("  Process {}: {}", outcome.test_id, outcome.reason());
        }
    }

    write_logs(log_dir, &outcomes)?;
    println!("\nLogs written to {}", log_dir.display());

    Ok(summary.failed == 0)
}
