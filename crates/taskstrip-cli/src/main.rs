//! taskstrip CLI - Build student tutorials from solution notebooks.

mod build;
mod colors;
mod loadtest;
mod preview;
mod strip;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use taskstrip_core::loadtest::LoadTest;
use taskstrip_core::{Config, TaskError};

#[derive(Parser)]
#[command(name = "taskstrip")]
#[command(about = "Build student tutorial notebooks from solution notebooks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ./taskstrip.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Strip task regions from a notebook and print the result
    Strip {
        /// Path to the solution notebook (.ipynb)
        input: PathBuf,
    },

    /// Regenerate out-of-date tutorial notebooks
    Build,

    /// Remove the tutorials directory
    Clean,

    /// Render task-only previews of the solution notebooks
    Preview {
        /// Notebooks to preview instead of the configured list
        notebooks: Vec<String>,

        /// Don't open the rendered files
        #[arg(long)]
        no_open: bool,
    },

    /// Run a notebook many times concurrently
    Loadtest {
        /// Path to the notebook to run
        notebook: PathBuf,

        /// Number of concurrent runs
        #[arg(short = 'n', long, default_value_t = LoadTest::DEFAULT_PROCESSES)]
        processes: usize,

        /// Per-run timeout in seconds
        #[arg(long, default_value_t = LoadTest::DEFAULT_TIMEOUT.as_secs())]
        timeout: u64,

        /// Directory for per-run logs
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,

        /// Runner command (default: uv run ipython)
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        runner: Option<Vec<String>>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; `strip` owns stdout.
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Helper to format taskstrip-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(task_err) = err.downcast_ref::<TaskError>() {
            anyhow::anyhow!("{}", task_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Strip { input } => strip::execute(&input).map_err(format_error)?,

        Commands::Build => {
            let config = Config::load(cli.config.as_deref())?;
            build::execute(&config).map_err(format_error)?;
        }

        Commands::Clean => {
            let config = Config::load(cli.config.as_deref())?;
            build::clean(&config).map_err(format_error)?;
        }

        Commands::Preview { notebooks, no_open } => {
            let config = Config::load(cli.config.as_deref())?;
            preview::execute(&config, &notebooks, !no_open).map_err(format_error)?;
        }

        Commands::Loadtest {
            notebook,
            processes,
            timeout,
            log_dir,
            runner,
        } => {
            let success = loadtest::execute(notebook, processes, timeout, &log_dir, runner)
                .await
                .map_err(format_error)?;
            if !success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
