//! Preview command implementation.
//!
//! Renders the task cells of each configured solution notebook and opens the
//! result for review.

use std::path::PathBuf;
use std::time::Instant;

use taskstrip_core::{Config, Converter, preview_notebook};

use crate::colors;

/// Execute the preview command.
///
/// `notebooks` overrides the configured list when non-empty. Notebooks are
/// processed in order and the first failure stops the run.
pub fn execute(config: &Config, notebooks: &[String], open: bool) -> anyhow::Result<()> {
    let inputs: Vec<PathBuf> = if notebooks.is_empty() {
        config.preview_inputs()
    } else {
        notebooks
            .iter()
            .map(|name| config.preview.input_dir.join(name))
            .collect()
    };

    colors::header(
        "taskstrip preview",
        &format!(
            "{} notebook(s) → {}",
            inputs.len(),
            config.preview.output_dir.display()
        ),
    );

    let converter = Converter::from_config(&config.preview);

    for input in &inputs {
        if !input.exists() {
            anyhow::bail!("Notebook not found: {}", input.display());
        }

        let start = Instant::now();
        print!(
            "  {} ... ",
            input.file_name().unwrap_or_default().to_string_lossy()
        );
        colors::flush_stdout();

        match preview_notebook(input, &converter, &config.preview.output_dir, open) {
            Ok(artifact) => println!(
                "{}✓{} {}{}{} ({:.2}s)",
                colors::GREEN,
                colors::RESET,
                colors::CYAN,
                artifact.display(),
                colors::RESET,
                start.elapsed().as_secs_f64()
            ),
            Err(e) => {
                println!("{}✗{}", colors::RED, colors::RESET);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
