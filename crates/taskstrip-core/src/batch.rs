//! Batch build of tutorial notebooks.
//!
//! Every `*.ipynb` in the solutions directory maps to the same file name in
//! the tutorials directory. Like a make rule, an output is regenerated only
//! when it is missing or older than its input or the stripping tool.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{TaskError, TaskResult};
use crate::ipynb::JupyterNotebook;

/// One solution → tutorial mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Whether a job's output needs regenerating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Output does not exist yet.
    Missing,
    /// Input (or the tool) changed after the output was written.
    Stale,
    /// Output is newer than everything it depends on.
    UpToDate,
}

impl Freshness {
    pub fn needs_build(self) -> bool {
        !matches!(self, Freshness::UpToDate)
    }
}

/// Outcome of a batch build.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Outputs that were (re)written, with their stripped region count
    pub built: Vec<(PathBuf, usize)>,

    /// Outputs that were already up to date
    pub skipped: Vec<PathBuf>,
}

fn is_notebook(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "ipynb")
}

/// List the build jobs for a solutions directory, in file-name order.
pub fn discover_jobs(solutions_dir: &Path, tutorials_dir: &Path) -> TaskResult<Vec<BuildJob>> {
    let entries = fs::read_dir(solutions_dir).map_err(|e| TaskError::ReadError {
        path: solutions_dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut inputs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if is_notebook(&path) {
            inputs.push(path);
        }
    }
    inputs.sort();

    Ok(inputs
        .into_iter()
        .map(|input| BuildJob {
            output: crate::tutorial_path(&input, tutorials_dir),
            input,
        })
        .collect())
}

fn modified(path: &Path) -> TaskResult<SystemTime> {
    Ok(fs::metadata(path)?.modified()?)
}

impl BuildJob {
    /// Compare modification times, `tool_mtime` being the stripping tool's.
    pub fn freshness(&self, tool_mtime: Option<SystemTime>) -> TaskResult<Freshness> {
        if !self.output.exists() {
            return Ok(Freshness::Missing);
        }

        let output_mtime = modified(&self.output)?;
        let input_mtime = modified(&self.input)?;
        let newest_dep = match tool_mtime {
            Some(tool) => input_mtime.max(tool),
            None => input_mtime,
        };

        if newest_dep > output_mtime {
            Ok(Freshness::Stale)
        } else {
            Ok(Freshness::UpToDate)
        }
    }

    /// Strip the input and write the output, returning the region count.
    pub fn run(&self) -> TaskResult<usize> {
        let mut notebook = JupyterNotebook::read_from_file(&self.input)?;
        let regions = notebook.strip_tasks();
        notebook.write_to_file(&self.output)?;

        tracing::info!(
            "Stripped {} → {} ({} regions)",
            self.input.display(),
            self.output.display(),
            regions
        );
        Ok(regions)
    }
}

/// Build every stale tutorial notebook.
///
/// Jobs run in file-name order; the first failure aborts the batch.
pub fn build_all(
    solutions_dir: &Path,
    tutorials_dir: &Path,
    tool_mtime: Option<SystemTime>,
) -> TaskResult<BuildReport> {
    let jobs = discover_jobs(solutions_dir, tutorials_dir)?;
    if jobs.is_empty() {
        tracing::warn!("No notebooks found in {}", solutions_dir.display());
    }

    fs::create_dir_all(tutorials_dir)?;

    let mut report = BuildReport::default();
    for job in jobs {
        let freshness = job.freshness(tool_mtime)?;
        if freshness.needs_build() {
            tracing::debug!("{} is {:?}", job.output.display(), freshness);
            let regions = job.run()?;
            report.built.push((job.output, regions));
        } else {
            report.skipped.push(job.output);
        }
    }

    Ok(report)
}

/// Remove the tutorials directory. Returns whether anything was removed.
pub fn clean(tutorials_dir: &Path) -> TaskResult<bool> {
    if !tutorials_dir.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(tutorials_dir)?;
    tracing::info!("Removed {}", tutorials_dir.display());
    Ok(true)
}
