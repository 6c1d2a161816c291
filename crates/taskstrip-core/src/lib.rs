//! Tutorial builder for Jupyter notebooks.
//!
//! Turns instructor "solution" notebooks into student "tutorial" notebooks by
//! replacing every `##TASK>` ... `##<TASKEND` region with a placeholder, and
//! renders task-only previews of the solutions for review.
//!
//! # Architecture
//!
//! ```text
//! solutions/nb.ipynb ──► JupyterNotebook ──► strip_tasks ──► tutorials/nb.ipynb
//!                              │
//!                              ▼
//!                     filter_for_preview ──► Converter (nbconvert) ──► print/nb.html
//! ```

mod error;
mod ipynb;

pub mod batch;
pub mod config;
pub mod loadtest;
pub mod markers;
pub mod preview;

pub use batch::{BuildJob, BuildReport, Freshness, build_all, clean};
pub use config::{Config, PreviewConfig};
pub use error::{TaskError, TaskResult};
pub use ipynb::{CellSource, JupyterCell, JupyterNotebook};
pub use markers::strip_notebook;
pub use preview::{Converter, filter_for_preview, preview_notebook};

use std::path::Path;

/// Strip a solution notebook file, returning the tutorial as nbformat JSON.
pub fn strip_file(input: impl AsRef<Path>) -> TaskResult<String> {
    let input = input.as_ref();
    let mut notebook = JupyterNotebook::read_from_file(input)?;
    let regions = notebook.strip_tasks();

    tracing::info!(
        "Stripped {} ({} cells, {} regions)",
        input.display(),
        notebook.cells.len(),
        regions
    );

    notebook.to_json_string()
}

/// Get the tutorial path for a solution notebook.
pub fn tutorial_path(
    input: impl AsRef<Path>,
    tutorials_dir: impl AsRef<Path>,
) -> std::path::PathBuf {
    let input = input.as_ref();
    match input.file_name() {
        Some(name) => tutorials_dir.as_ref().join(name),
        None => tutorials_dir.as_ref().to_path_buf(),
    }
}
