//! Review previews of solution notebooks.
//!
//! Keeps only the cells that carry a task marker, clears their execution
//! results, and renders the result through an external converter
//! (`jupyter nbconvert` by default).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::PreviewConfig;
use crate::error::{TaskError, TaskResult};
use crate::ipynb::{JupyterCell, JupyterNotebook};
use crate::markers::BEGIN_TOKEN;

/// Whether a cell belongs in the preview.
pub fn is_task_cell(cell: &JupyterCell) -> bool {
    cell.source().is_some_and(|source| source.rendered().contains(BEGIN_TOKEN))
}

/// Keep task cells only; code cells lose their outputs and execution count.
pub fn filter_for_preview(notebook: &JupyterNotebook) -> JupyterNotebook {
    let cells = notebook
        .cells
        .iter()
        .filter(|cell| is_task_cell(cell))
        .cloned()
        .map(|mut cell| {
            if cell.is_code() {
                cell.clear_outputs();
            }
            cell
        })
        .collect();

    JupyterNotebook {
        cells,
        extra: notebook.extra.clone(),
    }
}

/// File extension nbconvert uses for an export format.
pub fn artifact_extension(format: &str) -> &str {
    match format {
        "webpdf" | "pdf" => "pdf",
        "latex" => "tex",
        "markdown" => "md",
        "python" => "py",
        "rst" => "rst",
        "slides" => "slides.html",
        other => other,
    }
}

/// External document converter.
#[derive(Debug, Clone)]
pub struct Converter {
    /// Program to run
    program: String,

    /// Leading arguments (e.g. `nbconvert`)
    args: Vec<String>,

    /// Export format passed as `--to`
    format: String,
}

impl Converter {
    /// Create a converter from the preview configuration.
    pub fn from_config(config: &PreviewConfig) -> Self {
        Self {
            program: config.converter.clone(),
            args: config.converter_args.clone(),
            format: config.format.clone(),
        }
    }

    /// Path the converter will write for a notebook named `stem`.
    pub fn artifact_path(&self, output_dir: &Path, stem: &str) -> PathBuf {
        output_dir.join(format!("{}.{}", stem, artifact_extension(&self.format)))
    }

    /// Arguments after the program name, for a notebook read from stdin.
    pub fn command_args(&self, output_dir: &Path, stem: &str) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend([
            "--to".to_string(),
            self.format.clone(),
            "--stdin".to_string(),
            "--output".to_string(),
            stem.to_string(),
            "--output-dir".to_string(),
            output_dir.display().to_string(),
        ]);
        args
    }

    /// Pipe `notebook` into the converter and wait for it to finish.
    ///
    /// Returns the path of the produced artifact.
    pub fn convert(
        &self,
        notebook: &JupyterNotebook,
        output_dir: &Path,
        stem: &str,
    ) -> TaskResult<PathBuf> {
        let program = which::which(&self.program).map_err(|e| TaskError::ConverterSpawn {
            program: self.program.clone(),
            message: e.to_string(),
        })?;

        let payload = notebook.to_json_string()?;

        tracing::debug!(
            "Running {} {}",
            program.display(),
            self.command_args(output_dir, stem).join(" ")
        );

        let mut child = Command::new(&program)
            .args(self.command_args(output_dir, stem))
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| TaskError::ConverterSpawn {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // An early exit closes the pipe; the exit status below reports it.
            if let Err(e) = stdin.write_all(payload.as_bytes()) {
                tracing::debug!("Converter closed stdin: {}", e);
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(TaskError::ConverterFailed {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }

        let artifact = self.artifact_path(output_dir, stem);
        tracing::info!("Converted {} → {}", stem, artifact.display());
        Ok(artifact)
    }
}

/// Command that opens `path` in the platform's default viewer.
fn opener_command(path: &Path) -> TaskResult<Command> {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        Ok(cmd)
    } else if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        Ok(cmd)
    } else {
        let opener = which::which("xdg-open").map_err(|e| TaskError::OpenError {
            path: path.to_path_buf(),
            message: format!("xdg-open: {}", e),
        })?;
        let mut cmd = Command::new(opener);
        cmd.arg(path);
        Ok(cmd)
    }
}

/// Open a converted artifact with the platform's default viewer.
pub fn open_artifact(path: &Path) -> TaskResult<()> {
    let status = opener_command(path)?
        .status()
        .map_err(|e| TaskError::OpenError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if !status.success() {
        return Err(TaskError::OpenError {
            path: path.to_path_buf(),
            message: format!("viewer exited with {}", status),
        });
    }
    Ok(())
}

/// Filter, convert and optionally open one solution notebook.
pub fn preview_notebook(
    input: &Path,
    converter: &Converter,
    output_dir: &Path,
    open: bool,
) -> TaskResult<PathBuf> {
    let notebook = JupyterNotebook::read_from_file(input)?;
    let filtered = filter_for_preview(&notebook);
    tracing::debug!(
        "{}: kept {} of {} cells",
        input.display(),
        filtered.cells.len(),
        notebook.cells.len()
    );

    std::fs::create_dir_all(output_dir)?;

    let stem = input
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let artifact = converter.convert(&filtered, output_dir, &stem)?;

    if open {
        open_artifact(&artifact)?;
    }
    Ok(artifact)
}
