//! Error types for the strip and preview pipeline.

use std::path::PathBuf;

/// Result type for taskstrip operations.
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors that can occur while building or previewing notebooks.
///
/// Unmatched task markers are deliberately absent: a begin marker without an
/// end marker leaves the cell untouched.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Failed to read a notebook or config file.
    #[error("Failed to read file {path}: {message}")]
    ReadError { path: PathBuf, message: String },

    /// Failed to write an output file.
    #[error("Failed to write file {path}: {message}")]
    WriteError { path: PathBuf, message: String },

    /// Failed to serialize/deserialize notebook JSON.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid notebook structure.
    #[error("Invalid notebook: {0}")]
    InvalidNotebook(String),

    /// Config file could not be parsed.
    #[error("Invalid config {path}: {message}")]
    ConfigError { path: PathBuf, message: String },

    /// The external document converter could not be started.
    #[error("Converter `{program}` could not be started: {message}")]
    ConverterSpawn { program: String, message: String },

    /// The external document converter ran but reported failure.
    #[error("Converter `{program}` failed ({status})")]
    ConverterFailed { program: String, status: String },

    /// The converted artifact could not be opened in a viewer.
    #[error("Failed to open {path}: {message}")]
    OpenError { path: PathBuf, message: String },

    /// The load-test runner could not be used.
    #[error("Runner error: {0}")]
    RunnerError(String),
}

impl TaskError {
    /// Format the error with a recovery hint where one is known.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            TaskError::ConverterSpawn { .. } => Some(
                "install Jupyter (`pip install nbconvert`) or set `preview.converter` in taskstrip.toml",
            ),
            TaskError::ConverterFailed { .. } => {
                Some("run the converter by hand on the notebook to see its full output")
            }
            TaskError::JsonError(_) => Some("check that the input is a valid .ipynb file"),
            TaskError::ConfigError { .. } => {
                Some("valid keys are `solutions_dir`, `tutorials_dir` and a `[preview]` table")
            }
            _ => None,
        };

        match hint {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_for_missing_converter() {
        let err = TaskError::ConverterSpawn {
            program: "jupyter".to_string(),
            message: "not found in PATH".to_string(),
        };
        let rendered = err.with_hint();
        assert!(rendered.starts_with("Converter `jupyter` could not be started"));
        assert!(rendered.contains("hint:"));
    }

    #[test]
    fn test_no_hint_for_io() {
        let err = TaskError::IoError(std::io::Error::other("boom"));
        assert_eq!(err.with_hint(), "I/O error: boom");
    }
}
