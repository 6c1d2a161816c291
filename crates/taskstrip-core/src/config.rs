//! Pipeline configuration.
//!
//! Defaults describe the usual layout (`solutions/` in, `tutorials/` out,
//! previews in `print/`). A `taskstrip.toml` next to the notebooks can
//! override any of them:
//!
//! ```toml
//! solutions_dir = "solutions"
//! tutorials_dir = "tutorials"
//!
//! [preview]
//! format = "webpdf"
//! notebooks = ["01_Intro.ipynb", "05_Benchmarking.ipynb"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{TaskError, TaskResult};

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "taskstrip.toml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the instructor notebooks
    pub solutions_dir: PathBuf,

    /// Directory the student notebooks are written to
    pub tutorials_dir: PathBuf,

    /// Preview rendering
    pub preview: PreviewConfig,
}

/// Preview rendering settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Directory the previewed notebooks are read from
    pub input_dir: PathBuf,

    /// Directory rendered previews are written to
    pub output_dir: PathBuf,

    /// nbconvert export format (`html`, `webpdf`, `pdf`, ...)
    pub format: String,

    /// Notebooks to preview, relative to `input_dir`
    pub notebooks: Vec<String>,

    /// Converter program
    pub converter: String,

    /// Arguments placed before the generated ones
    pub converter_args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solutions_dir: PathBuf::from("solutions"),
            tutorials_dir: PathBuf::from("tutorials"),
            preview: PreviewConfig::default(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("solutions"),
            output_dir: PathBuf::from("print"),
            format: "html".to_string(),
            notebooks: vec!["05_Benchmarking.ipynb".to_string()],
            converter: "jupyter".to_string(),
            converter_args: vec!["nbconvert".to_string()],
        }
    }
}

impl Config {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str, path: &Path) -> TaskResult<Self> {
        toml::from_str(text).map_err(|e| TaskError::ConfigError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, `taskstrip.toml` in the
    /// working directory is used when present, else the defaults.
    pub fn load(path: Option<&Path>) -> TaskResult<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = fs::read_to_string(&path).map_err(|e| TaskError::ReadError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml(&text, &path)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Paths of the notebooks to preview.
    pub fn preview_inputs(&self) -> Vec<PathBuf> {
        self.preview
            .notebooks
            .iter()
            .map(|name| self.preview.input_dir.join(name))
            .collect()
    }
}
