//! Jupyter notebook (.ipynb) reading and writing.
//!
//! Only the fields the pipeline touches are typed. Everything else is kept
//! in order-preserving maps, so reading and writing a notebook is lossless.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{TaskError, TaskResult};

/// A Jupyter notebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JupyterNotebook {
    /// Notebook cells
    pub cells: Vec<JupyterCell>,

    /// `metadata`, `nbformat`, `nbformat_minor` and anything else, verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A Jupyter cell.
///
/// The cell is kept as its raw key map, in input order. `cell_type` and
/// `source` are read through typed accessors; a rewritten `source` keeps its
/// position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JupyterCell {
    /// Every cell key verbatim
    pub fields: Map<String, Value>,
}

/// Cell source, either one text block or a list of lines.
///
/// nbformat allows both. Lines keep their trailing `\n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellSource {
    Lines(Vec<String>),
    Text(String),
}

impl CellSource {
    /// The source as an ordered list of lines, newline terminators included.
    pub fn lines(&self) -> Vec<String> {
        match self {
            CellSource::Lines(lines) => lines.clone(),
            CellSource::Text(text) => text.split_inclusive('\n').map(String::from).collect(),
        }
    }

    /// The source rendered as a single string.
    pub fn rendered(&self) -> String {
        match self {
            CellSource::Lines(lines) => lines.concat(),
            CellSource::Text(text) => text.clone(),
        }
    }

    /// Build a source of the same representation from new lines.
    pub fn with_lines(&self, lines: Vec<String>) -> CellSource {
        match self {
            CellSource::Lines(_) => CellSource::Lines(lines),
            CellSource::Text(_) => CellSource::Text(lines.concat()),
        }
    }
}

impl JupyterCell {
    /// Cell type (`code`, `markdown`, `raw`).
    pub fn cell_type(&self) -> &str {
        self.fields
            .get("cell_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Whether this is an executable code cell.
    pub fn is_code(&self) -> bool {
        self.cell_type() == "code"
    }

    /// The cell source, if it is a string or a list of strings.
    ///
    /// A missing, null or otherwise shaped `source` reads as `None` and is
    /// written back untouched.
    pub fn source(&self) -> Option<CellSource> {
        let value = self.fields.get("source")?;
        CellSource::deserialize(value).ok()
    }

    /// Replace the cell source in place.
    pub fn set_source(&mut self, source: CellSource) {
        let value = match source {
            CellSource::Lines(lines) => Value::from(lines),
            CellSource::Text(text) => Value::String(text),
        };
        self.fields.insert("source".to_string(), value);
    }

    /// Drop execution results: `outputs` becomes `[]`, `execution_count` null.
    pub fn clear_outputs(&mut self) {
        self.fields
            .insert("outputs".to_string(), Value::Array(Vec::new()));
        self.fields.insert("execution_count".to_string(), Value::Null);
    }
}

impl JupyterNotebook {
    /// Parse a notebook from JSON text.
    pub fn from_json(json: &str) -> TaskResult<Self> {
        let notebook: Self = serde_json::from_str(json)?;
        for (index, cell) in notebook.cells.iter().enumerate() {
            if !cell.fields.get("cell_type").is_some_and(Value::is_string) {
                return Err(TaskError::InvalidNotebook(format!(
                    "cell {} has no string `cell_type`",
                    index
                )));
            }
        }
        Ok(notebook)
    }

    /// Serialize in nbformat's on-disk style: one-space indent, trailing newline.
    pub fn to_json_string(&self) -> TaskResult<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        buf.push(b'\n');

        // serde_json only ever emits UTF-8.
        String::from_utf8(buf).map_err(|e| TaskError::InvalidNotebook(e.to_string()))
    }

    /// Write the notebook to a file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> TaskResult<()> {
        let path = path.as_ref();
        let json = self.to_json_string()?;
        fs::write(path, json).map_err(|e| TaskError::WriteError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Read a notebook from a file.
    pub fn read_from_file(path: impl AsRef<Path>) -> TaskResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| TaskError::ReadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }
}
