//! Strip command implementation.
//!
//! Writes the tutorial version of one notebook to stdout, for use as
//! `taskstrip strip solutions/nb.ipynb > tutorials/nb.ipynb`.

use std::io::Write;
use std::path::Path;

use anyhow::Context;

/// Execute the strip command.
pub fn execute(input: &Path) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("Notebook not found: {}", input.display());
    }

    let json = taskstrip_core::strip_file(input)?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(json.as_bytes())
        .and_then(|_| stdout.flush())
        .context("Failed to write notebook to stdout")?;

    Ok(())
}
