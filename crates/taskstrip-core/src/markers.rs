//! Task-marker stripping.
//!
//! A solution notebook marks each exercise region with a begin line and an
//! end line:
//!
//! ```text
//!     ##TASK> build the model
//!     model = Model()
//!     ...
//!     ##<TASKEND
//! ```
//!
//! The region, markers included, is replaced by a placeholder block indented
//! like the begin line:
//!
//! ```text
//!     ####################################################################################
//!     # YOUR CODE BELOW
//!     ####################################################################################
//!
//!
//!     ####################################################################################
//!     # UNTIL HERE
//!     ####################################################################################
//! ```

use crate::ipynb::{CellSource, JupyterCell, JupyterNotebook};

/// Token that opens a solution region.
pub const BEGIN_TOKEN: &str = "##TASK>";

/// Token that closes a solution region.
pub const END_TOKEN: &str = "##<TASKEND";

/// Label placed above the student's blank.
pub const LABEL_BELOW: &str = "YOUR CODE BELOW";

/// Label placed below the student's blank.
pub const LABEL_UNTIL: &str = "UNTIL HERE";

/// Total width of a separator line, indentation included.
pub const SEPARATOR_WIDTH: usize = 88;

/// Separator fill character.
pub const SEPARATOR_FILL: char = '#';

/// Number of lines in a placeholder block.
pub const PLACEHOLDER_LINES: usize = 8;

/// Leading whitespace of a begin-marker line, or `None` if `line` is not one.
pub fn begin_marker_indent(line: &str) -> Option<&str> {
    let rest = line.trim_start();
    rest.starts_with(BEGIN_TOKEN).then(|| &line[..line.len() - rest.len()])
}

/// Whether `line` is an end-marker line.
pub fn is_end_marker(line: &str) -> bool {
    line.trim_start().starts_with(END_TOKEN)
}

/// Build the placeholder block for a region whose begin line had `indent`.
///
/// An indent of 88 characters or more leaves no room for fill; the separator
/// is then the bare indent.
pub fn placeholder_block(indent: &str) -> Vec<String> {
    let fill = SEPARATOR_WIDTH.saturating_sub(indent.chars().count());
    let separator = format!(
        "{}{}\n",
        indent,
        SEPARATOR_FILL.to_string().repeat(fill)
    );
    let label = |text: &str| format!("{}{} {}\n", indent, SEPARATOR_FILL, text);

    vec![
        separator.clone(),
        label(LABEL_BELOW),
        separator.clone(),
        "\n".to_string(),
        "\n".to_string(),
        separator.clone(),
        label(LABEL_UNTIL),
        separator,
    ]
}

/// Replace every marked region in `lines`, returning how many were replaced.
///
/// Each pass takes the first begin marker and the first end marker after it.
/// A begin marker without a later end marker stops the scan and leaves the
/// rest of the buffer as is.
pub fn strip_lines(lines: &mut Vec<String>) -> usize {
    let mut regions = 0;
    // Nothing before `start` can hold a begin marker: it is either scanned
    // text or an inserted placeholder block.
    let mut start = 0;

    loop {
        let Some((begin, indent)) = lines[start..].iter().enumerate().find_map(|(i, line)| {
            begin_marker_indent(line).map(|indent| (start + i, indent.to_string()))
        }) else {
            break;
        };

        let Some(end) = lines[begin + 1..]
            .iter()
            .position(|line| is_end_marker(line))
            .map(|offset| begin + 1 + offset)
        else {
            tracing::debug!(
                "Unmatched {} at line {}, leaving the rest as is",
                BEGIN_TOKEN,
                begin
            );
            break;
        };

        tracing::debug!("Stripping task region at lines {}..={}", begin, end);
        lines.splice(begin..=end, placeholder_block(&indent));
        start = begin + PLACEHOLDER_LINES;
        regions += 1;
    }

    regions
}

/// Strip a cell source, returning the rewritten source and its region
/// count, or `None` when nothing changed.
pub fn strip_source(source: &CellSource) -> Option<(CellSource, usize)> {
    let mut lines = source.lines();
    match strip_lines(&mut lines) {
        0 => None,
        regions => Some((source.with_lines(lines), regions)),
    }
}

impl JupyterCell {
    /// Strip task regions from this cell's source, returning the count.
    ///
    /// Cells without a string or line-list `source` are left untouched.
    pub fn strip_tasks(&mut self) -> usize {
        let Some((stripped, regions)) = self.source().as_ref().and_then(strip_source) else {
            return 0;
        };
        self.set_source(stripped);
        regions
    }
}

impl JupyterNotebook {
    /// Strip task regions from every cell, returning the total count.
    pub fn strip_tasks(&mut self) -> usize {
        self.cells.iter_mut().map(JupyterCell::strip_tasks).sum()
    }
}

/// Produce the tutorial version of a solution notebook.
pub fn strip_notebook(notebook: &JupyterNotebook) -> JupyterNotebook {
    let mut tutorial = notebook.clone();
    let regions = tutorial.strip_tasks();
    tracing::debug!("Stripped {} task region(s)", regions);
    tutorial
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_begin_marker_indent() {
        assert_eq!(begin_marker_indent("##TASK> x\n"), Some(""));
        assert_eq!(begin_marker_indent("    ##TASK>\n"), Some("    "));
        assert_eq!(begin_marker_indent("\t##TASK> tabbed"), Some("\t"));
        assert_eq!(begin_marker_indent("x = 1 ##TASK>"), None);
        assert_eq!(begin_marker_indent("# ##TASK>"), None);
    }

    #[test]
    fn test_is_end_marker() {
        assert!(is_end_marker("##<TASKEND\n"));
        assert!(is_end_marker("   ##<TASKEND trailing words"));
        assert!(!is_end_marker("x ##<TASKEND"));
    }

    #[test]
    fn test_placeholder_shape() {
        let block = placeholder_block("  ");
        assert_eq!(block.len(), PLACEHOLDER_LINES);

        let separators: Vec<_> = block
            .iter()
            .filter(|l| l.trim_start().starts_with("###"))
            .collect();
        assert_eq!(separators.len(), 4);
        for sep in separators {
            assert_eq!(sep.trim_end_matches('\n').chars().count(), SEPARATOR_WIDTH);
            assert!(sep.starts_with("  #"));
        }

        assert_eq!(block[1], "  # YOUR CODE BELOW\n");
        assert_eq!(block[3], "\n");
        assert_eq!(block[4], "\n");
        assert_eq!(block[6], "  # UNTIL HERE\n");
    }

    #[test]
    fn test_placeholder_indent_wider_than_separator() {
        let indent = " ".repeat(100);
        let block = placeholder_block(&indent);
        assert_eq!(block[0], format!("{}\n", indent));
        assert_eq!(block[1], format!("{}# YOUR CODE BELOW\n", indent));
    }

    #[test]
    fn test_strip_single_region() {
        let mut src = lines(&["A\n", "  ##TASK> x\n", "B\n", "  ##<TASKEND y\n", "C"]);
        assert_eq!(strip_lines(&mut src), 1);

        assert_eq!(src.len(), 2 + PLACEHOLDER_LINES);
        assert_eq!(src[0], "A\n");
        assert_eq!(&src[1..9], placeholder_block("  ").as_slice());
        assert_eq!(src[9], "C");
        assert_eq!(src.iter().filter(|l| l.contains(LABEL_BELOW)).count(), 1);
        assert_eq!(src.iter().filter(|l| l.contains(LABEL_UNTIL)).count(), 1);
    }

    #[test]
    fn test_strip_two_regions_keep_own_indent() {
        let mut src = lines(&[
            "def f():\n",
            "    ##TASK>\n",
            "    return 1\n",
            "    ##<TASKEND\n",
            "\n",
            "##TASK>\n",
            "g = f()\n",
            "##<TASKEND\n",
            "print(g)\n",
        ]);
        assert_eq!(strip_lines(&mut src), 2);

        let mut expected = lines(&["def f():\n"]);
        expected.extend(placeholder_block("    "));
        expected.push("\n".to_string());
        expected.extend(placeholder_block(""));
        expected.push("print(g)\n".to_string());
        assert_eq!(src, expected);
    }

    #[test]
    fn test_unmatched_begin_is_noop() {
        let original = lines(&["a\n", "##TASK> open\n", "b\n"]);
        let mut src = original.clone();
        assert_eq!(strip_lines(&mut src), 0);
        assert_eq!(src, original);
    }

    #[test]
    fn test_end_before_begin_is_ignored() {
        let original = lines(&["##<TASKEND\n", "a\n", "##TASK>\n"]);
        let mut src = original.clone();
        assert_eq!(strip_lines(&mut src), 0);
        assert_eq!(src, original);
    }

    #[test]
    fn test_nested_begin_discarded_with_region() {
        let mut src = lines(&[
            "##TASK>\n",
            "  ##TASK>\n",
            "x\n",
            "##<TASKEND\n",
            "tail\n",
            "##<TASKEND\n",
        ]);
        assert_eq!(strip_lines(&mut src), 1);

        let mut expected = placeholder_block("");
        expected.push("tail\n".to_string());
        expected.push("##<TASKEND\n".to_string());
        assert_eq!(src, expected);
    }

    #[test]
    fn test_second_region_unmatched_keeps_first_replacement() {
        let mut src = lines(&["##TASK>\n", "x\n", "##<TASKEND\n", "##TASK>\n", "y\n"]);
        assert_eq!(strip_lines(&mut src), 1);
        assert_eq!(src.len(), PLACEHOLDER_LINES + 2);
        assert_eq!(src[PLACEHOLDER_LINES], "##TASK>\n");
    }

    #[test]
    fn test_many_regions_do_not_recurse() {
        let mut src = Vec::new();
        for i in 0..1_000 {
            src.push("##TASK>\n".to_string());
            src.push(format!("solution_{}\n", i));
            src.push("##<TASKEND\n".to_string());
        }
        assert_eq!(strip_lines(&mut src), 1_000);
        assert_eq!(src.len(), 1_000 * PLACEHOLDER_LINES);
    }

    #[test]
    fn test_strip_source_keeps_text_form() {
        let source = CellSource::Text("a\n##TASK>\nb\n##<TASKEND\nc".to_string());
        let Some((CellSource::Text(text), 1)) = strip_source(&source) else {
            panic!("expected rewritten text source");
        };
        assert!(text.starts_with("a\n#####"));
        assert!(text.contains("# UNTIL HERE\n"));
        assert!(text.ends_with("\nc"));
        assert!(!text.contains("b\n"));
    }

    #[test]
    fn test_strip_source_none_when_unchanged() {
        let source = CellSource::Lines(lines(&["plain\n"]));
        assert!(strip_source(&source).is_none());
    }
}
