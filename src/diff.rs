//! Coloured previews of file writes, shown at the approval prompt.

use colored::Colorize;
use similar::{ChangeTag, TextDiff};

/// Lines of an all-new file shown before eliding the rest.
const NEW_FILE_PREVIEW_LINES: usize = 40;

/// Preview of replacing `old` with `new` at `path`: a unified diff for an
/// existing file, or the leading lines of a new one.
pub fn write_preview(path: &str, old: Option<&str>, new: &str) -> String {
    match old {
        Some(old) if old == new => format!("{} (unchanged)", path),
        Some(old) => unified_diff(old, new, path),
        None => new_file_preview(new, path),
    }
}

fn unified_diff(old: &str, new: &str, path: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut output = format!("--- a/{path}\n+++ b/{path}\n");

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        output.push_str(&hunk.header().to_string());
        output.push('\n');
        for change in hunk.iter_changes() {
            let line = match change.tag() {
                ChangeTag::Delete => format!("-{change}").red().to_string(),
                ChangeTag::Insert => format!("+{change}").green().to_string(),
                ChangeTag::Equal => format!(" {change}"),
            };
            output.push_str(&line);
            if change.missing_newline() {
                output.push('\n');
            }
        }
    }

    output
}

fn new_file_preview(content: &str, path: &str) -> String {
    let mut output = format!("--- /dev/null\n+++ b/{path}\n");
    let total = content.lines().count();

    for line in content.lines().take(NEW_FILE_PREVIEW_LINES) {
        output.push_str(&format!("+{line}").green().to_string());
        output.push('\n');
    }
    if total > NEW_FILE_PREVIEW_LINES {
        output.push_str(
            &format!("... {} more lines", total - NEW_FILE_PREVIEW_LINES)
                .dimmed()
                .to_string(),
        );
    }

    output
}
