use colored::Colorize;

/// First `max` characters of `text`, with `...` appended when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Minimal markdown renderer for the final answer.
///
/// Not a full parser: fenced code blocks are indented and dimmed, `**bold**`
/// and `` `code` `` spans are styled, headings are bolded.
pub fn render_markdown_lite(text: &str) -> String {
    let mut lines = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        if let Some(lang) = line.trim_start().strip_prefix("```") {
            in_fence = !in_fence;
            if in_fence && !lang.trim().is_empty() {
                lines.push(format!("  {}", lang.trim().dimmed()));
            }
            continue;
        }

        if in_fence {
            lines.push(format!("  {}", line.dimmed()));
        } else if let Some(heading) = line.strip_prefix('#') {
            lines.push(heading.trim_start_matches('#').trim().bold().to_string());
        } else {
            lines.push(render_spans(line));
        }
    }

    lines.join("\n")
}

/// Styles `**bold**` and `` `code` `` spans in a single line. Unclosed
/// markers are left as-is.
fn render_spans(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                out.push_str(&after[..end].bold().to_string());
                rest = &after[end + 2..];
                continue;
            }
        } else if let Some(after) = rest.strip_prefix('`') {
            if let Some(end) = after.find('`') {
                out.push_str(&after[..end].dimmed().to_string());
                rest = &after[end + 1..];
                continue;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}
