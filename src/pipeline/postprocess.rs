//! Report cleanup: deterministic fixes applied to the composed Markdown
//! before it is saved and rendered.
//!
//! The compose prompt asks for plain Markdown, but replies still arrive
//! wrapped in a ```` ```markdown ```` fence, with CRLF line endings, or with
//! tables glued to the paragraph above them (which GFM then reads as
//! paragraph text). None of these rules touch wording, figures, emoji or
//! image references; they only repair structure.
//!
//! Order matters: fences come off before anything looks at line starts, and
//! blank-line insertion runs before blank-line collapsing.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule, in order:
///
/// 1. Strip one outer ```` ```markdown ```` / ```` ``` ```` fence
/// 2. CRLF and lone CR → LF
/// 3. Trim trailing whitespace on every line
/// 4. Blank line before headings and before tables (outside code fences)
/// 5. Insert the `| --- |` row when a table has none
/// 6. Collapse runs of 3+ blank lines
/// 7. Drop zero-width and BOM characters
/// 8. Exactly one final newline
pub fn clean_report(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = s.replace("\r\n", "\n").replace('\r', "\n");
    let s = s.lines().map(str::trim_end).collect::<Vec<_>>().join("\n");
    let s = separate_blocks(&s);
    let s = add_missing_table_separators(&s);
    let s = RE_BLANK_RUN.replace_all(&s, "\n\n\n").into_owned();
    let s = s.replace(INVISIBLE, "");
    finish_with_newline(&s)
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\r?\n(.*?)\r?\n```\s*$").unwrap());

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}',
];

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes) && line[hashes..].starts_with(' ')
}

fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.len() > 2 && t.starts_with('|') && t.ends_with('|')
}

fn is_separator_row(line: &str) -> bool {
    is_table_row(line)
        && line.contains('-')
        && line.trim().chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// Blank line before headings and before the first row of a table, so GFM
/// does not fold either into the preceding paragraph.
fn separate_blocks(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_code = false;
    let mut prev = "";

    for line in input.lines() {
        if line.trim_start().starts_with("```") {
            in_code = !in_code;
        } else if !in_code && !prev.is_empty() {
            let starts_table = is_table_row(line) && !is_table_row(prev);
            if is_heading(line) || starts_table {
                out.push("");
            }
        }
        out.push(line);
        prev = line;
    }
    out.join("\n")
}

/// Insert the `| --- |` row under a table header that lacks one. A pipe
/// line only counts as a header when a table row follows it.
fn add_missing_table_separators(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_code = false;

    for (i, line) in lines.iter().enumerate() {
        out.push(line.to_string());

        if line.trim_start().starts_with("```") {
            in_code = !in_code;
            continue;
        }
        if in_code {
            continue;
        }

        let header = is_table_row(line) && i.checked_sub(1).is_none_or(|p| !is_table_row(lines[p]));
        if !header {
            continue;
        }
        match lines.get(i + 1) {
            Some(next) if is_table_row(next) && !is_separator_row(next) => {
                let cols = line.trim().matches('|').count().saturating_sub(1).max(1);
                out.push(format!("|{}", " --- |".repeat(cols)));
            }
            _ => {}
        }
    }
    out.join("\n")
}

fn finish_with_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        "\n".to_string()
    } else {
        format!("{trimmed}\n")
    }
}
