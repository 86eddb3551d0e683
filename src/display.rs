//! Terminal output for the relay.
//!
//! One preview line per forwarded message, plus error and status-check
//! formatting. Every print swallows write errors so a closed stdout can
//! never abort processing.

use std::io::{self, Write};

use owo_colors::OwoColorize;

/// Maximum characters in the per-message preview.
pub const PREVIEW_LEN: usize = 60;

/// Truncate a string to at most `max_chars` characters, adding an ellipsis
/// if truncated. Operates on characters, not bytes, so multibyte content is
/// safe.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return "...".to_string();
    }
    let kept: String = s.chars().take(max_chars - 3).collect();
    format!("{kept}...")
}

/// Replace embedded line breaks so a preview stays on one line.
#[must_use]
pub fn flatten(s: &str) -> String {
    s.replace(['\n', '\r'], " ")
}

/// Format tool input for an inline summary, truncating long values.
#[must_use]
pub fn format_tool_input(input: &serde_json::Value) -> String {
    match input {
        serde_json::Value::Object(map) => {
            let pairs: Vec<String> = map
                .iter()
                .map(|(k, v)| {
                    let value_str = match v {
                        serde_json::Value::String(s) => truncate(s, 40),
                        other => truncate(&other.to_string(), 40),
                    };
                    format!("{k}={value_str}")
                })
                .collect();
            pairs.join(", ")
        }
        other => truncate(&other.to_string(), PREVIEW_LEN),
    }
}

/// Print the per-message echo line: role icon, project tail, short preview.
pub fn print_message_preview(icon: &str, project_tail: &str, text: &str) {
    let preview = truncate(&flatten(text), PREVIEW_LEN);
    let mut out = io::stdout();
    let _ = writeln!(out, "{icon} {} {preview}", project_tail.cyan().bold());
    let _ = out.flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    let mut out = io::stdout();
    let _ = writeln!(out, "{} {message}", "[ERROR]".red().bold());
    let _ = out.flush();
}

/// Print one readiness-check line with a pass/fail marker.
pub fn print_check(label: &str, ok: bool, detail: &str) {
    let marker = if ok {
        "ok".green().bold().to_string()
    } else {
        "missing".red().bold().to_string()
    };
    let mut out = io::stdout();
    let _ = writeln!(out, "  {label}: {marker} {}", detail.dimmed());
    let _ = out.flush();
}
