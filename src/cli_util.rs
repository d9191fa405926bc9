use std::io::{self, IsTerminal, Write};

use nu_ansi_term::Color;

use crate::BfError;

/// Pretty-print a [`BfError`] with caret positioning.
/// If `program` is `Some("bf")`, prefix messages with "bf: ...".
pub fn print_error(program: Option<&str>, code: &str, err: &BfError) {
    let kind = if err.is_parse_error() {
        "Parse error"
    } else if matches!(err, BfError::SourceRead { .. } | BfError::Config(_)) {
        "Error"
    } else {
        "Runtime error"
    };
    let kind = if io::stderr().is_terminal() {
        Color::Red.bold().paint(kind).to_string()
    } else {
        kind.to_string()
    };

    let msg = match program {
        Some(p) => format!("{p}: {kind}: {err}"),
        None => format!("{kind}: {err}"),
    };

    match err.position() {
        Some(pos) => print_error_with_context(&msg, code, pos.offset),
        None => {
            eprintln!("{msg}");
            let _ = io::stderr().flush();
        }
    }
}

/// Print a concise error with a caret context window, working with UTF-8 by
/// slicing using char indices. Newlines in the window are shown as spaces so
/// the caret lines up.
pub fn print_error_with_context(prefix: &str, code: &str, pos: usize) {
    eprintln!("{prefix}");
    eprintln!("  {}", context_window(code, pos));
    let _ = io::stderr().flush();
}

fn context_window(code: &str, pos: usize) -> String {
    // Show a short window around the position for context
    const WINDOW_CHARS: usize = 32;

    let start = pos.saturating_sub(WINDOW_CHARS);
    let slice: String = code
        .chars()
        .skip(start)
        .take(pos - start + WINDOW_CHARS + 1)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    // Caret under the exact position
    let underline = format!("{}^", " ".repeat(pos - start));
    format!("{slice}\n  {underline}")
}
