//! Terminal styling for mergeview output.

use console::Style;

use mergeview_core::conflict::{Line, LineKind};

/// Prefix `msg` with a status glyph in `style`.
fn mark(style: Style, glyph: &str, msg: &str) -> String {
    format!("{} {}", style.apply_to(glyph), msg)
}

/// Completed step.
pub fn success(msg: &str) -> String {
    mark(Style::new().green(), "✓", msg)
}

/// Failed check.
pub fn error(msg: &str) -> String {
    mark(Style::new().red(), "✗", msg)
}

/// Something the user should look at, e.g. an excluded path.
pub fn warn(msg: &str) -> String {
    mark(Style::new().yellow(), "⚠", msg)
}

pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Render one parsed line with a kind marker in the gutter.
pub fn line(line: &Line) -> String {
    let text = line.rich_text.as_deref().unwrap_or(&line.text);
    match line.kind {
        LineKind::Context => format!("  {text}"),
        LineKind::Ours => Style::new().green().apply_to(format!("< {text}")).to_string(),
        LineKind::Theirs => Style::new().blue().apply_to(format!("> {text}")).to_string(),
        LineKind::NoNewlineMarker => dim(&format!("  {text}")),
        LineKind::Match => Style::new().cyan().apply_to(text).to_string(),
    }
}
