//! Conflict marker parser.
//!
//! Turns the output of a three-way merge, with `<<<<<<<` / `=======` /
//! `>>>>>>>` markers, into a flat sequence of [`Line`]s. Marker lines are
//! consumed; everything else is classified by the marker state it appears in.

use tracing::debug;

use crate::config::ParserConfig;
use crate::conflict::line::{Line, LineKind};
use crate::errors::ParseError;

const CONFLICT_MIDDLE: &str = "=======";

/// Marker state while walking the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerState {
    None,
    InOurs,
    InTheirs,
}

/// Caller policy applied to raw bytes before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserLimits {
    /// Maximum accepted input size in bytes; `None` disables the check.
    pub max_file_size: Option<usize>,
    /// Reject input containing NUL bytes.
    pub reject_binary: bool,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_file_size: None,
            reject_binary: true,
        }
    }
}

impl From<&ParserConfig> for ParserLimits {
    fn from(config: &ParserConfig) -> Self {
        Self {
            max_file_size: (config.max_file_size > 0).then_some(config.max_file_size),
            reject_binary: config.reject_binary,
        }
    }
}

/// The start marker line for a given "our" label.
pub fn conflict_start(our_label: &str) -> String {
    format!("<<<<<<< {our_label}")
}

/// The end marker line for a given "their" label.
pub fn conflict_end(their_label: &str) -> String {
    format!(">>>>>>> {their_label}")
}

/// Parse raw merge text into lines.
///
/// Empty or whitespace-only input yields no lines.
pub fn parse(raw_text: &str, our_label: &str, their_label: &str) -> Result<Vec<Line>, ParseError> {
    if raw_text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let start = conflict_start(our_label);
    let end = conflict_end(their_label);

    let mut state = MarkerState::None;
    let mut lines = Vec::new();
    let mut index = 0;
    let mut old_position = 1;
    let mut new_position = 1;
    let mut line_number = 0;

    for raw_line in raw_text.split_inclusive('\n') {
        line_number += 1;
        let text = raw_line.strip_suffix('\n').unwrap_or(raw_line);

        if text == start {
            expect_state(state, MarkerState::None, line_number)?;
            state = MarkerState::InOurs;
        } else if text == CONFLICT_MIDDLE {
            expect_state(state, MarkerState::InOurs, line_number)?;
            state = MarkerState::InTheirs;
        } else if text == end {
            expect_state(state, MarkerState::InTheirs, line_number)?;
            state = MarkerState::None;
        } else if text.starts_with('\\') {
            lines.push(Line::new(
                index,
                LineKind::NoNewlineMarker,
                old_position,
                new_position,
                text,
            ));
            index += 1;
        } else {
            let kind = match state {
                MarkerState::None => LineKind::Context,
                MarkerState::InOurs => LineKind::Ours,
                MarkerState::InTheirs => LineKind::Theirs,
            };
            lines.push(Line::new(index, kind, old_position, new_position, text));

            if kind != LineKind::Ours {
                old_position += 1;
            }
            if kind != LineKind::Theirs {
                new_position += 1;
            }
            index += 1;
        }
    }

    if state != MarkerState::None {
        return Err(ParseError::MissingEndDelimiter { line: line_number });
    }

    debug!(lines = lines.len(), "parsed merge text");
    Ok(lines)
}

/// Validate raw bytes against `limits`, then [`parse`] them.
pub fn parse_bytes(
    raw: &[u8],
    our_label: &str,
    their_label: &str,
    limits: &ParserLimits,
) -> Result<Vec<Line>, ParseError> {
    if let Some(limit) = limits.max_file_size {
        if raw.len() > limit {
            return Err(ParseError::FileTooLarge {
                size: raw.len(),
                limit,
            });
        }
    }

    // NUL is valid UTF-8 but never shows up in text a human resolves.
    if limits.reject_binary && raw.contains(&0) {
        return Err(ParseError::BinaryContent);
    }

    let text = std::str::from_utf8(raw).map_err(|_| ParseError::UnsupportedEncoding)?;
    parse(text, our_label, their_label)
}

fn expect_state(actual: MarkerState, expected: MarkerState, line: usize) -> Result<(), ParseError> {
    if actual == expected {
        Ok(())
    } else {
        Err(ParseError::UnexpectedDelimiter { line })
    }
}
