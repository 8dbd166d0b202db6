//! Conflict resolution.
//!
//! A resolution assigns a [`Side`] to every conflict section of a file.
//! Applying it filters the parsed lines down to the chosen sides; joining the
//! remaining text reconstructs the final file content.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conflict::line::{Line, LineKind};
use crate::conflict::parser::{conflict_end, conflict_start};
use crate::conflict::sections::section_id;
use crate::errors::ResolutionError;

/// Which side of a conflict to keep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Ours,
    Theirs,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ours => write!(f, "ours"),
            Self::Theirs => write!(f, "theirs"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ours" | "head" => Ok(Self::Ours),
            "theirs" | "origin" => Ok(Self::Theirs),
            other => Err(format!("invalid side '{other}': use 'ours' or 'theirs'")),
        }
    }
}

/// Section id → chosen side.
pub type ResolutionMap = HashMap<String, Side>;

/// Keep only the lines that belong to the chosen side of every conflict.
///
/// Fails on the first conflict whose id is missing from `resolution`; no
/// partial result is returned.
pub fn resolve_lines(
    lines: &[Line],
    path: &str,
    resolution: &ResolutionMap,
) -> Result<Vec<Line>, ResolutionError> {
    let mut current: Option<Side> = None;
    let mut kept = Vec::with_capacity(lines.len());

    for line in lines {
        if matches!(line.kind, LineKind::Context | LineKind::Match) {
            current = None;
            kept.push(line.clone());
            continue;
        }

        let side = match current {
            Some(side) => side,
            None => {
                let id = section_id(path, line);
                let side = *resolution
                    .get(&id)
                    .ok_or(ResolutionError::MissingResolution { section_id: id })?;
                current = Some(side);
                side
            }
        };

        let keep = match line.kind {
            LineKind::Ours => side == Side::Ours,
            LineKind::Theirs => side == Side::Theirs,
            _ => true,
        };
        if keep {
            kept.push(line.clone());
        }
    }

    debug!(path, kept = kept.len(), total = lines.len(), "applied resolution");
    Ok(kept)
}

/// Join resolved lines back into file content.
pub fn resolved_content(lines: &[Line]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check hand-edited content before accepting it as a resolution.
///
/// The content must be non-empty, must differ from the unresolved merge
/// text, and must not still contain a conflict marker for these labels.
pub fn validate_manual_content(
    content: &str,
    raw_text: &str,
    our_label: &str,
    their_label: &str,
) -> Result<(), ResolutionError> {
    if content.trim().is_empty() {
        return Err(ResolutionError::EmptyContent);
    }
    if content == raw_text {
        return Err(ResolutionError::UnchangedContent);
    }

    let start = conflict_start(our_label);
    let end = conflict_end(their_label);
    for (i, line) in content.lines().enumerate() {
        if line == start || line == end {
            return Err(ResolutionError::MarkersRemain { line: i + 1 });
        }
    }

    Ok(())
}
