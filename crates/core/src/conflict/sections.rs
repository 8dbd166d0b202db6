//! Section building for display.
//!
//! Parsed lines are grouped into alternating conflict and context sections.
//! Conflict sections are always shown in full; context sections are cut down
//! to `context_radius` lines next to each conflict, with a synthetic match
//! line (a unified-diff style `@@ … @@` header) standing in for every gap.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::conflict::line::{Line, LineKind};

/// Number of unchanged lines shown next to a conflict.
pub const DEFAULT_CONTEXT_RADIUS: usize = 3;

/// A contiguous run of lines grouped for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    pub is_conflict: bool,
    /// Resolution key; only set on conflict sections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lines: Vec<Line>,
}

impl Section {
    fn context(lines: Vec<Line>) -> Self {
        Self {
            is_conflict: false,
            id: None,
            lines,
        }
    }

    fn conflict(id: String, lines: Vec<Line>) -> Self {
        Self {
            is_conflict: true,
            id: Some(id),
            lines,
        }
    }
}

/// Stable identifier of the conflict that starts at `line` in the file at
/// `path`.
pub fn section_id(path: &str, line: &Line) -> String {
    let digest = Sha256::digest(path.as_bytes());
    format!(
        "{}_{}_{}",
        hex::encode(digest),
        line.old_position,
        line.new_position
    )
}

/// A maximal run of lines that are all conflicting or all context.
struct Run<'a> {
    is_conflict: bool,
    lines: &'a [Line],
}

fn runs(lines: &[Line]) -> Vec<Run<'_>> {
    let mut runs = Vec::new();
    let mut start = 0;

    for i in 1..=lines.len() {
        let boundary =
            i == lines.len() || lines[i].is_conflicting() != lines[start].is_conflicting();
        if boundary {
            runs.push(Run {
                is_conflict: lines[start].is_conflicting(),
                lines: &lines[start..i],
            });
            start = i;
        }
    }

    runs
}

/// Group `lines` (as produced by the parser) into display sections.
pub fn build_sections(lines: &[Line], path: &str, context_radius: usize) -> Vec<Section> {
    let runs = runs(lines);
    let run_count = runs.len();
    let mut sections = Vec::with_capacity(run_count + 1);

    for (i, run) in runs.iter().enumerate() {
        if run.is_conflict {
            let id = section_id(path, &run.lines[0]);
            sections.push(Section::conflict(id, run.lines.to_vec()));
            continue;
        }

        let len = run.lines.len();
        let conflict_before = i > 0;
        let conflict_after = i + 1 < run_count;

        if conflict_before && conflict_after && len > 2 * context_radius {
            let head = &run.lines[..context_radius];
            let tail = &run.lines[len - context_radius..];
            if !head.is_empty() {
                sections.push(Section::context(head.to_vec()));
            }
            sections.push(Section::context(with_match_line(tail, &runs[i + 1])));
        } else if conflict_after && !conflict_before && len > context_radius {
            let tail = &run.lines[len - context_radius..];
            sections.push(Section::context(with_match_line(tail, &runs[i + 1])));
        } else if conflict_before && !conflict_after && len > context_radius {
            // Nothing follows the drop, so no header is needed.
            if context_radius > 0 {
                sections.push(Section::context(run.lines[..context_radius].to_vec()));
            }
        } else {
            sections.push(Section::context(run.lines.to_vec()));
        }
    }

    finalize_match_lines(&mut sections, lines);

    debug!(
        path,
        sections = sections.len(),
        conflicts = sections.iter().filter(|s| s.is_conflict).count(),
        "built conflict sections"
    );
    sections
}

/// Prepend a match line to a kept tail slice. With an empty tail the match
/// line is anchored on the first line of the following run.
fn with_match_line(tail: &[Line], next: &Run<'_>) -> Vec<Line> {
    let anchor = tail.first().unwrap_or(&next.lines[0]);
    let mut kept = Vec::with_capacity(tail.len() + 1);
    kept.push(Line::match_at(anchor));
    kept.extend_from_slice(tail);
    kept
}

/// Fill in the text of every match line once all slice boundaries are known.
///
/// A header spans from its own position to the last displayed line before
/// the next gap (or the end of the file).
fn finalize_match_lines(sections: &mut [Section], all_lines: &[Line]) {
    let mut pending: Option<(usize, usize)> = None;
    let mut last_shown: Option<(usize, usize)> = None;

    for s in 0..sections.len() {
        for l in 0..sections[s].lines.len() {
            if sections[s].lines[l].kind == LineKind::Match {
                if let Some(at) = pending {
                    write_header(sections, at, last_shown, all_lines);
                }
                pending = Some((s, l));
                last_shown = None;
            } else {
                let line = &sections[s].lines[l];
                last_shown = Some((line.old_position, line.new_position));
            }
        }
    }

    if let Some(at) = pending {
        write_header(sections, at, last_shown, all_lines);
    }
}

fn write_header(
    sections: &mut [Section],
    (s, l): (usize, usize),
    end: Option<(usize, usize)>,
    all_lines: &[Line],
) {
    let match_line = &sections[s].lines[l];
    let (old_end, new_end) = end.unwrap_or((match_line.old_position, match_line.new_position));
    let suffix = header_suffix(all_lines, match_line.index);

    let text = format!(
        "@@ -{},{} +{},{} @@{}",
        match_line.old_position, old_end, match_line.new_position, new_end, suffix
    );
    sections[s].lines[l].text = text;
}

/// Text appended to a header: the nearest context line before
/// `anchor_index` that looks like the start of a declaration (begins with a
/// letter, `_` or `$`). Conflict lines exist in only one version and are
/// skipped.
fn header_suffix(all_lines: &[Line], anchor_index: usize) -> String {
    let before = all_lines.partition_point(|line| line.index < anchor_index);

    all_lines[..before]
        .iter()
        .rev()
        .filter(|line| line.kind == LineKind::Context)
        .find(|line| starts_declaration(&line.text))
        .map(|line| format!(" {}", line.text))
        .unwrap_or_default()
}

fn starts_declaration(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
}
