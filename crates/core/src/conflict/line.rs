//! The line model shared by the parser, section builder and resolver.

use serde::{Deserialize, Serialize};

/// Where a line of merged text came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// Unchanged in both sides.
    Context,
    /// Only present on "our" side.
    Ours,
    /// Only present on "their" side.
    Theirs,
    /// A `\ No newline at end of file` notice.
    NoNewlineMarker,
    /// Synthetic header standing in for elided context.
    Match,
}

impl LineKind {
    /// Whether a line of this kind belongs to a conflict region.
    pub fn is_conflicting(self) -> bool {
        matches!(self, Self::Ours | Self::Theirs | Self::NoNewlineMarker)
    }
}

impl std::fmt::Display for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Context => write!(f, "context"),
            Self::Ours => write!(f, "ours"),
            Self::Theirs => write!(f, "theirs"),
            Self::NoNewlineMarker => write!(f, "no_newline"),
            Self::Match => write!(f, "match"),
        }
    }
}

/// One line of parsed merge text.
///
/// `old_position` counts lines of "their" file and `new_position` lines of
/// "our" file, both 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Line {
    pub index: usize,
    pub kind: LineKind,
    pub old_position: usize,
    pub new_position: usize,
    pub text: String,
    /// Highlighted rendering, filled in after parsing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rich_text: Option<String>,
}

impl Line {
    pub fn new(
        index: usize,
        kind: LineKind,
        old_position: usize,
        new_position: usize,
        text: impl Into<String>,
    ) -> Self {
        Self {
            index,
            kind,
            old_position,
            new_position,
            text: text.into(),
            rich_text: None,
        }
    }

    /// A match line anchored at `line`, with its header text still empty.
    pub(crate) fn match_at(line: &Line) -> Self {
        Self::new(
            line.index,
            LineKind::Match,
            line.old_position,
            line.new_position,
            String::new(),
        )
    }

    pub fn is_conflicting(&self) -> bool {
        self.kind.is_conflicting()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_kinds() {
        assert!(LineKind::Ours.is_conflicting());
        assert!(LineKind::Theirs.is_conflicting());
        assert!(LineKind::NoNewlineMarker.is_conflicting());
        assert!(!LineKind::Context.is_conflicting());
        assert!(!LineKind::Match.is_conflicting());
    }

    #[test]
    fn test_rich_text_omitted_when_absent() {
        let line = Line::new(0, LineKind::Ours, 1, 1, "foo");
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["kind"], "ours");
        assert!(json.get("rich_text").is_none());
    }
}
