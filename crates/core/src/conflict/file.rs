//! Per-path conflict aggregate.
//!
//! A [`ConflictFile`] owns the raw merge text of one conflicting path, the
//! lines parsed from it, and the display sections derived from those lines.
//! Parsing happens on construction; sections are built on first access.

use std::sync::OnceLock;

use serde::Serialize;
use tracing::{debug, info};

use crate::conflict::line::Line;
use crate::conflict::parser::{self, ParserLimits};
use crate::conflict::resolver::{self, ResolutionMap};
use crate::conflict::sections::{self, Section, DEFAULT_CONTEXT_RADIUS};
use crate::errors::{ParseError, ResolutionError};

/// Default file mode reported for conflicting paths (a regular file).
pub const DEFAULT_FILE_MODE: u32 = 0o100644;

/// Syntax highlighting collaborator.
///
/// Returns the highlighted rendering of one line, or `None` to leave the
/// line plain.
pub trait Highlighter {
    fn highlight(&self, path: &str, text: &str) -> Option<String>;
}

/// One conflicting file.
#[derive(Debug)]
pub struct ConflictFile {
    our_path: String,
    their_path: String,
    our_mode: u32,
    our_label: String,
    their_label: String,
    raw_text: String,
    context_radius: usize,
    lines: Vec<Line>,
    sections: OnceLock<Vec<Section>>,
}

/// Serializable view of a [`ConflictFile`] for a UI layer.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictFileView<'a> {
    pub our_path: &'a str,
    pub their_path: &'a str,
    pub our_mode: u32,
    pub sections: &'a [Section],
}

impl ConflictFile {
    /// Parse `raw_text` whose markers carry `our_label` and `their_label`.
    ///
    /// The labels double as the file paths until [`with_paths`](Self::with_paths)
    /// says otherwise.
    pub fn new(
        raw_text: impl Into<String>,
        our_label: impl Into<String>,
        their_label: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let raw_text = raw_text.into();
        let our_label = our_label.into();
        let their_label = their_label.into();

        let lines = parser::parse(&raw_text, &our_label, &their_label)?;
        Ok(Self::from_lines(raw_text, our_label, their_label, lines))
    }

    /// Like [`new`](Self::new), but checks raw merge output against `limits`
    /// first (size, NUL bytes, UTF-8).
    pub fn from_bytes(
        raw: Vec<u8>,
        our_label: impl Into<String>,
        their_label: impl Into<String>,
        limits: &ParserLimits,
    ) -> Result<Self, ParseError> {
        let our_label = our_label.into();
        let their_label = their_label.into();

        let lines = parser::parse_bytes(&raw, &our_label, &their_label, limits)?;
        let raw_text = String::from_utf8(raw).map_err(|_| ParseError::UnsupportedEncoding)?;
        Ok(Self::from_lines(raw_text, our_label, their_label, lines))
    }

    fn from_lines(
        raw_text: String,
        our_label: String,
        their_label: String,
        lines: Vec<Line>,
    ) -> Self {
        info!(path = %our_label, lines = lines.len(), "parsed conflict file");

        Self {
            our_path: our_label.clone(),
            their_path: their_label.clone(),
            our_mode: DEFAULT_FILE_MODE,
            our_label,
            their_label,
            raw_text,
            context_radius: DEFAULT_CONTEXT_RADIUS,
            lines,
            sections: OnceLock::new(),
        }
    }

    /// Set the paths and mode of both sides.
    pub fn with_paths(
        mut self,
        our_path: impl Into<String>,
        their_path: impl Into<String>,
        our_mode: u32,
    ) -> Self {
        self.our_path = our_path.into();
        self.their_path = their_path.into();
        self.our_mode = our_mode;
        self.sections = OnceLock::new();
        self
    }

    /// Set how many unchanged lines are shown around each conflict.
    pub fn with_context_radius(mut self, context_radius: usize) -> Self {
        self.context_radius = context_radius;
        self.sections = OnceLock::new();
        self
    }

    pub fn our_path(&self) -> &str {
        &self.our_path
    }

    pub fn their_path(&self) -> &str {
        &self.their_path
    }

    pub fn our_mode(&self) -> u32 {
        self.our_mode
    }

    pub fn our_label(&self) -> &str {
        &self.our_label
    }

    pub fn their_label(&self) -> &str {
        &self.their_label
    }

    /// The unresolved merge text this file was parsed from.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Every parsed line, unreduced.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Display sections, built on first call. Section ids are keyed on the
    /// their-side path, so renaming our side keeps them stable.
    pub fn sections(&self) -> &[Section] {
        self.sections.get_or_init(|| {
            sections::build_sections(&self.lines, &self.their_path, self.context_radius)
        })
    }

    /// Ids of every conflict section, in document order.
    pub fn conflict_ids(&self) -> Vec<&str> {
        self.sections()
            .iter()
            .filter_map(|section| section.id.as_deref())
            .collect()
    }

    pub fn has_conflicts(&self) -> bool {
        self.lines.iter().any(Line::is_conflicting)
    }

    /// Apply `resolution` and return the surviving lines.
    pub fn resolve_lines(&self, resolution: &ResolutionMap) -> Result<Vec<Line>, ResolutionError> {
        let ids = self.conflict_ids();
        if let Some(unknown) = resolution
            .keys()
            .filter(|id| !ids.contains(&id.as_str()))
            .min()
        {
            return Err(ResolutionError::UnknownSection {
                section_id: unknown.clone(),
            });
        }

        resolver::resolve_lines(&self.lines, &self.their_path, resolution)
    }

    /// Apply `resolution` and return the reconstructed content.
    pub fn resolve(&self, resolution: &ResolutionMap) -> Result<String, ResolutionError> {
        let lines = self.resolve_lines(resolution)?;
        info!(path = %self.our_path, lines = lines.len(), "resolved conflict file");
        Ok(resolver::resolved_content(&lines))
    }

    /// Accept hand-edited content as the resolution of this file.
    pub fn resolve_content(&self, content: impl Into<String>) -> Result<String, ResolutionError> {
        let content = content.into();
        resolver::validate_manual_content(
            &content,
            &self.raw_text,
            &self.our_label,
            &self.their_label,
        )?;
        info!(path = %self.our_path, "accepted manually resolved content");
        Ok(content)
    }

    /// Fill in `rich_text` on every line using `highlighter`.
    pub fn highlight(&mut self, highlighter: &dyn Highlighter) {
        for line in &mut self.lines {
            line.rich_text = highlighter.highlight(&self.our_path, &line.text);
        }
        self.sections = OnceLock::new();
        debug!(path = %self.our_path, "highlighted conflict file");
    }

    pub fn view(&self) -> ConflictFileView<'_> {
        ConflictFileView {
            our_path: &self.our_path,
            their_path: &self.their_path,
            our_mode: self.our_mode,
            sections: self.sections(),
        }
    }
}
