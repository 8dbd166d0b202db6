//! In-memory three-way merge engine.
//!
//! Uses the `diffy` crate to merge a base, "ours", and "theirs" version of
//! each registered file. Files that merge cleanly are not reported as
//! conflicts.

use diffy::{ConflictStyle, MergeOptions};
use tracing::{debug, info};

use crate::config::LabelConfig;
use crate::conflict::collection::{ConflictDescriptor, ConflictSide, MergeEngine, MergedText};
use crate::conflict::file::DEFAULT_FILE_MODE;
use crate::conflict::parser::{conflict_end, conflict_start};
use crate::errors::CollectionError;

/// diffy always writes these labels; they are rewritten afterwards.
const DIFFY_OURS: &str = "<<<<<<< ours";
const DIFFY_THEIRS: &str = ">>>>>>> theirs";

/// Three versions of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub path: String,
    pub mode: u32,
    pub base: String,
    pub ours: String,
    pub theirs: String,
}

impl TextEntry {
    pub fn new(
        path: impl Into<String>,
        base: impl Into<String>,
        ours: impl Into<String>,
        theirs: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            mode: DEFAULT_FILE_MODE,
            base: base.into(),
            ours: ours.into(),
            theirs: theirs.into(),
        }
    }
}

/// The result of merging one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMerge {
    /// Merged without conflicts.
    Clean(String),
    /// Merged content with conflict markers.
    Conflicted(String),
}

/// Merge engine over files held in memory.
#[derive(Debug, Clone, Default)]
pub struct TextMerger {
    labels: LabelConfig,
    entries: Vec<TextEntry>,
}

impl TextMerger {
    pub fn new(labels: LabelConfig) -> Self {
        Self {
            labels,
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, entry: TextEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[TextEntry] {
        &self.entries
    }

    /// Three-way merge of `base`, `ours`, and `theirs`, labelling conflict
    /// markers with `our_label` and `their_label`.
    pub fn merge_texts(
        base: &str,
        ours: &str,
        theirs: &str,
        our_label: &str,
        their_label: &str,
    ) -> TextMerge {
        // Fast path: if either side is identical to base, the other side wins cleanly.
        if ours == base || ours == theirs {
            debug!("ours == base or ours == theirs, clean merge");
            return TextMerge::Clean(theirs.to_string());
        }
        if theirs == base {
            debug!("theirs == base, ours wins cleanly");
            return TextMerge::Clean(ours.to_string());
        }

        let mut options = MergeOptions::new();
        options.set_conflict_style(ConflictStyle::Merge);

        match options.merge(base, ours, theirs) {
            Ok(merged) => {
                debug!("clean three-way merge");
                TextMerge::Clean(merged)
            }
            Err(conflicted) => {
                debug!("three-way merge produced conflicts");
                TextMerge::Conflicted(relabel(&conflicted, our_label, their_label))
            }
        }
    }

    fn merge_entry(&self, entry: &TextEntry) -> TextMerge {
        Self::merge_texts(
            &entry.base,
            &entry.ours,
            &entry.theirs,
            &self.labels.ours,
            &self.labels.theirs,
        )
    }
}

/// Replace diffy's fixed marker labels with the configured ones.
fn relabel(conflicted: &str, our_label: &str, their_label: &str) -> String {
    let start = conflict_start(our_label);
    let end = conflict_end(their_label);

    conflicted
        .split_inclusive('\n')
        .map(|line| {
            let (text, newline) = match line.strip_suffix('\n') {
                Some(text) => (text, "\n"),
                None => (line, ""),
            };
            match text {
                DIFFY_OURS => format!("{start}{newline}"),
                DIFFY_THEIRS => format!("{end}{newline}"),
                _ => line.to_string(),
            }
        })
        .collect()
}

impl MergeEngine for TextMerger {
    fn conflicts(&self) -> Result<Vec<ConflictDescriptor>, CollectionError> {
        let conflicts: Vec<ConflictDescriptor> = self
            .entries
            .iter()
            .filter(|entry| matches!(self.merge_entry(entry), TextMerge::Conflicted(_)))
            .map(|entry| {
                let side = ConflictSide {
                    path: entry.path.clone(),
                    mode: entry.mode,
                };
                ConflictDescriptor {
                    our: Some(side.clone()),
                    their: Some(side),
                }
            })
            .collect();

        info!(
            files = self.entries.len(),
            conflicts = conflicts.len(),
            "merged in-memory files"
        );
        Ok(conflicts)
    }

    fn merged_text(&self, descriptor: &ConflictDescriptor) -> Result<MergedText, CollectionError> {
        let (our, _) = descriptor.sides()?;
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.path == our.path)
            .ok_or_else(|| CollectionError::UnknownPath(our.path.clone()))?;

        let raw = match self.merge_entry(entry) {
            TextMerge::Clean(text) | TextMerge::Conflicted(text) => text,
        };
        Ok(MergedText {
            raw,
            our_label: self.labels.ours.clone(),
            their_label: self.labels.theirs.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::collection::FileCollection;
    use crate::conflict::parser::ParserLimits;
    use crate::conflict::resolver::{ResolutionMap, Side};
    use crate::conflict::sections::DEFAULT_CONTEXT_RADIUS;

    const BASE: &str = "line1\noriginal\nline3\n";
    const OURS: &str = "line1\nours_version\nline3\n";
    const THEIRS: &str = "line1\ntheirs_version\nline3\n";

    #[test]
    fn test_identical_files() {
        let result = TextMerger::merge_texts(BASE, BASE, BASE, "ours", "theirs");
        assert_eq!(result, TextMerge::Clean(BASE.to_string()));
    }

    #[test]
    fn test_only_one_side_changed() {
        let result = TextMerger::merge_texts(BASE, OURS, BASE, "ours", "theirs");
        assert_eq!(result, TextMerge::Clean(OURS.to_string()));

        let result = TextMerger::merge_texts(BASE, BASE, THEIRS, "ours", "theirs");
        assert_eq!(result, TextMerge::Clean(THEIRS.to_string()));
    }

    #[test]
    fn test_non_overlapping_changes() {
        let base = "aaa\nbbb\nccc\nddd\neee\n";
        let ours = "AAA\nbbb\nccc\nddd\neee\n";
        let theirs = "aaa\nbbb\nccc\nddd\nEEE\n";
        match TextMerger::merge_texts(base, ours, theirs, "ours", "theirs") {
            TextMerge::Clean(merged) => {
                assert!(merged.contains("AAA"));
                assert!(merged.contains("EEE"));
            }
            TextMerge::Conflicted(text) => panic!("unexpected conflict:\n{text}"),
        }
    }

    #[test]
    fn test_conflicting_changes_use_labels() {
        let result = TextMerger::merge_texts(BASE, OURS, THEIRS, "HEAD", "feature");
        let TextMerge::Conflicted(text) = result else {
            panic!("expected a conflict");
        };
        assert!(text.contains("<<<<<<< HEAD\n"));
        assert!(text.contains("=======\n"));
        assert!(text.contains(">>>>>>> feature\n"));
        assert!(!text.contains("|||||||"));
    }

    #[test]
    fn test_relabel_keeps_other_lines() {
        let text = "a\n<<<<<<< ours\nb\n=======\nc\n>>>>>>> theirs";
        assert_eq!(
            relabel(text, "x", "y"),
            "a\n<<<<<<< x\nb\n=======\nc\n>>>>>>> y"
        );
    }

    #[test]
    fn test_engine_reports_only_conflicting_files() {
        let mut merger = TextMerger::new(LabelConfig::default());
        merger
            .add(TextEntry::new("clean.txt", BASE, OURS, BASE))
            .add(TextEntry::new("conflict.txt", BASE, OURS, THEIRS));

        let conflicts = merger.conflicts().unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].display_path(), "conflict.txt");
    }

    #[test]
    fn test_collection_over_text_merger_resolves() {
        let mut merger = TextMerger::new(LabelConfig::default());
        merger.add(TextEntry::new("conflict.txt", BASE, OURS, THEIRS));

        let collection = FileCollection::new(
            &merger,
            "feature",
            "main",
            DEFAULT_CONTEXT_RADIUS,
            &ParserLimits::default(),
        )
        .unwrap();
        let file = &collection.files()[0];
        let id = file.conflict_ids()[0].to_string();

        let resolved = file
            .resolve(&ResolutionMap::from([(id, Side::Theirs)]))
            .unwrap();
        assert_eq!(resolved, "line1\ntheirs_version\nline3");
    }

    #[test]
    fn test_unknown_path() {
        let merger = TextMerger::new(LabelConfig::default());
        let side = ConflictSide {
            path: "missing.txt".into(),
            mode: DEFAULT_FILE_MODE,
        };
        let descriptor = ConflictDescriptor {
            our: Some(side.clone()),
            their: Some(side),
        };
        assert!(matches!(
            merger.merged_text(&descriptor),
            Err(CollectionError::UnknownPath(_))
        ));
    }
}
