//! The conflicting files of one merge.
//!
//! A [`FileCollection`] asks a [`MergeEngine`] which paths conflict between
//! a source ("ours") and a target ("theirs") revision, and builds one
//! [`ConflictFile`] per path from the engine's merge text.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::conflict::file::{ConflictFile, ConflictFileView};
use crate::conflict::parser::ParserLimits;
use crate::errors::CollectionError;

/// One side of a conflicting path as reported by the merge engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictSide {
    pub path: String,
    pub mode: u32,
}

/// A conflicting path as reported by the merge engine.
///
/// Either side may be missing (for example when one side deleted the file);
/// such paths cannot be resolved line by line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConflictDescriptor {
    pub our: Option<ConflictSide>,
    pub their: Option<ConflictSide>,
}

impl ConflictDescriptor {
    /// The best available path for messages about this conflict.
    pub fn display_path(&self) -> &str {
        self.our
            .as_ref()
            .or(self.their.as_ref())
            .map(|side| side.path.as_str())
            .unwrap_or("<unknown>")
    }

    /// Both sides, or `ConflictSideMissing`.
    pub fn sides(&self) -> Result<(&ConflictSide, &ConflictSide), CollectionError> {
        match (&self.our, &self.their) {
            (Some(our), Some(their)) => Ok((our, their)),
            _ => Err(CollectionError::ConflictSideMissing {
                path: self.display_path().to_string(),
            }),
        }
    }
}

/// Merge output for one conflicting path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedText {
    /// Merged content containing conflict markers.
    pub raw: String,
    /// Label used on the `<<<<<<<` marker lines.
    pub our_label: String,
    /// Label used on the `>>>>>>>` marker lines.
    pub their_label: String,
}

/// The external three-way merge engine.
pub trait MergeEngine {
    /// Every conflicting path of the merge.
    fn conflicts(&self) -> Result<Vec<ConflictDescriptor>, CollectionError>;

    /// Merge text for one conflicting path. Only called with descriptors
    /// that have both sides.
    fn merged_text(&self, descriptor: &ConflictDescriptor) -> Result<MergedText, CollectionError>;
}

/// The conflicting files between two revisions.
#[derive(Debug)]
pub struct FileCollection {
    source: String,
    target: String,
    files: Vec<ConflictFile>,
    excluded: Vec<String>,
}

/// Serializable view of a [`FileCollection`].
#[derive(Debug, Clone, Serialize)]
pub struct CollectionView<'a> {
    pub commit_message: String,
    pub files: Vec<ConflictFileView<'a>>,
}

impl FileCollection {
    /// Build the collection for merging `target` into `source`.
    ///
    /// Paths missing a side are excluded and logged. Merge text is checked
    /// against `limits` before parsing. Any other engine or parse error
    /// aborts the whole collection.
    pub fn new(
        engine: &dyn MergeEngine,
        source: impl Into<String>,
        target: impl Into<String>,
        context_radius: usize,
        limits: &ParserLimits,
    ) -> Result<Self, CollectionError> {
        let source = source.into();
        let target = target.into();
        info!(%source, %target, "collecting conflicting files");

        let mut files = Vec::new();
        let mut excluded = Vec::new();

        for descriptor in engine.conflicts()? {
            let (our, their) = match descriptor.sides() {
                Ok(sides) => sides,
                Err(err) => {
                    warn!(path = descriptor.display_path(), error = %err, "excluding conflict");
                    excluded.push(descriptor.display_path().to_string());
                    continue;
                }
            };

            let merged = engine.merged_text(&descriptor)?;
            let file = ConflictFile::from_bytes(
                merged.raw.into_bytes(),
                merged.our_label,
                merged.their_label,
                limits,
            )
            .map_err(|err| CollectionError::Parse {
                path: our.path.clone(),
                source: err,
            })?
            .with_paths(our.path.clone(), their.path.clone(), our.mode)
            .with_context_radius(context_radius);
            files.push(file);
        }

        info!(
            files = files.len(),
            excluded = excluded.len(),
            "conflict collection ready"
        );
        Ok(Self {
            source,
            target,
            files,
            excluded,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn files(&self) -> &[ConflictFile] {
        &self.files
    }

    /// Paths the engine reported without both sides.
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn file_for_path(&self, our_path: &str, their_path: &str) -> Option<&ConflictFile> {
        self.files
            .iter()
            .find(|file| file.our_path() == our_path && file.their_path() == their_path)
    }

    /// Commit message template for committing a resolution.
    pub fn default_commit_message(&self) -> String {
        let conflicts: Vec<String> = self
            .files
            .iter()
            .map(|file| format!("#   {}", file.their_path()))
            .collect();

        format!(
            "Merge branch '{}' into '{}'\n\n# Conflicts:\n{}",
            self.target,
            self.source,
            conflicts.join("\n")
        )
    }

    pub fn view(&self) -> CollectionView<'_> {
        CollectionView {
            commit_message: self.default_commit_message(),
            files: self.files.iter().map(ConflictFile::view).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::file::DEFAULT_FILE_MODE;
    use crate::conflict::sections::DEFAULT_CONTEXT_RADIUS;
    use crate::errors::ParseError;

    /// Engine serving canned merge text.
    struct StaticEngine {
        entries: Vec<(ConflictDescriptor, String)>,
    }

    impl MergeEngine for StaticEngine {
        fn conflicts(&self) -> Result<Vec<ConflictDescriptor>, CollectionError> {
            Ok(self.entries.iter().map(|(d, _)| d.clone()).collect())
        }

        fn merged_text(
            &self,
            descriptor: &ConflictDescriptor,
        ) -> Result<MergedText, CollectionError> {
            let (our, their) = descriptor.sides()?;
            let (_, raw) = self
                .entries
                .iter()
                .find(|(d, _)| d == descriptor)
                .ok_or_else(|| CollectionError::UnknownPath(our.path.clone()))?;
            Ok(MergedText {
                raw: raw.clone(),
                our_label: our.path.clone(),
                their_label: their.path.clone(),
            })
        }
    }

    fn side(path: &str) -> Option<ConflictSide> {
        Some(ConflictSide {
            path: path.into(),
            mode: DEFAULT_FILE_MODE,
        })
    }

    fn conflict_text(path: &str) -> String {
        format!("<<<<<<< {path}\nours\n=======\ntheirs\n>>>>>>> {path}\n")
    }

    fn engine() -> StaticEngine {
        StaticEngine {
            entries: vec![
                (
                    ConflictDescriptor {
                        our: side("files/a.txt"),
                        their: side("files/a.txt"),
                    },
                    conflict_text("files/a.txt"),
                ),
                (
                    ConflictDescriptor {
                        our: None,
                        their: side("files/deleted.txt"),
                    },
                    String::new(),
                ),
                (
                    ConflictDescriptor {
                        our: side("files/b.txt"),
                        their: side("files/b.txt"),
                    },
                    conflict_text("files/b.txt"),
                ),
            ],
        }
    }

    fn collect(engine: &StaticEngine) -> Result<FileCollection, CollectionError> {
        FileCollection::new(
            engine,
            "feature",
            "main",
            DEFAULT_CONTEXT_RADIUS,
            &ParserLimits::default(),
        )
    }

    fn single(path: &str, raw: String) -> StaticEngine {
        StaticEngine {
            entries: vec![(
                ConflictDescriptor {
                    our: side(path),
                    their: side(path),
                },
                raw,
            )],
        }
    }

    #[test]
    fn test_collection_builds_one_file_per_complete_conflict() {
        let collection = collect(&engine()).unwrap();

        assert_eq!(collection.files().len(), 2);
        assert_eq!(collection.excluded(), ["files/deleted.txt".to_string()]);
        assert!(collection
            .file_for_path("files/b.txt", "files/b.txt")
            .is_some());
        assert!(collection
            .file_for_path("files/deleted.txt", "files/deleted.txt")
            .is_none());
    }

    #[test]
    fn test_default_commit_message() {
        let collection = collect(&engine()).unwrap();

        assert_eq!(
            collection.default_commit_message(),
            "Merge branch 'main' into 'feature'\n\n# Conflicts:\n#   files/a.txt\n#   files/b.txt"
        );
    }

    #[test]
    fn test_parse_failure_names_the_path() {
        let engine = StaticEngine {
            entries: vec![(
                ConflictDescriptor {
                    our: side("broken.txt"),
                    their: side("broken.txt"),
                },
                "<<<<<<< broken.txt\nfoo\n".to_string(),
            )],
        };

        let err = collect(&engine).unwrap_err();
        match err {
            CollectionError::Parse { path, source } => {
                assert_eq!(path, "broken.txt");
                assert!(matches!(source, ParseError::MissingEndDelimiter { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_oversized_merge_text_is_rejected() {
        let mut raw = conflict_text("big.txt");
        raw.push_str(&"filler line\n".repeat(100));
        let limits = ParserLimits {
            max_file_size: Some(256),
            reject_binary: true,
        };

        let engine = single("big.txt", raw.clone());
        let err = FileCollection::new(&engine, "feature", "main", 3, &limits).unwrap_err();
        match err {
            CollectionError::Parse { path, source } => {
                assert_eq!(path, "big.txt");
                assert_eq!(
                    source,
                    ParseError::FileTooLarge {
                        size: raw.len(),
                        limit: 256
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_binary_merge_text_is_rejected() {
        let raw = format!("{}\0\n", conflict_text("blob.bin"));

        let err = collect(&single("blob.bin", raw.clone())).unwrap_err();
        assert!(matches!(
            err,
            CollectionError::Parse { source: ParseError::BinaryContent, .. }
        ));

        let lenient = ParserLimits {
            max_file_size: None,
            reject_binary: false,
        };
        let engine = single("blob.bin", raw);
        let collection = FileCollection::new(&engine, "feature", "main", 3, &lenient).unwrap();
        assert_eq!(collection.files().len(), 1);
    }

    #[test]
    fn test_descriptor_sides() {
        let descriptor = ConflictDescriptor {
            our: side("x"),
            their: None,
        };
        assert_eq!(descriptor.display_path(), "x");
        assert!(matches!(
            descriptor.sides(),
            Err(CollectionError::ConflictSideMissing { ref path }) if path == "x"
        ));
    }

    #[test]
    fn test_view_serializes_commit_message_and_files() {
        let collection = collect(&engine()).unwrap();
        let json = serde_json::to_value(collection.view()).unwrap();

        assert!(json["commit_message"]
            .as_str()
            .unwrap()
            .contains("# Conflicts:"));
        assert_eq!(json["files"].as_array().unwrap().len(), 2);
        assert_eq!(json["files"][0]["their_path"], "files/a.txt");
    }
}
