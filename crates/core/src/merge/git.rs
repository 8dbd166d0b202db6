//! Repository merge engine via `git2`.
//!
//! Merges the trees of two commits against their merge base and reports
//! every path left conflicted in the resulting index. Conflict text is
//! produced from the three blobs with [`TextMerger::merge_texts`], labelled
//! with the our/their paths.

use std::path::{Path, PathBuf};

use git2::{Index, IndexEntry, Oid, Repository};
use tracing::{debug, info, instrument};

use crate::conflict::collection::{ConflictDescriptor, ConflictSide, MergeEngine, MergedText};
use crate::errors::{CollectionError, GitError, ParseError};
use crate::merge::text::{TextMerge, TextMerger};

/// Merge engine over a local Git repository.
pub struct GitMergeEngine {
    repo: Repository,
    repo_path: PathBuf,
    source: String,
    target: String,
    ours: Oid,
    theirs: Oid,
}

impl std::fmt::Debug for GitMergeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitMergeEngine")
            .field("repo_path", &self.repo_path)
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}

impl GitMergeEngine {
    /// Open the repository at `repo_path` to merge `target` ("theirs") into
    /// `source` ("ours").
    #[instrument(skip(repo_path), fields(path = %repo_path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(
        repo_path: P,
        source: &str,
        target: &str,
    ) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!("opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;

        let ours = resolve_commit(&repo, source)?;
        let theirs = resolve_commit(&repo, target)?;
        debug!(%ours, %theirs, "resolved merge revisions");

        Ok(Self {
            repo,
            repo_path: path.to_path_buf(),
            source: source.to_string(),
            target: target.to_string(),
            ours,
            theirs,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Merge both trees against their merge base.
    fn merge_index(&self) -> Result<Index, GitError> {
        let base = self
            .repo
            .merge_base(self.ours, self.theirs)
            .map_err(|_| GitError::NoMergeBase {
                ours: self.source.clone(),
                theirs: self.target.clone(),
            })?;

        let ancestor_tree = self.repo.find_commit(base)?.tree()?;
        let our_tree = self.repo.find_commit(self.ours)?.tree()?;
        let their_tree = self.repo.find_commit(self.theirs)?.tree()?;

        Ok(self
            .repo
            .merge_trees(&ancestor_tree, &our_tree, &their_tree, None)?)
    }

    fn blob_text(&self, entry: Option<&IndexEntry>, path: &str) -> Result<String, CollectionError> {
        let Some(entry) = entry else {
            return Ok(String::new());
        };
        let blob = self.repo.find_blob(entry.id).map_err(GitError::from)?;
        String::from_utf8(blob.content().to_vec()).map_err(|_| CollectionError::Parse {
            path: path.to_string(),
            source: ParseError::UnsupportedEncoding,
        })
    }
}

fn resolve_commit(repo: &Repository, rev: &str) -> Result<Oid, GitError> {
    let object = repo
        .revparse_single(rev)
        .map_err(|_| GitError::RevisionNotFound(rev.to_string()))?;
    let commit = object
        .peel_to_commit()
        .map_err(|_| GitError::RevisionNotFound(rev.to_string()))?;
    Ok(commit.id())
}

fn entry_side(entry: &IndexEntry) -> ConflictSide {
    ConflictSide {
        path: String::from_utf8_lossy(&entry.path).into_owned(),
        mode: entry.mode,
    }
}

impl MergeEngine for GitMergeEngine {
    #[instrument(skip(self), fields(source = %self.source, target = %self.target))]
    fn conflicts(&self) -> Result<Vec<ConflictDescriptor>, CollectionError> {
        let index = self.merge_index()?;
        let mut descriptors = Vec::new();

        for conflict in index.conflicts().map_err(GitError::from)? {
            let conflict = conflict.map_err(GitError::from)?;
            descriptors.push(ConflictDescriptor {
                our: conflict.our.as_ref().map(entry_side),
                their: conflict.their.as_ref().map(entry_side),
            });
        }

        info!(conflicts = descriptors.len(), "merged repository trees");
        Ok(descriptors)
    }

    fn merged_text(&self, descriptor: &ConflictDescriptor) -> Result<MergedText, CollectionError> {
        let (our, their) = descriptor.sides()?;
        let index = self.merge_index()?;

        for conflict in index.conflicts().map_err(GitError::from)? {
            let conflict = conflict.map_err(GitError::from)?;
            let (Some(our_entry), Some(their_entry)) = (&conflict.our, &conflict.their) else {
                continue;
            };
            if entry_side(our_entry) != *our || entry_side(their_entry) != *their {
                continue;
            }

            let base = self.blob_text(conflict.ancestor.as_ref(), &our.path)?;
            let ours = self.blob_text(Some(our_entry), &our.path)?;
            let theirs = self.blob_text(Some(their_entry), &our.path)?;

            let raw = match TextMerger::merge_texts(&base, &ours, &theirs, &our.path, &their.path)
            {
                TextMerge::Clean(text) | TextMerge::Conflicted(text) => text,
            };
            debug!(path = %our.path, bytes = raw.len(), "produced merge text");

            return Ok(MergedText {
                raw,
                our_label: our.path.clone(),
                their_label: their.path.clone(),
            });
        }

        Err(CollectionError::UnknownPath(our.path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::collection::FileCollection;
    use crate::conflict::parser::ParserLimits;
    use crate::conflict::resolver::{ResolutionMap, Side};
    use crate::conflict::sections::DEFAULT_CONTEXT_RADIUS;
    use git2::Signature;
    use tempfile::TempDir;

    /// Commit `files` as the full tree of a new commit on `branch`.
    fn commit(
        repo: &Repository,
        branch: &str,
        parents: &[Oid],
        files: &[(&str, &str)],
    ) -> Oid {
        let mut builder = repo.treebuilder(None).unwrap();
        for (path, content) in files {
            let blob = repo.blob(content.as_bytes()).unwrap();
            builder.insert(*path, blob, 0o100644).unwrap();
        }
        let tree = repo.find_tree(builder.write().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parents: Vec<git2::Commit<'_>> =
            parents.iter().map(|p| repo.find_commit(*p).unwrap()).collect();
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
        let refname = format!("refs/heads/{branch}");
        repo.commit(
            Some(refname.as_str()),
            &sig,
            &sig,
            "test commit",
            &tree,
            &parent_refs,
        )
        .unwrap()
    }

    fn conflicted_repo() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let base = commit(
            &repo,
            "main",
            &[],
            &[
                ("file.txt", "line1\noriginal\nline3\n"),
                ("gone.txt", "keep me\n"),
                ("same.txt", "untouched\n"),
            ],
        );
        commit(
            &repo,
            "feature",
            &[base],
            &[
                ("file.txt", "line1\nfeature\nline3\n"),
                ("same.txt", "untouched\n"),
            ],
        );
        commit(
            &repo,
            "main",
            &[base],
            &[
                ("file.txt", "line1\nmain\nline3\n"),
                ("gone.txt", "changed on main\n"),
                ("same.txt", "untouched\n"),
            ],
        );

        dir
    }

    #[test]
    fn test_open_rejects_missing_repository() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitMergeEngine::open(dir.path().join("nope"), "a", "b");
        assert!(matches!(result, Err(GitError::RepositoryNotFound(_))));
    }

    #[test]
    fn test_open_rejects_unknown_revision() {
        let dir = conflicted_repo();
        let result = GitMergeEngine::open(dir.path(), "feature", "does-not-exist");
        assert!(matches!(result, Err(GitError::RevisionNotFound(ref r)) if r == "does-not-exist"));
    }

    #[test]
    fn test_reports_conflicts_including_one_sided() {
        let dir = conflicted_repo();
        let engine = GitMergeEngine::open(dir.path(), "feature", "main").unwrap();

        let mut paths: Vec<String> = engine
            .conflicts()
            .unwrap()
            .iter()
            .map(|d| d.display_path().to_string())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["file.txt", "gone.txt"]);
    }

    #[test]
    fn test_collection_from_repository() {
        let dir = conflicted_repo();
        let engine = GitMergeEngine::open(dir.path(), "feature", "main").unwrap();
        let collection = FileCollection::new(
            &engine,
            "feature",
            "main",
            DEFAULT_CONTEXT_RADIUS,
            &ParserLimits::default(),
        )
        .unwrap();

        assert_eq!(collection.files().len(), 1);
        assert_eq!(collection.excluded(), ["gone.txt".to_string()]);
        assert_eq!(
            collection.default_commit_message(),
            "Merge branch 'main' into 'feature'\n\n# Conflicts:\n#   file.txt"
        );

        let file = collection.file_for_path("file.txt", "file.txt").unwrap();
        assert_eq!(file.our_label(), "file.txt");
        let id = file.conflict_ids()[0].to_string();

        let ours = file
            .resolve(&ResolutionMap::from([(id.clone(), Side::Ours)]))
            .unwrap();
        assert_eq!(ours, "line1\nfeature\nline3");

        let theirs = file
            .resolve(&ResolutionMap::from([(id, Side::Theirs)]))
            .unwrap();
        assert_eq!(theirs, "line1\nmain\nline3");
    }
}
