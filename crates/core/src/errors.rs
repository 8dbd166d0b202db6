//! Error types for the mergeview core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Errors raised while turning raw merge text into lines.
///
/// All of them mean the file cannot be presented for resolution; the caller
/// should surface them as "cannot parse conflict".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A conflict marker appeared outside the expected marker sequence.
    #[error("unexpected conflict delimiter on line {line}")]
    UnexpectedDelimiter { line: usize },

    /// The input ended while still inside a conflict region.
    #[error("missing conflict end delimiter (input ended on line {line})")]
    MissingEndDelimiter { line: usize },

    /// The input exceeds the configured size limit.
    #[error("merge text is {size} bytes, exceeding the {limit} byte limit")]
    FileTooLarge { size: usize, limit: usize },

    /// The input looks like binary content.
    #[error("merge text contains binary content")]
    BinaryContent,

    /// The input is not valid UTF-8.
    #[error("merge text is not valid UTF-8")]
    UnsupportedEncoding,
}

// ---------------------------------------------------------------------------
// Resolution errors
// ---------------------------------------------------------------------------

/// Errors raised while applying a resolution to a conflict file.
///
/// Resolution is all-or-nothing: on any of these errors no content is
/// produced and the caller has to ask again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// A conflict section has no entry in the resolution map.
    #[error("missing resolution for section ID: {section_id}")]
    MissingResolution { section_id: String },

    /// The resolution map names a section that is not a conflict in this file.
    #[error("resolution names unknown section ID: {section_id}")]
    UnknownSection { section_id: String },

    /// Manually resolved content is empty.
    #[error("resolved content is empty")]
    EmptyContent,

    /// Manually resolved content is identical to the unresolved merge text.
    #[error("resolved content has no changes")]
    UnchangedContent,

    /// Manually resolved content still contains conflict markers.
    #[error("resolved content still contains a conflict marker on line {line}")]
    MarkersRemain { line: usize },
}

// ---------------------------------------------------------------------------
// Collection errors
// ---------------------------------------------------------------------------

/// Errors at the boundary with the external merge engine.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The merge engine reported a conflict without both an "ours" and a
    /// "theirs" side.
    #[error("conflict at '{path}' is missing its ours or theirs side")]
    ConflictSideMissing { path: String },

    /// The merge text for a path could not be parsed.
    #[error("cannot parse conflict in '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },

    /// The merge engine reported a path it has no merge text for.
    #[error("no merge text available for '{0}'")]
    UnknownPath(String),

    /// Underlying repository error.
    #[error(transparent)]
    Git(#[from] GitError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from the `git2`-backed merge engine.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A revision (branch, tag, SHA) could not be resolved to a commit.
    #[error("git revision not found: {0}")]
    RevisionNotFound(String),

    /// The two revisions share no history.
    #[error("no merge base between '{ours}' and '{theirs}'")]
    NoMergeBase { ours: String, theirs: String },

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
