//! Conflict parsing, display, and resolution.
//!
//! The conflict subsystem is responsible for:
//! 1. **Parsing** -- turning merge text with conflict markers into lines.
//! 2. **Sectioning** -- grouping lines for display, eliding long context.
//! 3. **Resolution** -- applying a per-conflict choice of side.
//! 4. **Collection** -- one [`ConflictFile`] per path reported by a
//!    [`MergeEngine`].

pub mod collection;
pub mod file;
pub mod line;
pub mod parser;
pub mod resolver;
pub mod sections;

pub use collection::{ConflictDescriptor, ConflictSide, FileCollection, MergeEngine, MergedText};
pub use file::{ConflictFile, Highlighter};
pub use line::{Line, LineKind};
pub use parser::{parse, parse_bytes, ParserLimits};
pub use resolver::{resolve_lines, resolved_content, ResolutionMap, Side};
pub use sections::{build_sections, section_id, Section, DEFAULT_CONTEXT_RADIUS};
