pub mod document;
pub mod matcher;
pub mod offset_index;
pub mod token;

pub use document::{Document, PAGE_SEPARATOR, Page};
pub use matcher::{MatchKind, MatchSpan, find_all, find_exact, find_fuzzy};
pub use offset_index::OffsetTable;
pub use token::{Token, tokenize};
