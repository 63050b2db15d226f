mod files;
mod span;

pub use files::{File, SourceLoc, SourceMap};
pub use span::{FileId, Span};
