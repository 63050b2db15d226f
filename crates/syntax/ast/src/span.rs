use std::fmt;

/// A byte range inside one source file of the compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
    pub file: FileId,
}

impl Span {
    pub fn new(start: u32, end: u32, file: FileId) -> Self {
        Span { start, end, file }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} in file {}", self.start, self.end, self.file.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub(super) u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_range_and_file() {
        let span = Span::new(4, 8, FileId(0));
        assert_eq!(span.to_string(), "4-8 in file 0");
    }
}
