use std::fmt;
use std::path::{Path, PathBuf};

use crate::span::FileId;

#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<File>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, path: impl Into<PathBuf>, source: impl Into<String>) -> FileId {
        self.files.push(File::new(path, source));
        FileId(u32::try_from(self.files.len() - 1).expect("file count should fit in u32"))
    }

    #[inline]
    pub fn get(&self, id: FileId) -> Option<&File> {
        self.files.get(id.0 as usize)
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &File)> {
        self.files
            .iter()
            .enumerate()
            .map(|(i, file)| (FileId(i as u32), file))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl fmt::Display for SourceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.files().enumerate().try_for_each(|(i, (_, file))| {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", file.path.display())
        })
    }
}

#[derive(Debug)]
pub struct File {
    path: PathBuf,
    source: String,
    lines: Vec<u32>,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let source = source.into();
        let lines = source
            .match_indices('\n')
            .map(|(offset, _)| offset as u32 + 1)
            .collect();
        Self {
            path: path.into(),
            source,
            lines,
        }
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Maps a byte offset to a zero-based line and column.
    pub fn lookup(&self, offset: u32) -> SourceLoc {
        let line = match self.lines.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        let line_start = if line == 0 { 0 } else { self.lines[line - 1] };
        let end = (offset as usize).min(self.source.len());
        SourceLoc {
            line,
            col: self
                .source
                .get(line_start as usize..end)
                .map_or(0, |s| s.chars().count()),
        }
    }

    pub fn line(&self, idx: usize) -> Option<&str> {
        let start = if idx == 0 {
            0
        } else {
            self.lines.get(idx - 1).copied()?
        };
        let end = self
            .lines
            .get(idx)
            .map_or(self.source.len(), |&end| end as usize);
        self.source.get(start as usize..end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLoc {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.col + 1)
    }
}
