//! Source text helpers: line lookups and byte-preserving blanking

use std::ops::Range;

/// Byte offsets of line starts, for offset → 1-based line lookups
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Index the line starts of a text
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            starts,
            len: text.len(),
        }
    }

    /// 1-based line containing a byte offset
    pub fn line_of(&self, offset: usize) -> u32 {
        let idx = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        idx as u32 + 1
    }

    /// Number of lines
    pub fn line_count(&self) -> u32 {
        self.starts.len() as u32
    }

    /// Byte range of a 1-based line, without its newline
    pub fn line_range(&self, line: u32) -> (usize, usize) {
        let idx = (line.max(1) - 1) as usize;
        let start = self.starts.get(idx).copied().unwrap_or(self.len);
        let end = self
            .starts
            .get(idx + 1)
            .map(|s| s.saturating_sub(1))
            .unwrap_or(self.len);
        (start, end.max(start))
    }

    /// Text of a 1-based line
    pub fn line<'a>(&self, text: &'a str, line: u32) -> &'a str {
        let (start, end) = self.line_range(line);
        text.get(start..end).unwrap_or("").trim_end_matches('\r')
    }

    /// Text of lines `first..=last`
    pub fn lines<'a>(&self, text: &'a str, first: u32, last: u32) -> &'a str {
        let (start, _) = self.line_range(first);
        let (_, end) = self.line_range(last.max(first));
        text.get(start..end).unwrap_or("")
    }
}

/// Replace the bytes in `ranges` with spaces, keeping newlines
///
/// Offsets and line numbers in the result match the original text.
pub fn blank_ranges(text: &str, ranges: &[Range<usize>]) -> String {
    let mut bytes = text.as_bytes().to_vec();
    for range in ranges {
        let end = range.end.min(bytes.len());
        for b in bytes.iter_mut().take(end).skip(range.start) {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    }
    // Ranges are node extents, so multi-byte characters are blanked whole
    String::from_utf8(bytes).unwrap_or_else(|_| text.to_string())
}
