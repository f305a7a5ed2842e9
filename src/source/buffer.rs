// In-memory sources: owned text and borrowed slices
//
// Both are addressable: lines are handed out as positions into one
// contiguous buffer, which is what lets the reader keep rows zero-copy.

use super::{DataSource, LinePosition, SourceLine};
use crate::core::Terminators;
use crate::error::{Result, SourceKind};
use crate::options::CsvOptions;

const BOM: &str = "\u{feff}";

/// Line source over any contiguous text.
#[derive(Debug, Clone)]
pub struct BufferSource<T> {
    data: T,
    /// First byte after a leading BOM.
    origin: usize,
    pos: usize,
    line: u64,
    terminators: Terminators,
    kind: SourceKind,
}

/// Owned in-memory text.
pub type TextSource = BufferSource<String>;

/// Borrowed text slice.
pub type SliceSource<'a> = BufferSource<&'a str>;

impl BufferSource<String> {
    pub fn new(text: impl Into<String>, options: &CsvOptions) -> Self {
        BufferSource::with_kind(text.into(), options, SourceKind::Text)
    }
}

impl<'a> BufferSource<&'a str> {
    pub fn new(text: &'a str, options: &CsvOptions) -> Self {
        BufferSource::with_kind(text, options, SourceKind::Slice)
    }
}

impl<T: AsRef<str>> BufferSource<T> {
    /// Any other owned text container (`Arc<str>`, `Box<str>`, ...).
    pub fn from_buffer(data: T, options: &CsvOptions) -> Self {
        BufferSource::with_kind(data, options, SourceKind::Text)
    }

    fn with_kind(data: T, options: &CsvOptions, kind: SourceKind) -> Self {
        let origin = if data.as_ref().starts_with(BOM) {
            BOM.len()
        } else {
            0
        };
        BufferSource {
            data,
            origin,
            pos: origin,
            line: 0,
            terminators: options.terminators().clone(),
            kind,
        }
    }

    pub fn into_inner(self) -> T {
        self.data
    }

    /// (content start, content end, next line start)
    #[inline]
    fn next_bounds(&mut self) -> Option<(usize, usize, usize)> {
        let bytes = self.data.as_ref().as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }
        let start = self.pos;
        let bounds = match self.terminators.find(bytes, start) {
            Some(brk) => (start, brk.pos, brk.next_start()),
            None => (start, bytes.len(), bytes.len()),
        };
        self.pos = bounds.2;
        self.line += 1;
        Some(bounds)
    }
}

impl<T: AsRef<str>> DataSource for BufferSource<T> {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn is_addressable(&self) -> bool {
        true
    }

    fn try_read_line(&mut self) -> Result<Option<SourceLine<'_>>> {
        let (start, end, next) = match self.next_bounds() {
            Some(bounds) => bounds,
            None => return Ok(None),
        };
        let text = self.data.as_ref();
        Ok(Some(SourceLine {
            text: &text[start..end],
            number: self.line,
            terminator: &text[end..next],
        }))
    }

    fn try_get_line_position(&mut self) -> Result<Option<LinePosition>> {
        Ok(self.next_bounds().map(|(start, end, _)| LinePosition {
            start,
            len: end - start,
            number: self.line,
        }))
    }

    fn buffer(&self) -> Result<&str> {
        Ok(self.data.as_ref())
    }

    fn reset(&mut self) -> Result<()> {
        self.pos = self.origin;
        self.line = 0;
        Ok(())
    }

    fn count_lines(&mut self) -> Result<u64> {
        let bytes = self.data.as_ref().as_bytes();
        Ok(self.terminators.count_lines(&bytes[self.origin..]))
    }

    fn has_more_data(&mut self) -> Result<bool> {
        Ok(self.pos < self.data.as_ref().len())
    }

    fn line_number(&self) -> u64 {
        self.line
    }
}
