// Where the text comes from
//
// A DataSource yields physical lines split on the configured terminators,
// independent of the field delimiter. Quote-aware reassembly of multi-line
// records happens in the reader, on top of this.

pub mod buffer;
pub mod feeder;
pub mod stream;

pub use buffer::{BufferSource, SliceSource, TextSource};
pub use feeder::LineFeeder;
pub use stream::StreamSource;

use crate::error::{CsvError, Result, SourceKind};

/// One physical line. Valid until the source advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// Line content without its terminator.
    pub text: &'a str,
    /// 1-based physical line number.
    pub number: u64,
    /// The terminator that ended the line; empty at end of input.
    pub terminator: &'a str,
}

/// Location of a physical line inside `DataSource::buffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePosition {
    pub start: usize,
    pub len: usize,
    /// 1-based physical line number.
    pub number: u64,
}

impl LinePosition {
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

pub trait DataSource {
    fn kind(&self) -> SourceKind;

    /// True when `buffer` and `try_get_line_position` are supported.
    fn is_addressable(&self) -> bool {
        false
    }

    /// Next physical line, or None at end of input.
    fn try_read_line(&mut self) -> Result<Option<SourceLine<'_>>>;

    /// Zero-copy variant of `try_read_line` for addressable sources.
    fn try_get_line_position(&mut self) -> Result<Option<LinePosition>> {
        Err(CsvError::unsupported("try_get_line_position", self.kind()))
    }

    /// The whole backing text, for addressable sources.
    fn buffer(&self) -> Result<&str> {
        Err(CsvError::unsupported("buffer", self.kind()))
    }

    /// Rewind to the first line.
    fn reset(&mut self) -> Result<()>;

    /// Physical line count of the whole source, without tokenizing.
    /// Does not move the read position.
    fn count_lines(&mut self) -> Result<u64>;

    fn has_more_data(&mut self) -> Result<bool>;

    /// Number of lines produced since the start (or the last reset).
    fn line_number(&self) -> u64;
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn kind(&self) -> SourceKind {
        (**self).kind()
    }

    fn is_addressable(&self) -> bool {
        (**self).is_addressable()
    }

    fn try_read_line(&mut self) -> Result<Option<SourceLine<'_>>> {
        (**self).try_read_line()
    }

    fn try_get_line_position(&mut self) -> Result<Option<LinePosition>> {
        (**self).try_get_line_position()
    }

    fn buffer(&self) -> Result<&str> {
        (**self).buffer()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn count_lines(&mut self) -> Result<u64> {
        (**self).count_lines()
    }

    fn has_more_data(&mut self) -> Result<bool> {
        (**self).has_more_data()
    }

    fn line_number(&self) -> u64 {
        (**self).line_number()
    }
}
