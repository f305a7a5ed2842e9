// Reader: source -> logical records -> strategy -> rows
//
// A logical record is one physical line, or several when a quoted field
// embeds line breaks. Addressable sources keep records as spans of their
// buffer, so rows stay zero-copy; streams join the physical lines (with the
// terminators that separated them) into a pooled scratch string.

use crate::core::{FieldSpan, QuoteScan};
use crate::error::Result;
use crate::options::CsvOptions;
use crate::pool::{BufferPool, PooledString};
use crate::row::{Record, Row};
use crate::source::{DataSource, SliceSource, StreamSource, TextSource};
use crate::strategy::StrategySet;
use crate::validation::{ValidationSink, Validator};
use log::debug;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

/// Where the current logical record lives.
enum Logical {
    /// Byte range of the source buffer.
    Span(usize, usize),
    /// Joined into the reader's scratch string.
    Scratch,
}

pub struct CsvReader<S> {
    source: S,
    options: Arc<CsvOptions>,
    strategies: Arc<StrategySet>,
    scan: QuoteScan,
    spans: Vec<FieldSpan>,
    scratch: PooledString,
    /// Terminator of the last physical line joined into `scratch`.
    terminator: String,
    sink: Option<Box<dyn ValidationSink>>,
    validator: Validator,
    header_read: bool,
    headers: Option<Record>,
}

impl<S: DataSource> CsvReader<S> {
    pub fn new(source: S, options: impl Into<Arc<CsvOptions>>) -> Self {
        let options = options.into();
        let pool = Arc::new(BufferPool::new());
        debug!(
            "reader created over {} source (header: {}, trim: {})",
            source.kind(),
            options.has_header(),
            options.trim_whitespace()
        );
        CsvReader {
            source,
            scan: QuoteScan::new(options.delimiter(), options.quote(), options.trim_whitespace()),
            options,
            strategies: Arc::new(StrategySet::default()),
            spans: Vec::with_capacity(16),
            scratch: pool.lease_string(0),
            terminator: String::new(),
            sink: None,
            validator: Validator::default(),
            header_read: false,
            headers: None,
        }
    }

    /// Share one strategy registry between readers.
    pub fn with_strategies(mut self, strategies: Arc<StrategySet>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Enable per-record validation, reporting into `sink`.
    pub fn with_validation(mut self, sink: impl ValidationSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Rent the record scratch buffer from a shared pool.
    pub fn with_buffer_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.scratch = pool.lease_string(0);
        self
    }

    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    pub fn strategies(&self) -> &StrategySet {
        &self.strategies
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Next record as a zero-copy view, valid until the next call.
    /// The header record, if configured, is consumed first and never returned.
    ///
    /// On a stream, a quote that never closes buffers the rest of the input
    /// into this one record, so memory grows with the remaining input.
    pub fn try_read_record(&mut self) -> Result<Option<Row<'_>>> {
        self.ensure_header()?;
        self.next_row()
    }

    /// Materialize every remaining record.
    pub fn read_all_records(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(row) = self.try_read_record()? {
            records.push(row.to_record());
        }
        Ok(records)
    }

    /// Zero-copy iteration over every remaining record.
    pub fn for_each_row<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(Row<'_>),
    {
        while let Some(row) = self.try_read_record()? {
            f(row);
        }
        Ok(())
    }

    /// Owned records, one `Result` per record.
    pub fn records(&mut self) -> RecordIter<'_, S> {
        RecordIter { reader: self }
    }

    /// The header record, read on first use when `has_header` is set.
    pub fn headers(&mut self) -> Result<Option<&Record>> {
        self.ensure_header()?;
        Ok(self.headers.as_ref())
    }

    /// Physical line count minus the header, without tokenizing. A quoted
    /// field spanning N lines counts N times; see `count_logical_records`.
    pub fn count_records(&mut self) -> Result<u64> {
        let lines = self.source.count_lines()?;
        Ok(self.without_header(lines))
    }

    /// Quote-aware record count, minus the header. Scans quote state only.
    /// Streams must be seekable; the read position is preserved.
    pub fn count_logical_records(&mut self) -> Result<u64> {
        let records = if self.source.is_addressable() {
            count_logical_in(self.source.buffer()?, &self.options)?
        } else {
            self.count_logical_by_rewind()?
        };
        Ok(self.without_header(records))
    }

    /// Rewind to the first record. Fails without side effects when the
    /// source cannot rewind.
    pub fn reset(&mut self) -> Result<()> {
        self.source.reset()?;
        self.scan.restart();
        self.validator.reset();
        self.header_read = false;
        self.headers = None;
        debug!("reader reset ({} source)", self.source.kind());
        Ok(())
    }

    pub fn has_more_data(&mut self) -> Result<bool> {
        self.ensure_header()?;
        self.source.has_more_data()
    }

    fn ensure_header(&mut self) -> Result<()> {
        if self.header_read || !self.options.has_header() {
            return Ok(());
        }
        self.header_read = true;
        let header = self.next_row()?.map(|row| row.to_record());
        self.headers = header;
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<Row<'_>>> {
        let (logical, number) = match self.read_logical()? {
            Some(found) => found,
            None => return Ok(None),
        };
        let line: &str = match logical {
            Logical::Span(start, end) => &self.source.buffer()?[start..end],
            Logical::Scratch => &self.scratch,
        };

        self.spans.clear();
        self.strategies.tokenize(line, &self.options, &mut self.spans);
        if let Some(sink) = self.sink.as_deref_mut() {
            self.validator.check(&self.spans, number, sink);
        }
        Ok(Some(Row::new(line, &self.spans, &self.options, number)))
    }

    fn read_logical(&mut self) -> Result<Option<(Logical, u64)>> {
        if self.source.is_addressable() {
            let span = next_logical_span(&mut self.source, &mut self.scan)?;
            return Ok(span.map(|(start, end, number)| (Logical::Span(start, end), number)));
        }

        self.scan.restart();
        self.scratch.clear();
        let number = match self.source.try_read_line()? {
            Some(line) => {
                self.scan.feed(line.text.as_bytes());
                self.scratch.push_str(line.text);
                self.terminator.clear();
                self.terminator.push_str(line.terminator);
                line.number
            }
            None => return Ok(None),
        };
        while self.scan.in_quotes() {
            match self.source.try_read_line()? {
                Some(line) => {
                    self.scan.feed(line.text.as_bytes());
                    self.scratch.push_str(&self.terminator);
                    self.scratch.push_str(line.text);
                    self.terminator.clear();
                    self.terminator.push_str(line.terminator);
                }
                None => break,
            }
        }
        Ok(Some((Logical::Scratch, number)))
    }

    fn count_logical_by_rewind(&mut self) -> Result<u64> {
        let resume_at = self.source.line_number();
        self.source.reset()?;

        let options = &self.options;
        let mut scan = QuoteScan::new(options.delimiter(), options.quote(), options.trim_whitespace());
        let mut records = 0u64;
        let mut open = false;
        let counted = loop {
            match self.source.try_read_line() {
                Ok(Some(line)) => {
                    scan.feed(line.text.as_bytes());
                    open = scan.in_quotes();
                    if !open {
                        records += 1;
                        scan.restart();
                    }
                }
                Ok(None) => break Ok(records + u64::from(open)),
                Err(err) => break Err(err),
            }
        };

        self.skip_to_line(resume_at)?;
        counted
    }

    /// Rewind, then re-read until `line` lines have been produced again.
    fn skip_to_line(&mut self, line: u64) -> Result<()> {
        self.source.reset()?;
        while self.source.line_number() < line {
            if self.source.try_read_line()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    fn without_header(&self, count: u64) -> u64 {
        if self.options.has_header() {
            count.saturating_sub(1)
        } else {
            count
        }
    }
}

impl CsvReader<TextSource> {
    pub fn from_text(text: impl Into<String>, options: impl Into<Arc<CsvOptions>>) -> Self {
        let options = options.into();
        let source = TextSource::new(text, &options);
        CsvReader::new(source, options)
    }
}

impl<'a> CsvReader<SliceSource<'a>> {
    pub fn from_slice(text: &'a str, options: impl Into<Arc<CsvOptions>>) -> Self {
        let options = options.into();
        let source = SliceSource::new(text, &options);
        CsvReader::new(source, options)
    }
}

impl<R: Read> CsvReader<StreamSource<R>> {
    /// Forward-only stream reader. Use `StreamSource::seekable` with
    /// `CsvReader::new` for a rewindable one.
    pub fn from_reader(reader: R, options: impl Into<Arc<CsvOptions>>) -> Self {
        let options = options.into();
        let source = StreamSource::new(reader, &options);
        CsvReader::new(source, options)
    }
}

impl<S: DataSource> fmt::Debug for CsvReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvReader")
            .field("source", &self.source.kind())
            .field("line", &self.source.line_number())
            .field("options", &self.options)
            .field("strategies", &self.strategies)
            .field("validating", &self.sink.is_some())
            .finish()
    }
}

/// Iterator returned by [`CsvReader::records`].
pub struct RecordIter<'a, S> {
    reader: &'a mut CsvReader<S>,
}

impl<S: DataSource> Iterator for RecordIter<'_, S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.try_read_record() {
            Ok(Some(row)) => Some(Ok(row.to_record())),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// Read the next logical record of an addressable source as
/// `(start, end, first line number)`.
pub(crate) fn next_logical_span<S: DataSource + ?Sized>(
    source: &mut S,
    scan: &mut QuoteScan,
) -> Result<Option<(usize, usize, u64)>> {
    let first = match source.try_get_line_position()? {
        Some(position) => position,
        None => return Ok(None),
    };
    scan.restart();
    scan.feed(&source.buffer()?.as_bytes()[first.start..first.end()]);
    let mut end = first.end();
    while scan.in_quotes() {
        match source.try_get_line_position()? {
            Some(next) => {
                scan.feed(&source.buffer()?.as_bytes()[next.start..next.end()]);
                end = next.end();
            }
            None => break,
        }
    }
    Ok(Some((first.start, end, first.number)))
}

fn count_logical_in(text: &str, options: &CsvOptions) -> Result<u64> {
    let mut source = SliceSource::new(text, options);
    let mut scan = QuoteScan::new(options.delimiter(), options.quote(), options.trim_whitespace());
    let mut records = 0u64;
    while next_logical_span(&mut source, &mut scan)?.is_some() {
        records += 1;
    }
    Ok(records)
}
