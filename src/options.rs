// Parse configuration
//
// CsvOptions is immutable once built and shared by every component of one
// read. Single-byte delimiter and quote are required so the scanners can
// work on raw bytes of UTF-8 text without ever splitting a code point.

use crate::core::Terminators;
use crate::error::{CsvError, Result};
use crate::pool::StringPool;
use std::fmt;
use std::sync::Arc;

#[cfg(windows)]
const PLATFORM_NEWLINE: &str = "\r\n";
#[cfg(not(windows))]
const PLATFORM_NEWLINE: &str = "\n";

/// Immutable parse configuration.
#[derive(Clone)]
pub struct CsvOptions {
    delimiter: u8,
    quote: u8,
    has_header: bool,
    trim_whitespace: bool,
    skip_empty_fields: bool,
    line_terminator: String,
    terminators: Terminators,
    string_pool: Option<Arc<StringPool>>,
}

impl CsvOptions {
    pub fn builder() -> CsvOptionsBuilder {
        CsvOptionsBuilder::default()
    }

    #[inline]
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    #[inline]
    pub fn quote(&self) -> u8 {
        self.quote
    }

    #[inline]
    pub fn has_header(&self) -> bool {
        self.has_header
    }

    #[inline]
    pub fn trim_whitespace(&self) -> bool {
        self.trim_whitespace
    }

    /// Only affects `Row::mapped_fields`; tokenization always keeps empty fields.
    #[inline]
    pub fn skip_empty_fields(&self) -> bool {
        self.skip_empty_fields
    }

    pub fn line_terminator(&self) -> &str {
        &self.line_terminator
    }

    /// Recognizer derived from `line_terminator`.
    #[inline]
    pub fn terminators(&self) -> &Terminators {
        &self.terminators
    }

    pub fn string_pool(&self) -> Option<&Arc<StringPool>> {
        self.string_pool.as_ref()
    }
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: b',',
            quote: b'"',
            has_header: false,
            trim_whitespace: false,
            skip_empty_fields: false,
            line_terminator: PLATFORM_NEWLINE.to_string(),
            terminators: Terminators::Standard,
            string_pool: None,
        }
    }
}

impl fmt::Debug for CsvOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvOptions")
            .field("delimiter", &(self.delimiter as char))
            .field("quote", &(self.quote as char))
            .field("has_header", &self.has_header)
            .field("trim_whitespace", &self.trim_whitespace)
            .field("skip_empty_fields", &self.skip_empty_fields)
            .field("line_terminator", &self.line_terminator)
            .field("string_pool", &self.string_pool.is_some())
            .finish()
    }
}

/// Builder for [`CsvOptions`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct CsvOptionsBuilder {
    delimiter: char,
    quote: char,
    has_header: bool,
    trim_whitespace: bool,
    skip_empty_fields: bool,
    line_terminator: String,
    string_pool: Option<Arc<StringPool>>,
}

impl Default for CsvOptionsBuilder {
    fn default() -> Self {
        CsvOptionsBuilder {
            delimiter: ',',
            quote: '"',
            has_header: false,
            trim_whitespace: false,
            skip_empty_fields: false,
            line_terminator: PLATFORM_NEWLINE.to_string(),
            string_pool: None,
        }
    }
}

impl CsvOptionsBuilder {
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn quote(mut self, quote: char) -> Self {
        self.quote = quote;
        self
    }

    pub fn has_header(mut self, yes: bool) -> Self {
        self.has_header = yes;
        self
    }

    pub fn trim_whitespace(mut self, yes: bool) -> Self {
        self.trim_whitespace = yes;
        self
    }

    pub fn skip_empty_fields(mut self, yes: bool) -> Self {
        self.skip_empty_fields = yes;
        self
    }

    /// `"\n"`, `"\r\n"` and `"\r"` all enable recognition of the three
    /// standard line endings. Any other string is matched literally.
    pub fn line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.line_terminator = terminator.into();
        self
    }

    pub fn string_pool(mut self, pool: Arc<StringPool>) -> Self {
        self.string_pool = Some(pool);
        self
    }

    pub fn build(self) -> Result<CsvOptions> {
        let delimiter = ascii_byte("delimiter", self.delimiter)?;
        let quote = ascii_byte("quote", self.quote)?;
        if delimiter == quote {
            return Err(CsvError::InvalidOptions(format!(
                "delimiter and quote must differ (both {:?})",
                self.delimiter
            )));
        }
        if self.line_terminator.is_empty() {
            return Err(CsvError::InvalidOptions(
                "line terminator must not be empty".to_string(),
            ));
        }
        if self
            .line_terminator
            .bytes()
            .any(|b| b == delimiter || b == quote)
        {
            return Err(CsvError::InvalidOptions(format!(
                "line terminator {:?} contains the delimiter or quote",
                self.line_terminator
            )));
        }

        let terminators = Terminators::from_configured(&self.line_terminator);
        Ok(CsvOptions {
            delimiter,
            quote,
            has_header: self.has_header,
            trim_whitespace: self.trim_whitespace,
            skip_empty_fields: self.skip_empty_fields,
            line_terminator: self.line_terminator,
            terminators,
            string_pool: self.string_pool,
        })
    }
}

fn ascii_byte(what: &str, c: char) -> Result<u8> {
    if !c.is_ascii() {
        return Err(CsvError::InvalidOptions(format!(
            "{what} must be an ASCII character, got {c:?}"
        )));
    }
    if c == '\r' || c == '\n' {
        return Err(CsvError::InvalidOptions(format!(
            "{what} must not be a line break character"
        )));
    }
    Ok(c as u8)
}
