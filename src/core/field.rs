// Field spans and quote resolution
//
// Tokenizers never copy: they record where each field's content lives in the
// line and what still has to be done to it. Resolution returns
// Cow::Borrowed unless doubled quotes or malformed quoting force a copy.

use memchr::memchr;
use std::borrow::Cow;

/// How a span's bytes relate to the field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Unquoted; span is the (trimmed) value.
    Plain,
    /// Quoted with no escapes; span is the content between the quotes.
    Quoted,
    /// Quoted with doubled quotes; span is the content between the quotes.
    Escaped,
    /// Opening quote never closed; span runs from after the quote to end of line.
    Unterminated,
    /// Data after the closing quote; span covers the raw field from the opening quote.
    Malformed,
}

impl FieldKind {
    /// True when quoting was not well-formed (reported by validation).
    #[inline]
    pub fn is_irregular(self) -> bool {
        matches!(self, FieldKind::Unterminated | FieldKind::Malformed)
    }
}

/// Position of one field within a tokenized line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldSpan {
    pub start: usize,
    pub end: usize,
    pub kind: FieldKind,
}

impl FieldSpan {
    #[inline]
    pub fn new(start: usize, end: usize, kind: FieldKind) -> Self {
        FieldSpan { start, end, kind }
    }

    #[inline]
    pub fn plain(start: usize, end: usize) -> Self {
        FieldSpan::new(start, end, FieldKind::Plain)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Raw bytes of the span, before quote resolution.
    #[inline]
    pub fn raw<'a>(&self, line: &'a str) -> &'a str {
        &line[self.start..self.end]
    }
}

/// Resolve a span into the field value.
#[inline]
pub fn resolve_field<'a>(line: &'a str, span: &FieldSpan, quote: u8) -> Cow<'a, str> {
    let raw = span.raw(line);
    match span.kind {
        FieldKind::Plain | FieldKind::Quoted => Cow::Borrowed(raw),
        FieldKind::Escaped | FieldKind::Unterminated => {
            if memchr(quote, raw.as_bytes()).is_none() {
                Cow::Borrowed(raw)
            } else {
                let mut out = String::with_capacity(raw.len());
                collapse_doubled_quotes(raw, quote, &mut out);
                Cow::Owned(out)
            }
        }
        FieldKind::Malformed => {
            let mut out = String::with_capacity(raw.len());
            decode_malformed(raw, quote, &mut out);
            Cow::Owned(out)
        }
    }
}

/// Append the resolved value to `out` (no allocation beyond `out` growth).
#[inline]
pub fn write_resolved(line: &str, span: &FieldSpan, quote: u8, out: &mut String) {
    let raw = span.raw(line);
    match span.kind {
        FieldKind::Plain | FieldKind::Quoted => out.push_str(raw),
        FieldKind::Escaped | FieldKind::Unterminated => collapse_doubled_quotes(raw, quote, out),
        FieldKind::Malformed => decode_malformed(raw, quote, out),
    }
}

/// True when resolving this span would allocate.
#[inline]
pub fn needs_copy(line: &str, span: &FieldSpan, quote: u8) -> bool {
    match span.kind {
        FieldKind::Plain | FieldKind::Quoted => false,
        FieldKind::Escaped | FieldKind::Unterminated => {
            memchr(quote, span.raw(line).as_bytes()).is_some()
        }
        FieldKind::Malformed => true,
    }
}

/// `He said ""hi""` -> `He said "hi"`. A lone quote is kept as-is.
pub fn collapse_doubled_quotes(inner: &str, quote: u8, out: &mut String) {
    let bytes = inner.as_bytes();
    let mut copied = 0;
    let mut pos = 0;
    while let Some(offset) = memchr(quote, &bytes[pos..]) {
        let q = pos + offset;
        // Keep the first quote of the pair
        out.push_str(&inner[copied..=q]);
        if q + 1 < bytes.len() && bytes[q + 1] == quote {
            pos = q + 2;
        } else {
            pos = q + 1;
        }
        copied = pos;
        if pos >= bytes.len() {
            break;
        }
    }
    if copied < inner.len() {
        out.push_str(&inner[copied..]);
    }
}

/// Decode a raw field that starts with a quote and has data after its
/// closing quote: quoted part unescaped, remainder appended verbatim.
pub fn decode_malformed(raw: &str, quote: u8, out: &mut String) {
    let bytes = raw.as_bytes();
    if bytes.first() != Some(&quote) {
        out.push_str(raw);
        return;
    }
    let mut pos = 1;
    loop {
        match memchr(quote, &bytes[pos..]) {
            None => {
                out.push_str(&raw[pos..]);
                return;
            }
            Some(offset) => {
                let q = pos + offset;
                out.push_str(&raw[pos..q]);
                if q + 1 < bytes.len() && bytes[q + 1] == quote {
                    out.push_str(&raw[q..=q]);
                    pos = q + 2;
                } else {
                    out.push_str(&raw[q + 1..]);
                    return;
                }
            }
        }
    }
}
