// Quote-aware tokenizer: the universal fallback
//
// States per field:
//   FieldStart     -> quote opens a quoted field, anything else is unquoted
//   Unquoted       -> runs to the next delimiter; quotes are plain data
//   Quoted         -> runs to the next quote, delimiters and line breaks are data
//   QuoteInQuoted  -> quote again: escaped quote, back to Quoted
//                     delimiter / end of line: field closed
//                     anything else: malformed, rest of field taken verbatim
//
// The unquoted and quoted runs are memchr searches rather than per-byte
// transitions; the emitted spans are the same.

use super::{LineView, ParsingStrategy};
use crate::core::{skip_whitespace, trim_end, FieldKind, FieldSpan};
use crate::options::CsvOptions;
use memchr::memchr;

/// Full quote/escape state machine. Always available, accepts every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteAware;

impl ParsingStrategy for QuoteAware {
    fn name(&self) -> &'static str {
        "quote-aware"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn can_handle(&self, _line: &LineView<'_>, _options: &CsvOptions) -> bool {
        true
    }

    fn tokenize(&self, line: &str, options: &CsvOptions, out: &mut Vec<FieldSpan>) {
        tokenize_quoted(
            line.as_bytes(),
            options.delimiter(),
            options.quote(),
            options.trim_whitespace(),
            out,
        );
    }
}

/// Split one logical line. Always emits at least one span.
pub fn tokenize_quoted(
    bytes: &[u8],
    delimiter: u8,
    quote: u8,
    trim: bool,
    out: &mut Vec<FieldSpan>,
) {
    let len = bytes.len();
    let mut pos = 0;

    loop {
        let start = if trim {
            skip_whitespace(bytes, pos, len, delimiter, quote)
        } else {
            pos
        };

        let next = if start < len && bytes[start] == quote {
            quoted_field(bytes, start, delimiter, quote, trim, out)
        } else {
            let end = memchr(delimiter, &bytes[start..]).map_or(len, |offset| start + offset);
            let value_end = if trim {
                trim_end(bytes, start, end, delimiter, quote)
            } else {
                end
            };
            out.push(FieldSpan::plain(start, value_end));
            (end < len).then_some(end + 1)
        };

        match next {
            Some(next_start) => pos = next_start,
            None => return,
        }
    }
}

/// Emit the field whose opening quote is at `open`. Returns the start of the
/// next field, or None at end of line.
fn quoted_field(
    bytes: &[u8],
    open: usize,
    delimiter: u8,
    quote: u8,
    trim: bool,
    out: &mut Vec<FieldSpan>,
) -> Option<usize> {
    let len = bytes.len();
    let content = open + 1;
    let mut escaped = false;
    let mut pos = content;

    loop {
        let close = match memchr(quote, &bytes[pos..]) {
            Some(offset) => pos + offset,
            None => {
                // Unterminated: everything to end of line, verbatim
                out.push(FieldSpan::new(content, len, FieldKind::Unterminated));
                return None;
            }
        };

        if close + 1 < len && bytes[close + 1] == quote {
            escaped = true;
            pos = close + 2;
            continue;
        }

        let kind = if escaped {
            FieldKind::Escaped
        } else {
            FieldKind::Quoted
        };
        let after = if trim {
            skip_whitespace(bytes, close + 1, len, delimiter, quote)
        } else {
            close + 1
        };

        if after >= len {
            out.push(FieldSpan::new(content, close, kind));
            return None;
        }
        if bytes[after] == delimiter {
            out.push(FieldSpan::new(content, close, kind));
            return Some(after + 1);
        }

        // Data after the closing quote: the field continues unquoted
        let end = memchr(delimiter, &bytes[after..]).map_or(len, |offset| after + offset);
        let value_end = if trim {
            trim_end(bytes, open, end, delimiter, quote)
        } else {
            end
        };
        out.push(FieldSpan::new(open, value_end, FieldKind::Malformed));
        return (end < len).then_some(end + 1);
    }
}
