// Byte-level helpers and the quote-state scanner used to reassemble
// records whose quoted fields span several physical lines.

use memchr::{memchr, memrchr};

/// Whitespace stripped by `trim_whitespace`. The delimiter and quote never
/// count, so tab-separated input with trimming keeps its empty fields and a
/// tab quote still opens a quoted field.
#[inline]
pub fn is_trim_whitespace(byte: u8, delimiter: u8, quote: u8) -> bool {
    byte != delimiter && byte != quote && matches!(byte, b' ' | b'\t' | 0x0B | 0x0C)
}

#[inline]
pub fn line_has_quote(line: &[u8], quote: u8) -> bool {
    memchr(quote, line).is_some()
}

/// Advance past leading whitespace, returning the first non-whitespace index.
#[inline]
pub fn skip_whitespace(
    bytes: &[u8],
    mut pos: usize,
    end: usize,
    delimiter: u8,
    quote: u8,
) -> usize {
    while pos < end && is_trim_whitespace(bytes[pos], delimiter, quote) {
        pos += 1;
    }
    pos
}

/// Retreat past trailing whitespace, returning the exclusive end.
#[inline]
pub fn trim_end(bytes: &[u8], start: usize, mut end: usize, delimiter: u8, quote: u8) -> usize {
    while end > start && is_trim_whitespace(bytes[end - 1], delimiter, quote) {
        end -= 1;
    }
    end
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Tracks tokenizer quote state across physical lines without producing fields.
///
/// Mirrors the field state machine exactly: a quote only opens a quoted
/// field at field start (after optional whitespace when trimming), and
/// quotes inside unquoted fields are plain data.
#[derive(Debug, Clone, Copy)]
pub struct QuoteScan {
    state: ScanState,
    delimiter: u8,
    quote: u8,
    trim: bool,
}

impl QuoteScan {
    pub fn new(delimiter: u8, quote: u8, trim: bool) -> Self {
        QuoteScan {
            state: ScanState::FieldStart,
            delimiter,
            quote,
            trim,
        }
    }

    /// True when the text fed so far ends inside an open quoted field, i.e.
    /// the physical line break that follows belongs to the field.
    #[inline]
    pub fn in_quotes(&self) -> bool {
        self.state == ScanState::Quoted
    }

    /// Start a new record.
    #[inline]
    pub fn restart(&mut self) {
        self.state = ScanState::FieldStart;
    }

    pub fn feed(&mut self, text: &[u8]) {
        if self.feed_quote_free(text) {
            return;
        }
        let len = text.len();
        let mut i = 0;
        while i < len {
            match self.state {
                ScanState::FieldStart => {
                    let b = text[i];
                    if self.trim && is_trim_whitespace(b, self.delimiter, self.quote) {
                        i += 1;
                    } else if b == self.quote {
                        self.state = ScanState::Quoted;
                        i += 1;
                    } else {
                        self.state = ScanState::Unquoted;
                    }
                }
                ScanState::Unquoted => match memchr(self.delimiter, &text[i..]) {
                    Some(offset) => {
                        i += offset + 1;
                        self.state = ScanState::FieldStart;
                    }
                    None => i = len,
                },
                ScanState::Quoted => match memchr(self.quote, &text[i..]) {
                    Some(offset) => {
                        i += offset + 1;
                        self.state = ScanState::QuoteInQuoted;
                    }
                    None => i = len,
                },
                ScanState::QuoteInQuoted => {
                    let b = text[i];
                    if b == self.quote {
                        self.state = ScanState::Quoted;
                        i += 1;
                    } else if b == self.delimiter {
                        self.state = ScanState::FieldStart;
                        i += 1;
                    } else {
                        // Closing quote followed by data: permissive, rest is unquoted
                        self.state = ScanState::Unquoted;
                    }
                }
            }
        }
    }

    /// Outside quotes, text without a quote byte only moves between
    /// FieldStart and Unquoted; settle that from the last delimiter alone.
    #[inline]
    fn feed_quote_free(&mut self, text: &[u8]) -> bool {
        if matches!(self.state, ScanState::Quoted | ScanState::QuoteInQuoted)
            || memchr(self.quote, text).is_some()
        {
            return false;
        }
        let tail = match memrchr(self.delimiter, text) {
            Some(pos) => {
                self.state = ScanState::FieldStart;
                &text[pos + 1..]
            }
            None => text,
        };
        if self.state == ScanState::FieldStart {
            let blank = if self.trim {
                tail.iter().all(|&b| is_trim_whitespace(b, self.delimiter, self.quote))
            } else {
                tail.is_empty()
            };
            if !blank {
                self.state = ScanState::Unquoted;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ends_in_quotes(text: &[u8]) -> bool {
        let mut scan = QuoteScan::new(b',', b'"', false);
        scan.feed(text);
        scan.in_quotes()
    }

    #[test]
    fn test_open_quote_at_line_end() {
        assert!(ends_in_quotes(b"a,\"line1"));
        assert!(!ends_in_quotes(b"a,\"line1\""));
        assert!(!ends_in_quotes(b"a,b"));
    }

    #[test]
    fn test_doubled_quote_keeps_field_open() {
        assert!(ends_in_quotes(b"\"say \"\""));
        assert!(!ends_in_quotes(b"\"say \"\"hi\"\"\""));
    }

    #[test]
    fn test_quote_inside_unquoted_field_is_data() {
        assert!(!ends_in_quotes(b"ab\"c,d"));
        assert!(ends_in_quotes(b"ab\"c,\"d"));
    }

    #[test]
    fn test_state_carries_across_feeds() {
        let mut scan = QuoteScan::new(b',', b'"', false);
        scan.feed(b"x,\"first");
        assert!(scan.in_quotes());
        scan.feed(b"\n");
        assert!(scan.in_quotes());
        scan.feed(b"second\",y");
        assert!(!scan.in_quotes());
    }

    #[test]
    fn test_trim_allows_whitespace_before_opening_quote() {
        let mut scan = QuoteScan::new(b',', b'"', true);
        scan.feed(b"a,  \"open");
        assert!(scan.in_quotes());

        let mut untrimmed = QuoteScan::new(b',', b'"', false);
        untrimmed.feed(b"a,  \"open");
        assert!(!untrimmed.in_quotes());
    }

    #[test]
    fn test_quote_free_feed_settles_field_state() {
        // Quote-free prefix takes the fast path; the state it leaves must
        // still decide whether the following quote opens a field
        let mut trimmed = QuoteScan::new(b',', b'"', true);
        trimmed.feed(b"a,  ");
        trimmed.feed(b"\"open");
        assert!(trimmed.in_quotes());

        let mut untrimmed = QuoteScan::new(b',', b'"', false);
        untrimmed.feed(b"a,  ");
        untrimmed.feed(b"\"open");
        assert!(!untrimmed.in_quotes());

        let mut ended_on_delimiter = QuoteScan::new(b',', b'"', false);
        ended_on_delimiter.feed(b"a,b,");
        ended_on_delimiter.feed(b"\"open");
        assert!(ended_on_delimiter.in_quotes());
    }

    #[test]
    fn test_trim_helpers_never_strip_delimiter() {
        assert!(is_trim_whitespace(b' ', b',', b'"'));
        assert!(!is_trim_whitespace(b'\t', b'\t', b'"'));
        assert_eq!(skip_whitespace(b"  a", 0, 3, b',', b'"'), 2);
        assert_eq!(trim_end(b"a \t", 0, 3, b',', b'"'), 1);
        assert_eq!(trim_end(b"a\t\t", 0, 3, b'\t', b'"'), 3);
    }

    #[test]
    fn test_trim_helpers_never_strip_quote() {
        assert!(!is_trim_whitespace(b'\t', b',', b'\t'));
        assert_eq!(skip_whitespace(b" \ta", 0, 3, b',', b'\t'), 1);
        assert_eq!(trim_end(b"a\t ", 0, 3, b',', b'\t'), 2);
    }

    #[test]
    fn test_whitespace_quote_opens_field_when_trimming() {
        let mut scan = QuoteScan::new(b',', b'\t', true);
        scan.feed(b" \ta,b");
        assert!(scan.in_quotes());
        scan.feed(b"\t,c");
        assert!(!scan.in_quotes());
    }
}
