// Plain delimiter split for lines that cannot contain quoted fields

use super::{LineView, ParsingStrategy};
use crate::core::simd::split_memchr;
use crate::core::FieldSpan;
use crate::options::CsvOptions;

/// memchr split on the delimiter. Accepts a line only when it holds no quote
/// character and trimming is off, where splitting is exactly the state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleDelimiter;

impl ParsingStrategy for SimpleDelimiter {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn priority(&self) -> i32 {
        10
    }

    #[inline]
    fn can_handle(&self, line: &LineView<'_>, options: &CsvOptions) -> bool {
        !options.trim_whitespace() && !line.contains_quote()
    }

    #[inline]
    fn tokenize(&self, line: &str, options: &CsvOptions, out: &mut Vec<FieldSpan>) {
        split_memchr(line.as_bytes(), options.delimiter(), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refuses_quotes_and_trimming() {
        let options = CsvOptions::default();
        assert!(SimpleDelimiter.can_handle(&LineView::new("a,b", b'"'), &options));
        assert!(!SimpleDelimiter.can_handle(&LineView::new("a,\"b\"", b'"'), &options));

        let trimmed = CsvOptions::builder().trim_whitespace(true).build().unwrap();
        assert!(!SimpleDelimiter.can_handle(&LineView::new("a,b", b'"'), &trimmed));
    }

    #[test]
    fn test_split_keeps_empty_fields() {
        let mut spans = Vec::new();
        SimpleDelimiter.tokenize("a,,c,", &CsvOptions::default(), &mut spans);
        let bounds: Vec<_> = spans.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(bounds, vec![(0, 1), (2, 2), (3, 4), (5, 5)]);
    }
}
