//! Line terminator recognition.
//!
//! `Terminators::Standard` recognizes `\n`, `\r\n` and bare `\r` (memchr2
//! fast path). `Terminators::Custom` recognizes exactly one configured
//! pattern such as `"|"` or `"<br>"`, via a memmem finder.
use memchr::memmem;
use memchr::{memchr2, memchr2_iter};

#[derive(Debug, Clone)]
pub enum Terminators {
    Standard,
    Custom(CustomTerminator),
}

#[derive(Debug, Clone)]
pub struct CustomTerminator {
    pattern: Vec<u8>,
    finder: memmem::Finder<'static>,
}

impl CustomTerminator {
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }
}

/// A located terminator: content ends at `pos`, next line starts at `pos + len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBreak {
    pub pos: usize,
    pub len: usize,
}

impl LineBreak {
    #[inline]
    pub fn next_start(&self) -> usize {
        self.pos + self.len
    }
}

/// Outcome of searching for a terminator in a buffer that may still grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    Found(LineBreak),
    /// A `\r` sits at the very end; the next byte decides between `\r` and `\r\n`.
    NeedMore,
    NotFound,
}

impl Terminators {
    /// Map a configured terminator string onto a recognizer. The three
    /// standard conventions all select `Standard`.
    pub fn from_configured(terminator: &str) -> Self {
        match terminator {
            "\n" | "\r\n" | "\r" => Terminators::Standard,
            custom => Terminators::custom(custom.as_bytes()),
        }
    }

    pub fn custom(pattern: &[u8]) -> Self {
        let pattern = pattern.to_vec();
        let finder = memmem::Finder::new(&pattern).into_owned();
        Terminators::Custom(CustomTerminator { pattern, finder })
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, Terminators::Standard)
    }

    /// Maximum pattern length (used for chunk-boundary safety in streaming).
    pub fn max_pattern_len(&self) -> usize {
        match self {
            Terminators::Standard => 2,
            Terminators::Custom(c) => c.pattern.len().max(1),
        }
    }

    /// Find the first terminator at or after `from`, treating `input` as complete.
    #[inline]
    pub fn find(&self, input: &[u8], from: usize) -> Option<LineBreak> {
        match self.scan(input, from, true) {
            Scan::Found(b) => Some(b),
            _ => None,
        }
    }

    /// Find the first terminator at or after `from`. With `complete == false`
    /// a trailing `\r` reports `NeedMore` instead of a one-byte break.
    #[inline]
    pub fn scan(&self, input: &[u8], from: usize, complete: bool) -> Scan {
        if from >= input.len() {
            return Scan::NotFound;
        }
        match self {
            Terminators::Standard => match memchr2(b'\n', b'\r', &input[from..]) {
                Some(offset) => {
                    let pos = from + offset;
                    if input[pos] == b'\n' {
                        Scan::Found(LineBreak { pos, len: 1 })
                    } else if pos + 1 < input.len() {
                        let len = if input[pos + 1] == b'\n' { 2 } else { 1 };
                        Scan::Found(LineBreak { pos, len })
                    } else if complete {
                        Scan::Found(LineBreak { pos, len: 1 })
                    } else {
                        Scan::NeedMore
                    }
                }
                None => Scan::NotFound,
            },
            Terminators::Custom(c) => match c.finder.find(&input[from..]) {
                Some(offset) => Scan::Found(LineBreak {
                    pos: from + offset,
                    len: c.pattern.len(),
                }),
                None => Scan::NotFound,
            },
        }
    }

    /// Number of physical lines in `input`: one per terminator, plus one for
    /// trailing content without a terminator. Empty input has zero lines.
    pub fn count_lines(&self, input: &[u8]) -> u64 {
        if input.is_empty() {
            return 0;
        }
        let mut lines = 0u64;
        let mut last_end = 0usize;
        match self {
            Terminators::Standard => {
                let mut skip_lf_at = usize::MAX;
                for pos in memchr2_iter(b'\n', b'\r', input) {
                    if pos == skip_lf_at {
                        continue;
                    }
                    if input[pos] == b'\r' && pos + 1 < input.len() && input[pos + 1] == b'\n' {
                        skip_lf_at = pos + 1;
                        last_end = pos + 2;
                    } else {
                        last_end = pos + 1;
                    }
                    lines += 1;
                }
            }
            Terminators::Custom(c) => {
                for pos in c.finder.find_iter(input) {
                    lines += 1;
                    last_end = pos + c.pattern.len();
                }
            }
        }
        if last_end < input.len() {
            lines += 1;
        }
        lines
    }
}

impl Default for Terminators {
    fn default() -> Self {
        Terminators::Standard
    }
}
