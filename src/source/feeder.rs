// Push-based line splitting for callers that must never block
//
// Text is fed in whatever chunks the caller's I/O produces; complete lines
// are taken out as they become available. `next_line` returns None while the
// buffered tail is still an incomplete line, so a cooperative pipeline can go
// back to its event loop and feed more later. Cancellation therefore only
// ever happens between lines.
//
// The buffer is compacted at the start of `feed`, never while a line handed
// out by `next_line` could still be borrowed.

use super::SourceLine;
use crate::core::{Scan, Terminators};

#[derive(Debug, Clone)]
pub struct LineFeeder {
    buf: String,
    /// Start of the first line not yet handed out.
    consumed: usize,
    /// Where the terminator search resumes.
    scan_from: usize,
    /// Located but not yet taken: (content start, content end, next start).
    pending: Option<(usize, usize, usize)>,
    terminators: Terminators,
    finished: bool,
    line: u64,
}

impl LineFeeder {
    pub fn new(terminators: Terminators) -> Self {
        LineFeeder {
            buf: String::new(),
            consumed: 0,
            scan_from: 0,
            pending: None,
            terminators,
            finished: false,
            line: 0,
        }
    }

    /// Append decoded text. Ignored after `finish`.
    pub fn feed(&mut self, text: &str) {
        if self.finished {
            return;
        }
        self.compact();
        self.buf.push_str(text);
    }

    /// Mark end of input: the buffered tail becomes the final line.
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes fed but not yet returned as lines.
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.consumed
    }

    /// Lines handed out so far.
    pub fn line_number(&self) -> u64 {
        self.line
    }

    /// True when `next_line` would return a line right now.
    pub fn has_line(&mut self) -> bool {
        if self.pending.is_some() {
            return true;
        }
        let bytes = self.buf.as_bytes();
        let len = bytes.len();
        if self.consumed >= len {
            return false;
        }
        match self.terminators.scan(bytes, self.scan_from, self.finished) {
            Scan::Found(brk) => {
                self.pending = Some((self.consumed, brk.pos, brk.next_start()));
                true
            }
            Scan::NeedMore => {
                // Trailing \r: the next chunk decides whether \n follows
                self.scan_from = len - 1;
                false
            }
            Scan::NotFound if self.finished => {
                self.pending = Some((self.consumed, len, len));
                true
            }
            Scan::NotFound => {
                // A custom pattern may straddle this chunk and the next
                let overlap = self.terminators.max_pattern_len() - 1;
                self.scan_from = len.saturating_sub(overlap).max(self.consumed);
                false
            }
        }
    }

    /// Next complete line, or None if more input is needed (or input is done).
    pub fn next_line(&mut self) -> Option<SourceLine<'_>> {
        if !self.has_line() {
            return None;
        }
        let (start, end, next) = self.pending.take()?;
        self.consumed = next;
        self.scan_from = next;
        self.line += 1;
        Some(SourceLine {
            text: &self.buf[start..end],
            number: self.line,
            terminator: &self.buf[end..next],
        })
    }

    /// Forget all buffered text and start over (used on rewind).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.consumed = 0;
        self.scan_from = 0;
        self.pending = None;
        self.finished = false;
        self.line = 0;
    }

    fn compact(&mut self) {
        if self.consumed == 0 {
            return;
        }
        self.buf.drain(..self.consumed);
        self.scan_from -= self.consumed;
        if let Some((start, end, next)) = self.pending {
            self.pending = Some((start - self.consumed, end - self.consumed, next - self.consumed));
        }
        self.consumed = 0;
    }
}
