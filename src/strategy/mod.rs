// Line tokenization strategies
//
// Every strategy turns one logical line into field spans. They differ only in
// which lines they accept and how fast they split them; for any line two
// strategies both accept, the spans must be identical.
//
//   quote-aware: full state machine, accepts everything (fallback)
//   simple:      memchr split, quote-free lines without trimming
//   vectorized:  SWAR / SSE2 / AVX2 split, same restrictions plus a minimum length

pub mod quoted;
pub mod simple;
pub mod vectorized;

pub use quoted::QuoteAware;
pub use simple::SimpleDelimiter;
pub use vectorized::{VectorTier, Vectorized};

use crate::core::{line_has_quote, FieldSpan};
use crate::options::CsvOptions;
use log::debug;
use std::cell::Cell;
use std::cmp::Reverse;
use std::fmt;

/// A line as presented to `can_handle`, with lazily computed shape facts.
pub struct LineView<'a> {
    text: &'a str,
    quote: u8,
    has_quote: Cell<Option<bool>>,
}

impl<'a> LineView<'a> {
    pub fn new(text: &'a str, quote: u8) -> Self {
        LineView {
            text,
            quote,
            has_quote: Cell::new(None),
        }
    }

    #[inline]
    pub fn text(&self) -> &'a str {
        self.text
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Scanned once, then cached for the remaining candidates.
    #[inline]
    pub fn contains_quote(&self) -> bool {
        match self.has_quote.get() {
            Some(known) => known,
            None => {
                let found = line_has_quote(self.text.as_bytes(), self.quote);
                self.has_quote.set(Some(found));
                found
            }
        }
    }
}

/// An interchangeable line-to-fields tokenizer.
pub trait ParsingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Higher wins.
    fn priority(&self) -> i32;

    /// Hardware/runtime availability. Checked once when registered.
    fn is_available(&self) -> bool {
        true
    }

    fn can_handle(&self, line: &LineView<'_>, options: &CsvOptions) -> bool;

    /// Append the spans of `line` to `out`.
    fn tokenize(&self, line: &str, options: &CsvOptions, out: &mut Vec<FieldSpan>);
}

/// Priority-ordered registry with a quote-aware fallback that never refuses.
pub struct StrategySet {
    strategies: Vec<Box<dyn ParsingStrategy>>,
    fallback: QuoteAware,
}

impl StrategySet {
    /// Only the fallback.
    pub fn new() -> Self {
        StrategySet {
            strategies: Vec::new(),
            fallback: QuoteAware,
        }
    }

    /// Register a strategy. Unavailable strategies are skipped; among equal
    /// priorities the earlier registration stays first.
    pub fn register<P: ParsingStrategy + 'static>(&mut self, strategy: P) -> &mut Self {
        if !strategy.is_available() {
            debug!("strategy `{}` unavailable on this CPU, skipped", strategy.name());
            return self;
        }
        self.strategies.push(Box::new(strategy));
        self.strategies.sort_by_key(|s| Reverse(s.priority()));
        self
    }

    pub fn with<P: ParsingStrategy + 'static>(mut self, strategy: P) -> Self {
        self.register(strategy);
        self
    }

    /// Highest-priority registered strategy accepting `line`, else the fallback.
    #[inline]
    pub fn select(&self, line: &LineView<'_>, options: &CsvOptions) -> &dyn ParsingStrategy {
        for strategy in &self.strategies {
            if strategy.can_handle(line, options) {
                return strategy.as_ref();
            }
        }
        &self.fallback
    }

    /// Select and tokenize in one step. Returns the name of the strategy used.
    pub fn tokenize(&self, line: &str, options: &CsvOptions, out: &mut Vec<FieldSpan>) -> &'static str {
        let view = LineView::new(line, options.quote());
        let strategy = self.select(&view, options);
        strategy.tokenize(line, options, out);
        strategy.name()
    }

    /// Registered strategy names in selection order, fallback last.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(self.fallback.name()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategySet {
    /// Every built-in strategy this CPU supports.
    fn default() -> Self {
        let set = StrategySet::new()
            .with(Vectorized::avx2())
            .with(Vectorized::sse2())
            .with(Vectorized::swar())
            .with(SimpleDelimiter);
        debug!("strategy set built: {:?}", set.names());
        set
    }
}

impl fmt::Debug for StrategySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategySet")
            .field("strategies", &self.names())
            .finish()
    }
}
