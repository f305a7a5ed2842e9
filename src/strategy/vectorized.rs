// Wide-compare delimiter split, tiered by hardware width
//
// Same acceptance rule as the simple strategy plus a minimum line length,
// below which setup cost outweighs the wider compares.

use super::{LineView, ParsingStrategy};
use crate::core::simd::{avx2_available, split_avx2, split_sse2, split_swar, sse2_available};
use crate::core::FieldSpan;
use crate::options::CsvOptions;

/// Hardware width of a vectorized tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorTier {
    /// 8 bytes per u64 word; portable.
    Swar,
    /// 16 bytes per compare.
    Sse2,
    /// 32 bytes per compare.
    Avx2,
}

impl VectorTier {
    /// Shortest line worth vectorizing at this width.
    pub fn min_line_len(self) -> usize {
        match self {
            VectorTier::Swar => 16,
            VectorTier::Sse2 => 32,
            VectorTier::Avx2 => 64,
        }
    }
}

/// Delimiter split using one vector tier.
#[derive(Debug, Clone, Copy)]
pub struct Vectorized {
    tier: VectorTier,
    min_len: usize,
}

impl Vectorized {
    pub fn new(tier: VectorTier) -> Self {
        Vectorized {
            tier,
            min_len: tier.min_line_len(),
        }
    }

    pub fn swar() -> Self {
        Self::new(VectorTier::Swar)
    }

    pub fn sse2() -> Self {
        Self::new(VectorTier::Sse2)
    }

    pub fn avx2() -> Self {
        Self::new(VectorTier::Avx2)
    }

    /// Override the minimum line length (mainly for benchmarking).
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    pub fn tier(&self) -> VectorTier {
        self.tier
    }
}

impl ParsingStrategy for Vectorized {
    fn name(&self) -> &'static str {
        match self.tier {
            VectorTier::Swar => "swar",
            VectorTier::Sse2 => "sse2",
            VectorTier::Avx2 => "avx2",
        }
    }

    fn priority(&self) -> i32 {
        match self.tier {
            VectorTier::Swar => 15,
            VectorTier::Sse2 => 20,
            VectorTier::Avx2 => 30,
        }
    }

    fn is_available(&self) -> bool {
        match self.tier {
            VectorTier::Swar => true,
            VectorTier::Sse2 => sse2_available(),
            VectorTier::Avx2 => avx2_available(),
        }
    }

    #[inline]
    fn can_handle(&self, line: &LineView<'_>, options: &CsvOptions) -> bool {
        line.len() >= self.min_len && !options.trim_whitespace() && !line.contains_quote()
    }

    #[inline]
    fn tokenize(&self, line: &str, options: &CsvOptions, out: &mut Vec<FieldSpan>) {
        let bytes = line.as_bytes();
        let delimiter = options.delimiter();
        match self.tier {
            VectorTier::Swar => split_swar(bytes, delimiter, out),
            VectorTier::Sse2 => split_sse2(bytes, delimiter, out),
            VectorTier::Avx2 => split_avx2(bytes, delimiter, out),
        }
    }
}
