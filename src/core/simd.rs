// Vectorized delimiter splitting for quote-free lines
//
// Every kernel here turns a line into Plain spans by locating each delimiter
// byte. They differ only in how many bytes they compare at once:
//
//   memchr: library-dispatched search, one delimiter at a time
//   SWAR:   8 bytes per u64 word, portable
//   SSE2:   16 bytes per 128-bit compare (x86_64)
//   AVX2:   32 bytes per 256-bit compare (x86_64, runtime detected)
//
// Output must be identical across kernels; the conformance tests hold them
// to that. Bitmask handling follows the structural scanner: compare, take the
// movemask, then walk set bits with trailing_zeros.

use super::field::FieldSpan;
use memchr::memchr_iter;

/// Baseline SIMD chunk size (128-bit).
pub const CHUNK: usize = 16;

/// Wide chunk size for AVX2.
pub const WIDE: usize = 32;

/// SWAR word size.
pub const WORD: usize = 8;

// ---------------------------------------------------------------------------
// Capability detection
// ---------------------------------------------------------------------------

/// Cached SIMD capability level.
/// 0 = unchecked, 1 = scalar only, 2 = SSE2, 3 = AVX2
#[cfg(target_arch = "x86_64")]
static SIMD_LEVEL: std::sync::atomic::AtomicU8 = std::sync::atomic::AtomicU8::new(0);

#[cfg(target_arch = "x86_64")]
#[inline]
fn simd_level() -> u8 {
    use std::sync::atomic::Ordering;
    let level = SIMD_LEVEL.load(Ordering::Relaxed);
    if level != 0 {
        return level;
    }
    let detected = if is_x86_feature_detected!("avx2") {
        3
    } else if is_x86_feature_detected!("sse2") {
        2
    } else {
        1
    };
    SIMD_LEVEL.store(detected, Ordering::Relaxed);
    detected
}

/// True when 256-bit compares are usable on this CPU.
#[inline]
pub fn avx2_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        simd_level() >= 3
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

/// True when 128-bit compares are usable on this CPU.
#[inline]
pub fn sse2_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        simd_level() >= 2
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

// ---------------------------------------------------------------------------
// Scalar / memchr
// ---------------------------------------------------------------------------

/// Split on every delimiter occurrence using memchr.
#[inline]
pub fn split_memchr(line: &[u8], delimiter: u8, out: &mut Vec<FieldSpan>) {
    let mut field_start = 0;
    for pos in memchr_iter(delimiter, line) {
        out.push(FieldSpan::plain(field_start, pos));
        field_start = pos + 1;
    }
    out.push(FieldSpan::plain(field_start, line.len()));
}

#[inline]
fn split_scalar_tail(
    line: &[u8],
    mut pos: usize,
    mut field_start: usize,
    delimiter: u8,
    out: &mut Vec<FieldSpan>,
) {
    while pos < line.len() {
        if line[pos] == delimiter {
            out.push(FieldSpan::plain(field_start, pos));
            field_start = pos + 1;
        }
        pos += 1;
    }
    out.push(FieldSpan::plain(field_start, line.len()));
}

// ---------------------------------------------------------------------------
// SWAR
// ---------------------------------------------------------------------------

const LOW7: u64 = 0x7f7f_7f7f_7f7f_7f7f;
const ONES: u64 = 0x0101_0101_0101_0101;

/// High bit of each byte set iff that byte of `x` is zero. Exact: no
/// false positives, since the per-byte add never carries across bytes.
#[inline]
fn zero_byte_mask(x: u64) -> u64 {
    let t = (x & LOW7).wrapping_add(LOW7);
    !(t | x | LOW7)
}

/// Split on delimiters comparing a u64 word at a time.
pub fn split_swar(line: &[u8], delimiter: u8, out: &mut Vec<FieldSpan>) {
    let splat = ONES.wrapping_mul(delimiter as u64);
    let mut field_start = 0;
    let mut pos = 0;
    let mut word = [0u8; WORD];

    while pos + WORD <= line.len() {
        word.copy_from_slice(&line[pos..pos + WORD]);
        let mut mask = zero_byte_mask(u64::from_le_bytes(word) ^ splat);
        while mask != 0 {
            let hit = pos + (mask.trailing_zeros() / 8) as usize;
            out.push(FieldSpan::plain(field_start, hit));
            field_start = hit + 1;
            mask &= mask - 1; // clear lowest set bit
        }
        pos += WORD;
    }

    split_scalar_tail(line, pos, field_start, delimiter, out);
}

// ---------------------------------------------------------------------------
// SSE2 / AVX2
// ---------------------------------------------------------------------------

/// Split on delimiters with 128-bit compares; scalar if SSE2 is missing.
pub fn split_sse2(line: &[u8], delimiter: u8, out: &mut Vec<FieldSpan>) {
    #[cfg(target_arch = "x86_64")]
    {
        if sse2_available() {
            // SAFETY: SSE2 support was verified at runtime above.
            unsafe { split_sse2_impl(line, delimiter, out) };
            return;
        }
    }
    split_scalar_tail(line, 0, 0, delimiter, out);
}

/// Split on delimiters with 256-bit compares; falls back to SSE2.
pub fn split_avx2(line: &[u8], delimiter: u8, out: &mut Vec<FieldSpan>) {
    #[cfg(target_arch = "x86_64")]
    {
        if avx2_available() {
            // SAFETY: AVX2 support was verified at runtime above.
            unsafe { split_avx2_impl(line, delimiter, out) };
            return;
        }
    }
    split_sse2(line, delimiter, out);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn split_sse2_impl(line: &[u8], delimiter: u8, out: &mut Vec<FieldSpan>) {
    use std::arch::x86_64::*;

    let len = line.len();
    let ptr = line.as_ptr();
    let splat = _mm_set1_epi8(delimiter as i8);
    let mut field_start = 0;
    let mut pos = 0;

    while pos + CHUNK <= len {
        let chunk = _mm_loadu_si128(ptr.add(pos) as *const __m128i);
        let mut mask = _mm_movemask_epi8(_mm_cmpeq_epi8(chunk, splat)) as u32;
        while mask != 0 {
            let hit = pos + mask.trailing_zeros() as usize;
            out.push(FieldSpan::plain(field_start, hit));
            field_start = hit + 1;
            mask &= mask - 1;
        }
        pos += CHUNK;
    }

    split_scalar_tail(line, pos, field_start, delimiter, out);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn split_avx2_impl(line: &[u8], delimiter: u8, out: &mut Vec<FieldSpan>) {
    use std::arch::x86_64::*;

    let len = line.len();
    let ptr = line.as_ptr();
    let wide_splat = _mm256_set1_epi8(delimiter as i8);
    let splat = _mm_set1_epi8(delimiter as i8);
    let mut field_start = 0;
    let mut pos = 0;

    while pos + WIDE <= len {
        let chunk = _mm256_loadu_si256(ptr.add(pos) as *const __m256i);
        let mut mask = _mm256_movemask_epi8(_mm256_cmpeq_epi8(chunk, wide_splat)) as u32;
        while mask != 0 {
            let hit = pos + mask.trailing_zeros() as usize;
            out.push(FieldSpan::plain(field_start, hit));
            field_start = hit + 1;
            mask &= mask - 1;
        }
        pos += WIDE;
    }

    // 16-byte remainder, then scalar tail
    if pos + CHUNK <= len {
        let chunk = _mm_loadu_si128(ptr.add(pos) as *const __m128i);
        let mut mask = _mm_movemask_epi8(_mm_cmpeq_epi8(chunk, splat)) as u32;
        while mask != 0 {
            let hit = pos + mask.trailing_zeros() as usize;
            out.push(FieldSpan::plain(field_start, hit));
            field_start = hit + 1;
            mask &= mask - 1;
        }
        pos += CHUNK;
    }

    split_scalar_tail(line, pos, field_start, delimiter, out);
}
