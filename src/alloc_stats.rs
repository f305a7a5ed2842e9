// Allocation counters for profiling pooled vs. unpooled parsing
//
// With the `memory_tracking` feature the crate installs a global allocator
// that wraps mimalloc (feature `mimalloc`) or the system allocator and keeps
// live/high-water byte counts. Without it every query returns zero.

#[cfg(feature = "memory_tracking")]
mod counting {
    use std::alloc::{GlobalAlloc, Layout};
    use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

    pub static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);
    pub static HIGH_WATER: AtomicUsize = AtomicUsize::new(0);

    #[cfg(feature = "mimalloc")]
    type Inner = mimalloc::MiMalloc;
    #[cfg(feature = "mimalloc")]
    const INNER: Inner = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    type Inner = std::alloc::System;
    #[cfg(not(feature = "mimalloc"))]
    const INNER: Inner = std::alloc::System;

    pub struct CountingAlloc;

    #[inline]
    fn grew(bytes: usize) {
        let live = LIVE_BYTES.fetch_add(bytes, Relaxed) + bytes;
        HIGH_WATER.fetch_max(live, Relaxed);
    }

    #[inline]
    fn shrank(bytes: usize) {
        LIVE_BYTES.fetch_sub(bytes, Relaxed);
    }

    unsafe impl GlobalAlloc for CountingAlloc {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let block = INNER.alloc(layout);
            if !block.is_null() {
                grew(layout.size());
            }
            block
        }

        unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
            let block = INNER.alloc_zeroed(layout);
            if !block.is_null() {
                grew(layout.size());
            }
            block
        }

        unsafe fn dealloc(&self, block: *mut u8, layout: Layout) {
            shrank(layout.size());
            INNER.dealloc(block, layout)
        }

        unsafe fn realloc(&self, block: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
            let moved = INNER.realloc(block, layout, new_size);
            if !moved.is_null() {
                shrank(layout.size());
                grew(new_size);
            }
            moved
        }
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static HEAP: counting::CountingAlloc = counting::CountingAlloc;

// Without tracking, mimalloc is installed directly
#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static HEAP: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// True when the counters below are live.
pub const fn enabled() -> bool {
    cfg!(feature = "memory_tracking")
}

/// Bytes currently allocated on the heap.
pub fn allocated() -> usize {
    #[cfg(feature = "memory_tracking")]
    {
        counting::LIVE_BYTES.load(std::sync::atomic::Ordering::Acquire)
    }
    #[cfg(not(feature = "memory_tracking"))]
    {
        0
    }
}

/// Highest value of `allocated()` since the last `reset_peak`.
pub fn peak() -> usize {
    #[cfg(feature = "memory_tracking")]
    {
        counting::HIGH_WATER.load(std::sync::atomic::Ordering::Acquire)
    }
    #[cfg(not(feature = "memory_tracking"))]
    {
        0
    }
}

/// Restart peak tracking from the current level. Returns `(current, old peak)`.
pub fn reset_peak() -> (usize, usize) {
    #[cfg(feature = "memory_tracking")]
    {
        use std::sync::atomic::Ordering::{AcqRel, Acquire};
        let live = counting::LIVE_BYTES.load(Acquire);
        (live, counting::HIGH_WATER.swap(live, AcqRel))
    }
    #[cfg(not(feature = "memory_tracking"))]
    {
        (0, 0)
    }
}

/// Run `f` and report how far the heap rose above its starting level
/// while it ran. Counts every thread, so parallel parses are included.
pub fn measure<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let (base, _) = reset_peak();
    let value = f();
    (value, peak().saturating_sub(base))
}
