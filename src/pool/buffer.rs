// Scratch buffer reuse
//
// Readers and stream sources rent byte and string scratch space here instead
// of allocating per record. Free lists sit behind parking_lot mutexes; the
// counters are plain atomics so `stats()` never takes a lock.
//
// Rentals either come back explicitly (`return_bytes`/`return_string`) or,
// through the `lease_*` guards, when the guard is dropped.

use log::debug;
use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferPoolStats {
    /// Buffers handed out.
    pub rented: u64,
    /// Buffers handed back.
    pub returned: u64,
    /// Rented but not yet returned.
    pub outstanding: u64,
    /// Buffers currently sitting in the free lists.
    pub retained: usize,
    /// Rentals that needed a fresh allocation.
    pub allocated: u64,
}

/// Thread-safe pool of reusable byte and string buffers.
pub struct BufferPool {
    bytes: Mutex<Vec<Vec<u8>>>,
    strings: Mutex<Vec<String>>,
    max_retained: usize,
    default_capacity: usize,
    rented: AtomicU64,
    returned: AtomicU64,
    allocated: AtomicU64,
}

impl BufferPool {
    pub const DEFAULT_MAX_RETAINED: usize = 64;
    pub const DEFAULT_CAPACITY: usize = 4096;

    pub fn new() -> Self {
        Self::with_limits(Self::DEFAULT_MAX_RETAINED, Self::DEFAULT_CAPACITY)
    }

    /// `max_retained` bounds each free list; `default_capacity` is the
    /// minimum capacity of freshly allocated buffers.
    pub fn with_limits(max_retained: usize, default_capacity: usize) -> Self {
        BufferPool {
            bytes: Mutex::new(Vec::new()),
            strings: Mutex::new(Vec::new()),
            max_retained,
            default_capacity,
            rented: AtomicU64::new(0),
            returned: AtomicU64::new(0),
            allocated: AtomicU64::new(0),
        }
    }

    /// Rent an empty byte buffer with capacity of at least `min_len`.
    ///
    /// The pool only counts the rental; hand it back with `return_bytes` or
    /// it stays outstanding for good. `lease_bytes` returns on drop.
    pub fn rent_bytes(&self, min_len: usize) -> Vec<u8> {
        self.rented.fetch_add(1, Ordering::Relaxed);
        match take_fitting(&self.bytes, |buf| buf.capacity() >= min_len) {
            Some(buf) => buf,
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(min_len.max(self.default_capacity))
            }
        }
    }

    /// Hand a byte buffer back. With `clear` its contents are zeroed first.
    pub fn return_bytes(&self, mut buf: Vec<u8>, clear: bool) {
        self.returned.fetch_add(1, Ordering::Relaxed);
        if clear {
            buf.fill(0);
        }
        buf.clear();
        self.retain(&self.bytes, buf, |b| b.capacity());
    }

    /// Rent an empty string with capacity of at least `min_len` bytes.
    /// Same contract as `rent_bytes`: pair it with `return_string`.
    pub fn rent_string(&self, min_len: usize) -> String {
        self.rented.fetch_add(1, Ordering::Relaxed);
        match take_fitting(&self.strings, |s| s.capacity() >= min_len) {
            Some(s) => s,
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                String::with_capacity(min_len.max(self.default_capacity))
            }
        }
    }

    /// Hand a string back. With `clear` its bytes are zeroed first.
    pub fn return_string(&self, s: String, clear: bool) {
        self.returned.fetch_add(1, Ordering::Relaxed);
        let s = if clear {
            let mut bytes = s.into_bytes();
            bytes.fill(0);
            bytes.clear();
            String::from_utf8(bytes).unwrap_or_default()
        } else {
            let mut s = s;
            s.clear();
            s
        };
        self.retain(&self.strings, s, |s| s.capacity());
    }

    /// Rent a byte buffer that returns itself when dropped.
    pub fn lease_bytes(self: &Arc<Self>, min_len: usize) -> PooledBytes {
        PooledBytes {
            buf: self.rent_bytes(min_len),
            pool: Arc::clone(self),
        }
    }

    /// Rent a string that returns itself when dropped.
    pub fn lease_string(self: &Arc<Self>, min_len: usize) -> PooledString {
        PooledString {
            buf: self.rent_string(min_len),
            pool: Arc::clone(self),
        }
    }

    /// Rentals not yet handed back. A plain rental that was dropped instead
    /// of returned is still counted here; nothing reclaims it.
    pub fn outstanding(&self) -> u64 {
        let rented = self.rented.load(Ordering::Relaxed);
        rented.saturating_sub(self.returned.load(Ordering::Relaxed))
    }

    pub fn stats(&self) -> BufferPoolStats {
        let rented = self.rented.load(Ordering::Relaxed);
        let returned = self.returned.load(Ordering::Relaxed);
        BufferPoolStats {
            rented,
            returned,
            outstanding: rented.saturating_sub(returned),
            retained: self.bytes.lock().len() + self.strings.lock().len(),
            allocated: self.allocated.load(Ordering::Relaxed),
        }
    }

    /// Drop every retained buffer. Outstanding rentals are unaffected.
    pub fn clear(&self) {
        let bytes = std::mem::take(&mut *self.bytes.lock());
        let strings = std::mem::take(&mut *self.strings.lock());
        debug!(
            "buffer pool cleared: {} byte buffers, {} strings released",
            bytes.len(),
            strings.len()
        );
    }

    fn retain<T>(&self, list: &Mutex<Vec<T>>, item: T, capacity: impl Fn(&T) -> usize) {
        if capacity(&item) == 0 {
            return;
        }
        let mut list = list.lock();
        if list.len() < self.max_retained {
            list.push(item);
        } else {
            debug!(
                "buffer pool at retention bound ({}), dropping returned buffer",
                self.max_retained
            );
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("max_retained", &self.max_retained)
            .field("default_capacity", &self.default_capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Most recently returned buffer that is big enough.
fn take_fitting<T>(list: &Mutex<Vec<T>>, fits: impl Fn(&T) -> bool) -> Option<T> {
    let mut list = list.lock();
    let index = list.iter().rposition(fits)?;
    Some(list.swap_remove(index))
}

/// Byte buffer rented from a [`BufferPool`]; returned on drop.
pub struct PooledBytes {
    buf: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBytes {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBytes {
    fn drop(&mut self) {
        self.pool.return_bytes(std::mem::take(&mut self.buf), false);
    }
}

impl fmt::Debug for PooledBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBytes")
            .field("len", &self.buf.len())
            .field("capacity", &self.buf.capacity())
            .finish()
    }
}

/// String rented from a [`BufferPool`]; returned on drop.
pub struct PooledString {
    buf: String,
    pool: Arc<BufferPool>,
}

impl Deref for PooledString {
    type Target = String;

    fn deref(&self) -> &String {
        &self.buf
    }
}

impl DerefMut for PooledString {
    fn deref_mut(&mut self) -> &mut String {
        &mut self.buf
    }
}

impl Drop for PooledString {
    fn drop(&mut self) {
        self.pool.return_string(std::mem::take(&mut self.buf), false);
    }
}

impl fmt::Debug for PooledString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledString")
            .field("len", &self.buf.len())
            .field("capacity", &self.buf.capacity())
            .finish()
    }
}
