// Pooling primitives shared across readers and threads

pub mod buffer;
pub mod string;

pub use buffer::{BufferPool, BufferPoolStats, PooledBytes, PooledString};
pub use string::{StringPool, StringPoolStats};
