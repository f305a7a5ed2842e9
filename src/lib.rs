// rowscan - low-allocation CSV tokenization
//
// Layers, leaves first:
//   core:       byte scanners, field spans, line terminators, decoding
//   strategy:   interchangeable line tokenizers picked by priority/capability
//   source:     in-memory, borrowed and streaming line sources
//   pool:       buffer rental and string interning, shareable across threads
//   row/reader: zero-copy rows, owned records, orchestration
//
// Strategies (all produce identical fields for a line they accept):
//   quote-aware: full state machine, universal fallback
//   simple:      memchr split of quote-free lines
//   swar/sse2/avx2: wide-compare split of long quote-free lines

pub mod alloc_stats;
pub mod core;
pub mod error;
pub mod options;
pub mod parallel;
pub mod pool;
pub mod reader;
pub mod row;
pub mod source;
pub mod strategy;
pub mod validation;

pub use crate::core::{Encoding, FieldKind, FieldSpan, Terminators};
pub use error::{CsvError, Result, SourceKind};
pub use options::{CsvOptions, CsvOptionsBuilder};
pub use parallel::{read_all_parallel, ParsedRecords};
pub use pool::{BufferPool, BufferPoolStats, StringPool, StringPoolStats};
pub use reader::{CsvReader, RecordIter};
pub use row::{Record, Row};
pub use source::{
    BufferSource, DataSource, LineFeeder, LinePosition, SliceSource, SourceLine, StreamSource,
    TextSource,
};
pub use strategy::{
    LineView, ParsingStrategy, QuoteAware, SimpleDelimiter, StrategySet, VectorTier, Vectorized,
};
pub use validation::{IssueKind, ValidationCollector, ValidationIssue, ValidationSink};
