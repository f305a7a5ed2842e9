// Whole-buffer parse across cores with rayon
//
// 1. Single-threaded: split the text into logical records (quote-aware,
//    same reassembly as the reader)
// 2. Parallel: tokenize and materialize each record independently
//
// Records come back in source order. The options' string pool, if any, is
// shared by every worker. Readers themselves stay single-threaded; this is
// the one place the crate fans out.

use crate::core::{FieldSpan, QuoteScan};
use crate::error::Result;
use crate::options::CsvOptions;
use crate::reader::next_logical_span;
use crate::row::{Record, Row};
use crate::source::SliceSource;
use crate::strategy::StrategySet;
use rayon::prelude::*;

/// Records of a parallel parse plus the header, when one was configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRecords {
    pub headers: Option<Record>,
    pub records: Vec<Record>,
}

/// Parse all of `text` into owned records using every available core.
pub fn read_all_parallel(
    text: &str,
    options: &CsvOptions,
    strategies: &StrategySet,
) -> Result<ParsedRecords> {
    let ranges = logical_ranges(text, options)?;

    let mut records: Vec<Record> = ranges
        .par_iter()
        .map_init(
            || Vec::with_capacity(16),
            |spans: &mut Vec<FieldSpan>, &(start, end, number)| {
                let line = &text[start..end];
                spans.clear();
                strategies.tokenize(line, options, spans);
                Row::new(line, spans, options, number).to_record()
            },
        )
        .collect();

    let headers = if options.has_header() && !records.is_empty() {
        Some(records.remove(0))
    } else {
        None
    };
    Ok(ParsedRecords { headers, records })
}

/// `(start, end, line number)` of every logical record.
fn logical_ranges(text: &str, options: &CsvOptions) -> Result<Vec<(usize, usize, u64)>> {
    let mut source = SliceSource::new(text, options);
    let mut scan = QuoteScan::new(options.delimiter(), options.quote(), options.trim_whitespace());
    let mut ranges = Vec::new();
    while let Some(range) = next_logical_span(&mut source, &mut scan)? {
        ranges.push(range);
    }
    Ok(ranges)
}
