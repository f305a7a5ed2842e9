//! Reader behavior across source kinds: headers, rewinding, counting,
//! validation, pooling and the non-blocking line feeder.

use rowscan::{
    BufferPool, CsvError, CsvOptions, CsvReader, DataSource, Encoding, IssueKind, LineFeeder,
    SliceSource, SourceKind, StringPool, StreamSource, Terminators, TextSource,
    ValidationCollector, ValidationIssue,
};
use std::io::{Cursor, Read};
use std::sync::Arc;

const PEOPLE: &str = "name,city\nJohn,\"New York, NY\"\nJane,\"Line\nBreak\"\nBob,Paris\n";

fn with_header() -> CsvOptions {
    CsvOptions::builder().has_header(true).build().unwrap()
}

fn fields<S: DataSource>(reader: &mut CsvReader<S>) -> Vec<Vec<String>> {
    reader
        .read_all_records()
        .unwrap()
        .iter()
        .map(|r| r.to_vec())
        .collect()
}

/// Reader that hands out at most one byte per call.
struct Trickle<'a>(&'a [u8]);

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match (self.0.split_first(), buf.first_mut()) {
            (Some((&b, rest)), Some(slot)) => {
                *slot = b;
                self.0 = rest;
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

#[test]
fn header_available_before_first_record() {
    let mut reader = CsvReader::from_slice(PEOPLE, with_header());
    let headers = reader.headers().unwrap().unwrap().clone();
    assert_eq!(headers, ["name", "city"]);
    assert_eq!(headers.position("city"), Some(1));
    assert_eq!(headers.line_number(), 1);

    let records = reader.read_all_records().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].get(1), Some("New York, NY"));
    assert_eq!(records[1].get(1), Some("Line\nBreak"));
    assert_eq!(records[2].line_number(), 5);
}

#[test]
fn header_without_records() {
    let mut reader = CsvReader::from_reader(Cursor::new("a,b"), with_header());
    assert!(reader.try_read_record().unwrap().is_none());
    assert_eq!(reader.headers().unwrap().unwrap(), &["a", "b"]);
}

#[test]
fn empty_input_with_header_has_no_header() {
    let mut reader = CsvReader::from_text("", with_header());
    assert!(reader.headers().unwrap().is_none());
    assert!(!reader.has_more_data().unwrap());
}

// ---------------------------------------------------------------------------
// Rewinding and counting
// ---------------------------------------------------------------------------

#[test]
fn reset_rereads_header_and_records() {
    let options = with_header();
    let source = StreamSource::seekable(Cursor::new(PEOPLE), &options).unwrap();
    let mut reader = CsvReader::new(source, options);

    let first = fields(&mut reader);
    reader.reset().unwrap();
    assert_eq!(reader.headers().unwrap().unwrap(), &["name", "city"]);
    assert_eq!(fields(&mut reader), first);
}

#[test]
fn seekable_stream_rewinds_to_its_starting_offset() {
    let mut cursor = Cursor::new("skipped\nx,1\ny,2\n");
    cursor.set_position(8);
    let options = CsvOptions::default();
    let mut reader = CsvReader::new(StreamSource::seekable(cursor, &options).unwrap(), options);

    assert_eq!(reader.count_records().unwrap(), 2);
    let first = fields(&mut reader);
    assert_eq!(first[0], vec!["x", "1"]);
    reader.reset().unwrap();
    assert_eq!(fields(&mut reader), first);
}

#[test]
fn counts_agree_across_addressable_sources() {
    let options = Arc::new(with_header());
    let mut text = CsvReader::from_text(PEOPLE, Arc::clone(&options));
    let mut slice = CsvReader::from_slice(PEOPLE, Arc::clone(&options));
    let source = StreamSource::seekable(Cursor::new(PEOPLE.as_bytes()), &options).unwrap();
    let mut stream = CsvReader::new(source, Arc::clone(&options));

    // 5 physical lines, 4 logical records, header excluded from both
    assert_eq!(text.count_records().unwrap(), 4);
    assert_eq!(slice.count_records().unwrap(), 4);
    assert_eq!(stream.count_records().unwrap(), 4);
    assert_eq!(text.count_logical_records().unwrap(), 3);
    assert_eq!(slice.count_logical_records().unwrap(), 3);
    assert_eq!(stream.count_logical_records().unwrap(), 3);
}

#[test]
fn counting_mid_stream_keeps_position() {
    let options = CsvOptions::default();
    let source = StreamSource::seekable(Cursor::new("a\n\"b\nc\"\nd\ne\n"), &options)
        .unwrap()
        .with_chunk_size(2);
    let mut reader = CsvReader::new(source, options);

    let first = reader.try_read_record().unwrap().unwrap().get(0).unwrap().into_owned();
    let second = reader.try_read_record().unwrap().unwrap().get(0).unwrap().into_owned();
    assert_eq!((first.as_str(), second.as_str()), ("a", "b\nc"));

    assert_eq!(reader.count_logical_records().unwrap(), 4);
    assert_eq!(reader.count_records().unwrap(), 5);
    assert_eq!(fields(&mut reader), vec![vec!["d"], vec!["e"]]);
}

#[test]
fn slice_count_ignores_read_position() {
    let mut reader = CsvReader::from_slice("1\n2\n3", CsvOptions::default());
    reader.try_read_record().unwrap();
    assert_eq!(reader.count_records().unwrap(), 3);
    assert_eq!(reader.records().count(), 2);
}

// ---------------------------------------------------------------------------
// Unsupported operations
// ---------------------------------------------------------------------------

#[test]
fn forward_only_stream_rejects_rewinding_operations() {
    let options = CsvOptions::default();
    let mut source = StreamSource::new(Cursor::new("a\nb"), &options);
    for err in [
        source.reset().unwrap_err(),
        source.count_lines().unwrap_err(),
        source.try_get_line_position().unwrap_err(),
    ] {
        assert!(matches!(
            err,
            CsvError::UnsupportedOperation {
                kind: SourceKind::Stream,
                ..
            }
        ));
    }
    assert!(source.buffer().unwrap_err().is_unsupported());
    assert!(!source.is_addressable());

    // Nothing above consumed input
    assert_eq!(source.try_read_line().unwrap().unwrap().text, "a");
    assert_eq!(source.try_read_line().unwrap().unwrap().text, "b");
    assert!(source.try_read_line().unwrap().is_none());
}

#[test]
fn unsupported_error_message_names_operation_and_source() {
    let options = CsvOptions::default();
    let mut source = StreamSource::new(Cursor::new(""), &options);
    let message = source.reset().unwrap_err().to_string();
    assert_eq!(message, "unsupported operation `reset` on stream source");
}

#[test]
fn io_errors_surface_as_io_variant() {
    struct Broken;
    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
        }
    }
    let mut reader = CsvReader::from_reader(Broken, CsvOptions::default());
    let err = reader.read_all_records().unwrap_err();
    assert!(matches!(err, CsvError::Io(_)));
    assert!(!err.is_unsupported());
}

#[test]
fn invalid_options_rejected_at_build() {
    let same = CsvOptions::builder().delimiter('"').build().unwrap_err();
    assert!(matches!(same, CsvError::InvalidOptions(_)));
    assert!(CsvOptions::builder().delimiter('\n').build().is_err());
    assert!(CsvOptions::builder().quote('é').build().is_err());
    assert!(CsvOptions::builder().line_terminator("").build().is_err());
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[test]
fn buffer_sources_report_their_kind_and_positions() {
    let options = CsvOptions::default();
    let mut text = TextSource::new("ab\r\ncd", &options);
    let mut slice = SliceSource::new("ab\r\ncd", &options);
    assert_eq!(text.kind(), SourceKind::Text);
    assert_eq!(slice.kind(), SourceKind::Slice);

    let first = slice.try_get_line_position().unwrap().unwrap();
    assert_eq!((first.start, first.len, first.number), (0, 2, 1));
    let second = slice.try_get_line_position().unwrap().unwrap();
    assert_eq!((second.start, second.end()), (4, 6));
    assert!(!slice.has_more_data().unwrap());

    let line = text.try_read_line().unwrap().unwrap();
    assert_eq!((line.text, line.terminator), ("ab", "\r\n"));
    assert_eq!(text.line_number(), 1);
}

#[test]
fn boxed_sources_are_interchangeable() {
    let options = CsvOptions::default();
    let sources: Vec<Box<dyn DataSource>> = vec![
        Box::new(TextSource::new("x,y\n", &options)),
        Box::new(StreamSource::new(Cursor::new(b"x,y\n".to_vec()), &options)),
    ];
    for source in sources {
        let kind = source.kind();
        let mut reader = CsvReader::new(source, options.clone());
        assert_eq!(fields(&mut reader), vec![vec!["x", "y"]], "{kind}");
    }
}

#[test]
fn stream_decodes_latin1_and_utf16() {
    let options = CsvOptions::default();

    let latin1 = StreamSource::new(Cursor::new(vec![b'c', b'a', b'f', 0xE9, b',', b'1']), &options)
        .with_encoding(Encoding::Latin1);
    let mut reader = CsvReader::new(latin1, options.clone());
    assert_eq!(fields(&mut reader), vec![vec!["café", "1"]]);

    let mut utf16 = vec![0xFF, 0xFE];
    for unit in "ä,b\nc,d".encode_utf16() {
        utf16.extend_from_slice(&unit.to_le_bytes());
    }
    let source = StreamSource::new(Cursor::new(utf16), &options).with_chunk_size(3);
    let mut reader = CsvReader::new(source, options);
    assert_eq!(fields(&mut reader), vec![vec!["ä", "b"], vec!["c", "d"]]);
}

#[test]
fn one_byte_reads_split_every_sequence() {
    let data = "\u{feff}\"α\r\nβ\",γ\r\nδ,ε";
    let source = StreamSource::new(Trickle(data.as_bytes()), &CsvOptions::default());
    let mut reader = CsvReader::new(source, CsvOptions::default());
    assert_eq!(
        fields(&mut reader),
        vec![vec!["α\r\nβ", "γ"], vec!["δ", "ε"]]
    );
}

// ---------------------------------------------------------------------------
// Line feeder
// ---------------------------------------------------------------------------

#[test]
fn feeder_yields_lines_only_when_complete() {
    let mut feeder = LineFeeder::new(Terminators::Standard);
    feeder.feed("first,1\nsec");
    assert!(feeder.has_line());
    assert_eq!(feeder.next_line().unwrap().text, "first,1");
    assert!(!feeder.has_line());
    assert!(feeder.next_line().is_none());

    feeder.feed("ond,2\r");
    // A trailing \r could still become \r\n
    assert!(!feeder.has_line());
    feeder.feed("\nthird");
    let line = feeder.next_line().unwrap();
    assert_eq!((line.text, line.terminator, line.number), ("second,2", "\r\n", 2));

    feeder.finish();
    assert_eq!(feeder.next_line().unwrap().text, "third");
    assert!(feeder.next_line().is_none());
    assert_eq!(feeder.buffered(), 0);
}

#[test]
fn feeder_custom_pattern_split_across_feeds() {
    let mut feeder = LineFeeder::new(Terminators::custom(b"||"));
    feeder.feed("a|");
    assert!(!feeder.has_line());
    feeder.feed("|b");
    assert_eq!(feeder.next_line().unwrap().text, "a");
    feeder.finish();
    assert_eq!(feeder.next_line().unwrap().text, "b");
}

#[test]
fn feeder_reset_starts_over() {
    let mut feeder = LineFeeder::new(Terminators::Standard);
    feeder.feed("x\ny");
    feeder.finish();
    assert!(feeder.next_line().is_some());
    feeder.reset();
    assert!(!feeder.is_finished());
    assert_eq!(feeder.line_number(), 0);
    feeder.feed("z\n");
    assert_eq!(feeder.next_line().unwrap().text, "z");
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn validation_collects_every_anomaly_kind() {
    let collector = ValidationCollector::new();
    let input = "a,b\n1,2,3\n\"x\"y,z\nok,\"never closed\n";
    let mut reader = CsvReader::from_slice(input, CsvOptions::default())
        .with_validation(collector.clone());
    let records = reader.read_all_records().unwrap();
    assert_eq!(records.len(), 4);

    let issues = collector.take();
    let kinds: Vec<IssueKind> = issues.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            IssueKind::FieldCountMismatch,
            IssueKind::MalformedQuote,
            IssueKind::UnterminatedQuote
        ]
    );
    assert_eq!(issues[1].field_index, Some(0));
    assert_eq!(issues[2].line_number, 4);
    assert_eq!(issues[2].to_string(), "line 4: quoted field is never closed (field 1)");
    assert!(collector.is_empty());
}

#[test]
fn validation_closure_sink() {
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        move |issue: ValidationIssue| seen.lock().push(issue.line_number)
    };
    let mut reader = CsvReader::from_text("a\nb,c\nd\n", CsvOptions::default()).with_validation(sink);
    reader.read_all_records().unwrap();
    assert_eq!(*seen.lock(), vec![2]);
}

#[test]
fn validation_restarts_after_reset() {
    let collector = ValidationCollector::new();
    let mut reader = CsvReader::from_text("a,b\nc\n", CsvOptions::default())
        .with_validation(collector.clone());
    reader.read_all_records().unwrap();
    reader.reset().unwrap();
    reader.read_all_records().unwrap();
    assert_eq!(collector.count(IssueKind::FieldCountMismatch), 2);
}

#[test]
fn no_validation_means_no_issues_even_when_malformed() {
    let collector = ValidationCollector::new();
    let mut reader = CsvReader::from_slice("\"x\"y", CsvOptions::default());
    assert_eq!(fields(&mut reader), vec![vec!["xy"]]);
    assert!(collector.is_empty());
}

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

#[test]
fn string_pool_shares_repeated_values() {
    let pool = Arc::new(StringPool::new());
    let options = CsvOptions::builder()
        .has_header(true)
        .string_pool(Arc::clone(&pool))
        .build()
        .unwrap();
    let input = "status,code\nactive,1\nactive,2\nactive,1\n";
    let records = CsvReader::from_slice(input, options).read_all_records().unwrap();

    let first = records[0].get_shared(0).unwrap();
    assert!(Arc::ptr_eq(first, records[1].get_shared(0).unwrap()));
    assert!(Arc::ptr_eq(
        records[0].get_shared(1).unwrap(),
        records[2].get_shared(1).unwrap()
    ));
    assert!(pool.contains("active"));
    assert!(pool.stats().hits >= 2);
}

#[test]
fn string_pool_skips_long_values() {
    let pool = Arc::new(StringPool::with_limits(4, 1024));
    let options = CsvOptions::builder().string_pool(Arc::clone(&pool)).build().unwrap();
    let records = CsvReader::from_slice("abcdefgh\nabcdefgh\n", options)
        .read_all_records()
        .unwrap();
    assert!(!Arc::ptr_eq(
        records[0].get_shared(0).unwrap(),
        records[1].get_shared(0).unwrap()
    ));
    assert!(!pool.contains("abcdefgh"));
    assert_eq!(pool.stats().bypassed, 2);
}

#[test]
fn shared_buffer_pool_gets_rentals_back() {
    let pool = Arc::new(BufferPool::new());
    let options = CsvOptions::default();
    {
        let source = StreamSource::new(Cursor::new("a,\"b\nc\"\n"), &options)
            .with_buffer_pool(Arc::clone(&pool));
        let mut reader = CsvReader::new(source, options.clone()).with_buffer_pool(Arc::clone(&pool));
        assert_eq!(fields(&mut reader), vec![vec!["a", "b\nc"]]);
        assert!(pool.outstanding() >= 3);
    }
    assert_eq!(pool.outstanding(), 0);
    let stats = pool.stats();
    assert_eq!(stats.rented, stats.returned);
    assert!(stats.retained > 0);

    pool.clear();
    assert_eq!(pool.stats().retained, 0);
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[test]
fn row_values_borrow_unless_unescaping() {
    let mut reader = CsvReader::from_slice("plain,\"quoted\",\"esc\"\"aped\"", CsvOptions::default());
    let row = reader.try_read_record().unwrap().unwrap();
    assert!(!row.needs_copy(0));
    assert!(!row.needs_copy(1));
    assert!(row.needs_copy(2));
    assert_eq!(row.raw(2), Some("esc\"\"aped"));
    assert_eq!(row.get(2).as_deref(), Some("esc\"aped"));
    assert!(row.get(3).is_none());
}

#[test]
fn snapshot_into_reuses_strings() {
    let mut reader = CsvReader::from_slice("a,b,c\nd,e", CsvOptions::default());
    let mut scratch = Vec::new();
    reader.try_read_record().unwrap().unwrap().snapshot_into(&mut scratch);
    assert_eq!(scratch, ["a", "b", "c"]);
    reader.try_read_record().unwrap().unwrap().snapshot_into(&mut scratch);
    assert_eq!(scratch, ["d", "e"]);
}

#[test]
fn skip_empty_fields_affects_mapping_only() {
    let options = CsvOptions::builder().skip_empty_fields(true).build().unwrap();
    let mut reader = CsvReader::from_slice("a,,c", options);
    let row = reader.try_read_record().unwrap().unwrap();
    assert_eq!(row.len(), 3);
    let mapped: Vec<(usize, String)> = row
        .mapped_fields()
        .map(|(i, v)| (i, v.into_owned()))
        .collect();
    assert_eq!(mapped, vec![(0, "a".to_string()), (2, "c".to_string())]);
}
