// Buffered, encoding-aware line source over any `io::Read`
//
// Raw chunks are read into a rented byte buffer, decoded into a rented
// string and pushed through a LineFeeder. Streams are not addressable:
// `buffer` and `try_get_line_position` always fail. Rewinding and counting
// need a seekable stream, built with `StreamSource::seekable`.

use super::{DataSource, LineFeeder, SourceLine};
use crate::core::{Decoder, Encoding, Terminators};
use crate::error::{CsvError, Result, SourceKind};
use crate::options::CsvOptions;
use crate::pool::{BufferPool, PooledBytes, PooledString};
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

/// Default raw read size.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

type SeekFn<R> = fn(&mut R, SeekFrom) -> io::Result<u64>;

fn seek_stream<R: Seek>(reader: &mut R, pos: SeekFrom) -> io::Result<u64> {
    reader.seek(pos)
}

pub struct StreamSource<R> {
    reader: R,
    seek: Option<SeekFn<R>>,
    /// Stream offset of the first byte, restored by `reset`.
    origin: u64,
    encoding: Encoding,
    detect_bom: bool,
    decoder: Decoder,
    feeder: LineFeeder,
    terminators: Terminators,
    pool: Arc<BufferPool>,
    chunk_size: usize,
    chunk: PooledBytes,
    decoded: PooledString,
}

impl<R: Read> StreamSource<R> {
    /// Forward-only stream: `reset` and `count_lines` are unsupported.
    pub fn new(reader: R, options: &CsvOptions) -> Self {
        let pool = Arc::new(BufferPool::new());
        let terminators = options.terminators().clone();
        StreamSource {
            reader,
            seek: None,
            origin: 0,
            encoding: Encoding::Utf8,
            detect_bom: true,
            decoder: Decoder::new(Encoding::Utf8, true),
            feeder: LineFeeder::new(terminators.clone()),
            terminators,
            chunk: pool.lease_bytes(DEFAULT_CHUNK_SIZE),
            decoded: pool.lease_string(DEFAULT_CHUNK_SIZE),
            pool,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Source encoding when no BOM says otherwise. Defaults to UTF-8.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self.decoder = Decoder::new(encoding, self.detect_bom);
        self
    }

    /// Let a leading BOM override the configured encoding (on by default).
    pub fn with_bom_detection(mut self, detect: bool) -> Self {
        self.detect_bom = detect;
        self.decoder = Decoder::new(self.encoding, detect);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Rent scratch buffers from a shared pool instead of a private one.
    pub fn with_buffer_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.chunk = pool.lease_bytes(self.chunk_size);
        self.decoded = pool.lease_string(self.chunk_size);
        self.pool = pool;
        self
    }

    /// Encoding in effect (after BOM detection, once the first bytes are read).
    pub fn encoding(&self) -> Encoding {
        self.decoder.encoding()
    }

    pub fn is_seekable(&self) -> bool {
        self.seek.is_some()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read one raw chunk and push its decoded text into the feeder.
    fn fill(&mut self) -> Result<()> {
        if self.chunk.len() != self.chunk_size {
            self.chunk.resize(self.chunk_size, 0);
        }
        let n = read_retrying(&mut self.reader, &mut self.chunk)?;
        self.decoded.clear();
        self.decoder.decode(&self.chunk[..n], &mut self.decoded, n == 0);
        self.feeder.feed(&self.decoded);
        if n == 0 {
            self.feeder.finish();
        }
        Ok(())
    }

    fn seek_fn(&self, operation: &'static str) -> Result<SeekFn<R>> {
        self.seek
            .ok_or_else(|| CsvError::unsupported(operation, SourceKind::Stream))
    }
}

impl<R: Read + Seek> StreamSource<R> {
    /// Rewindable stream. The current position becomes the rewind point.
    pub fn seekable(mut reader: R, options: &CsvOptions) -> Result<Self> {
        let origin = reader.stream_position()?;
        let mut source = StreamSource::new(reader, options);
        source.seek = Some(seek_stream::<R>);
        source.origin = origin;
        Ok(source)
    }
}

impl<R: Read> DataSource for StreamSource<R> {
    fn kind(&self) -> SourceKind {
        SourceKind::Stream
    }

    fn try_read_line(&mut self) -> Result<Option<SourceLine<'_>>> {
        while !self.feeder.has_line() {
            if self.feeder.is_finished() {
                return Ok(None);
            }
            self.fill()?;
        }
        Ok(self.feeder.next_line())
    }

    fn reset(&mut self) -> Result<()> {
        let seek = self.seek_fn("reset")?;
        seek(&mut self.reader, SeekFrom::Start(self.origin))?;
        self.decoder.reset(self.encoding);
        self.feeder.reset();
        Ok(())
    }

    /// Counts from the rewind point with a private decoder and feeder,
    /// then puts the stream back where it was.
    fn count_lines(&mut self) -> Result<u64> {
        let seek = self.seek_fn("count_lines")?;
        let resume_at = seek(&mut self.reader, SeekFrom::Current(0))?;
        seek(&mut self.reader, SeekFrom::Start(self.origin))?;

        let mut decoder = Decoder::new(self.encoding, self.detect_bom);
        let mut feeder = LineFeeder::new(self.terminators.clone());
        let mut raw = self.pool.lease_bytes(self.chunk_size);
        raw.resize(self.chunk_size, 0);
        let mut text = self.pool.lease_string(self.chunk_size);
        let mut lines = 0u64;

        let counted = loop {
            let n = match read_retrying(&mut self.reader, &mut raw) {
                Ok(n) => n,
                Err(err) => break Err(err),
            };
            text.clear();
            decoder.decode(&raw[..n], &mut text, n == 0);
            feeder.feed(&text);
            if n == 0 {
                feeder.finish();
            }
            while feeder.next_line().is_some() {
                lines += 1;
            }
            if n == 0 {
                break Ok(lines);
            }
        };

        seek(&mut self.reader, SeekFrom::Start(resume_at))?;
        counted
    }

    fn has_more_data(&mut self) -> Result<bool> {
        loop {
            if self.feeder.has_line() {
                return Ok(true);
            }
            if self.feeder.is_finished() {
                return Ok(false);
            }
            self.fill()?;
        }
    }

    fn line_number(&self) -> u64 {
        self.feeder.line_number()
    }
}

impl<R> fmt::Debug for StreamSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSource")
            .field("seekable", &self.seek.is_some())
            .field("encoding", &self.encoding)
            .field("chunk_size", &self.chunk_size)
            .field("line", &self.feeder.line_number())
            .finish()
    }
}

fn read_retrying<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all<R: Read>(source: &mut StreamSource<R>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(line) = source.try_read_line().unwrap() {
            out.push(line.text.to_string());
        }
        out
    }

    #[test]
    fn test_small_chunks_reassemble_lines() {
        let options = CsvOptions::default();
        let data = "id,name\r\n1,caf\u{e9}\n2,\u{4e2d}\u{6587}\rlast";
        let mut source = StreamSource::new(data.as_bytes(), &options).with_chunk_size(3);
        assert_eq!(read_all(&mut source), vec!["id,name", "1,caf\u{e9}", "2,\u{4e2d}\u{6587}", "last"]);
        assert!(!source.has_more_data().unwrap());
    }

    #[test]
    fn test_forward_only_stream_rejects_rewind_and_count() {
        let options = CsvOptions::default();
        let mut source = StreamSource::new(&b"a\nb"[..], &options);
        assert!(source.reset().unwrap_err().is_unsupported());
        assert!(source.count_lines().unwrap_err().is_unsupported());
        assert!(source.buffer().unwrap_err().is_unsupported());
        assert!(source.try_get_line_position().unwrap_err().is_unsupported());
        // State is intact after the rejected calls
        assert_eq!(read_all(&mut source), vec!["a", "b"]);
    }

    #[test]
    fn test_seekable_reset_and_count_keep_position() {
        let options = CsvOptions::default();
        let mut source =
            StreamSource::seekable(Cursor::new(b"1\n2\n3\n".to_vec()), &options).unwrap().with_chunk_size(2);
        assert_eq!(source.try_read_line().unwrap().unwrap().text, "1");
        assert_eq!(source.count_lines().unwrap(), 3);
        assert_eq!(read_all(&mut source), vec!["2", "3"]);

        source.reset().unwrap();
        assert_eq!(source.line_number(), 0);
        assert_eq!(read_all(&mut source), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_utf16_with_bom() {
        let options = CsvOptions::default();
        let mut bytes = vec![0xFE, 0xFF];
        for unit in "a,b\nc,d".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let mut source = StreamSource::new(Cursor::new(bytes), &options).with_chunk_size(5);
        assert_eq!(read_all(&mut source), vec!["a,b", "c,d"]);
        assert_eq!(source.encoding(), Encoding::Utf16Be);
    }

    #[test]
    fn test_latin1_without_bom() {
        let options = CsvOptions::default();
        let mut source = StreamSource::new(&b"na\xefve,1"[..], &options).with_encoding(Encoding::Latin1);
        assert_eq!(read_all(&mut source), vec!["na\u{ef}ve,1"]);
    }

    #[test]
    fn test_shared_pool_rentals_returned_on_drop() {
        let options = CsvOptions::default();
        let pool = Arc::new(BufferPool::new());
        {
            let mut source = StreamSource::new(&b"x\ny"[..], &options).with_buffer_pool(Arc::clone(&pool));
            assert_eq!(pool.outstanding(), 2);
            read_all(&mut source);
        }
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_io_error_propagates() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
            }
        }
        let mut source = StreamSource::new(Failing, &CsvOptions::default());
        match source.try_read_line() {
            Err(CsvError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
