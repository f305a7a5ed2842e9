// Source encoding → UTF-8 text, incrementally
//
// Pure-Rust decoders for the encodings a CSV stream is commonly stored in.
// Bytes arrive in arbitrary chunks, so every decoder carries an incomplete
// trailing sequence (split UTF-8 code point, odd UTF-16 byte, dangling high
// surrogate) over to the next call. Invalid input decodes to U+FFFD.

/// Encoding of a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
    Utf16Le,
    Utf16Be,
}

impl Encoding {
    /// Recognize a byte order mark. Returns the encoding and BOM length.
    pub fn from_bom(prefix: &[u8]) -> Option<(Encoding, usize)> {
        if prefix.starts_with(&[0xEF, 0xBB, 0xBF]) {
            Some((Encoding::Utf8, 3))
        } else if prefix.starts_with(&[0xFF, 0xFE]) {
            Some((Encoding::Utf16Le, 2))
        } else if prefix.starts_with(&[0xFE, 0xFF]) {
            Some((Encoding::Utf16Be, 2))
        } else {
            None
        }
    }
}

/// Incremental decoder appending UTF-8 text to a caller-owned String.
#[derive(Debug, Clone)]
pub struct Decoder {
    encoding: Encoding,
    detect_bom: bool,
    bom_checked: bool,
    /// Undecoded bytes carried from the previous chunk.
    carry: Vec<u8>,
}

impl Decoder {
    pub fn new(encoding: Encoding, detect_bom: bool) -> Self {
        Decoder {
            encoding,
            detect_bom,
            bom_checked: false,
            carry: Vec::with_capacity(8),
        }
    }

    /// Effective encoding (after BOM detection, if any happened).
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Forget carried bytes and re-arm BOM detection (used on rewind).
    pub fn reset(&mut self, encoding: Encoding) {
        self.encoding = encoding;
        self.bom_checked = false;
        self.carry.clear();
    }

    /// Decode `input` and append to `out`. With `last == true` any carried
    /// incomplete sequence is flushed as U+FFFD.
    pub fn decode(&mut self, input: &[u8], out: &mut String, last: bool) {
        self.carry.extend_from_slice(input);

        if !self.bom_checked {
            // Wait until three bytes are in hand, unless the stream ends first
            if self.carry.len() < 3 && !last {
                return;
            }
            self.bom_checked = true;
            let mut skip = 0;
            if let Some((encoding, len)) = Encoding::from_bom(&self.carry) {
                if self.detect_bom {
                    self.encoding = encoding;
                    skip = len;
                } else if encoding == self.encoding {
                    skip = len;
                }
            }
            self.carry.drain(..skip);
        }

        let consumed = match self.encoding {
            Encoding::Utf8 => decode_utf8(&self.carry, out, last),
            Encoding::Latin1 => {
                out.extend(self.carry.iter().map(|&b| b as char));
                self.carry.len()
            }
            Encoding::Utf16Le => decode_utf16(&self.carry, out, last, false),
            Encoding::Utf16Be => decode_utf16(&self.carry, out, last, true),
        };
        self.carry.drain(..consumed);
    }
}

/// Returns the number of bytes consumed; the rest is an incomplete tail.
fn decode_utf8(input: &[u8], out: &mut String, last: bool) -> usize {
    let mut pos = 0;
    loop {
        match std::str::from_utf8(&input[pos..]) {
            Ok(text) => {
                out.push_str(text);
                return input.len();
            }
            Err(err) => {
                let valid = pos + err.valid_up_to();
                if let Ok(text) = std::str::from_utf8(&input[pos..valid]) {
                    out.push_str(text);
                }
                match err.error_len() {
                    Some(bad) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pos = valid + bad;
                    }
                    None if last => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        return input.len();
                    }
                    None => return valid,
                }
            }
        }
    }
}

fn decode_utf16(input: &[u8], out: &mut String, last: bool, big_endian: bool) -> usize {
    let mut units_end = input.len() - input.len() % 2;
    let unit_at = |i: usize| {
        let pair = [input[i], input[i + 1]];
        if big_endian {
            u16::from_be_bytes(pair)
        } else {
            u16::from_le_bytes(pair)
        }
    };

    // Keep a dangling high surrogate for the next chunk
    if !last && units_end >= 2 {
        let tail = unit_at(units_end - 2);
        if (0xD800..=0xDBFF).contains(&tail) {
            units_end -= 2;
        }
    }

    let units = (0..units_end).step_by(2).map(unit_at);
    out.extend(char::decode_utf16(units).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)));

    if last {
        if units_end < input.len() {
            out.push(char::REPLACEMENT_CHARACTER);
        }
        input.len()
    } else {
        units_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_chunks(encoding: Encoding, chunks: &[&[u8]]) -> String {
        let mut decoder = Decoder::new(encoding, true);
        let mut out = String::new();
        for chunk in chunks {
            decoder.decode(chunk, &mut out, false);
        }
        decoder.decode(&[], &mut out, true);
        out
    }

    #[test]
    fn test_utf8_split_code_point() {
        let bytes = "a\u{e9}b".as_bytes(); // é is two bytes
        assert_eq!(decode_chunks(Encoding::Utf8, &[&bytes[..2], &bytes[2..]]), "a\u{e9}b");
    }

    #[test]
    fn test_utf8_invalid_byte_replaced() {
        assert_eq!(decode_chunks(Encoding::Utf8, &[b"ab\xffcd"]), "ab\u{fffd}cd");
        // Truncated sequence at end of stream
        assert_eq!(decode_chunks(Encoding::Utf8, &[b"ab\xc3"]), "ab\u{fffd}");
    }

    #[test]
    fn test_bom_detection_switches_encoding() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "a,b\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_chunks(Encoding::Utf8, &[&bytes]), "a,b\n");

        let utf8_bom = b"\xEF\xBB\xBFx,y";
        assert_eq!(decode_chunks(Encoding::Utf8, &[utf8_bom]), "x,y");
    }

    #[test]
    fn test_bom_split_across_chunks() {
        assert_eq!(decode_chunks(Encoding::Utf8, &[b"\xEF", b"\xBB", b"\xBFok"]), "ok");
    }

    #[test]
    fn test_short_input_without_bom() {
        assert_eq!(decode_chunks(Encoding::Utf8, &[b"a"]), "a");
        assert_eq!(decode_chunks(Encoding::Utf8, &[]), "");
    }

    #[test]
    fn test_utf16_be_surrogate_pair_split() {
        let mut bytes = Vec::new();
        for unit in "x\u{1F600}y".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let mut decoder = Decoder::new(Encoding::Utf16Be, false);
        let mut out = String::new();
        // Split between the two surrogates, then mid-unit
        decoder.decode(&bytes[..4], &mut out, false);
        decoder.decode(&bytes[4..7], &mut out, false);
        decoder.decode(&bytes[7..], &mut out, true);
        assert_eq!(out, "x\u{1F600}y");
    }

    #[test]
    fn test_latin1_maps_bytes_to_code_points() {
        assert_eq!(decode_chunks(Encoding::Latin1, &[b"caf\xe9"]), "caf\u{e9}");
    }
}
