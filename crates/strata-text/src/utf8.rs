//! Byte-at-a-time UTF-8 decoding.
//!
//! Text arrives as raw bytes (widget buffers, binding layers), not `&str`, so
//! layout decodes it itself. The decoder follows the lead-byte masks directly:
//!
//! | byte                | meaning                            |
//! |---------------------|------------------------------------|
//! | `0xxxxxxx`          | single byte codepoint              |
//! | `11110xxx`          | lead of 4, seed `(b & 0x07) << 18` |
//! | `1110xxxx`          | lead of 3, seed `(b & 0x0F) << 12` |
//! | `110xxxxx`          | lead of 2, seed `(b & 0x1F) << 6`  |
//! | `10xxxxxx`          | continuation, 6 more bits          |
//!
//! Malformed input never panics: a continuation byte with no open sequence is
//! dropped, a lead byte arriving before a sequence is complete discards the
//! partial codepoint, and a sequence cut off by the end of input is dropped.

/// A fully decoded codepoint and where its bytes live in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedChar {
    /// Byte offset of the first byte of the sequence.
    pub offset: usize,
    /// Number of bytes in the sequence.
    pub len: usize,
    /// Decoded codepoint.
    pub codepoint: u32,
}

impl DecodedChar {
    /// Byte offset just past this codepoint.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Iterator over the codepoints of a byte run.
#[derive(Debug, Clone)]
pub struct Utf8Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Utf8Decoder<'a> {
    /// Decode `bytes` from the start.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Byte position of the next undecoded byte.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for Utf8Decoder<'_> {
    type Item = DecodedChar;

    fn next(&mut self) -> Option<DecodedChar> {
        let mut codepoint = 0u32;
        let mut remaining = 0u32;
        let mut start = None;

        while let Some(&b) = self.bytes.get(self.pos) {
            let offset = self.pos;
            self.pos += 1;

            if b & 0x80 == 0 {
                return Some(DecodedChar {
                    offset,
                    len: 1,
                    codepoint: u32::from(b),
                });
            } else if b & 0xF0 == 0xF0 {
                codepoint = u32::from(b & 0x07) << 18;
                remaining = 3;
                start = Some(offset);
            } else if b & 0xE0 == 0xE0 {
                codepoint = u32::from(b & 0x0F) << 12;
                remaining = 2;
                start = Some(offset);
            } else if b & 0xC0 == 0xC0 {
                codepoint = u32::from(b & 0x1F) << 6;
                remaining = 1;
                start = Some(offset);
            } else {
                // continuation byte
                let Some(lead) = start else { continue };
                codepoint |= u32::from(b & 0x3F) << (6 * (remaining - 1));
                remaining -= 1;

                if remaining == 0 {
                    return Some(DecodedChar {
                        offset: lead,
                        len: self.pos - lead,
                        codepoint,
                    });
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codepoints(bytes: &[u8]) -> Vec<u32> {
        Utf8Decoder::new(bytes).map(|c| c.codepoint).collect()
    }

    #[test]
    fn test_ascii() {
        assert_eq!(codepoints(b"Hi!"), vec![0x48, 0x69, 0x21]);
    }

    #[test]
    fn test_two_byte_sequence() {
        let decoded: Vec<_> = Utf8Decoder::new(&[0xC3, 0xA9]).collect();
        assert_eq!(
            decoded,
            vec![DecodedChar {
                offset: 0,
                len: 2,
                codepoint: 0xE9
            }]
        );
    }

    #[test]
    fn test_matches_std_for_valid_text() {
        let text = "aé€😀z";
        let expected: Vec<u32> = text.chars().map(u32::from).collect();
        assert_eq!(codepoints(text.as_bytes()), expected);

        let offsets: Vec<usize> = Utf8Decoder::new(text.as_bytes()).map(|c| c.offset).collect();
        let std_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        assert_eq!(offsets, std_offsets);
    }

    #[test]
    fn test_stray_continuation_is_dropped() {
        assert_eq!(codepoints(&[0x80, b'a', 0xBF]), vec![u32::from(b'a')]);
    }

    #[test]
    fn test_interrupted_sequence_restarts() {
        // 3-byte lead, one continuation, then a 2-byte sequence for é.
        assert_eq!(codepoints(&[0xE2, 0x82, 0xC3, 0xA9]), vec![0xE9]);
        // ASCII interrupting a sequence is emitted on its own.
        assert_eq!(codepoints(&[0xC3, b'x']), vec![u32::from(b'x')]);
    }

    #[test]
    fn test_truncated_tail_is_dropped() {
        assert_eq!(codepoints(&[b'a', 0xF0, 0x9F]), vec![u32::from(b'a')]);
    }
}
