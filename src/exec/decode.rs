// src/exec/decode.rs

//! Incremental UTF-8 decoding of pipe reads.

/// Turns raw pipe reads into text without splitting multi-byte characters.
///
/// A read may end in the middle of a UTF-8 sequence; those trailing bytes are
/// held back and prepended to the next read. Genuinely invalid bytes are
/// replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one read. Returns the text that is complete so far.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let keep_from = incomplete_tail_start(&self.pending);
        let tail = self.pending.split_off(keep_from);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = tail;
        text
    }

    /// Flush whatever is held back (at EOF).
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

/// Index where an unfinished UTF-8 sequence starts at the end of `buf`, or
/// `buf.len()` if the buffer ends on a character boundary.
fn incomplete_tail_start(buf: &[u8]) -> usize {
    // A sequence is at most 4 bytes, so only the last 3 can be unfinished.
    let len = buf.len();
    for back in 1..=len.min(3) {
        let idx = len - back;
        let byte = buf[idx];
        if byte & 0b1100_0000 == 0b1000_0000 {
            // continuation byte; keep looking for the lead byte
            continue;
        }
        let needed = match byte {
            b if b & 0b1000_0000 == 0 => 1,
            b if b & 0b1110_0000 == 0b1100_0000 => 2,
            b if b & 0b1111_0000 == 0b1110_0000 => 3,
            b if b & 0b1111_1000 == 0b1111_0000 => 4,
            _ => return len,
        };
        return if back < needed { idx } else { len };
    }
    len
}
