// Frame reassembly: arbitrary transport chunks in, complete lines out.
//
// Bytes are buffered rather than decoded per chunk. A `\n` byte never
// appears inside a multi-byte UTF-8 sequence, so splitting on it first and
// decoding whole lines afterwards is safe for chunks that cut a code point.

use tracing::trace;

pub const LINE_TERMINATOR: u8 = b'\n';

/// Carry buffer for one in-flight stream.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    carry: Vec<u8>,
    /// Prefix of `carry` already known to hold no terminator.
    scanned: usize,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return an iterator over the lines it completed.
    ///
    /// The iterator is lazy: lines are cut out of the carry buffer one at a
    /// time, so a consumer that stops early (termination) leaves the rest
    /// buffered and unread.
    pub fn push<'a>(&'a mut self, chunk: &[u8]) -> Lines<'a> {
        self.carry.extend_from_slice(chunk);
        Lines { carry: &mut self.carry, scanned: &mut self.scanned }
    }

    /// Bytes received but not yet resolved into a complete line.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// End of stream. Unterminated content is dropped, never emitted; the
    /// number of discarded bytes is returned for logging.
    pub fn finish(&mut self) -> usize {
        let dropped = self.carry.len();
        if dropped > 0 {
            trace!(dropped, "discarding unterminated trailing frame content");
        }
        self.carry.clear();
        self.scanned = 0;
        dropped
    }
}

/// Lazy sequence of complete lines, see [`FrameReassembler::push`].
pub struct Lines<'a> {
    carry: &'a mut Vec<u8>,
    scanned: &'a mut usize,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let start = *self.scanned;
        let Some(offset) = self.carry[start..].iter().position(|b| *b == LINE_TERMINATOR) else {
            *self.scanned = self.carry.len();
            return None;
        };
        let end = start + offset;
        *self.scanned = 0;
        let mut line: Vec<u8> = self.carry.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(match String::from_utf8(line) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}
