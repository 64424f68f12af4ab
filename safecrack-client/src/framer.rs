//! Line framing for NDJSON bodies that arrive in arbitrary chunks.
//!
//! Chunks are buffered as raw bytes and split on `\n` before decoding. A
//! `\n` byte never occurs inside a multi-byte UTF-8 sequence, so a code point
//! split across two chunks is reassembled before it is decoded:
//!
//! ```text
//! chunk 1: {"type":"progr          -> no line, tail = {"type":"progr
//! chunk 2: ess",...}\n{"typ        -> line {"type":"progress",...}, tail = {"typ
//! finish                           -> line {"typ
//! ```

use safecrack_types::ProtocolError;

/// Default cap on the unterminated tail (1 MiB).
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Accumulates byte chunks and yields complete, non-blank lines.
///
/// One framer belongs to one streaming operation and is dropped with it.
#[derive(Debug)]
pub struct LineFramer {
    /// Bytes received since the last emitted newline.
    pending: Vec<u8>,
    /// Prefix of `pending` already searched for `\n`.
    scanned: usize,
    /// Cap on the unterminated tail. `None` = unbounded.
    max_line_bytes: Option<usize>,
}

impl LineFramer {
    /// Create a framer with the default tail cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(Some(DEFAULT_MAX_LINE_BYTES))
    }

    /// Create a framer with an explicit tail cap (`None` disables it).
    #[must_use]
    pub fn with_limit(max_line_bytes: Option<usize>) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            max_line_bytes,
        }
    }

    /// Bytes currently buffered, including lines not yet pulled.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.pending.len()
    }

    /// Append `chunk` and return the complete lines it finished.
    ///
    /// The iterator is lazy. Lines are removed from the buffer only as they
    /// are pulled; lines left unpulled stay buffered ahead of the next chunk.
    /// Once every complete line has been yielded, a tail longer than the cap
    /// is reported as a final [`ProtocolError::LineTooLong`] item, so a
    /// consumer that stops at an earlier line never sees it.
    pub fn push(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.pending.extend_from_slice(chunk);
        Lines {
            pending: &mut self.pending,
            scanned: &mut self.scanned,
            consumed: 0,
            limit: self.max_line_bytes,
            exhausted: false,
        }
    }

    /// Signal end of input. Returns the unterminated tail as a final line, if any.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        decode_line(&self.pending)
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy iterator over the complete lines in a [`LineFramer`].
#[derive(Debug)]
pub struct Lines<'a> {
    pending: &'a mut Vec<u8>,
    scanned: &'a mut usize,
    /// Bytes already handed out; drained from `pending` on drop.
    consumed: usize,
    limit: Option<usize>,
    exhausted: bool,
}

impl Iterator for Lines<'_> {
    type Item = Result<String, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        loop {
            let from = self.consumed.max(*self.scanned);
            let Some(offset) = self.pending[from..].iter().position(|b| *b == b'\n') else {
                *self.scanned = self.pending.len();
                self.exhausted = true;
                let tail = self.pending.len() - self.consumed;
                return match self.limit {
                    Some(limit) if tail > limit => {
                        Some(Err(ProtocolError::LineTooLong { len: tail, limit }))
                    }
                    _ => None,
                };
            };
            let end = from + offset;
            let line = decode_line(&self.pending[self.consumed..end]);
            self.consumed = end + 1;
            *self.scanned = self.consumed;
            if let Some(line) = line {
                return Some(Ok(line));
            }
        }
    }
}

impl Drop for Lines<'_> {
    fn drop(&mut self) {
        self.pending.drain(..self.consumed);
        *self.scanned = self.scanned.saturating_sub(self.consumed);
    }
}

/// Decode one line without its `\n`. Blank lines yield `None`.
///
/// Invalid UTF-8 is replaced with U+FFFD rather than rejected.
fn decode_line(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let text = String::from_utf8_lossy(raw);
    if text.trim().is_empty() {
        return None;
    }
    Some(text.into_owned())
}
