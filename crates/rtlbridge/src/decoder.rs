//! Newline-delimited JSON framing for the decoder's output.
//!
//! The stream is untrusted: any line may be noise, truncated or not JSON at
//! all. Every line is classified into a [`DecodeEvent`] and decoding always
//! continues with the next line. Only the current partial line is buffered,
//! and a line longer than the configured maximum is dropped rather than
//! accumulated.

use std::collections::VecDeque;
use std::io;

use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;

use crate::record::IncomingRecord;

/// Longest line accepted before it is discarded.
pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

const READ_CHUNK_SIZE: usize = 4096;

/// Outcome of decoding one line.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeEvent {
    /// A JSON object that parsed as a record
    Record { record: IncomingRecord, line: String },

    /// A line that does not look like JSON
    NonJson { line: String },

    /// A line that looked like JSON but failed to parse
    ParseError { line: String, error: String },

    /// A line exceeded the maximum length and was dropped
    Oversized { len: usize },
}

/// Incremental line splitter and classifier.
#[derive(Debug)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    max_line_len: usize,
    /// Bytes dropped so far from an oversized line still awaiting its newline
    discarding: Option<usize>,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::with_max_line_len(DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_len,
            discarding: None,
        }
    }

    /// Number of bytes of the current partial line held in memory.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk of bytes, returning events for every line it completes.
    pub fn feed(&mut self, mut chunk: &[u8]) -> Vec<DecodeEvent> {
        let mut events = Vec::new();

        while let Some(pos) = chunk.iter().position(|b| *b == b'\n') {
            let head = &chunk[..pos];
            chunk = &chunk[pos + 1..];

            if let Some(dropped) = self.discarding.take() {
                events.push(DecodeEvent::Oversized {
                    len: dropped + head.len(),
                });
            } else if self.buffer.len() + head.len() > self.max_line_len {
                events.push(DecodeEvent::Oversized {
                    len: self.buffer.len() + head.len(),
                });
                self.buffer.clear();
            } else {
                self.buffer.extend_from_slice(head);
                let line = std::mem::take(&mut self.buffer);
                events.extend(classify(&line));
            }
        }

        if let Some(dropped) = self.discarding.as_mut() {
            *dropped += chunk.len();
        } else if self.buffer.len() + chunk.len() > self.max_line_len {
            self.discarding = Some(self.buffer.len() + chunk.len());
            self.buffer.clear();
        } else {
            self.buffer.extend_from_slice(chunk);
        }

        events
    }

    /// Flush an unterminated final line at end of stream.
    pub fn finish(&mut self) -> Option<DecodeEvent> {
        if let Some(len) = self.discarding.take() {
            return Some(DecodeEvent::Oversized { len });
        }
        let line = std::mem::take(&mut self.buffer);
        classify(&line)
    }
}

/// Classify one complete line. Blank lines yield nothing.
pub fn classify(line: &[u8]) -> Option<DecodeEvent> {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return None;
    }

    if !trimmed.starts_with('{') {
        return Some(DecodeEvent::NonJson {
            line: trimmed.to_string(),
        });
    }

    Some(match IncomingRecord::from_json(trimmed) {
        Ok(record) => DecodeEvent::Record {
            record,
            line: trimmed.to_string(),
        },
        Err(e) => DecodeEvent::ParseError {
            line: trimmed.to_string(),
            error: e.to_string(),
        },
    })
}

/// Lazy sequence of decode events read from `reader`.
///
/// The sequence ends when the reader reaches end of stream. [`next`] is
/// cancel-safe: dropping its future loses no data.
///
/// [`next`]: DecodedLines::next
pub struct DecodedLines<R> {
    reader: R,
    decoder: StreamDecoder,
    pending: VecDeque<DecodeEvent>,
    chunk: Box<[u8]>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> DecodedLines<R> {
    pub fn new(reader: R) -> Self {
        Self::with_decoder(reader, StreamDecoder::new())
    }

    pub fn with_decoder(reader: R, decoder: StreamDecoder) -> Self {
        Self {
            reader,
            decoder,
            pending: VecDeque::new(),
            chunk: vec![0; READ_CHUNK_SIZE].into_boxed_slice(),
            eof: false,
        }
    }

    /// Next event, `Ok(None)` once the stream has ended.
    pub async fn next(&mut self) -> io::Result<Option<DecodeEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.eof {
                return Ok(None);
            }

            let n = self.reader.read(&mut self.chunk).await?;
            if n == 0 {
                self.eof = true;
                self.pending.extend(self.decoder.finish());
                continue;
            }
            let events = self.decoder.feed(&self.chunk[..n]);
            self.pending.extend(events);
        }
    }
}
