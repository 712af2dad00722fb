//! Incremental extraction of named JSON blocks from the transcoder output
//!
//! HandBrakeCLI run with `--json` interleaves blocks like
//!
//! ```text
//! Progress: {
//!     "State": "WORKING",
//!     "Working": { "Progress": 0.42 }
//! }
//! ```
//!
//! with whatever else it prints. A block starts with a header line made of a
//! name (word characters and blanks) followed by `: {`, continues with one or
//! more lines that begin with a space and ends with a line that begins with
//! `}`. Output arrives in arbitrary chunks, so the parser keeps a buffer and a
//! cursor and only ever looks at the part of the buffer it has not settled yet.
//!
//! Framing is line based: an indented body line shaped like `  Name: {` is a
//! header candidate too. The leftmost candidate always wins, which keeps the
//! outer block intact for well-formed output.

use tracing::trace;

use crate::domain::model::StructuredMessage;
use crate::error::{RipError, RipResult};

/// Incremental parser turning raw output chunks into [`StructuredMessage`]s
#[derive(Debug, Default)]
pub struct StreamMessageParser {
    buffer: Vec<u8>,
    /// First byte that has not been matched or rejected yet
    cursor: usize,
    /// True when `cursor` sits in the middle of a line, right after a block
    mid_line: bool,
    /// Progress through an incomplete block starting at `cursor`
    partial: Option<PartialBlock>,
    failed: bool,
}

/// Scan state of a block whose end has not been received yet
#[derive(Debug, Clone, Copy)]
struct PartialBlock {
    /// Length of the header name
    name_len: usize,
    /// Offset from the block start of the next line to inspect
    next_line: usize,
    /// Body lines seen so far
    body_lines: usize,
}

enum Candidate {
    /// Block found, `end` is one past its closing brace
    Complete { name_len: usize, end: usize },
    /// Not a block, scanning resumes at `next_line`
    Rejected { next_line: usize },
    /// Could still be a block once more output arrives
    Incomplete(Option<PartialBlock>),
}

impl StreamMessageParser {
    /// Create an empty parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of output
    pub fn push(&mut self, chunk: &[u8]) {
        if !self.failed {
            self.buffer.extend_from_slice(chunk);
        }
    }

    /// Bytes received but not consumed yet
    pub fn pending(&self) -> &[u8] {
        &self.buffer[self.cursor..]
    }

    /// True once a block failed to decode
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Next complete message in stream order.
    ///
    /// `Ok(None)` means more output is needed. A block whose body is not
    /// valid JSON is fatal: the error is returned once and the parser yields
    /// nothing afterwards.
    pub fn next_message(&mut self) -> RipResult<Option<StructuredMessage>> {
        if self.failed {
            return Ok(None);
        }

        loop {
            if self.mid_line {
                match find_newline(&self.buffer[self.cursor..]) {
                    Some(offset) => {
                        self.cursor += offset + 1;
                        self.mid_line = false;
                    }
                    None => {
                        self.cursor = self.buffer.len();
                        self.compact();
                        return Ok(None);
                    }
                }
            }

            match self.classify() {
                Candidate::Complete { name_len, end } => {
                    let start = self.cursor;
                    self.cursor = start + end;
                    self.mid_line = true;
                    self.partial = None;
                    return self.decode(start, name_len, end).map(Some);
                }
                Candidate::Rejected { next_line } => {
                    self.cursor += next_line;
                    self.partial = None;
                }
                Candidate::Incomplete(partial) => {
                    self.partial = partial;
                    self.compact();
                    return Ok(None);
                }
            }
        }
    }

    /// Iterate over the messages currently available
    pub fn messages(&mut self) -> Messages<'_> {
        Messages {
            parser: self,
            done: false,
        }
    }

    /// Look at the candidate block starting at `cursor`
    fn classify(&self) -> Candidate {
        let block = &self.buffer[self.cursor..];

        let (name_len, mut next_line, mut body_lines) = match self.partial {
            Some(p) => (p.name_len, p.next_line, p.body_lines),
            None => {
                let Some(header_end) = find_newline(block) else {
                    return Candidate::Incomplete(None);
                };
                match header_name_len(&block[..header_end]) {
                    Some(name_len) => (name_len, header_end + 1, 0),
                    None => {
                        return Candidate::Rejected {
                            next_line: header_end + 1,
                        }
                    }
                }
            }
        };

        loop {
            let Some(&first) = block.get(next_line) else {
                return Candidate::Incomplete(Some(PartialBlock {
                    name_len,
                    next_line,
                    body_lines,
                }));
            };

            match first {
                b' ' => match find_newline(&block[next_line..]) {
                    Some(offset) => {
                        next_line += offset + 1;
                        body_lines += 1;
                    }
                    None => {
                        return Candidate::Incomplete(Some(PartialBlock {
                            name_len,
                            next_line,
                            body_lines,
                        }))
                    }
                },
                b'}' if body_lines > 0 => {
                    return Candidate::Complete {
                        name_len,
                        end: next_line + 1,
                    }
                }
                _ => {
                    // The header line is not a block start after all
                    let header_end = find_newline(block).unwrap_or(block.len());
                    return Candidate::Rejected {
                        next_line: header_end + 1,
                    };
                }
            }
        }
    }

    fn decode(
        &mut self,
        start: usize,
        name_len: usize,
        end: usize,
    ) -> RipResult<StructuredMessage> {
        let block = &self.buffer[start..start + end];
        let name = String::from_utf8_lossy(&block[..name_len]).into_owned();
        // Skip ": " to land on the opening brace
        let body = &block[name_len + 2..];

        match serde_json::from_slice(body) {
            Ok(payload) => Ok(StructuredMessage::new(name, payload)),
            Err(source) => {
                self.failed = true;
                self.buffer.clear();
                self.cursor = 0;
                Err(RipError::Decode { name, source })
            }
        }
    }

    /// Drop everything before the cursor
    fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        trace!(
            consumed = self.cursor,
            kept = self.buffer.len() - self.cursor,
            "compacting output buffer"
        );
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
    }
}

/// Iterator over the messages available in a [`StreamMessageParser`]
///
/// Ends when the parser needs more input or after yielding a decode error.
pub struct Messages<'a> {
    parser: &'a mut StreamMessageParser,
    done: bool,
}

impl Iterator for Messages<'_> {
    type Item = RipResult<StructuredMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.parser.next_message() {
            Ok(Some(message)) => Some(Ok(message)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn find_newline(bytes: &[u8]) -> Option<usize> {
    bytes.iter().position(|&b| b == b'\n')
}

/// Length of the name in a `<name>: {` header line, if the line is one
fn header_name_len(line: &[u8]) -> Option<usize> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let name = line.strip_suffix(b": {")?;
    let text = std::str::from_utf8(name).ok()?;

    let valid = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || (c.is_whitespace() && c != '\n'));

    valid.then_some(name.len())
}
