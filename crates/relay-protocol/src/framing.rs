//! Newline framing.
//!
//! Bytes from the socket are appended with [`LineFramer::extend`];
//! complete lines are pulled out with [`LineFramer::next_frame`].
//! A line (or an unterminated tail) longer than the configured cap is a
//! [`ProtocolError::FrameTooLong`]; the connection should be closed.

use bytes::{Buf, BytesMut};

use crate::json_codec::ProtocolError;

#[derive(Debug)]
pub struct LineFramer {
    buffer: BytesMut,
    /// Prefix of `buffer` already searched for a newline.
    scanned: usize,
    max_frame_bytes: usize,
}

impl LineFramer {
    pub fn new(max_frame_bytes: usize) -> Self {
        LineFramer {
            buffer: BytesMut::with_capacity(8 * 1024),
            scanned: 0,
            max_frame_bytes,
        }
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete, non-blank line, trimmed. `Ok(None)` means more
    /// bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<String>, ProtocolError> {
        loop {
            let found = self.buffer[self.scanned..].iter().position(|&b| b == b'\n');
            let Some(newline_pos) = found.map(|pos| self.scanned + pos) else {
                self.scanned = self.buffer.len();
                if self.buffer.len() > self.max_frame_bytes {
                    return Err(ProtocolError::FrameTooLong {
                        limit: self.max_frame_bytes,
                    });
                }
                return Ok(None);
            };

            if newline_pos > self.max_frame_bytes {
                return Err(ProtocolError::FrameTooLong {
                    limit: self.max_frame_bytes,
                });
            }

            let line = self.buffer.split_to(newline_pos);
            self.buffer.advance(1);
            self.scanned = 0;

            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if !text.is_empty() {
                return Ok(Some(text.to_string()));
            }
        }
    }

    /// Bytes buffered but not yet framed.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
