//! Line codec
//!
//! Frames a TCP byte stream into text lines. Inbound lines end in `\n`
//! with an optional `\r`; outbound lines are terminated with `\r\n`.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;
use crate::types::MAX_LINE_LEN;

/// A tokio codec that frames text on newline boundaries
#[derive(Debug)]
pub struct LineCodec {
    max_length: usize,
    /// Bytes already scanned for `\n`, so partial reads are not rescanned
    next_index: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LEN)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
            next_index: 0,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn to_line(mut raw: BytesMut) -> String {
    if raw.last() == Some(&b'\n') {
        raw.truncate(raw.len() - 1);
    }
    if raw.last() == Some(&b'\r') {
        raw.truncate(raw.len() - 1);
    }
    String::from_utf8_lossy(&raw).into_owned()
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let newline = src[self.next_index..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|offset| self.next_index + offset);

        match newline {
            Some(pos) => {
                self.next_index = 0;
                let raw = src.split_to(pos + 1);
                let content_len = if pos > 0 && raw[pos - 1] == b'\r' {
                    pos - 1
                } else {
                    pos
                };
                if content_len > self.max_length {
                    return Err(CodecError::LineTooLong {
                        max: self.max_length,
                    });
                }
                Ok(Some(to_line(raw)))
            }
            None => {
                if src.len() > self.max_length + 1 {
                    return Err(CodecError::LineTooLong {
                        max: self.max_length,
                    });
                }
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        // unterminated trailing data is the last line
        self.next_index = 0;
        let content_len = src.len() - usize::from(src.last() == Some(&b'\r'));
        if content_len > self.max_length {
            src.clear();
            return Err(CodecError::LineTooLong {
                max: self.max_length,
            });
        }
        let raw = src.split_to(src.len());
        Ok(Some(to_line(raw)))
    }
}

impl Encoder<String> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
