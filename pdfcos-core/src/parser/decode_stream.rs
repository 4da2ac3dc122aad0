//! Lazily decoded byte source
//!
//! A [`DecodeStream`] wraps an encoded source and a [`Codec`]. Nothing is
//! decoded until the first read, so building a filter chain is cheap and a
//! chain over bytes that are not loaded yet can still be constructed.

use super::source::{ByteSource, MemoryStream};
use super::ParseResult;
use std::fmt;

/// One decoding stage of a filter chain.
pub trait Codec: fmt::Debug {
    /// Filter name as it appears in the stream dictionary.
    fn name(&self) -> &'static str;

    /// Decode the complete encoded input. Codecs should return whatever they
    /// managed to decode when the input is damaged; an `Err` discards the
    /// output of this stage.
    fn decode(&mut self, input: Vec<u8>) -> ParseResult<Vec<u8>>;
}

/// Byte source that decodes its input on first access.
pub struct DecodeStream {
    input: Box<dyn ByteSource>,
    maybe_length: Option<usize>,
    codec: Box<dyn Codec>,
    buffer: Option<Vec<u8>>,
    pos: usize,
}

impl DecodeStream {
    /// `maybe_length` bounds how much of `input` is read, when known.
    pub fn new(input: Box<dyn ByteSource>, maybe_length: Option<usize>, codec: Box<dyn Codec>) -> Self {
        Self {
            input,
            maybe_length,
            codec,
            buffer: None,
            pos: 0,
        }
    }

    pub fn is_decoded(&self) -> bool {
        self.buffer.is_some()
    }

    fn ensure_decoded(&mut self) -> ParseResult<&[u8]> {
        if self.buffer.is_none() {
            let encoded = self.input.get_bytes(self.maybe_length)?;
            let encoded_len = encoded.len();
            let decoded = match self.codec.decode(encoded) {
                Ok(decoded) => decoded,
                Err(err) if err.is_missing_data() => {
                    self.input.reset();
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(codec = self.codec.name(), "Invalid stream: {}", err);
                    Vec::new()
                }
            };
            tracing::trace!(
                codec = self.codec.name(),
                encoded_len,
                decoded_len = decoded.len(),
                "decoded stream"
            );
            self.buffer = Some(decoded);
        }
        Ok(self.buffer.as_deref().unwrap_or_default())
    }
}

impl fmt::Debug for DecodeStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeStream")
            .field("codec", &self.codec.name())
            .field("input", &self.input)
            .field("decoded", &self.buffer.as_ref().map(Vec::len))
            .field("pos", &self.pos)
            .finish()
    }
}

impl ByteSource for DecodeStream {
    fn get_byte(&mut self) -> ParseResult<Option<u8>> {
        let pos = self.pos;
        let byte = self.ensure_decoded()?.get(pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    fn get_bytes(&mut self, length: Option<usize>) -> ParseResult<Vec<u8>> {
        let pos = self.pos;
        let buffer = self.ensure_decoded()?;
        let pos = pos.min(buffer.len());
        let end = match length {
            Some(length) => pos.saturating_add(length).min(buffer.len()),
            None => buffer.len(),
        };
        let bytes = buffer[pos..end].to_vec();
        self.pos = end;
        Ok(bytes)
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn start(&self) -> usize {
        0
    }

    fn end(&mut self) -> ParseResult<usize> {
        Ok(self.ensure_decoded()?.len())
    }

    fn make_sub_stream(
        &mut self,
        start: usize,
        length: Option<usize>,
    ) -> ParseResult<Box<dyn ByteSource>> {
        let decoded = self.ensure_decoded()?.to_vec();
        let mut whole = MemoryStream::new(decoded);
        whole.make_sub_stream(start, length)
    }
}
