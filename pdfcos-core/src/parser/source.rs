//! Byte sources
//!
//! Everything the lexer and the stream builders read goes through
//! [`ByteSource`]: a positioned cursor with a start and an end, able to hand
//! out independent sub-ranges of itself.

use super::ParseResult;
use std::fmt;
use std::rc::Rc;

/// Random-access cursor over a byte range.
///
/// Positions are absolute within the underlying data. Reads past `end`
/// return `None`. Sources backed by partially loaded data return
/// [`ParseError::NeedMoreData`](super::ParseError::NeedMoreData) and leave
/// the cursor untouched so the read can be retried.
pub trait ByteSource: fmt::Debug {
    fn get_byte(&mut self) -> ParseResult<Option<u8>>;

    /// Read `length` bytes, or everything up to the end when `None`.
    fn get_bytes(&mut self, length: Option<usize>) -> ParseResult<Vec<u8>>;

    fn pos(&self) -> usize;

    fn set_pos(&mut self, pos: usize);

    fn start(&self) -> usize;

    fn end(&mut self) -> ParseResult<usize>;

    /// Independent cursor over `start..start + length`, or to the end.
    fn make_sub_stream(
        &mut self,
        start: usize,
        length: Option<usize>,
    ) -> ParseResult<Box<dyn ByteSource>>;

    fn peek_byte(&mut self) -> ParseResult<Option<u8>> {
        let byte = self.get_byte()?;
        if byte.is_some() {
            self.skip(-1);
        }
        Ok(byte)
    }

    fn peek_bytes(&mut self, length: usize) -> ParseResult<Vec<u8>> {
        let pos = self.pos();
        let bytes = self.get_bytes(Some(length))?;
        self.set_pos(pos);
        Ok(bytes)
    }

    /// Big-endian u16, or `None` when fewer than two bytes remain.
    fn get_u16(&mut self) -> ParseResult<Option<u16>> {
        let hi = self.get_byte()?;
        let lo = self.get_byte()?;
        Ok(match (hi, lo) {
            (Some(hi), Some(lo)) => Some(u16::from_be_bytes([hi, lo])),
            _ => None,
        })
    }

    fn skip(&mut self, n: isize) {
        let pos = (self.pos() as isize).saturating_add(n).max(0) as usize;
        self.set_pos(pos);
    }

    fn reset(&mut self) {
        let start = self.start();
        self.set_pos(start);
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn get_byte(&mut self) -> ParseResult<Option<u8>> {
        (**self).get_byte()
    }

    fn get_bytes(&mut self, length: Option<usize>) -> ParseResult<Vec<u8>> {
        (**self).get_bytes(length)
    }

    fn pos(&self) -> usize {
        (**self).pos()
    }

    fn set_pos(&mut self, pos: usize) {
        (**self).set_pos(pos)
    }

    fn start(&self) -> usize {
        (**self).start()
    }

    fn end(&mut self) -> ParseResult<usize> {
        (**self).end()
    }

    fn make_sub_stream(
        &mut self,
        start: usize,
        length: Option<usize>,
    ) -> ParseResult<Box<dyn ByteSource>> {
        (**self).make_sub_stream(start, length)
    }

    fn peek_byte(&mut self) -> ParseResult<Option<u8>> {
        (**self).peek_byte()
    }

    fn peek_bytes(&mut self, length: usize) -> ParseResult<Vec<u8>> {
        (**self).peek_bytes(length)
    }

    fn skip(&mut self, n: isize) {
        (**self).skip(n)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Fully loaded, shareable byte buffer.
#[derive(Clone)]
pub struct MemoryStream {
    data: Rc<[u8]>,
    start: usize,
    end: usize,
    pos: usize,
}

impl MemoryStream {
    pub fn new(data: impl Into<Rc<[u8]>>) -> Self {
        let data = data.into();
        let end = data.len();
        Self {
            data,
            start: 0,
            end,
            pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The bytes between start and end.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    fn sub_range(&self, start: usize, length: Option<usize>) -> Self {
        let limit = self.data.len();
        let start = start.min(limit);
        let end = match length {
            Some(length) => start.saturating_add(length).min(limit),
            None => limit,
        };
        Self {
            data: Rc::clone(&self.data),
            start,
            end,
            pos: start,
        }
    }
}

impl fmt::Debug for MemoryStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStream")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("pos", &self.pos)
            .finish()
    }
}

impl ByteSource for MemoryStream {
    fn get_byte(&mut self) -> ParseResult<Option<u8>> {
        if self.pos >= self.end {
            return Ok(None);
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn get_bytes(&mut self, length: Option<usize>) -> ParseResult<Vec<u8>> {
        let pos = self.pos.min(self.end);
        let end = match length {
            Some(length) => pos.saturating_add(length).min(self.end),
            None => self.end,
        };
        self.pos = end;
        Ok(self.data[pos..end].to_vec())
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn start(&self) -> usize {
        self.start
    }

    fn end(&mut self) -> ParseResult<usize> {
        Ok(self.end)
    }

    fn make_sub_stream(
        &mut self,
        start: usize,
        length: Option<usize>,
    ) -> ParseResult<Box<dyn ByteSource>> {
        Ok(Box::new(self.sub_range(start, length)))
    }
}

/// A source with no bytes. Stands in for streams that failed to decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStream;

impl ByteSource for NullStream {
    fn get_byte(&mut self) -> ParseResult<Option<u8>> {
        Ok(None)
    }

    fn get_bytes(&mut self, _length: Option<usize>) -> ParseResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn pos(&self) -> usize {
        0
    }

    fn set_pos(&mut self, _pos: usize) {}

    fn start(&self) -> usize {
        0
    }

    fn end(&mut self) -> ParseResult<usize> {
        Ok(0)
    }

    fn make_sub_stream(
        &mut self,
        _start: usize,
        _length: Option<usize>,
    ) -> ParseResult<Box<dyn ByteSource>> {
        Ok(Box::new(NullStream))
    }
}
