//! Incrementally loaded byte source
//!
//! A [`ChunkedStream`] models a file that arrives in fixed-size chunks, for
//! example over HTTP range requests. Reading a byte whose chunk is not loaded
//! fails with [`ParseError::NeedMoreData`] naming the missing range. The
//! caller feeds the data in with [`ChunkedStream::on_receive_data`] and
//! retries the operation from the start.

use super::source::ByteSource;
use super::{ParseError, ParseResult};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Default chunk size used by [`ChunkedStream::new`].
pub const DEFAULT_CHUNK_SIZE: usize = 65536;

struct ChunkStore {
    bytes: Vec<u8>,
    chunk_size: usize,
    loaded: Vec<bool>,
    loaded_count: usize,
}

impl ChunkStore {
    fn is_range_loaded(&self, begin: usize, end: usize) -> bool {
        if begin >= end {
            return true;
        }
        let first = begin / self.chunk_size;
        let last = (end - 1) / self.chunk_size;
        (first..=last).all(|chunk| self.loaded.get(chunk).copied().unwrap_or(false))
    }

    /// First unloaded offset at or after `begin`, bounded by `end`.
    fn first_missing(&self, begin: usize, end: usize) -> Option<usize> {
        if begin >= end {
            return None;
        }
        let first = begin / self.chunk_size;
        let last = (end - 1) / self.chunk_size;
        (first..=last)
            .find(|&chunk| !self.loaded.get(chunk).copied().unwrap_or(false))
            .map(|chunk| (chunk * self.chunk_size).max(begin))
    }
}

/// Byte source over a partially loaded file.
#[derive(Clone)]
pub struct ChunkedStream {
    store: Rc<RefCell<ChunkStore>>,
    start: usize,
    end: usize,
    pos: usize,
}

impl ChunkedStream {
    pub fn new(length: usize) -> Self {
        Self::with_chunk_size(length, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(length: usize, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunks = length.div_ceil(chunk_size);
        Self {
            store: Rc::new(RefCell::new(ChunkStore {
                bytes: vec![0; length],
                chunk_size,
                loaded: vec![false; chunks],
                loaded_count: 0,
            })),
            start: 0,
            end: length,
            pos: 0,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.store.borrow().chunk_size
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store bytes starting at `begin`. Only chunks covered completely, or
    /// ending at the file end, become readable.
    pub fn on_receive_data(&self, begin: usize, data: &[u8]) {
        let mut store = self.store.borrow_mut();
        let total = store.bytes.len();
        let begin = begin.min(total);
        let end = begin.saturating_add(data.len()).min(total);
        store.bytes[begin..end].copy_from_slice(&data[..end - begin]);

        let chunk_size = store.chunk_size;
        let first = begin.div_ceil(chunk_size);
        let last = if end == total {
            store.loaded.len()
        } else {
            end / chunk_size
        };
        for chunk in first..last {
            if !store.loaded[chunk] {
                store.loaded[chunk] = true;
                store.loaded_count += 1;
            }
        }
        tracing::trace!(begin, end, loaded = store.loaded_count, "received chunk data");
    }

    pub fn is_data_loaded(&self) -> bool {
        let store = self.store.borrow();
        store.loaded_count == store.loaded.len()
    }

    pub fn is_range_loaded(&self, begin: usize, end: usize) -> bool {
        self.store.borrow().is_range_loaded(begin, end)
    }

    /// Chunk-aligned ranges that have not arrived yet.
    pub fn missing_ranges(&self) -> Vec<(usize, usize)> {
        let store = self.store.borrow();
        let total = store.bytes.len();
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for (chunk, _) in store.loaded.iter().enumerate().filter(|(_, loaded)| !**loaded) {
            let begin = chunk * store.chunk_size;
            let end = (begin + store.chunk_size).min(total);
            match ranges.last_mut() {
                Some(last) if last.1 == begin => last.1 = end,
                _ => ranges.push((begin, end)),
            }
        }
        ranges
    }

    fn ensure_range(&self, begin: usize, end: usize) -> ParseResult<()> {
        let store = self.store.borrow();
        match store.first_missing(begin, end) {
            None => Ok(()),
            Some(missing) => Err(ParseError::NeedMoreData {
                begin: missing,
                end: end.max(missing + 1),
            }),
        }
    }
}

impl fmt::Debug for ChunkedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedStream")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("pos", &self.pos)
            .field("complete", &self.is_data_loaded())
            .finish()
    }
}

impl ByteSource for ChunkedStream {
    fn get_byte(&mut self) -> ParseResult<Option<u8>> {
        if self.pos >= self.end {
            return Ok(None);
        }
        self.ensure_range(self.pos, self.pos + 1)?;
        let byte = self.store.borrow().bytes[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    fn get_bytes(&mut self, length: Option<usize>) -> ParseResult<Vec<u8>> {
        let pos = self.pos.min(self.end);
        let end = match length {
            Some(length) => pos.saturating_add(length).min(self.end),
            None => self.end,
        };
        self.ensure_range(pos, end)?;
        let bytes = self.store.borrow().bytes[pos..end].to_vec();
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
        let limit = self.store.borrow().bytes.len();
        let start = start.min(limit);
        let end = match length {
            Some(length) => start.saturating_add(length).min(limit),
            None => limit,
        };
        Ok(Box::new(ChunkedStream {
            store: Rc::clone(&self.store),
            start,
            end,
            pos: start,
        }))
    }
}
