//! High-level file reader
//!
//! Reads a whole file into memory and gives access to the header, the
//! linearization dictionary, the trailer and every `N G obj ... endobj`
//! section found by a sequential scan. No cross-reference table is
//! consulted, so damaged files with broken offsets read the same way as
//! intact ones.

use super::diagnostics::{Diagnostics, ParseWarning, WarningKind};
use super::header::PdfHeader;
use super::lexer::{is_delimiter, is_whitespace, Lexer};
use super::linearization::Linearization;
use super::object_parser::Parser;
use super::objects::{ObjectRef, PdfDictionary, PdfObject};
use super::resolver::{ObjectTable, XRefResolver};
use super::source::{ByteSource, MemoryStream};
use super::{ParseOptions, ParseResult};
use crate::error::{PdfError, Result};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

const OBJ_KEYWORD: &[u8] = b"obj";
const TRAILER_KEYWORD: &[u8] = b"trailer";

/// Reader over a complete in-memory file
pub struct CosReader {
    data: MemoryStream,
    header: PdfHeader,
    options: ParseOptions,
}

impl CosReader {
    /// Open a file from a path with lenient parsing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Read from bytes with lenient parsing
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::with_options(data, ParseOptions::lenient())
    }

    /// Read from bytes with custom parsing options
    pub fn with_options(data: Vec<u8>, options: ParseOptions) -> Result<Self> {
        if data.is_empty() {
            return Err(PdfError::InvalidStructure("Empty file".to_string()));
        }
        let header = PdfHeader::parse(&data)?;
        tracing::debug!(version = %header.version, size = data.len(), "opened document");
        Ok(Self {
            data: MemoryStream::new(data),
            header,
            options,
        })
    }

    pub fn header(&self) -> &PdfHeader {
        &self.header
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// File size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The file contents
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// A fresh source over the file, positioned at `offset`
    pub fn source_at(&self, offset: usize) -> MemoryStream {
        let mut source = self.data.clone();
        source.set_pos(offset);
        source
    }

    /// The linearization dictionary, if the file is linearized
    pub fn linearization(&self) -> Result<Option<Linearization>> {
        Ok(Linearization::create(self.source_at(0))?)
    }

    /// The last `trailer` dictionary in the file
    pub fn trailer(&self) -> Result<Option<PdfDictionary>> {
        let at = match self
            .as_bytes()
            .windows(TRAILER_KEYWORD.len())
            .rposition(|window| window == TRAILER_KEYWORD)
        {
            Some(at) => at,
            None => return Ok(None),
        };
        let lexer = Lexer::with_options(
            self.source_at(at + TRAILER_KEYWORD.len()),
            self.options.clone(),
        );
        let mut parser = Parser::new(lexer, false)?;
        match parser.get_object(None)? {
            PdfObject::Dictionary(dict) => Ok(Some(dict)),
            _ => Ok(None),
        }
    }

    /// Every indirect object in the file
    pub fn objects(&self) -> Result<ObjectTable> {
        self.objects_with_warnings().map(|(table, _)| table)
    }

    /// A single indirect object
    pub fn object(&self, reference: ObjectRef) -> Result<PdfObject> {
        self.objects()?
            .get(reference)
            .cloned()
            .ok_or(PdfError::ObjectNotFound(reference.num, reference.gen))
    }

    /// Scan the file for indirect objects.
    ///
    /// Objects that fail to parse are reported as warnings and skipped.
    /// When an object number appears more than once, the later definition
    /// wins, as it does for incremental updates. Offsets that fall inside
    /// the data of a stream already read are not considered.
    pub fn objects_with_warnings(&self) -> Result<(ObjectTable, Vec<ParseWarning>)> {
        let table = Rc::new(RefCell::new(ObjectTable::new()));
        let mut diagnostics = Diagnostics::new(&self.options);
        let mut covered_until = 0;

        for offset in find_object_offsets(self.as_bytes()) {
            if offset < covered_until {
                tracing::debug!(offset, "skipping object header inside stream data");
                continue;
            }
            let resolver: Rc<dyn XRefResolver> = table.clone();
            match self.parse_object_at(offset, resolver, &mut diagnostics) {
                Ok((reference, object)) => {
                    if let PdfObject::Stream(stream) = &object {
                        covered_until = stream.start() + stream.length();
                    }
                    if table.borrow_mut().insert(reference, object).is_some() {
                        tracing::debug!(%reference, offset, "object redefined");
                    }
                }
                Err(err) if err.is_missing_data() => return Err(err.into()),
                Err(err) => diagnostics.warn(
                    WarningKind::InvalidObject,
                    Some(offset),
                    format!("Skipping invalid object: {err}"),
                ),
            }
        }

        let table = match Rc::try_unwrap(table) {
            Ok(cell) => cell.into_inner(),
            Err(shared) => shared.borrow().clone(),
        };
        tracing::debug!(objects = table.len(), "object scan finished");
        Ok((table, diagnostics.take()))
    }

    fn parse_object_at(
        &self,
        offset: usize,
        resolver: Rc<dyn XRefResolver>,
        diagnostics: &mut Diagnostics,
    ) -> ParseResult<(ObjectRef, PdfObject)> {
        let lexer = Lexer::with_options(self.source_at(offset), self.options.clone());
        let mut parser = Parser::new(lexer, true)?.with_resolver(resolver);
        let result = parser.parse_indirect_object(None);
        diagnostics.merge(parser.lexer_mut().diagnostics_mut().take());
        result
    }
}

/// Offsets of every `N G obj` header in `data`
pub fn find_object_offsets(data: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut from = 0;
    while let Some(found) = data[from..]
        .windows(OBJ_KEYWORD.len())
        .position(|window| window == OBJ_KEYWORD)
    {
        let keyword = from + found;
        if let Some(offset) = object_header_start(data, keyword) {
            offsets.push(offset);
        }
        from = keyword + OBJ_KEYWORD.len();
    }
    offsets
}

/// Walk back from `obj` over `num gen` and return where `num` starts.
fn object_header_start(data: &[u8], keyword: usize) -> Option<usize> {
    match data.get(keyword + OBJ_KEYWORD.len()) {
        Some(&ch) if !is_whitespace(ch) && !is_delimiter(ch) => return None,
        _ => {}
    }
    let steps: [fn(u8) -> bool; 4] = [is_whitespace, is_digit, is_whitespace, is_digit];
    let mut pos = keyword;
    for pred in steps {
        let next = skip_back(data, pos, pred);
        if next == pos {
            return None;
        }
        pos = next;
    }
    match pos.checked_sub(1).map(|before| data[before]) {
        Some(ch) if !is_whitespace(ch) && !is_delimiter(ch) => None,
        _ => Some(pos),
    }
}

fn is_digit(ch: u8) -> bool {
    ch.is_ascii_digit()
}

fn skip_back(data: &[u8], mut pos: usize, pred: fn(u8) -> bool) -> usize {
    while pos > 0 && pred(data[pos - 1]) {
        pos -= 1;
    }
    pos
}
