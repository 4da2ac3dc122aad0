//! COS Objects
//!
//! The typed values produced by the parser, following ISO 32000-1 Section 7.3.
//! Names and commands are interned, dictionaries keep their insertion order,
//! and streams share their byte sources so cloning an object is cheap.

use super::source::{ByteSource, MemoryStream};
use super::ParseResult;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

lazy_static! {
    static ref NAME_ATOMS: Mutex<HashSet<Arc<str>>> = Mutex::new(HashSet::new());
    static ref COMMAND_ATOMS: Mutex<HashSet<Arc<str>>> = Mutex::new(HashSet::new());
}

fn intern(table: &Mutex<HashSet<Arc<str>>>, value: &str) -> Arc<str> {
    let mut atoms = table.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(atom) = atoms.get(value) {
        return Arc::clone(atom);
    }
    let atom: Arc<str> = Arc::from(value);
    atoms.insert(Arc::clone(&atom));
    atom
}

/// Decode bytes as Latin-1, so every byte maps to exactly one char.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// PDF Name object. Two names with the same text share one allocation.
#[derive(Clone)]
pub struct PdfName(Arc<str>);

impl PdfName {
    pub fn new(name: &str) -> Self {
        PdfName(intern(&NAME_ATOMS, name))
    }

    /// Build a name from raw bytes, one char per byte.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(&latin1(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when both values are the same interned atom.
    pub fn ptr_eq(&self, other: &PdfName) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for PdfName {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for PdfName {}

impl Hash for PdfName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl Borrow<str> for PdfName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PdfName {
    fn from(name: &str) -> Self {
        PdfName::new(name)
    }
}

impl fmt::Debug for PdfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl fmt::Display for PdfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        for ch in self.0.chars() {
            let code = ch as u32;
            if code < 0x21 || code > 0x7e || b"#()<>[]{}/%".contains(&(code as u8)) {
                write!(f, "#{:02X}", code & 0xff)?;
            } else {
                write!(f, "{ch}")?;
            }
        }
        Ok(())
    }
}

/// Operator or keyword token (`obj`, `R`, `BT`, `[`, ...).
#[derive(Clone)]
pub struct PdfCommand(Arc<str>);

impl PdfCommand {
    pub fn new(cmd: &str) -> Self {
        PdfCommand(intern(&COMMAND_ATOMS, cmd))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn ptr_eq(&self, other: &PdfCommand) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for PdfCommand {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for PdfCommand {}

impl PartialEq<str> for PdfCommand {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl fmt::Debug for PdfCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cmd({})", self.0)
    }
}

impl fmt::Display for PdfCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// PDF String object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PdfString(pub Vec<u8>);

impl PdfString {
    pub fn new(data: Vec<u8>) -> Self {
        PdfString(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.0)
    }
}

impl fmt::Display for PdfString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printable = self
            .0
            .iter()
            .all(|&b| (0x20..0x7f).contains(&b) || matches!(b, b'\n' | b'\r' | b'\t'));
        if !printable {
            f.write_str("<")?;
            for b in &self.0 {
                write!(f, "{b:02X}")?;
            }
            return f.write_str(">");
        }
        f.write_str("(")?;
        for &b in &self.0 {
            match b {
                b'(' | b')' | b'\\' => write!(f, "\\{}", b as char)?,
                b'\n' => f.write_str("\\n")?,
                b'\r' => f.write_str("\\r")?,
                b'\t' => f.write_str("\\t")?,
                _ => write!(f, "{}", b as char)?,
            }
        }
        f.write_str(")")
    }
}

/// PDF Array object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfArray(pub Vec<PdfObject>);

impl PdfArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PdfObject> {
        self.0.get(index)
    }

    pub fn push(&mut self, obj: PdfObject) {
        self.0.push(obj);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PdfObject> {
        self.0.iter()
    }
}

/// PDF Dictionary object. Iteration follows the order keys were read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfDictionary(pub IndexMap<PdfName, PdfObject>);

impl PdfDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.0.get(key)
    }

    /// Look up `key`, falling back to its abbreviated form (`Filter`/`F`).
    pub fn get2(&self, key: &str, abbreviation: &str) -> Option<&PdfObject> {
        self.get(key).or_else(|| self.get(abbreviation))
    }

    /// Later duplicates replace earlier values but keep the first position.
    pub fn insert(&mut self, key: impl Into<PdfName>, value: PdfObject) {
        self.0.insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PdfName> {
        self.0.keys()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, PdfName, PdfObject> {
        self.0.iter()
    }

    /// Get the /Type name, if present
    pub fn get_type(&self) -> Option<&str> {
        self.get("Type").and_then(|obj| obj.as_name()).map(|n| n.as_str())
    }
}

/// Indirect object reference `num gen R`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub num: u32,
    pub gen: u16,
}

impl ObjectRef {
    pub fn new(num: u32, gen: u16) -> Self {
        Self { num, gen }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.num, self.gen)
    }
}

struct StreamInner {
    dict: PdfDictionary,
    start: usize,
    length: usize,
    raw: RefCell<Box<dyn ByteSource>>,
    decoded: RefCell<Box<dyn ByteSource>>,
    cache_key: Option<String>,
}

/// PDF Stream object.
///
/// Holds the dictionary, the raw byte range and the head of the decode
/// pipeline. Clones share the same sources; use [`PdfStream::ptr_eq`] to
/// check whether two values are the same instance.
#[derive(Clone)]
pub struct PdfStream {
    inner: Rc<StreamInner>,
}

impl PdfStream {
    pub fn new(
        dict: PdfDictionary,
        start: usize,
        length: usize,
        raw: Box<dyn ByteSource>,
        decoded: Box<dyn ByteSource>,
    ) -> Self {
        Self::with_cache_key(dict, start, length, raw, decoded, None)
    }

    pub(crate) fn with_cache_key(
        dict: PdfDictionary,
        start: usize,
        length: usize,
        raw: Box<dyn ByteSource>,
        decoded: Box<dyn ByteSource>,
        cache_key: Option<String>,
    ) -> Self {
        PdfStream {
            inner: Rc::new(StreamInner {
                dict,
                start,
                length,
                raw: RefCell::new(raw),
                decoded: RefCell::new(decoded),
                cache_key,
            }),
        }
    }

    /// Stream over an in-memory payload with no filters applied.
    pub fn from_bytes(dict: PdfDictionary, data: Vec<u8>) -> Self {
        let length = data.len();
        let source = MemoryStream::new(data);
        Self::new(dict, 0, length, Box::new(source.clone()), Box::new(source))
    }

    pub fn dict(&self) -> &PdfDictionary {
        &self.inner.dict
    }

    /// Offset of the first payload byte in the containing source
    pub fn start(&self) -> usize {
        self.inner.start
    }

    /// Payload length in bytes, before decoding
    pub fn length(&self) -> usize {
        self.inner.length
    }

    /// Key under which an inline image was cached
    pub fn cache_key(&self) -> Option<&str> {
        self.inner.cache_key.as_deref()
    }

    /// Get the raw (possibly compressed or encrypted) stream data
    pub fn raw_data(&self) -> ParseResult<Vec<u8>> {
        let mut raw = self.inner.raw.borrow_mut();
        raw.reset();
        raw.get_bytes(None)
    }

    /// Get the data after decryption and all filters
    pub fn decode(&self) -> ParseResult<Vec<u8>> {
        let mut decoded = self.inner.decoded.borrow_mut();
        decoded.reset();
        decoded.get_bytes(None)
    }

    /// Rewind the decode pipeline without discarding decoded data.
    pub fn reset(&self) {
        self.inner.decoded.borrow_mut().reset();
    }

    /// Decoded data as a fresh source, e.g. to lex a content stream.
    pub fn content_source(&self) -> ParseResult<MemoryStream> {
        Ok(MemoryStream::new(self.decode()?))
    }

    pub fn ptr_eq(&self, other: &PdfStream) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for PdfStream {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.inner.dict == other.inner.dict
                && self.inner.start == other.inner.start
                && self.inner.length == other.inner.length)
    }
}

impl fmt::Debug for PdfStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfStream")
            .field("dict", &self.inner.dict)
            .field("start", &self.inner.start)
            .field("length", &self.inner.length)
            .finish()
    }
}

/// PDF Object types
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(PdfString),
    Name(PdfName),
    Command(PdfCommand),
    Array(PdfArray),
    Dictionary(PdfDictionary),
    Stream(PdfStream),
    Reference(ObjectRef),
    /// End of input; never stored inside arrays or dictionaries
    Eof,
}

impl PdfObject {
    pub fn is_null(&self) -> bool {
        matches!(self, PdfObject::Null)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, PdfObject::Eof)
    }

    /// True for the command with the given text.
    pub fn is_command(&self, cmd: &str) -> bool {
        matches!(self, PdfObject::Command(c) if c == cmd)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PdfObject::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers are widened.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            PdfObject::Real(r) => Some(*r),
            PdfObject::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            PdfObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&PdfName> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_command(&self) -> Option<&PdfCommand> {
        match self {
            PdfObject::Command(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&PdfArray> {
        match self {
            PdfObject::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PdfDictionary> {
        match self {
            PdfObject::Dictionary(dict) => Some(dict),
            PdfObject::Stream(stream) => Some(stream.dict()),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&PdfStream> {
        match self {
            PdfObject::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            PdfObject::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Short lowercase name of the variant, for diagnostics and listings.
    pub fn type_name(&self) -> &'static str {
        match self {
            PdfObject::Null => "null",
            PdfObject::Boolean(_) => "boolean",
            PdfObject::Integer(_) => "integer",
            PdfObject::Real(_) => "real",
            PdfObject::String(_) => "string",
            PdfObject::Name(_) => "name",
            PdfObject::Command(_) => "command",
            PdfObject::Array(_) => "array",
            PdfObject::Dictionary(_) => "dictionary",
            PdfObject::Stream(_) => "stream",
            PdfObject::Reference(_) => "reference",
            PdfObject::Eof => "eof",
        }
    }
}

impl fmt::Display for PdfDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<<")?;
        for (key, value) in self.iter() {
            write!(f, " {key} {value}")?;
        }
        f.write_str(" >>")
    }
}

impl fmt::Display for PdfArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("]")
    }
}

/// Serializes back to COS syntax. Stream payloads are summarized.
impl fmt::Display for PdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfObject::Null => f.write_str("null"),
            PdfObject::Boolean(b) => write!(f, "{b}"),
            PdfObject::Integer(i) => write!(f, "{i}"),
            PdfObject::Real(r) => {
                if r.fract() == 0.0 && r.abs() < 1e15 {
                    write!(f, "{r:.1}")
                } else {
                    write!(f, "{r}")
                }
            }
            PdfObject::String(s) => write!(f, "{s}"),
            PdfObject::Name(n) => write!(f, "{n}"),
            PdfObject::Command(c) => write!(f, "{c}"),
            PdfObject::Array(arr) => write!(f, "{arr}"),
            PdfObject::Dictionary(dict) => write!(f, "{dict}"),
            PdfObject::Stream(stream) => {
                write!(f, "{} stream[{} bytes]", stream.dict(), stream.length())
            }
            PdfObject::Reference(r) => write!(f, "{r}"),
            PdfObject::Eof => f.write_str("%%EOF"),
        }
    }
}
