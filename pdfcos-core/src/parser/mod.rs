//! COS Parser Module
//!
//! This module implements the object layer of a PDF reader: tokenizing raw
//! bytes, assembling typed objects, recovering stream boundaries and building
//! the decode pipeline for stream payloads, following ISO 32000-1 Section 7
//! and the recovery behavior of mainstream viewers.

pub mod chunked;
pub mod decode_stream;
pub mod diagnostics;
pub mod encryption;
pub mod filter_impls;
pub mod filters;
pub mod header;
pub mod inline_image;
pub mod lexer;
pub mod linearization;
pub mod object_parser;
pub mod objects;
pub mod reader;
pub mod resolver;
pub mod source;
pub mod stack_safe;
pub mod stream_length;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use self::chunked::ChunkedStream;
pub use self::decode_stream::{Codec, DecodeStream};
pub use self::diagnostics::{Diagnostics, ParseWarning, WarningKind};
pub use self::encryption::Decryptor;
pub use self::filters::{BuiltinCodecs, CodecProvider, Filter};
pub use self::header::{PdfHeader, PdfVersion};
pub use self::lexer::{Lexer, Token, CONTENT_STREAM_OPERATORS};
pub use self::linearization::Linearization;
pub use self::object_parser::Parser;
pub use self::objects::{
    ObjectRef, PdfArray, PdfCommand, PdfDictionary, PdfName, PdfObject, PdfStream, PdfString,
};
pub use self::resolver::{NoResolver, ObjectTable, XRefResolver};
pub use self::source::{ByteSource, MemoryStream, NullStream};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// COS parser errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid PDF header")]
    InvalidHeader,

    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("Invalid number at position {position}: {found}")]
    InvalidNumber { position: usize, found: String },

    #[error("Command token too long at position {position}")]
    CommandTooLong { position: usize },

    #[error("Missing endstream command for stream data at {position}")]
    MissingEndstream { position: usize },

    #[error("Bad filter name: {0}")]
    BadFilterName(String),

    #[error("Maximum nesting depth exceeded: {depth} (limit: {limit})")]
    RecursionLimit { depth: usize, limit: usize },

    #[error("Stream decode error: {0}")]
    StreamDecodeError(String),

    #[error("Data not loaded: bytes {begin}..{end}")]
    NeedMoreData { begin: usize, end: usize },
}

impl ParseError {
    /// Returns true when the error only reports bytes that have not arrived
    /// yet. Such errors are never swallowed by recovery paths: the caller is
    /// expected to load the range and retry the whole operation.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, ParseError::NeedMoreData { .. })
    }
}

/// Options for parsing behavior
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Return partially built arrays and dictionaries at end of input
    /// instead of failing
    pub recovery_mode: bool,
    /// Keep warnings in memory so callers can inspect them after parsing
    pub collect_warnings: bool,
    /// Upper bound on collected warnings; later ones are only logged
    pub max_warnings: usize,
    /// Maximum nesting of arrays and dictionaries
    pub max_depth: usize,
    /// Inline images at least this many bytes long are never cached
    pub max_inline_image_cache_length: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            recovery_mode: false,
            collect_warnings: false,
            max_warnings: 1000,
            max_depth: stack_safe::MAX_RECURSION_DEPTH,
            max_inline_image_cache_length: inline_image::MAX_LENGTH_TO_CACHE,
        }
    }
}

impl ParseOptions {
    /// Create options for lenient parsing of damaged files
    pub fn lenient() -> Self {
        Self {
            recovery_mode: true,
            collect_warnings: true,
            ..Default::default()
        }
    }

    /// Create options for strict parsing: no partial objects are returned
    pub fn strict() -> Self {
        Self {
            recovery_mode: false,
            collect_warnings: true,
            ..Default::default()
        }
    }

    /// Keep warnings in memory in addition to logging them
    pub fn with_warnings(mut self) -> Self {
        self.collect_warnings = true;
        self
    }
}
