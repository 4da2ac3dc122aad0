//! # pdfcos
//!
//! A tolerant reader for the COS object syntax that every PDF file is built
//! from. It turns a byte source into typed objects and keeps going on the
//! malformed input real-world producers emit.
//!
//! ## Features
//!
//! - **Lexer**: numbers, literal and hex strings, names, commands and
//!   delimiters, with the recovery rules mainstream readers apply
//! - **Object parser**: two-token lookahead, indirect references, streams
//!   and inline images
//! - **Stream recovery**: scans for `endstream` when `/Length` is wrong
//! - **Inline images**: filter-aware end detection and a content-addressed
//!   cache
//! - **Filter chains**: lazy decoding through ASCIIHex, ASCII85, RunLength,
//!   Flate, LZW and predictors, with image codecs passed through
//! - **Linearization**: validated first-object hint dictionary
//! - **Incremental input**: chunked sources report missing byte ranges so
//!   callers can fetch and retry
//!
//! ## Quick Start
//!
//! ```rust
//! use pdfcos::parser::{Lexer, MemoryStream, Parser, PdfObject};
//!
//! # fn main() -> pdfcos::Result<()> {
//! let source = MemoryStream::new(b"<< /Type /Page /Kids [3 0 R] >>".to_vec());
//! let mut parser = Parser::new(Lexer::new(source), true)?;
//!
//! let page = parser.get_object(None)?;
//! let dict = page.as_dict().expect("a dictionary");
//! assert_eq!(dict.get_type(), Some("Page"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Reading a file
//!
//! ```rust,no_run
//! use pdfcos::CosReader;
//!
//! # fn main() -> pdfcos::Result<()> {
//! let reader = CosReader::open("document.pdf")?;
//! println!("PDF {}", reader.header().version);
//!
//! for (reference, object) in reader.objects()?.iter() {
//!     println!("{reference}: {}", object.type_name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod parser;

pub use error::{PdfError, Result};
pub use parser::reader::CosReader;
pub use parser::{ParseError, ParseOptions, ParseResult};

/// Current version of pdfcos
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
