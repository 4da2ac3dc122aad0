use crate::parser::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),
}

pub type Result<T> = std::result::Result<T, PdfError>;

impl PdfError {
    /// Returns true when the failure only means more input is needed.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, PdfError::Parse(err) if err.is_missing_data())
    }
}
