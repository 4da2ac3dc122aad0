//! Linearization dictionary (ISO 32000-1 Annex F)
//!
//! A linearized file starts with an indirect object holding a dictionary
//! that describes the first page and the hint tables. Anything that does
//! not match the expected shape means the file is read as if it were not
//! linearized.

use super::diagnostics::WarningKind;
use super::lexer::Lexer;
use super::object_parser::Parser;
use super::objects::{PdfDictionary, PdfObject};
use super::source::ByteSource;
use super::{ParseError, ParseOptions, ParseResult};

/// Parameters of the linearization dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linearization {
    /// /L: file length in bytes
    pub length: usize,
    /// /H: offsets and lengths of the primary (and overflow) hint stream
    pub hints: Vec<u64>,
    /// /O: object number of the first page
    pub object_number_first: u32,
    /// /E: offset of the end of the first page
    pub end_first: usize,
    /// /N: number of pages
    pub num_pages: u32,
    /// /T: offset of the first entry of the main cross-reference table
    pub main_xref_entries_offset: usize,
    /// /P: page number of the first page, zero when absent
    pub page_first: u32,
}

fn get_int(dict: &PdfDictionary, key: &str, allow_zero: bool) -> ParseResult<i64> {
    match dict.get(key) {
        Some(PdfObject::Integer(value)) if *value > 0 || (allow_zero && *value == 0) => Ok(*value),
        _ => Err(ParseError::SyntaxError {
            position: 0,
            message: format!("The \"{key}\" parameter in the linearization dictionary is invalid"),
        }),
    }
}

fn narrow<T: TryFrom<i64>>(value: i64, key: &str) -> ParseResult<T> {
    T::try_from(value).map_err(|_| ParseError::SyntaxError {
        position: 0,
        message: format!("The \"{key}\" parameter in the linearization dictionary is out of range"),
    })
}

fn get_hints(dict: &PdfDictionary) -> ParseResult<Vec<u64>> {
    let hints = match dict.get("H").and_then(|obj| obj.as_array()) {
        Some(hints) if hints.len() == 2 || hints.len() == 4 => hints,
        _ => {
            return Err(ParseError::SyntaxError {
                position: 0,
                message: "Hint array in the linearization dictionary is invalid".to_string(),
            })
        }
    };
    hints
        .iter()
        .enumerate()
        .map(|(index, hint)| match hint {
            PdfObject::Integer(value) if *value > 0 => Ok(*value as u64),
            _ => Err(ParseError::SyntaxError {
                position: 0,
                message: format!("Hint ({index}) in the linearization dictionary is invalid"),
            }),
        })
        .collect()
}

impl Linearization {
    /// Read the linearization dictionary at the current position of
    /// `source`, normally the start of the file.
    ///
    /// Returns `Ok(None)` when the file is not linearized or the dictionary
    /// is unusable. Only missing data is reported as an error.
    pub fn create<S: ByteSource>(mut source: S) -> ParseResult<Option<Self>> {
        let file_length = source.end()? - source.start();
        let mut parser = Parser::new(Lexer::with_options(source, ParseOptions::default()), false)?;
        match Self::read(&mut parser, file_length) {
            Ok(linearization) => Ok(linearization),
            Err(err) if err.is_missing_data() => Err(err),
            Err(err) => {
                parser.lexer_mut().diagnostics_mut().warn(
                    WarningKind::InvalidLinearization,
                    None,
                    format!("Ignoring linearization dictionary: {err}"),
                );
                Ok(None)
            }
        }
    }

    fn read<S: ByteSource>(
        parser: &mut Parser<S>,
        file_length: usize,
    ) -> ParseResult<Option<Self>> {
        let obj1 = parser.get_object(None)?;
        let obj2 = parser.get_object(None)?;
        let obj3 = parser.get_object(None)?;
        let dict = match (obj1, obj2, obj3, parser.get_object(None)?) {
            (PdfObject::Integer(_), PdfObject::Integer(_), keyword, PdfObject::Dictionary(dict))
                if keyword.is_command("obj") =>
            {
                dict
            }
            _ => return Ok(None),
        };
        match dict.get("Linearized").and_then(|obj| obj.as_real()) {
            Some(version) if version > 0.0 => {}
            _ => return Ok(None),
        }

        let length: usize = narrow(get_int(&dict, "L", false)?, "L")?;
        if length != file_length {
            return Err(ParseError::SyntaxError {
                position: 0,
                message: format!(
                    "The \"L\" parameter in the linearization dictionary ({length}) does not equal the file length ({file_length})"
                ),
            });
        }

        let linearization = Linearization {
            length,
            hints: get_hints(&dict)?,
            object_number_first: narrow(get_int(&dict, "O", false)?, "O")?,
            end_first: narrow(get_int(&dict, "E", false)?, "E")?,
            num_pages: narrow(get_int(&dict, "N", false)?, "N")?,
            main_xref_entries_offset: narrow(get_int(&dict, "T", false)?, "T")?,
            page_first: if dict.contains_key("P") {
                narrow(get_int(&dict, "P", true)?, "P")?
            } else {
                0
            },
        };
        tracing::debug!(?linearization, "found linearization dictionary");
        Ok(Some(linearization))
    }
}
