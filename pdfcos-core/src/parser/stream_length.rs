//! Stream length recovery
//!
//! The declared /Length of a stream is trusted when the `endstream` keyword
//! follows it. Otherwise the payload is scanned for the keyword, first in
//! full and then, for producers that write `endstrea`, truncated by one
//! byte.

use super::diagnostics::WarningKind;
use super::lexer::{is_whitespace, Lexer, Token};
use super::objects::PdfObject;
use super::source::ByteSource;
use super::{ParseError, ParseResult};

/// Bytes examined per scan window
pub const SCAN_BLOCK_SIZE: usize = 2048;

/// The stream terminator keyword
pub const ENDSTREAM: &[u8] = b"endstream";

/// How many trailing bytes of [`ENDSTREAM`] may be missing
pub const MAX_TRUNCATION: usize = 1;

/// Determine the payload length of the stream whose data starts at `start`.
///
/// On success the lexer has consumed the terminating keyword. `declared` is
/// the raw /Length entry; references and other non-integers are not
/// followed and take the scanning path.
pub fn find_stream_length<S: ByteSource>(
    lexer: &mut Lexer<S>,
    start: usize,
    declared: Option<&PdfObject>,
) -> ParseResult<usize> {
    let declared_length = match declared {
        Some(PdfObject::Integer(n)) if *n >= 0 => Some(*n as usize),
        other => {
            let shown = other.map_or_else(|| "missing".to_string(), |obj| obj.to_string());
            lexer.diagnostics_mut().info(
                WarningKind::BadStreamLength,
                Some(start),
                format!("Bad length \"{shown}\" in stream"),
            );
            None
        }
    };

    if let Some(length) = declared_length.filter(|&n| n > 0) {
        lexer.set_position(start.saturating_add(length));
        match lexer.next_token() {
            Ok(token) if token.is_command("endstream") => return Ok(length),
            Ok(_) => {}
            Err(err) if err.is_missing_data() => return Err(err),
            Err(err) => tracing::debug!("token after declared stream end: {err}"),
        }
    }

    let (offset, keyword_len) = match scan_for_signature(lexer.source_mut(), start, ENDSTREAM)? {
        Some(offset) => (offset, ENDSTREAM.len()),
        None => find_truncated(lexer, start)?.ok_or(ParseError::MissingEndstream { position: start })?,
    };
    let length = trim_eol(lexer.source_mut(), start, offset)?;
    tracing::debug!(start, offset, keyword_len, length, "recovered stream length");

    if let Some(declared) = declared_length {
        if declared != length {
            lexer.diagnostics_mut().warn(
                WarningKind::StreamLengthMismatch,
                Some(start),
                format!("Stream length mismatch: declared {declared}, found {length}"),
            );
        }
    }

    lexer.set_position(start + offset);
    match lexer.next_token()? {
        Token::Command(_) => Ok(length),
        other => Err(ParseError::UnexpectedToken {
            expected: "endstream".to_string(),
            found: format!("{other:?}"),
        }),
    }
}

/// Retry the scan with shortened keywords. A match only counts when a
/// whitespace byte follows it.
fn find_truncated<S: ByteSource>(
    lexer: &mut Lexer<S>,
    start: usize,
) -> ParseResult<Option<(usize, usize)>> {
    for i in 1..=MAX_TRUNCATION {
        let signature = &ENDSTREAM[..ENDSTREAM.len() - i];
        let source = lexer.source_mut();
        let Some(offset) = scan_for_signature(source, start, signature)? else {
            continue;
        };
        source.set_pos(start + offset + signature.len());
        let following = source.peek_byte()?;
        if !following.is_some_and(is_whitespace) {
            break;
        }
        lexer.diagnostics_mut().info(
            WarningKind::TruncatedEndstream,
            Some(start + offset),
            format!(
                "Found \"{}\" when searching for endstream command",
                String::from_utf8_lossy(signature)
            ),
        );
        return Ok(Some((offset, signature.len())));
    }
    Ok(None)
}

/// Offset of the first occurrence of `signature` at or after `start`,
/// relative to `start`. The source is read in bounded windows.
pub fn scan_for_signature<S: ByteSource + ?Sized>(
    source: &mut S,
    start: usize,
    signature: &[u8],
) -> ParseResult<Option<usize>> {
    let end = source.end()?;
    let mut pos = start;
    while pos < end {
        source.set_pos(pos);
        let window = source.peek_bytes(SCAN_BLOCK_SIZE)?;
        if window.len() < signature.len() {
            break;
        }
        if let Some(i) = window.windows(signature.len()).position(|w| w == signature) {
            return Ok(Some(pos + i - start));
        }
        if window.len() < SCAN_BLOCK_SIZE {
            break;
        }
        pos += window.len() - signature.len() + 1;
    }
    Ok(None)
}

/// Drop the end-of-line marker that separates the data from the keyword.
fn trim_eol<S: ByteSource + ?Sized>(
    source: &mut S,
    start: usize,
    offset: usize,
) -> ParseResult<usize> {
    let tail_start = start + offset.saturating_sub(2);
    source.set_pos(tail_start);
    let tail = source.get_bytes(Some(start + offset - tail_start))?;
    let eol = match tail.as_slice() {
        [.., b'\r', b'\n'] => 2,
        [.., b'\n'] | [.., b'\r'] => 1,
        _ => 0,
    };
    Ok(offset - eol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::source::MemoryStream;
    use crate::parser::ParseOptions;

    fn lexer_at(input: &[u8]) -> (Lexer<MemoryStream>, usize) {
        let start = input
            .windows(7)
            .position(|w| w == b"stream\n")
            .map(|p| p + 7)
            .unwrap_or(0);
        let lexer = Lexer::with_options(
            MemoryStream::new(input.to_vec()),
            ParseOptions::default().with_warnings(),
        );
        (lexer, start)
    }

    #[test]
    fn test_trusted_length() {
        let (mut lexer, start) = lexer_at(b"stream\nHello\nendstream endobj");
        let length = find_stream_length(&mut lexer, start, Some(&PdfObject::Integer(5))).unwrap();
        assert_eq!(length, 5);
        assert!(lexer.warnings().is_empty());
        assert!(lexer.next_token().unwrap().is_command("endobj"));
    }

    #[test]
    fn test_length_too_large() {
        let (mut lexer, start) = lexer_at(b"stream\nHello\nendstream endobj");
        let length = find_stream_length(&mut lexer, start, Some(&PdfObject::Integer(50))).unwrap();
        assert_eq!(length, 5);
        assert_eq!(lexer.diagnostics().count(WarningKind::StreamLengthMismatch), 1);
        assert!(lexer.next_token().unwrap().is_command("endobj"));
    }

    #[test]
    fn test_length_too_small() {
        let (mut lexer, start) = lexer_at(b"stream\nHello world\r\nendstream");
        let length = find_stream_length(&mut lexer, start, Some(&PdfObject::Integer(3))).unwrap();
        assert_eq!(length, 11);
    }

    #[test]
    fn test_reference_length_is_scanned() {
        let (mut lexer, start) = lexer_at(b"stream\nabc\nendstream");
        let declared = PdfObject::Reference(crate::parser::ObjectRef::new(9, 0));
        assert_eq!(find_stream_length(&mut lexer, start, Some(&declared)).unwrap(), 3);
        assert_eq!(lexer.diagnostics().count(WarningKind::BadStreamLength), 1);
    }

    #[test]
    fn test_empty_stream_with_zero_length() {
        let (mut lexer, start) = lexer_at(b"stream\nendstream");
        assert_eq!(find_stream_length(&mut lexer, start, Some(&PdfObject::Integer(0))).unwrap(), 0);
        assert!(lexer.warnings().is_empty());
    }

    #[test]
    fn test_truncated_keyword() {
        let (mut lexer, start) = lexer_at(b"stream\nabc\nendstrea\nendobj");
        assert_eq!(find_stream_length(&mut lexer, start, None).unwrap(), 3);
        assert_eq!(lexer.diagnostics().count(WarningKind::TruncatedEndstream), 1);
        assert!(lexer.next_token().unwrap().is_command("endobj"));
    }

    #[test]
    fn test_truncated_keyword_needs_whitespace() {
        let (mut lexer, start) = lexer_at(b"stream\nabc endstreaX");
        assert_eq!(
            find_stream_length(&mut lexer, start, None),
            Err(ParseError::MissingEndstream { position: start })
        );
    }

    #[test]
    fn test_missing_endstream() {
        let (mut lexer, start) = lexer_at(b"stream\nno terminator here");
        assert!(matches!(
            find_stream_length(&mut lexer, start, Some(&PdfObject::Integer(4))),
            Err(ParseError::MissingEndstream { .. })
        ));
    }

    #[test]
    fn test_scan_across_window_boundary() {
        for pad in [SCAN_BLOCK_SIZE - 9, SCAN_BLOCK_SIZE - 4, SCAN_BLOCK_SIZE, 3 * SCAN_BLOCK_SIZE] {
            let mut data = vec![b'x'; pad];
            data.extend_from_slice(b"endstream");
            let mut source = MemoryStream::new(data);
            assert_eq!(
                scan_for_signature(&mut source, 0, ENDSTREAM).unwrap(),
                Some(pad),
                "padding {pad}"
            );
        }
    }
}
