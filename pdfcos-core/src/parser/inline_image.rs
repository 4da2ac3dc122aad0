//! Inline image boundaries
//!
//! The data of an inline image (`BI <dict> ID <data> EI`) has no declared
//! length, and `EI` may occur by chance inside binary data. Each detector
//! below starts at the first data byte, returns the payload length and
//! leaves the source just past the terminating `EI`.

use super::diagnostics::{Diagnostics, WarningKind};
use super::filters::Filter;
use super::objects::{PdfDictionary, PdfName, PdfObject};
use super::resolver::XRefResolver;
use super::source::ByteSource;
use super::ParseResult;
use std::collections::HashSet;

/// Inline images shorter than this are fingerprinted and cached.
pub const MAX_LENGTH_TO_CACHE: usize = 1000;

/// Bytes after a candidate `EI` that must look like content stream syntax
const TRAILER_PEEK_LENGTH: usize = 10;

fn is_space(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\r' | b'\n')
}

/// The first filter of an inline image dictionary, looked up under /F
/// and then /Filter.
pub fn filter_name(
    dict: &PdfDictionary,
    resolver: &dyn XRefResolver,
) -> ParseResult<Option<PdfName>> {
    let Some(entry) = dict.get2("F", "Filter") else {
        return Ok(None);
    };
    Ok(match resolver.fetch_if_ref(entry)? {
        PdfObject::Name(name) => Some(name),
        PdfObject::Array(array) => match array.get(0) {
            Some(first) => match resolver.fetch_if_ref(first)? {
                PdfObject::Name(name) => Some(name),
                _ => None,
            },
            None => None,
        },
        _ => None,
    })
}

/// Locate the end of the payload with the detector matching `filter`.
pub fn find_inline_stream_end<S: ByteSource + ?Sized>(
    source: &mut S,
    filter: Option<&str>,
    known_commands: Option<&HashSet<&str>>,
    diagnostics: &mut Diagnostics,
) -> ParseResult<usize> {
    match filter.and_then(Filter::from_name) {
        Some(Filter::DCTDecode) => find_dct_end(source, known_commands, diagnostics),
        Some(Filter::ASCII85Decode) => find_ascii85_end(source, known_commands, diagnostics),
        Some(Filter::ASCIIHexDecode) => find_ascii_hex_end(source, known_commands, diagnostics),
        _ => find_default_end(source, known_commands, diagnostics),
    }
}

/// Whether the bytes after `EI` plausibly continue a content stream. A
/// single NUL is tolerated, runs of NUL are not.
fn is_plausible_trailer(bytes: &[u8]) -> bool {
    bytes.iter().enumerate().all(|(i, &ch)| {
        (ch == 0 && bytes.get(i + 1) != Some(&0))
            || ch == b'\n'
            || ch == b'\r'
            || (0x20..=0x7f).contains(&ch)
    })
}

/// The regular-character word at the source position, after whitespace.
fn peek_word<S: ByteSource + ?Sized>(source: &mut S) -> ParseResult<Vec<u8>> {
    let bytes = source.peek_bytes(TRAILER_PEEK_LENGTH + super::lexer::MAX_COMMAND_LENGTH)?;
    Ok(bytes
        .iter()
        .copied()
        .skip_while(|&ch| is_space(ch))
        .take_while(|&ch| {
            !is_space(ch) && !b"%()/<>[]{}".contains(&ch) && ch != 0 && ch != 0x0C
        })
        .collect())
}

/// Scan for `EI` followed by a space or EOL and plausible trailing syntax.
///
/// When the data runs out the last rejected candidate is used instead.
pub fn find_default_end<S: ByteSource + ?Sized>(
    source: &mut S,
    known_commands: Option<&HashSet<&str>>,
    diagnostics: &mut Diagnostics,
) -> ParseResult<usize> {
    let start = source.pos();
    let mut state = 0u8;
    let mut maybe_ei_pos = None;
    let mut found = false;

    while let Some(ch) = source.get_byte()? {
        match state {
            0 => state = u8::from(ch == b'E'),
            1 => state = if ch == b'I' { 2 } else { 0 },
            _ => {
                if !matches!(ch, b' ' | b'\n' | b'\r') {
                    state = 0;
                    continue;
                }
                maybe_ei_pos = Some(source.pos());
                let following = source.peek_bytes(TRAILER_PEEK_LENGTH)?;
                if !is_plausible_trailer(&following) {
                    state = 0;
                    continue;
                }
                // `EI` inside the data is usually followed by garbage rather
                // than by an operator.
                if let Some(known) = known_commands {
                    let word = peek_word(source)?;
                    let starts_command = word
                        .first()
                        .is_some_and(|c| !c.is_ascii_digit() && !b"+-.".contains(c));
                    if starts_command
                        && !known.contains(&*String::from_utf8_lossy(&word))
                    {
                        state = 0;
                        continue;
                    }
                }
                found = true;
                break;
            }
        }
    }

    if !found {
        diagnostics.warn(
            WarningKind::InlineImageEnd,
            Some(start),
            "Reached the end of the stream without finding a valid EI marker",
        );
        if let Some(pos) = maybe_ei_pos {
            diagnostics.warn(
                WarningKind::InlineImageEnd,
                Some(pos),
                "Using the last \"EI\" marker found",
            );
            source.set_pos(pos);
        }
    }

    // Data written directly against `EI` has no separator to drop.
    let pos = source.pos();
    let mut end_offset = 4;
    source.set_pos(pos.saturating_sub(end_offset));
    let before = source.peek_byte()?;
    source.set_pos(pos);
    if !before.is_some_and(is_space) {
        end_offset -= 1;
    }
    Ok(pos.saturating_sub(end_offset).saturating_sub(start))
}

/// Walk JPEG marker segments up to the EOI marker.
pub fn find_dct_end<S: ByteSource + ?Sized>(
    source: &mut S,
    known_commands: Option<&HashSet<&str>>,
    diagnostics: &mut Diagnostics,
) -> ParseResult<usize> {
    let start = source.pos();
    let mut found_eoi = false;

    while let Some(byte) = source.get_byte()? {
        if byte != 0xFF {
            continue;
        }
        match source.get_byte()? {
            // Byte stuffing
            Some(0x00) => {}
            // Fill bytes: the next 0xFF may start a real marker.
            Some(0xFF) => source.skip(-1),
            Some(0xD9) => found_eoi = true,
            // SOFn, DHT, DAC, SOS, DQT, DNL, DRI, DHP, EXP, APPn and COM
            // carry a segment length.
            Some(0xC0..=0xC7 | 0xC9..=0xCF | 0xDA..=0xDF | 0xE0..=0xEF | 0xFE) => {
                match source.get_u16()? {
                    Some(length) if length > 2 => source.skip(length as isize - 2),
                    _ => source.skip(-2),
                }
            }
            _ => {}
        }
        if found_eoi {
            break;
        }
    }

    if !found_eoi {
        diagnostics.warn(
            WarningKind::InlineImageEnd,
            Some(start),
            "Inline DCTDecode image stream: EOI marker not found, searching for /EI/ instead",
        );
        source.set_pos(start);
        return find_default_end(source, known_commands, diagnostics);
    }
    let length = source.pos() - start;
    skip_ei(source)?;
    Ok(length)
}

/// Scan for the ASCII85 end-of-data marker `~>`.
pub fn find_ascii85_end<S: ByteSource + ?Sized>(
    source: &mut S,
    known_commands: Option<&HashSet<&str>>,
    diagnostics: &mut Diagnostics,
) -> ParseResult<usize> {
    let start = source.pos();
    let mut found = false;

    while let Some(ch) = source.get_byte()? {
        if ch != b'~' {
            continue;
        }
        let tilde_pos = source.pos();
        let mut next = source.peek_byte()?;
        while next.is_some_and(is_space) {
            source.skip(1);
            next = source.peek_byte()?;
        }
        if next == Some(b'>') {
            source.skip(1);
            found = true;
            break;
        }
        // Some producers drop the '>' and go straight to EI.
        if source.pos() > tilde_pos && source.peek_bytes(2)? == b"EI" {
            found = true;
            break;
        }
    }

    if !found {
        diagnostics.warn(
            WarningKind::InlineImageEnd,
            Some(start),
            "Inline ASCII85Decode image stream: EOD marker not found, searching for /EI/ instead",
        );
        source.set_pos(start);
        return find_default_end(source, known_commands, diagnostics);
    }
    let length = source.pos() - start;
    skip_ei(source)?;
    Ok(length)
}

/// Scan for the ASCIIHex end-of-data marker `>`.
pub fn find_ascii_hex_end<S: ByteSource + ?Sized>(
    source: &mut S,
    known_commands: Option<&HashSet<&str>>,
    diagnostics: &mut Diagnostics,
) -> ParseResult<usize> {
    let start = source.pos();
    let mut found = false;
    while let Some(ch) = source.get_byte()? {
        if ch == b'>' {
            found = true;
            break;
        }
    }

    if !found {
        diagnostics.warn(
            WarningKind::InlineImageEnd,
            Some(start),
            "Inline ASCIIHexDecode image stream: EOD marker not found, searching for /EI/ instead",
        );
        source.set_pos(start);
        return find_default_end(source, known_commands, diagnostics);
    }
    let length = source.pos() - start;
    skip_ei(source)?;
    Ok(length)
}

/// Consume everything up to and including `EI` and the byte after it.
pub fn skip_ei<S: ByteSource + ?Sized>(source: &mut S) -> ParseResult<()> {
    let mut state = 0u8;
    while let Some(ch) = source.get_byte()? {
        match state {
            0 => state = u8::from(ch == b'E'),
            1 => state = if ch == b'I' { 2 } else { 0 },
            _ => break,
        }
    }
    Ok(())
}

/// Adler-32 checksum, used to fingerprint small inline images.
pub fn adler32(bytes: &[u8]) -> u32 {
    const MOD_ADLER: u32 = 65521;
    let (mut a, mut b) = (1u32, 0u32);
    for &byte in bytes {
        a = (a + u32::from(byte)) % MOD_ADLER;
        b = (b + a) % MOD_ADLER;
    }
    (b << 16) | a
}
