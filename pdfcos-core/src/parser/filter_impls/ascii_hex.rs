//! ASCIIHexDecode filter implementation (ISO 32000-1:2008 Section 7.4.2)

use crate::parser::decode_stream::Codec;
use crate::parser::ParseResult;

#[derive(Debug, Default)]
pub struct AsciiHexCodec;

impl Codec for AsciiHexCodec {
    fn name(&self) -> &'static str {
        "ASCIIHexDecode"
    }

    fn decode(&mut self, input: Vec<u8>) -> ParseResult<Vec<u8>> {
        Ok(decode_ascii_hex(&input))
    }
}

/// Decode hex digit pairs up to the `>` end marker. Characters that are not
/// hex digits are skipped and an odd final digit is padded with zero.
pub fn decode_ascii_hex(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;

    for &ch in data {
        if ch == b'>' {
            break;
        }
        let Some(value) = hex_digit_value(ch) else {
            continue;
        };
        match high.take() {
            Some(h) => result.push((h << 4) | value),
            None => high = Some(value),
        }
    }

    if let Some(h) = high {
        result.push(h << 4);
    }
    result
}

/// Get value of hex digit
fn hex_digit_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}
