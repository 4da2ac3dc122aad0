//! ASCII85Decode filter implementation (ISO 32000-1:2008 Section 7.4.3)

use crate::parser::decode_stream::Codec;
use crate::parser::ParseResult;

#[derive(Debug, Default)]
pub struct Ascii85Codec;

impl Codec for Ascii85Codec {
    fn name(&self) -> &'static str {
        "ASCII85Decode"
    }

    fn decode(&mut self, input: Vec<u8>) -> ParseResult<Vec<u8>> {
        Ok(decode_ascii85(&input))
    }
}

fn is_ascii85_whitespace(ch: u8) -> bool {
    matches!(ch, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

fn push_group(result: &mut Vec<u8>, group: &[u8]) {
    let mut padded = [b'u'; 5];
    padded[..group.len()].copy_from_slice(group);
    let value = padded
        .iter()
        .fold(0u32, |acc, &ch| acc.wrapping_mul(85).wrapping_add(u32::from(ch - b'!')));
    result.extend_from_slice(&value.to_be_bytes()[..group.len() - 1]);
}

/// Decode ASCII85 data up to the `~>` end marker.
///
/// Decoding stops at the first character outside the alphabet; the bytes
/// decoded so far are kept.
pub fn decode_ascii85(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() * 4 / 5);
    let mut group: Vec<u8> = Vec::with_capacity(5);
    let mut chars = data.iter().copied().filter(|&b| !is_ascii85_whitespace(b)).peekable();

    // Skip optional <~ prefix
    if chars.peek() == Some(&b'<') {
        let mut lookahead = chars.clone();
        lookahead.next();
        if lookahead.next() == Some(b'~') {
            chars = lookahead;
        }
    }

    for ch in chars {
        match ch {
            b'~' => break,
            b'z' if group.is_empty() => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group.push(ch);
                if group.len() == 5 {
                    push_group(&mut result, &group);
                    group.clear();
                }
            }
            _ => {
                tracing::warn!("Invalid ASCII85 character: {}", ch as char);
                break;
            }
        }
    }

    // A single trailing character carries no complete byte.
    if group.len() > 1 {
        push_group(&mut result, &group);
    }
    result
}
