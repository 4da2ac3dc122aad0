//! FlateDecode filter implementation (ISO 32000-1:2008 Section 7.4.4)

use crate::parser::decode_stream::Codec;
use crate::parser::{ParseError, ParseResult};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;

#[derive(Debug, Default)]
pub struct FlateCodec;

impl Codec for FlateCodec {
    fn name(&self) -> &'static str {
        "FlateDecode"
    }

    fn decode(&mut self, input: Vec<u8>) -> ParseResult<Vec<u8>> {
        decode_flate(&input)
    }
}

/// Decode zlib data, falling back to a raw deflate stream when the zlib
/// header is missing. Output produced before a corrupt block is kept.
pub fn decode_flate(data: &[u8]) -> ParseResult<Vec<u8>> {
    let mut result = Vec::new();
    let zlib_err = match ZlibDecoder::new(data).read_to_end(&mut result) {
        Ok(_) => return Ok(result),
        Err(e) => e,
    };
    if !result.is_empty() {
        tracing::warn!("Flate stream truncated or corrupt: {}", zlib_err);
        return Ok(result);
    }

    let mut raw = Vec::new();
    match DeflateDecoder::new(data).read_to_end(&mut raw) {
        Ok(_) => Ok(raw),
        Err(_) if !raw.is_empty() => {
            tracing::warn!("Flate stream truncated or corrupt: {}", zlib_err);
            Ok(raw)
        }
        Err(_) => Err(ParseError::StreamDecodeError(format!(
            "Flate decode error: {zlib_err}"
        ))),
    }
}
