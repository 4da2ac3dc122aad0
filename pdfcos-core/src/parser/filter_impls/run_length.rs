//! RunLengthDecode filter implementation (ISO 32000-1:2008 Section 7.4.5)

use crate::parser::decode_stream::Codec;
use crate::parser::ParseResult;

const EOD: u8 = 128;

#[derive(Debug, Default)]
pub struct RunLengthCodec;

impl Codec for RunLengthCodec {
    fn name(&self) -> &'static str {
        "RunLengthDecode"
    }

    fn decode(&mut self, input: Vec<u8>) -> ParseResult<Vec<u8>> {
        Ok(decode_run_length(&input))
    }
}

pub fn decode_run_length(data: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(data.len());
    let mut pos = 0;

    while let Some(&length) = data.get(pos) {
        pos += 1;
        match length {
            EOD => return decoded,
            0..=127 => {
                let count = length as usize + 1;
                let end = (pos + count).min(data.len());
                decoded.extend_from_slice(&data[pos..end]);
                if end - pos < count {
                    tracing::warn!("run-length decode stream ended prematurely");
                    return decoded;
                }
                pos = end;
            }
            _ => {
                let Some(&byte) = data.get(pos) else {
                    tracing::warn!("run-length decode stream ended prematurely");
                    return decoded;
                };
                pos += 1;
                decoded.extend(std::iter::repeat(byte).take(257 - length as usize));
            }
        }
    }
    decoded
}
