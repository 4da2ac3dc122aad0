//! Image filters (DCTDecode, JPXDecode, JBIG2Decode, CCITTFaxDecode)
//!
//! Image codecs are not decoded here: the encoded data is handed through
//! unchanged so a renderer can pick its own decoder. The codec checks the
//! container signature where there is one and logs what it found.

use crate::parser::decode_stream::Codec;
use crate::parser::filters::Filter;
use crate::parser::ParseResult;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JP2_SIGNATURE: [u8; 4] = [0x00, 0x00, 0x00, 0x0C];
const J2K_CODESTREAM: [u8; 2] = [0xFF, 0x4F];

#[derive(Debug)]
pub struct EncodedImageCodec {
    filter: Filter,
}

impl EncodedImageCodec {
    pub fn new(filter: Filter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }
}

/// Whether `data` starts like a payload of the given image filter. Filters
/// without a fixed signature always match.
pub fn has_expected_signature(filter: Filter, data: &[u8]) -> bool {
    match filter {
        Filter::DCTDecode => data.starts_with(&JPEG_SOI),
        Filter::JPXDecode => data.starts_with(&JP2_SIGNATURE) || data.starts_with(&J2K_CODESTREAM),
        _ => true,
    }
}

impl Codec for EncodedImageCodec {
    fn name(&self) -> &'static str {
        self.filter.name()
    }

    fn decode(&mut self, input: Vec<u8>) -> ParseResult<Vec<u8>> {
        if !has_expected_signature(self.filter, &input) {
            tracing::debug!(
                filter = self.filter.name(),
                len = input.len(),
                "image data does not start with the expected signature"
            );
        }
        Ok(input)
    }
}
