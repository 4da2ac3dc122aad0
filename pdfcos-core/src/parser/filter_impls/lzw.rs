//! LZWDecode filter implementation (ISO 32000-1:2008 Section 7.4.4)

use crate::parser::decode_stream::Codec;
use crate::parser::ParseResult;

const CLEAR_TABLE: usize = 256;
const EOD: usize = 257;
const MAX_ENTRIES: usize = 4096;
const INITIAL_SIZE: usize = 258;

#[derive(Debug)]
pub struct LzwCodec {
    early_change: bool,
}

impl LzwCodec {
    /// `early_change` mirrors the /EarlyChange parameter (default 1).
    pub fn new(early_change: bool) -> Self {
        Self { early_change }
    }
}

impl Default for LzwCodec {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Codec for LzwCodec {
    fn name(&self) -> &'static str {
        "LZWDecode"
    }

    fn decode(&mut self, input: Vec<u8>) -> ParseResult<Vec<u8>> {
        Ok(decode_lzw(&input, self.early_change))
    }
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    buffer: u32,
    bits: u32,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            buffer: 0,
            bits: 0,
        }
    }

    fn read(&mut self, n: u32) -> Option<usize> {
        while self.bits < n {
            let byte = *self.data.get(self.pos)?;
            self.pos += 1;
            self.buffer = (self.buffer << 8) | u32::from(byte);
            self.bits += 8;
        }
        self.bits -= n;
        let code = (self.buffer >> self.bits) & ((1 << n) - 1);
        self.buffer &= (1 << self.bits) - 1;
        Some(code as usize)
    }
}

struct Table {
    early_change: bool,
    entries: Vec<Vec<u8>>,
}

impl Table {
    fn new(early_change: bool) -> Self {
        let mut entries: Vec<Vec<u8>> = (0..=255u8).map(|b| vec![b]).collect();
        // Clear table and EOD don't have any data.
        entries.push(Vec::new());
        entries.push(Vec::new());
        Self {
            early_change,
            entries,
        }
    }

    fn clear(&mut self) {
        self.entries.truncate(INITIAL_SIZE);
    }

    fn register(&mut self, mut entry: Vec<u8>, byte: u8) {
        if self.entries.len() < MAX_ENTRIES {
            entry.push(byte);
            self.entries.push(entry);
        }
    }

    fn code_length(&self) -> u32 {
        let next = self.entries.len() + usize::from(self.early_change);
        match next {
            0..=511 => 9,
            512..=1023 => 10,
            1024..=2047 => 11,
            _ => 12,
        }
    }
}

/// Decode LZW data with variable code lengths of 9 to 12 bits.
pub fn decode_lzw(data: &[u8], early_change: bool) -> Vec<u8> {
    let mut table = Table::new(early_change);
    let mut reader = BitReader::new(data);
    let mut decoded = Vec::new();
    let mut prev: Option<Vec<u8>> = None;

    while let Some(code) = reader.read(table.code_length()) {
        match code {
            CLEAR_TABLE => {
                table.clear();
                prev = None;
            }
            EOD => return decoded,
            code => {
                let entry = if let Some(entry) = table.entries.get(code) {
                    entry.clone()
                } else if let (true, Some(prev)) = (code == table.entries.len(), prev.as_ref()) {
                    let mut entry = prev.clone();
                    entry.push(prev[0]);
                    entry
                } else {
                    tracing::warn!("Invalid LZW code {} with table size {}", code, table.entries.len());
                    return decoded;
                };
                if entry.is_empty() {
                    return decoded;
                }
                decoded.extend_from_slice(&entry);
                if let Some(prev) = prev.take() {
                    table.register(prev, entry[0]);
                }
                prev = Some(entry);
            }
        }
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;

    // Example from ISO 32000-1 Section 7.4.4.2
    const SPEC_SAMPLE: [u8; 9] = [0x80, 0x0B, 0x60, 0x50, 0x22, 0x0C, 0x0C, 0x85, 0x01];

    #[test]
    fn test_lzw_decode_sample() {
        assert_eq!(decode_lzw(&SPEC_SAMPLE, true), b"-----A---B");
    }

    #[test]
    fn test_codec_uses_early_change() {
        let mut codec = LzwCodec::default();
        assert_eq!(codec.decode(SPEC_SAMPLE.to_vec()).unwrap(), b"-----A---B");
        assert_eq!(codec.name(), "LZWDecode");
    }

    #[test]
    fn test_truncated_input_keeps_prefix() {
        let decoded = decode_lzw(&SPEC_SAMPLE[..5], true);
        assert!(b"-----A---B".starts_with(&decoded));
        assert!(!decoded.is_empty());
    }

    #[test]
    fn test_code_length_growth() {
        let mut table = Table::new(true);
        assert_eq!(table.code_length(), 9);
        while table.entries.len() < 511 {
            table.register(vec![0], 0);
        }
        assert_eq!(table.code_length(), 10);

        let mut late = Table::new(false);
        while late.entries.len() < 511 {
            late.register(vec![0], 0);
        }
        assert_eq!(late.code_length(), 9);
    }
}
