//! Predictor functions for FlateDecode and LZWDecode (ISO 32000-1:2008 Section 7.4.4.4)
//!
//! Predictor 2 is the TIFF horizontal differencing predictor, 10 through 15
//! are the PNG filters where every row starts with its own filter type byte.

use crate::parser::decode_stream::Codec;
use crate::parser::objects::PdfDictionary;
use crate::parser::{ParseError, ParseResult};

/// Decode parameters relevant to prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    /// Read the parameters from a /DecodeParms dictionary.
    ///
    /// Returns `Ok(None)` when no prediction is needed and an error for
    /// predictor values that are not defined.
    pub fn from_dict(params: &PdfDictionary) -> ParseResult<Option<Self>> {
        let get = |key: &str, default: i64| {
            params.get(key).and_then(|obj| obj.as_integer()).unwrap_or(default)
        };
        let predictor = get("Predictor", 1);
        if predictor <= 1 {
            return Ok(None);
        }
        if predictor != 2 && !(10..=15).contains(&predictor) {
            return Err(ParseError::StreamDecodeError(format!(
                "Unsupported predictor: {predictor}"
            )));
        }
        let colors = get("Colors", 1);
        let bits = get("BitsPerComponent", 8);
        let columns = get("Columns", 1);
        if !(1..=32).contains(&colors) || ![1, 2, 4, 8, 16].contains(&bits) || columns < 1 {
            return Err(ParseError::StreamDecodeError(format!(
                "Invalid predictor parameters: Colors {colors}, BitsPerComponent {bits}, Columns {columns}"
            )));
        }
        Ok(Some(Self {
            predictor,
            colors: colors as usize,
            bits_per_component: bits as usize,
            columns: columns as usize,
        }))
    }

    /// Bytes of sample data per row, without the PNG tag byte.
    pub fn row_bytes(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    /// Bytes per complete pixel, at least one.
    pub fn pixel_bytes(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8)
    }
}

#[derive(Debug)]
pub struct PredictorCodec {
    params: PredictorParams,
}

impl PredictorCodec {
    pub fn new(params: PredictorParams) -> Self {
        Self { params }
    }
}

impl Codec for PredictorCodec {
    fn name(&self) -> &'static str {
        "Predictor"
    }

    fn decode(&mut self, input: Vec<u8>) -> ParseResult<Vec<u8>> {
        if self.params.predictor == 2 {
            Ok(decode_tiff(&input, &self.params))
        } else {
            decode_png(&input, &self.params)
        }
    }
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let p = i16::from(left) + i16::from(up) - i16::from(up_left);
    let pa = (p - i16::from(left)).abs();
    let pb = (p - i16::from(up)).abs();
    let pc = (p - i16::from(up_left)).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}

/// Undo PNG row filters. A truncated final row is decoded as far as it goes.
pub fn decode_png(data: &[u8], params: &PredictorParams) -> ParseResult<Vec<u8>> {
    let row_bytes = params.row_bytes();
    let pixel_bytes = params.pixel_bytes();
    let mut output = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];
    let mut row = vec![0u8; row_bytes];

    for chunk in data.chunks(row_bytes + 1) {
        let tag = chunk[0];
        let raw = &chunk[1..];
        let len = raw.len();
        match tag {
            0 => row[..len].copy_from_slice(raw),
            1 => {
                for i in 0..len {
                    let left = if i >= pixel_bytes { row[i - pixel_bytes] } else { 0 };
                    row[i] = raw[i].wrapping_add(left);
                }
            }
            2 => {
                for i in 0..len {
                    row[i] = raw[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                for i in 0..len {
                    let left = if i >= pixel_bytes { row[i - pixel_bytes] } else { 0 };
                    let avg = ((u16::from(left) + u16::from(prev_row[i])) / 2) as u8;
                    row[i] = raw[i].wrapping_add(avg);
                }
            }
            4 => {
                for i in 0..len {
                    let (left, up_left) = if i >= pixel_bytes {
                        (row[i - pixel_bytes], prev_row[i - pixel_bytes])
                    } else {
                        (0, 0)
                    };
                    row[i] = raw[i].wrapping_add(paeth(left, prev_row[i], up_left));
                }
            }
            other => {
                return Err(ParseError::StreamDecodeError(format!(
                    "Unsupported predictor: PNG row type {other}"
                )));
            }
        }
        output.extend_from_slice(&row[..len]);
        std::mem::swap(&mut prev_row, &mut row);
    }
    Ok(output)
}

/// Undo TIFF predictor 2: every sample is stored as a difference from the
/// sample of the same component to its left.
pub fn decode_tiff(data: &[u8], params: &PredictorParams) -> Vec<u8> {
    let row_bytes = params.row_bytes();
    let colors = params.colors;
    let bits = params.bits_per_component;
    let mut output = Vec::with_capacity(data.len());

    for raw in data.chunks(row_bytes) {
        let start = output.len();
        match bits {
            8 => {
                output.extend_from_slice(raw);
                for i in colors..raw.len() {
                    output[start + i] = output[start + i].wrapping_add(output[start + i - colors]);
                }
            }
            16 => {
                output.extend_from_slice(raw);
                let sample_bytes = 2 * colors;
                let mut i = sample_bytes;
                while i + 1 < raw.len() {
                    let left = u16::from_be_bytes([
                        output[start + i - sample_bytes],
                        output[start + i - sample_bytes + 1],
                    ]);
                    let value = u16::from_be_bytes([raw[i], raw[i + 1]]).wrapping_add(left);
                    output[start + i..start + i + 2].copy_from_slice(&value.to_be_bytes());
                    i += 2;
                }
            }
            _ => decode_tiff_packed(raw, params, &mut output),
        }
    }
    output
}

fn decode_tiff_packed(raw: &[u8], params: &PredictorParams, output: &mut Vec<u8>) {
    let bits = params.bits_per_component;
    let mask = (1u32 << bits) - 1;
    let mut components = vec![0u32; params.colors];
    let mut in_buf = 0u32;
    let mut in_bits = 0usize;
    let mut out_buf = 0u32;
    let mut out_bits = 0usize;
    let mut input = raw.iter();

    'row: for _ in 0..params.columns {
        for component in components.iter_mut() {
            if in_bits < bits {
                let Some(&byte) = input.next() else {
                    break 'row;
                };
                in_buf = (in_buf << 8) | u32::from(byte);
                in_bits += 8;
            }
            *component = (*component + (in_buf >> (in_bits - bits))) & mask;
            in_bits -= bits;
            in_buf &= (1 << in_bits) - 1;
            out_buf = (out_buf << bits) | *component;
            out_bits += bits;
            if out_bits >= 8 {
                output.push((out_buf >> (out_bits - 8)) as u8);
                out_bits -= 8;
                out_buf &= (1 << out_bits) - 1;
            }
        }
    }
    if out_bits > 0 {
        output.push((out_buf << (8 - out_bits)) as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::objects::PdfObject;

    fn params(predictor: i64, colors: usize, bits: usize, columns: usize) -> PredictorParams {
        PredictorParams {
            predictor,
            colors,
            bits_per_component: bits,
            columns,
        }
    }

    #[test]
    fn test_from_dict() {
        let mut dict = PdfDictionary::new();
        assert_eq!(PredictorParams::from_dict(&dict).unwrap(), None);

        dict.insert("Predictor", PdfObject::Integer(12));
        dict.insert("Columns", PdfObject::Integer(4));
        let parsed = PredictorParams::from_dict(&dict).unwrap().unwrap();
        assert_eq!(parsed, params(12, 1, 8, 4));
        assert_eq!(parsed.row_bytes(), 4);

        dict.insert("Predictor", PdfObject::Integer(7));
        assert!(PredictorParams::from_dict(&dict).is_err());
    }

    #[test]
    fn test_png_none_and_sub() {
        let p = params(15, 1, 8, 3);
        let data = [0, 1, 2, 3, 1, 1, 1, 1];
        assert_eq!(decode_png(&data, &p).unwrap(), vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_png_up() {
        let p = params(12, 1, 8, 2);
        let data = [2, 5, 6, 2, 1, 1, 2, 1, 1];
        assert_eq!(decode_png(&data, &p).unwrap(), vec![5, 6, 6, 7, 7, 8]);
    }

    #[test]
    fn test_png_average_and_paeth() {
        let p = params(15, 1, 8, 2);
        // Row 1: none [10, 20]; row 2: average; row 3: paeth
        let data = [0, 10, 20, 3, 5, 5, 4, 1, 1];
        let decoded = decode_png(&data, &p).unwrap();
        // average: 5 + (0 + 10) / 2 = 10, 5 + (10 + 20) / 2 = 20
        assert_eq!(&decoded[..4], &[10, 20, 10, 20]);
        // paeth picks up (10, then 20) for both bytes
        assert_eq!(&decoded[4..], &[11, 21]);
    }

    #[test]
    fn test_png_rgb_pixel_stride() {
        let p = params(11, 3, 8, 2);
        let data = [1, 10, 20, 30, 1, 2, 3];
        assert_eq!(decode_png(&data, &p).unwrap(), vec![10, 20, 30, 11, 22, 33]);
    }

    #[test]
    fn test_png_bad_row_type() {
        let p = params(10, 1, 8, 1);
        assert!(decode_png(&[9, 1], &p).is_err());
    }

    #[test]
    fn test_png_truncated_row() {
        let p = params(12, 1, 8, 4);
        assert_eq!(decode_png(&[0, 1, 2, 3, 4, 2, 1], &p).unwrap(), vec![1, 2, 3, 4, 2]);
    }

    #[test]
    fn test_tiff_8_bit() {
        let p = params(2, 1, 8, 4);
        assert_eq!(decode_tiff(&[1, 1, 1, 1, 5, 0, 0, 0], &p), vec![1, 2, 3, 4, 5, 5, 5, 5]);

        let rgb = params(2, 3, 8, 2);
        assert_eq!(decode_tiff(&[1, 2, 3, 1, 1, 1], &rgb), vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_tiff_16_bit() {
        let p = params(2, 1, 16, 2);
        assert_eq!(decode_tiff(&[0x01, 0x00, 0x00, 0x02], &p), vec![0x01, 0x00, 0x01, 0x02]);
    }

    #[test]
    fn test_tiff_packed_bits() {
        // 4-bit samples: 1, +1, +1, +1 -> 1, 2, 3, 4
        let p = params(2, 1, 4, 4);
        assert_eq!(decode_tiff(&[0x11, 0x11], &p), vec![0x12, 0x34]);
    }
}
