//! PDF stream filter implementations
//!
//! This module contains the codecs behind the filter chain, according to
//! ISO 32000-1:2008 Section 7.4. Each codec decodes a complete encoded
//! buffer and keeps whatever output it produced before hitting damaged data.

pub mod ascii85;
pub mod ascii_hex;
#[cfg(feature = "compression")]
pub mod flate;
pub mod image;
pub mod lzw;
pub mod predictor;
pub mod run_length;

pub use ascii85::Ascii85Codec;
pub use ascii_hex::AsciiHexCodec;
#[cfg(feature = "compression")]
pub use flate::FlateCodec;
pub use image::EncodedImageCodec;
pub use lzw::LzwCodec;
pub use predictor::{PredictorCodec, PredictorParams};
pub use run_length::RunLengthCodec;
