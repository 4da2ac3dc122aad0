//! PDF Stream Filters
//!
//! Builds the decode pipeline for a stream according to ISO 32000-1 Section
//! 7.4. Each entry of /Filter becomes one lazily evaluated
//! [`DecodeStream`] stage wrapped around the previous one, paired
//! positionally with its /DecodeParms entry.

use super::decode_stream::{Codec, DecodeStream};
use super::diagnostics::{Diagnostics, WarningKind};
use super::filter_impls::{
    Ascii85Codec, AsciiHexCodec, EncodedImageCodec, LzwCodec, PredictorCodec, PredictorParams,
    RunLengthCodec,
};
use super::objects::{PdfDictionary, PdfObject};
use super::resolver::XRefResolver;
use super::source::{ByteSource, NullStream};
use super::{ParseError, ParseResult};

/// Supported PDF filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// ASCII hex decode
    ASCIIHexDecode,

    /// ASCII 85 decode
    ASCII85Decode,

    /// LZW decode
    LZWDecode,

    /// Flate decode (zlib/deflate compression)
    FlateDecode,

    /// Run length decode
    RunLengthDecode,

    /// CCITT fax decode
    CCITTFaxDecode,

    /// JBIG2 decode
    JBIG2Decode,

    /// DCT decode (JPEG)
    DCTDecode,

    /// JPX decode (JPEG 2000)
    JPXDecode,

    /// Crypt filter
    Crypt,
}

impl Filter {
    /// Parse filter from its full or abbreviated name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "LZWDecode" | "LZW" => Some(Filter::LZWDecode),
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "RunLengthDecode" | "RL" => Some(Filter::RunLengthDecode),
            "CCITTFaxDecode" | "CCF" => Some(Filter::CCITTFaxDecode),
            "JBIG2Decode" => Some(Filter::JBIG2Decode),
            "DCTDecode" | "DCT" => Some(Filter::DCTDecode),
            "JPXDecode" | "JPX" => Some(Filter::JPXDecode),
            "Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }

    /// Full filter name
    pub fn name(&self) -> &'static str {
        match self {
            Filter::ASCIIHexDecode => "ASCIIHexDecode",
            Filter::ASCII85Decode => "ASCII85Decode",
            Filter::LZWDecode => "LZWDecode",
            Filter::FlateDecode => "FlateDecode",
            Filter::RunLengthDecode => "RunLengthDecode",
            Filter::CCITTFaxDecode => "CCITTFaxDecode",
            Filter::JBIG2Decode => "JBIG2Decode",
            Filter::DCTDecode => "DCTDecode",
            Filter::JPXDecode => "JPXDecode",
            Filter::Crypt => "Crypt",
        }
    }

    /// Image filters produce encoded image data rather than plain bytes
    pub fn is_image(&self) -> bool {
        matches!(
            self,
            Filter::CCITTFaxDecode | Filter::JBIG2Decode | Filter::DCTDecode | Filter::JPXDecode
        )
    }
}

/// Creates the codec for one filter stage.
pub trait CodecProvider {
    /// `Ok(None)` means the filter is not supported; the stage is skipped
    /// and its input is passed on unchanged.
    fn create(
        &self,
        filter: Filter,
        params: Option<&PdfDictionary>,
    ) -> ParseResult<Option<Box<dyn Codec>>>;
}

/// The codecs shipped with this crate. Image filters are passed through.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCodecs;

impl CodecProvider for BuiltinCodecs {
    fn create(
        &self,
        filter: Filter,
        params: Option<&PdfDictionary>,
    ) -> ParseResult<Option<Box<dyn Codec>>> {
        let codec: Box<dyn Codec> = match filter {
            Filter::ASCIIHexDecode => Box::new(AsciiHexCodec),
            Filter::ASCII85Decode => Box::new(Ascii85Codec),
            Filter::RunLengthDecode => Box::new(RunLengthCodec),
            Filter::LZWDecode => {
                let early_change = params
                    .and_then(|p| p.get("EarlyChange"))
                    .and_then(|obj| obj.as_integer())
                    .unwrap_or(1);
                Box::new(LzwCodec::new(early_change != 0))
            }
            #[cfg(feature = "compression")]
            Filter::FlateDecode => Box::new(super::filter_impls::FlateCodec),
            #[cfg(not(feature = "compression"))]
            Filter::FlateDecode => return Ok(None),
            Filter::CCITTFaxDecode
            | Filter::JBIG2Decode
            | Filter::DCTDecode
            | Filter::JPXDecode => Box::new(EncodedImageCodec::new(filter)),
            Filter::Crypt => return Ok(None),
        };
        Ok(Some(codec))
    }
}

fn as_params(obj: PdfObject) -> Option<PdfDictionary> {
    match obj {
        PdfObject::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

/// Assembles decode pipelines for stream dictionaries.
pub struct FilterChainBuilder<'a> {
    resolver: &'a dyn XRefResolver,
    codecs: &'a dyn CodecProvider,
}

impl<'a> FilterChainBuilder<'a> {
    pub fn new(resolver: &'a dyn XRefResolver, codecs: &'a dyn CodecProvider) -> Self {
        Self { resolver, codecs }
    }

    /// Wrap `source` in one stage per entry of the dictionary's /Filter.
    ///
    /// `length` is the encoded payload length; only the first stage knows
    /// its input length. A filter entry that is not a name fails the whole
    /// stream with [`ParseError::BadFilterName`].
    pub fn build(
        &self,
        source: Box<dyn ByteSource>,
        dict: &PdfDictionary,
        length: usize,
        diagnostics: &mut Diagnostics,
    ) -> ParseResult<Box<dyn ByteSource>> {
        let filter = match dict.get2("Filter", "F") {
            Some(obj) => self.resolver.fetch_if_ref(obj)?,
            None => return Ok(source),
        };
        let params = match dict.get2("DecodeParms", "DP") {
            Some(obj) => self.resolver.fetch_if_ref(obj)?,
            None => PdfObject::Null,
        };

        match filter {
            PdfObject::Name(name) => {
                let params = match params {
                    PdfObject::Array(array) => {
                        tracing::warn!("/DecodeParms should not be an Array, when /Filter is a Name");
                        match array.get(0) {
                            Some(first) => as_params(self.resolver.fetch_if_ref(first)?),
                            None => None,
                        }
                    }
                    other => as_params(other),
                };
                self.make_filter(source, name.as_str(), Some(length), params.as_ref(), diagnostics)
            }
            PdfObject::Array(filters) => {
                let params_array = match params {
                    PdfObject::Array(array) => Some(array),
                    _ => None,
                };
                let mut stream = source;
                let mut maybe_length = Some(length);
                for (i, entry) in filters.iter().enumerate() {
                    let name = match self.resolver.fetch_if_ref(entry)? {
                        PdfObject::Name(name) => name,
                        other => return Err(ParseError::BadFilterName(other.to_string())),
                    };
                    let stage_params = match params_array.as_ref().and_then(|a| a.get(i)) {
                        Some(obj) => as_params(self.resolver.fetch_if_ref(obj)?),
                        None => None,
                    };
                    stream = self.make_filter(
                        stream,
                        name.as_str(),
                        maybe_length,
                        stage_params.as_ref(),
                        diagnostics,
                    )?;
                    maybe_length = None;
                }
                Ok(stream)
            }
            _ => Ok(source),
        }
    }

    /// Build a single stage. Problems that only affect this stream are
    /// reported as warnings and yield an empty source.
    pub fn make_filter(
        &self,
        source: Box<dyn ByteSource>,
        name: &str,
        maybe_length: Option<usize>,
        params: Option<&PdfDictionary>,
        diagnostics: &mut Diagnostics,
    ) -> ParseResult<Box<dyn ByteSource>> {
        if maybe_length == Some(0) {
            diagnostics.warn(
                WarningKind::EmptyStream,
                None,
                format!("Empty \"{name}\" stream"),
            );
            return Ok(Box::new(NullStream));
        }

        let unsupported = |diagnostics: &mut Diagnostics| {
            diagnostics.warn(
                WarningKind::UnsupportedFilter,
                None,
                format!("Filter \"{name}\" is not supported"),
            );
        };
        let Some(filter) = Filter::from_name(name) else {
            unsupported(diagnostics);
            return Ok(source);
        };

        let invalid = |diagnostics: &mut Diagnostics, err: ParseError| {
            diagnostics.warn(
                WarningKind::InvalidStream,
                None,
                format!("Invalid stream: \"{err}\""),
            );
        };
        let codec = match self.codecs.create(filter, params) {
            Ok(Some(codec)) => codec,
            Ok(None) => {
                unsupported(diagnostics);
                return Ok(source);
            }
            Err(err) if err.is_missing_data() => return Err(err),
            Err(err) => {
                invalid(diagnostics, err);
                return Ok(Box::new(NullStream));
            }
        };

        let predictor = match (filter, params) {
            (Filter::FlateDecode | Filter::LZWDecode, Some(params)) => {
                match PredictorParams::from_dict(params) {
                    Ok(predictor) => predictor,
                    Err(err) => {
                        invalid(diagnostics, err);
                        return Ok(Box::new(NullStream));
                    }
                }
            }
            _ => None,
        };

        tracing::trace!(filter = filter.name(), ?maybe_length, "adding filter stage");
        let stage: Box<dyn ByteSource> = Box::new(DecodeStream::new(source, maybe_length, codec));
        Ok(match predictor {
            Some(predictor) => Box::new(DecodeStream::new(
                stage,
                None,
                Box::new(PredictorCodec::new(predictor)),
            )),
            None => stage,
        })
    }
}
