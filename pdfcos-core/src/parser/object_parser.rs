//! COS object parser
//!
//! Recursive descent over lexer tokens with two tokens of lookahead. The
//! lookahead is what makes `3 0 R` a reference while `3 0 obj` stays two
//! integers, and what tells a dictionary that a `stream` keyword follows.

use super::diagnostics::{Diagnostics, ParseWarning, WarningKind};
use super::encryption::Decryptor;
use super::filters::{BuiltinCodecs, CodecProvider, FilterChainBuilder};
use super::inline_image;
use super::lexer::{Lexer, Token};
use super::objects::{
    ObjectRef, PdfArray, PdfCommand, PdfDictionary, PdfObject, PdfStream, PdfString,
};
use super::resolver::{NoResolver, XRefResolver};
use super::source::ByteSource;
use super::stack_safe::StackSafeContext;
use super::stream_length::find_stream_length;
use super::{ParseError, ParseResult};
use std::collections::HashMap;
use std::rc::Rc;

/// Builds objects from the tokens of a [`Lexer`].
///
/// A parser lives for one logical parse, such as one content stream or one
/// indirect object. Streams it creates share the lexer's underlying data
/// through sub-streams and stay valid after the parser is dropped.
pub struct Parser<S: ByteSource> {
    lexer: Lexer<S>,
    buf1: Token,
    buf2: Option<Token>,
    allow_streams: bool,
    resolver: Rc<dyn XRefResolver>,
    codecs: Rc<dyn CodecProvider>,
    image_cache: HashMap<(u32, u32), PdfStream>,
    image_id: usize,
    context: StackSafeContext,
}

impl<S: ByteSource> Parser<S> {
    /// Create a parser and read the first two tokens.
    ///
    /// With `allow_streams` off, a dictionary followed by `stream` is
    /// returned as a plain dictionary, as needed for object streams and
    /// content streams.
    pub fn new(mut lexer: Lexer<S>, allow_streams: bool) -> ParseResult<Self> {
        let buf1 = lexer.next_token()?;
        let buf2 = if buf1.is_command("ID") {
            None
        } else {
            Some(lexer.next_token()?)
        };
        let context = StackSafeContext::with_limit(lexer.options().max_depth);
        Ok(Self {
            lexer,
            buf1,
            buf2,
            allow_streams,
            resolver: Rc::new(NoResolver),
            codecs: Rc::new(BuiltinCodecs),
            image_cache: HashMap::new(),
            image_id: 0,
            context,
        })
    }

    /// Resolver used for indirect filter names and decode parameters
    pub fn with_resolver(mut self, resolver: Rc<dyn XRefResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Codecs used to build filter chains
    pub fn with_codecs(mut self, codecs: Rc<dyn CodecProvider>) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn lexer(&self) -> &Lexer<S> {
        &self.lexer
    }

    pub fn lexer_mut(&mut self) -> &mut Lexer<S> {
        &mut self.lexer
    }

    pub fn into_lexer(self) -> Lexer<S> {
        self.lexer
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.lexer.diagnostics()
    }

    /// Warnings collected by the lexer and the parser so far
    pub fn warnings(&self) -> &[ParseWarning] {
        self.lexer.warnings()
    }

    /// Number of distinct inline images kept for reuse
    pub fn image_cache_len(&self) -> usize {
        self.image_cache.len()
    }

    /// Advance the lookahead by one token. `ID` is never read past: the
    /// bytes after it are image data, not tokens.
    fn shift(&mut self) -> ParseResult<()> {
        match self.buf2.take() {
            Some(token) => {
                let stop = token.is_command("ID");
                self.buf1 = token;
                if !stop {
                    self.buf2 = Some(self.lexer.next_token()?);
                }
            }
            None => self.refill()?,
        }
        Ok(())
    }

    /// Discard the lookahead and read two fresh tokens.
    fn refill(&mut self) -> ParseResult<()> {
        self.buf1 = self.lexer.next_token()?;
        self.buf2 = if self.buf1.is_command("ID") {
            None
        } else {
            Some(self.lexer.next_token()?)
        };
        Ok(())
    }

    fn recovery_mode(&self) -> bool {
        self.lexer.options().recovery_mode
    }

    /// Read the next object.
    ///
    /// Strings, including those nested in arrays and dictionaries, are
    /// passed through `decryptor` when one is given. Keywords that are not
    /// part of an object come back as [`PdfObject::Command`], and the end
    /// of input as [`PdfObject::Eof`].
    pub fn get_object(&mut self, decryptor: Option<&dyn Decryptor>) -> ParseResult<PdfObject> {
        let buf1 = std::mem::replace(&mut self.buf1, Token::Eof);
        self.shift()?;

        match buf1 {
            Token::Command(cmd) => match cmd.as_str() {
                "BI" => self.make_inline_image(decryptor),
                "[" => {
                    self.context.enter()?;
                    let array = self.parse_array(decryptor);
                    self.context.exit();
                    array
                }
                "<<" => {
                    self.context.enter()?;
                    let dict = self.parse_dictionary(decryptor);
                    self.context.exit();
                    dict
                }
                _ => Ok(PdfObject::Command(cmd)),
            },
            Token::Integer(num) => {
                let followed_by_r = self.buf2.as_ref().is_some_and(|t| t.is_command("R"));
                if let Token::Integer(gen) = self.buf1 {
                    if followed_by_r {
                        if let (Ok(num), Ok(gen)) = (u32::try_from(num), u16::try_from(gen)) {
                            self.shift()?;
                            self.shift()?;
                            return Ok(PdfObject::Reference(ObjectRef::new(num, gen)));
                        }
                    }
                }
                Ok(PdfObject::Integer(num))
            }
            Token::String(data) => Ok(PdfObject::String(PdfString(match decryptor {
                Some(decryptor) => decryptor.decrypt_string(&data),
                None => data,
            }))),
            Token::Real(value) => Ok(PdfObject::Real(value)),
            Token::Boolean(value) => Ok(PdfObject::Boolean(value)),
            Token::Null => Ok(PdfObject::Null),
            Token::Name(name) => Ok(PdfObject::Name(name)),
            Token::Eof => Ok(PdfObject::Eof),
        }
    }

    fn parse_array(&mut self, decryptor: Option<&dyn Decryptor>) -> ParseResult<PdfObject> {
        let mut array = PdfArray::new();
        while !self.buf1.is_command("]") && !self.buf1.is_eof() {
            array.push(self.get_object(decryptor)?);
        }
        if self.buf1.is_eof() {
            if self.recovery_mode() {
                return Ok(PdfObject::Array(array));
            }
            return Err(ParseError::UnexpectedEof { context: "array" });
        }
        self.shift()?;
        Ok(PdfObject::Array(array))
    }

    fn parse_dictionary(&mut self, decryptor: Option<&dyn Decryptor>) -> ParseResult<PdfObject> {
        let mut dict = PdfDictionary::new();
        while !self.buf1.is_command(">>") && !self.buf1.is_eof() {
            let key = match &self.buf1 {
                Token::Name(name) => name.clone(),
                other => {
                    let message =
                        format!("Malformed dictionary: key must be a name object, found {other:?}");
                    let position = self.lexer.position();
                    self.lexer.diagnostics_mut().info(
                        WarningKind::MalformedDictionary,
                        Some(position),
                        message,
                    );
                    self.shift()?;
                    continue;
                }
            };
            self.shift()?;
            if self.buf1.is_eof() {
                break;
            }
            let value = self.get_object(decryptor)?;
            dict.insert(key, value);
        }

        if self.buf1.is_eof() {
            if self.recovery_mode() {
                return Ok(PdfObject::Dictionary(dict));
            }
            return Err(ParseError::UnexpectedEof {
                context: "dictionary",
            });
        }

        if self.buf2.as_ref().is_some_and(|t| t.is_command("stream")) {
            if self.allow_streams {
                return self.make_stream(dict, decryptor).map(PdfObject::Stream);
            }
            // The caller sees `stream` as the next object.
            self.shift()?;
            return Ok(PdfObject::Dictionary(dict));
        }

        self.shift()?;
        Ok(PdfObject::Dictionary(dict))
    }

    /// Build a stream whose dictionary has just been read. On entry the
    /// lexer stands right after the `stream` keyword.
    fn make_stream(
        &mut self,
        dict: PdfDictionary,
        decryptor: Option<&dyn Decryptor>,
    ) -> ParseResult<PdfStream> {
        self.lexer.skip_to_next_line()?;
        let start = self.lexer.position();
        let length = find_stream_length(&mut self.lexer, start, dict.get("Length"))?;

        let source = self.lexer.source_mut();
        let raw = source.make_sub_stream(start, Some(length))?;
        let mut input = source.make_sub_stream(start, Some(length))?;
        if let Some(decryptor) = decryptor {
            input = decryptor.create_stream(input, length);
        }
        let decoded = FilterChainBuilder::new(&*self.resolver, &*self.codecs).build(
            input,
            &dict,
            length,
            self.lexer.diagnostics_mut(),
        )?;

        // `endstream` was consumed by the length lookup.
        self.refill()?;
        Ok(PdfStream::new(dict, start, length, raw, decoded))
    }

    /// Build an inline image. On entry `BI` has been consumed; the image
    /// dictionary runs up to `ID`.
    fn make_inline_image(&mut self, decryptor: Option<&dyn Decryptor>) -> ParseResult<PdfObject> {
        let mut dict = PdfDictionary::new();
        while !self.buf1.is_command("ID") && !self.buf1.is_eof() {
            let key = match &self.buf1 {
                Token::Name(name) => name.clone(),
                other => {
                    return Err(ParseError::SyntaxError {
                        position: self.lexer.position(),
                        message: format!(
                            "Inline image dictionary key must be a name object, found {other:?}"
                        ),
                    });
                }
            };
            self.shift()?;
            if self.buf1.is_eof() {
                break;
            }
            let value = self.get_object(decryptor)?;
            dict.insert(key, value);
        }
        if self.buf1.is_eof() {
            return Err(ParseError::UnexpectedEof {
                context: "inline image",
            });
        }

        let filter = inline_image::filter_name(&dict, &*self.resolver)?;
        let known_commands = self.lexer.known_commands();
        let begin_pos = self.lexer.begin_inline_image_pos();
        let max_cache_length = self.lexer.options().max_inline_image_cache_length;

        let (source, diagnostics) = self.lexer.parts_mut();
        let start = source.pos();
        let dict_length = begin_pos.map_or(0, |begin| start.saturating_sub(begin));
        let length = inline_image::find_inline_stream_end(
            source,
            filter.as_ref().map(|name| name.as_str()),
            known_commands,
            diagnostics,
        )?;

        // Small images are fingerprinted so that repeated ones share a stream.
        let mut fingerprint = None;
        if let Some(begin) = begin_pos.filter(|_| length < max_cache_length && dict_length > 0) {
            let end_pos = source.pos();
            source.set_pos(begin);
            let dict_bytes = source.get_bytes(Some(dict_length))?;
            source.set_pos(start);
            let image_bytes = source.get_bytes(Some(length))?;
            source.set_pos(end_pos);

            let key = (inline_image::adler32(&image_bytes), inline_image::adler32(&dict_bytes));
            if let Some(cached) = self.image_cache.get(&key) {
                let cached = cached.clone();
                cached.reset();
                self.finish_inline_image()?;
                return Ok(PdfObject::Stream(cached));
            }
            fingerprint = Some(key);
        }

        let raw = source.make_sub_stream(start, Some(length))?;
        let mut input = source.make_sub_stream(start, Some(length))?;
        if let Some(decryptor) = decryptor {
            input = decryptor.create_stream(input, length);
        }
        let decoded = FilterChainBuilder::new(&*self.resolver, &*self.codecs).build(
            input,
            &dict,
            length,
            self.lexer.diagnostics_mut(),
        )?;

        let cache_key = fingerprint.map(|_| {
            self.image_id += 1;
            format!("inline_img_{}", self.image_id)
        });
        let stream = PdfStream::with_cache_key(dict, start, length, raw, decoded, cache_key);
        if let Some(key) = fingerprint {
            self.image_cache.insert(key, stream.clone());
        }
        self.finish_inline_image()?;
        Ok(PdfObject::Stream(stream))
    }

    /// The detectors leave the source after `EI`; continue lexing there
    /// with `EI` as the next object.
    fn finish_inline_image(&mut self) -> ParseResult<()> {
        let pos = self.lexer.source().pos();
        self.lexer.set_position(pos);
        self.buf2 = Some(Token::Command(PdfCommand::new("EI")));
        self.shift()
    }

    /// Read `num gen obj <object> endobj`.
    ///
    /// A missing `endobj` is tolerated with a warning in recovery mode.
    pub fn parse_indirect_object(
        &mut self,
        decryptor: Option<&dyn Decryptor>,
    ) -> ParseResult<(ObjectRef, PdfObject)> {
        let num = self.get_object(None)?;
        let gen = self.get_object(None)?;
        let reference = match (&num, &gen) {
            (PdfObject::Integer(n), PdfObject::Integer(g)) => {
                match (u32::try_from(*n), u16::try_from(*g)) {
                    (Ok(n), Ok(g)) => ObjectRef::new(n, g),
                    _ => {
                        return Err(ParseError::SyntaxError {
                            position: self.lexer.position(),
                            message: format!("Invalid object number {num} {gen}"),
                        })
                    }
                }
            }
            _ => {
                return Err(ParseError::UnexpectedToken {
                    expected: "object number and generation".to_string(),
                    found: format!("{num} {gen}"),
                })
            }
        };

        let keyword = self.get_object(None)?;
        if !keyword.is_command("obj") {
            return Err(ParseError::UnexpectedToken {
                expected: "obj".to_string(),
                found: keyword.to_string(),
            });
        }

        let object = self.get_object(decryptor)?;
        if object.is_eof() {
            return Err(ParseError::UnexpectedEof {
                context: "indirect object",
            });
        }

        if self.buf1.is_command("endobj") {
            self.shift()?;
        } else if self.recovery_mode() {
            let position = self.lexer.position();
            self.lexer.diagnostics_mut().warn(
                WarningKind::MissingEndobj,
                Some(position),
                format!("Missing endobj after object {reference}"),
            );
        } else {
            return Err(ParseError::UnexpectedToken {
                expected: "endobj".to_string(),
                found: format!("{:?}", self.buf1),
            });
        }
        Ok((reference, object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::decode_stream::{Codec, DecodeStream};
    use crate::parser::lexer::CONTENT_STREAM_OPERATORS;
    use crate::parser::objects::PdfName;
    use crate::parser::source::MemoryStream;
    use crate::parser::test_helpers::{indirect_stream, lenient_parser, parser};
    use crate::parser::{ChunkedStream, ParseOptions};
    use pretty_assertions::assert_eq;

    fn name(text: &str) -> PdfObject {
        PdfObject::Name(PdfName::new(text))
    }

    fn objects(input: &[u8]) -> Vec<PdfObject> {
        let mut parser = parser(input);
        let mut out = Vec::new();
        loop {
            let obj = parser.get_object(None).unwrap();
            if obj.is_eof() {
                return out;
            }
            out.push(obj);
        }
    }

    #[test]
    fn test_primitive_objects() {
        assert_eq!(
            objects(b"true false null 42 -1.5 (text) <414243> /Name"),
            vec![
                PdfObject::Boolean(true),
                PdfObject::Boolean(false),
                PdfObject::Null,
                PdfObject::Integer(42),
                PdfObject::Real(-1.5),
                PdfObject::String(PdfString(b"text".to_vec())),
                PdfObject::String(PdfString(b"ABC".to_vec())),
                name("Name"),
            ]
        );
    }

    #[test]
    fn test_reference_disambiguation() {
        assert_eq!(
            objects(b"3 0 R"),
            vec![PdfObject::Reference(ObjectRef::new(3, 0))]
        );
        assert_eq!(
            objects(b"[1 2 3 0 R 4]"),
            vec![PdfObject::Array(PdfArray(vec![
                PdfObject::Integer(1),
                PdfObject::Integer(2),
                PdfObject::Reference(ObjectRef::new(3, 0)),
                PdfObject::Integer(4),
            ]))]
        );
        assert_eq!(
            objects(b"3 0 obj"),
            vec![
                PdfObject::Integer(3),
                PdfObject::Integer(0),
                PdfObject::Command(PdfCommand::new("obj")),
            ]
        );
    }

    #[test]
    fn test_out_of_range_reference_stays_integers() {
        assert_eq!(
            objects(b"-3 0 R"),
            vec![
                PdfObject::Integer(-3),
                PdfObject::Integer(0),
                PdfObject::Command(PdfCommand::new("R")),
            ]
        );
        assert_eq!(objects(b"1 70000 R").len(), 3);
    }

    #[test]
    fn test_nested_dictionary() {
        let parsed = objects(b"<< /Type /Page /Kids [1 0 R] /Inner << /A 1 >> >>");
        let dict = parsed[0].as_dict().unwrap();
        assert_eq!(dict.get_type(), Some("Page"));
        assert_eq!(
            dict.get("Kids"),
            Some(&PdfObject::Array(PdfArray(vec![PdfObject::Reference(
                ObjectRef::new(1, 0)
            )])))
        );
        let inner = dict.get("Inner").and_then(|obj| obj.as_dict()).unwrap();
        assert_eq!(inner.get("A"), Some(&PdfObject::Integer(1)));
    }

    #[test]
    fn test_malformed_dictionary_key_is_skipped() {
        let mut parser = parser(b"<< /A 1 2 /B 3 >>");
        let obj = parser.get_object(None).unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("B"), Some(&PdfObject::Integer(3)));
        assert_eq!(parser.diagnostics().count(WarningKind::MalformedDictionary), 1);
    }

    #[test]
    fn test_eof_inside_array() {
        let err = parser(b"[1 2").get_object(None).unwrap_err();
        assert_eq!(err, ParseError::UnexpectedEof { context: "array" });

        let obj = lenient_parser(b"[1 2").get_object(None).unwrap();
        assert_eq!(
            obj,
            PdfObject::Array(PdfArray(vec![PdfObject::Integer(1), PdfObject::Integer(2)]))
        );
    }

    #[test]
    fn test_eof_inside_dictionary() {
        let err = parser(b"<< /A 1").get_object(None).unwrap_err();
        assert_eq!(err, ParseError::UnexpectedEof { context: "dictionary" });

        let obj = lenient_parser(b"<< /A 1 /B").get_object(None).unwrap();
        assert_eq!(obj.as_dict().map(|d| d.len()), Some(1));
    }

    #[test]
    fn test_recursion_limit() {
        let options = ParseOptions {
            max_depth: 16,
            ..Default::default()
        };
        let input = "[".repeat(64);
        let lexer = Lexer::with_options(MemoryStream::new(input.into_bytes()), options);
        let mut parser = Parser::new(lexer, false).unwrap();
        assert_eq!(
            parser.get_object(None),
            Err(ParseError::RecursionLimit { depth: 17, limit: 16 })
        );
    }

    #[test]
    fn test_stream_round_trip() {
        let input = indirect_stream(1, "", b"BT /F1 12 Tf ET", "15");
        let mut parser = parser(&input);
        let (reference, obj) = parser.parse_indirect_object(None).unwrap();
        assert_eq!(reference, ObjectRef::new(1, 0));
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.raw_data().unwrap(), b"BT /F1 12 Tf ET");
        assert_eq!(stream.decode().unwrap(), b"BT /F1 12 Tf ET");
        assert!(parser.warnings().is_empty());
        assert!(parser.get_object(None).unwrap().is_eof());
    }

    #[test]
    fn test_stream_absolute_range() {
        let input = indirect_stream(1, "", b"abc", "3");
        let mut parser = parser(&input);
        let (_, obj) = parser.parse_indirect_object(None).unwrap();
        let stream = obj.as_stream().unwrap();
        assert_eq!(&input[stream.start()..stream.start() + stream.length()], b"abc");
    }

    #[test]
    fn test_stream_recovered_lengths() {
        for declared in ["2", "400", "/Bogus", "9 0 R", "0"] {
            let input = indirect_stream(4, "", b"Hello world", declared);
            let mut parser = parser(&input);
            let (_, obj) = parser.parse_indirect_object(None).unwrap();
            let stream = obj.as_stream().unwrap();
            assert_eq!(stream.length(), 11, "declared {declared}");
            assert_eq!(stream.decode().unwrap(), b"Hello world");
        }
    }

    #[test]
    fn test_end_to_end_ascii_hex_stream() {
        let input = b"1 0 obj << /Length 11 /Filter /ASCIIHexDecode >> stream\n48656C6C6F>\nendstream endobj";
        let mut parser = parser(input);
        let (reference, obj) = parser.parse_indirect_object(None).unwrap();
        assert_eq!(reference, ObjectRef::new(1, 0));
        assert_eq!(obj.as_stream().unwrap().decode().unwrap(), b"Hello");
        assert_eq!(parser.diagnostics().count(WarningKind::StreamLengthMismatch), 0);
    }

    #[test]
    fn test_streams_disallowed() {
        let lexer = Lexer::new(MemoryStream::new(
            b"<< /Length 3 >> stream\nabc\nendstream".to_vec(),
        ));
        let mut parser = Parser::new(lexer, false).unwrap();
        assert!(matches!(parser.get_object(None).unwrap(), PdfObject::Dictionary(_)));
        assert!(parser.get_object(None).unwrap().is_command("stream"));
    }

    #[test]
    fn test_missing_endobj() {
        let input = b"5 0 obj 42 6 0 obj";
        let err = parser(input).parse_indirect_object(None).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));

        let mut parser = lenient_parser(input);
        let (reference, obj) = parser.parse_indirect_object(None).unwrap();
        assert_eq!((reference, obj), (ObjectRef::new(5, 0), PdfObject::Integer(42)));
        assert_eq!(parser.diagnostics().count(WarningKind::MissingEndobj), 1);
    }

    #[derive(Debug)]
    struct Reverse;

    impl Codec for Reverse {
        fn name(&self) -> &'static str {
            "Reverse"
        }

        fn decode(&mut self, mut input: Vec<u8>) -> ParseResult<Vec<u8>> {
            input.reverse();
            Ok(input)
        }
    }

    impl Decryptor for Reverse {
        fn decrypt_string(&self, data: &[u8]) -> Vec<u8> {
            data.iter().rev().copied().collect()
        }

        fn create_stream(&self, source: Box<dyn ByteSource>, length: usize) -> Box<dyn ByteSource> {
            Box::new(DecodeStream::new(source, Some(length), Box::new(Reverse)))
        }
    }

    #[test]
    fn test_decryption_hook() {
        let mut parser = parser(b"[(olleh) /Name 3] << /Length 3 >> stream\ncba\nendstream");
        let array = parser.get_object(Some(&Reverse)).unwrap();
        assert_eq!(
            array,
            PdfObject::Array(PdfArray(vec![
                PdfObject::String(PdfString(b"hello".to_vec())),
                name("Name"),
                PdfObject::Integer(3),
            ]))
        );
        let stream = parser.get_object(Some(&Reverse)).unwrap();
        let stream = stream.as_stream().unwrap();
        assert_eq!(stream.raw_data().unwrap(), b"cba");
        assert_eq!(stream.decode().unwrap(), b"abc");
    }

    fn content_parser(input: &[u8]) -> Parser<MemoryStream> {
        let lexer = Lexer::with_options(
            MemoryStream::new(input.to_vec()),
            ParseOptions::default().with_warnings(),
        )
        .with_known_commands(&CONTENT_STREAM_OPERATORS);
        Parser::new(lexer, false).unwrap()
    }

    #[test]
    fn test_inline_image() {
        let mut parser = content_parser(b"q BI /W 2 /H 1 /BPC 8 /CS /G ID \x01\x02 EI Q");
        assert!(parser.get_object(None).unwrap().is_command("q"));
        let image = parser.get_object(None).unwrap();
        let stream = image.as_stream().unwrap();
        assert_eq!(stream.dict().get("W"), Some(&PdfObject::Integer(2)));
        assert_eq!(stream.decode().unwrap(), vec![1, 2]);
        assert!(stream.cache_key().is_some());
        assert!(parser.get_object(None).unwrap().is_command("EI"));
        assert!(parser.get_object(None).unwrap().is_command("Q"));
    }

    #[test]
    fn test_inline_image_with_filter() {
        let mut parser = content_parser(b"BI /F /AHx ID 4142> EI Q");
        let image = parser.get_object(None).unwrap();
        assert_eq!(image.as_stream().unwrap().decode().unwrap(), b"AB");
        assert!(parser.get_object(None).unwrap().is_command("EI"));
        assert!(parser.get_object(None).unwrap().is_command("Q"));
    }

    #[test]
    fn test_inline_image_cache() {
        let image = b"BI /W 1 /H 1 ID \x7f EI ";
        let mut input = image.to_vec();
        input.extend_from_slice(image);
        let mut parser = content_parser(&input);

        let first = parser.get_object(None).unwrap();
        assert!(parser.get_object(None).unwrap().is_command("EI"));
        let second = parser.get_object(None).unwrap();
        assert!(parser.get_object(None).unwrap().is_command("EI"));

        let (first, second) = (first.as_stream().unwrap(), second.as_stream().unwrap());
        assert!(first.ptr_eq(second));
        assert_eq!(parser.image_cache_len(), 1);
        assert_eq!(second.decode().unwrap(), vec![0x7f]);
    }

    #[test]
    fn test_inline_image_at_end_of_loaded_chunks() {
        let input = b"BI /W 1 /H 1 ID \x01 EI ";
        let source = ChunkedStream::with_chunk_size(input.len(), 7);
        source.on_receive_data(0, input);
        let lexer = Lexer::with_options(source, ParseOptions::default().with_warnings())
            .with_known_commands(&CONTENT_STREAM_OPERATORS);
        let mut parser = Parser::new(lexer, false).unwrap();

        let image = parser.get_object(None).unwrap();
        assert_eq!(image.as_stream().unwrap().decode().unwrap(), vec![1]);
        assert!(parser.get_object(None).unwrap().is_command("EI"));
        assert_eq!(parser.get_object(None).unwrap(), PdfObject::Eof);
    }

    #[test]
    fn test_inline_image_bad_key() {
        let mut parser = content_parser(b"BI 12 ID \x00 EI");
        assert!(matches!(
            parser.get_object(None),
            Err(ParseError::SyntaxError { .. })
        ));
    }

    #[test]
    fn test_missing_data_propagates() {
        let input = indirect_stream(1, "", b"payload", "7");
        let source = ChunkedStream::with_chunk_size(input.len(), 16);
        source.on_receive_data(0, &input[..16]);
        let lexer = Lexer::new(source.clone());
        let err = Parser::new(lexer, true)
            .and_then(|mut parser| parser.parse_indirect_object(None))
            .unwrap_err();
        assert!(err.is_missing_data());

        source.on_receive_data(16, &input[16..]);
        let mut parser = Parser::new(Lexer::new(source), true).unwrap();
        let (_, obj) = parser.parse_indirect_object(None).unwrap();
        assert_eq!(obj.as_stream().unwrap().decode().unwrap(), b"payload");
    }
}
