//! Parser behavior on pinned inputs
//!
//! Each test fixes one tolerated irregularity or one documented result so
//! that compatibility with real-world files does not regress.

use pdfcos::parser::{
    BuiltinCodecs, Codec, CodecProvider, Filter, Lexer, MemoryStream, ObjectRef, Parser,
    PdfDictionary, PdfName, PdfObject, Token, WarningKind, CONTENT_STREAM_OPERATORS,
};
use pdfcos::{ParseOptions, ParseResult};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::rc::Rc;

fn lexer(input: &[u8]) -> Lexer<MemoryStream> {
    Lexer::with_options(
        MemoryStream::new(input.to_vec()),
        ParseOptions::default().with_warnings(),
    )
}

fn parser(input: &[u8]) -> Parser<MemoryStream> {
    Parser::new(lexer(input), true).unwrap()
}

#[test]
fn test_numeric_edge_cases() {
    let mut lexer = lexer(b"4. . .5 1E2 1.5E-1");
    assert_eq!(lexer.next_token().unwrap(), Token::Integer(4));
    assert_eq!(lexer.next_token().unwrap(), Token::Integer(0));
    assert_eq!(lexer.diagnostics().count(WarningKind::BadNumber), 1);
    assert_eq!(lexer.next_token().unwrap(), Token::Real(0.5));
    assert_eq!(lexer.next_token().unwrap(), Token::Real(100.0));
    match lexer.next_token().unwrap() {
        Token::Real(value) => assert!((value - 0.15).abs() < 1e-12),
        other => panic!("expected a real, got {other:?}"),
    }
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}

#[test]
fn test_double_minus_is_tolerated() {
    let mut lexer = lexer(b"--5 3-4");
    assert_eq!(lexer.next_token().unwrap(), Token::Integer(-5));
    assert_eq!(lexer.next_token().unwrap(), Token::Integer(34));
}

#[test]
fn test_hex_string_tolerance() {
    let mut lexer = lexer(b"<4E6F2k>");
    assert_eq!(lexer.next_token().unwrap(), Token::String(b"No".to_vec()));
    assert_eq!(lexer.warnings().len(), 1);
    assert_eq!(lexer.warnings()[0].kind, WarningKind::InvalidHexCharacter);
}

#[test]
fn test_name_escape() {
    let mut lexer = lexer(b"/A#42C");
    match lexer.next_token().unwrap() {
        Token::Name(name) => {
            assert_eq!(name.as_str(), "ABC");
            assert!(name.ptr_eq(&PdfName::new("ABC")));
        }
        other => panic!("expected a name, got {other:?}"),
    }
}

#[test]
fn test_reference_disambiguation() {
    let mut parser = parser(b"3 0 R 3 0 obj");
    assert_eq!(
        parser.get_object(None).unwrap(),
        PdfObject::Reference(ObjectRef::new(3, 0))
    );
    assert_eq!(parser.get_object(None).unwrap(), PdfObject::Integer(3));
    assert_eq!(parser.get_object(None).unwrap(), PdfObject::Integer(0));
    assert!(parser.get_object(None).unwrap().is_command("obj"));
}

#[test]
fn test_end_to_end_ascii_hex_stream() {
    let input =
        b"1 0 obj << /Length 11 /Filter /ASCIIHexDecode >> stream\n48656C6C6F>\nendstream endobj";
    let mut parser = parser(input);
    let (reference, obj) = parser.parse_indirect_object(None).unwrap();
    assert_eq!(reference, ObjectRef::new(1, 0));
    let stream = obj.as_stream().unwrap();
    assert_eq!(stream.decode().unwrap(), b"Hello");
    assert_eq!(stream.length(), 11);
    assert!(parser.warnings().is_empty());
}

#[test]
fn test_stream_raw_bytes_round_trip() {
    let payload = b"\x00\x01binary\xffpayload(";
    let mut input = format!("7 2 obj\n<< /Length {} >>\nstream\n", payload.len()).into_bytes();
    input.extend_from_slice(payload);
    input.extend_from_slice(b"\nendstream\nendobj\n");

    let mut parser = parser(&input);
    let (reference, obj) = parser.parse_indirect_object(None).unwrap();
    assert_eq!(reference, ObjectRef::new(7, 2));
    assert_eq!(obj.as_stream().unwrap().raw_data().unwrap(), payload);
}

/// Counts codec constructions and otherwise defers to the built-in codecs
#[derive(Default)]
struct CountingCodecs {
    created: Cell<usize>,
}

impl CodecProvider for CountingCodecs {
    fn create(
        &self,
        filter: Filter,
        params: Option<&PdfDictionary>,
    ) -> ParseResult<Option<Box<dyn Codec>>> {
        self.created.set(self.created.get() + 1);
        BuiltinCodecs.create(filter, params)
    }
}

#[test]
fn test_inline_image_cache_reuses_codec_chain() {
    let image = b"BI /W 2 /H 1 /BPC 8 /CS /G /F /AHx ID 0A0B> EI ";
    let mut input = b"q ".to_vec();
    input.extend_from_slice(image);
    input.extend_from_slice(image);
    input.extend_from_slice(b"Q");

    let codecs = Rc::new(CountingCodecs::default());
    let lexer = lexer(&input).with_known_commands(&CONTENT_STREAM_OPERATORS);
    let mut parser = Parser::new(lexer, false)
        .unwrap()
        .with_codecs(codecs.clone());

    assert!(parser.get_object(None).unwrap().is_command("q"));
    let first = parser.get_object(None).unwrap();
    assert!(parser.get_object(None).unwrap().is_command("EI"));
    let second = parser.get_object(None).unwrap();
    assert!(parser.get_object(None).unwrap().is_command("EI"));
    assert!(parser.get_object(None).unwrap().is_command("Q"));

    let (first, second) = (first.as_stream().unwrap(), second.as_stream().unwrap());
    assert_eq!(first.cache_key(), second.cache_key());
    assert!(first.ptr_eq(second));
    assert_eq!(second.decode().unwrap(), vec![0x0A, 0x0B]);
    assert_eq!(codecs.created.get(), 1);
}
