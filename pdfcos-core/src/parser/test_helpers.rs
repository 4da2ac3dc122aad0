//! Builders for parser tests

use super::lexer::Lexer;
use super::object_parser::Parser;
use super::source::MemoryStream;
use super::ParseOptions;

/// Strict parser over `input` that collects warnings
pub fn parser(input: &[u8]) -> Parser<MemoryStream> {
    parser_with(input, ParseOptions::default().with_warnings())
}

/// Parser in recovery mode
pub fn lenient_parser(input: &[u8]) -> Parser<MemoryStream> {
    parser_with(input, ParseOptions::lenient())
}

pub fn parser_with(input: &[u8], options: ParseOptions) -> Parser<MemoryStream> {
    let lexer = Lexer::with_options(MemoryStream::new(input.to_vec()), options);
    Parser::new(lexer, true).unwrap()
}

/// `num 0 obj << /Length length extra >> stream ... endstream endobj`
pub fn indirect_stream(num: u32, extra: &str, payload: &[u8], length: &str) -> Vec<u8> {
    let mut out = format!("{num} 0 obj\n<< /Length {length} {extra}>>\nstream\n").into_bytes();
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    out
}

/// A small document with a catalog, a page tree and one content stream
pub fn create_minimal_pdf() -> Vec<u8> {
    let mut content = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    content.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    content.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");
    content.extend_from_slice(
        b"3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>\nendobj\n",
    );
    content.extend_from_slice(&indirect_stream(4, "", b"BT /F1 12 Tf (Hi) Tj ET", "23"));
    content.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\n%%EOF\n");
    content
}
