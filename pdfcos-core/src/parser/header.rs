//! PDF Header Parser
//!
//! Parses the file header and version according to ISO 32000-1 Section 7.5.2.
//! Some producers write junk before the header, so `%PDF-` is searched for
//! in the first kilobyte rather than required at offset 0.

use super::{ParseError, ParseResult};

/// How far into the file the header may start
pub const HEADER_SEARCH_LIMIT: usize = 1024;

const HEADER_SIGNATURE: &[u8] = b"%PDF-";

/// PDF Version information
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// PDF 1.0 through 2.0
    pub fn is_supported(&self) -> bool {
        matches!((self.major, self.minor), (1, 0..=7) | (2, 0))
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// PDF Header information
#[derive(Debug, Clone, PartialEq)]
pub struct PdfHeader {
    pub version: PdfVersion,
    /// Offset of `%PDF-` in the file
    pub offset: usize,
    pub has_binary_marker: bool,
}

impl PdfHeader {
    /// Parse the header from the start of the file data
    pub fn parse(data: &[u8]) -> ParseResult<Self> {
        let window = &data[..data.len().min(HEADER_SEARCH_LIMIT)];
        let offset = window
            .windows(HEADER_SIGNATURE.len())
            .position(|w| w == HEADER_SIGNATURE)
            .ok_or(ParseError::InvalidHeader)?;
        if offset > 0 {
            tracing::warn!("{offset} bytes of junk before the PDF header");
        }

        let rest = &data[offset + HEADER_SIGNATURE.len()..];
        let line_len = rest
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .unwrap_or(rest.len());
        let version = Self::parse_version(&rest[..line_len])?;

        let has_binary_marker = Self::check_binary_marker(&rest[line_len..]);

        Ok(PdfHeader {
            version,
            offset,
            has_binary_marker,
        })
    }

    fn parse_version(line: &[u8]) -> ParseResult<PdfVersion> {
        // PDF headers should be ASCII, but be lenient about it
        let line = String::from_utf8_lossy(line);
        let version_str = line.trim();
        let (major, minor) = version_str
            .split_once('.')
            .ok_or(ParseError::InvalidHeader)?;

        let major = major.parse::<u8>().map_err(|_| ParseError::InvalidHeader)?;
        // Trailing garbage such as "%PDF-1.4 %comment" is tolerated
        let minor_digits: String = minor.chars().take_while(char::is_ascii_digit).collect();
        let minor = minor_digits
            .parse::<u8>()
            .map_err(|_| ParseError::InvalidHeader)?;

        let version = PdfVersion::new(major, minor);
        if !version.is_supported() {
            return Err(ParseError::UnsupportedVersion(version.to_string()));
        }
        Ok(version)
    }

    /// Binary marker: a comment line with at least four bytes >= 128
    fn check_binary_marker(after_version: &[u8]) -> bool {
        let line_start = after_version
            .iter()
            .position(|&b| b != b'\n' && b != b'\r')
            .unwrap_or(after_version.len());
        let line = &after_version[line_start..];
        let line_end = line
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .unwrap_or(line.len())
            .min(HEADER_SEARCH_LIMIT);

        match line[..line_end].split_first() {
            Some((b'%', comment)) => comment.iter().filter(|&&b| b >= 128).count() >= 4,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pdf_header_basic() {
        let header = PdfHeader::parse(b"%PDF-1.7\n").unwrap();
        assert_eq!(header.version, PdfVersion::new(1, 7));
        assert_eq!(header.offset, 0);
        assert!(!header.has_binary_marker);
    }

    #[test]
    fn test_parse_pdf_header_with_binary_marker() {
        let header = PdfHeader::parse(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n1 0 obj").unwrap();
        assert_eq!(header.version, PdfVersion::new(1, 4));
        assert!(header.has_binary_marker);

        let header = PdfHeader::parse(b"%PDF-1.4\r\n%\xE2\xE3\n").unwrap();
        assert!(!header.has_binary_marker);
    }

    #[test]
    fn test_parse_pdf_20() {
        let header = PdfHeader::parse(b"%PDF-2.0\r").unwrap();
        assert_eq!(header.version.to_string(), "2.0");
    }

    #[test]
    fn test_junk_before_header() {
        let header = PdfHeader::parse(b"\xEF\xBB\xBFjunk%PDF-1.5\n").unwrap();
        assert_eq!(header.offset, 7);
        assert_eq!(header.version, PdfVersion::new(1, 5));
    }

    #[test]
    fn test_trailing_text_on_version_line() {
        let header = PdfHeader::parse(b"%PDF-1.3 generated\n").unwrap();
        assert_eq!(header.version, PdfVersion::new(1, 3));
    }

    #[test]
    fn test_invalid_headers() {
        assert_eq!(PdfHeader::parse(b""), Err(ParseError::InvalidHeader));
        assert_eq!(PdfHeader::parse(b"%PS-Adobe-3.0\n"), Err(ParseError::InvalidHeader));
        assert_eq!(PdfHeader::parse(b"%PDF-x.y\n"), Err(ParseError::InvalidHeader));
        assert_eq!(PdfHeader::parse(b"%PDF-17\n"), Err(ParseError::InvalidHeader));
    }

    #[test]
    fn test_unsupported_version() {
        assert_eq!(
            PdfHeader::parse(b"%PDF-3.0\n"),
            Err(ParseError::UnsupportedVersion("3.0".to_string()))
        );
        assert!(!PdfVersion::new(1, 8).is_supported());
    }
}
