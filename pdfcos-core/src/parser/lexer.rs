//! PDF Lexer
//!
//! Tokenizes PDF syntax according to ISO 32000-1 Section 7.2, with the
//! recovery rules mainstream readers apply to malformed files.

use super::diagnostics::{Diagnostics, ParseWarning, WarningKind};
use super::objects::{latin1, PdfCommand, PdfName};
use super::source::ByteSource;
use super::{ParseError, ParseOptions, ParseResult};
use lazy_static::lazy_static;
use std::collections::HashSet;

/// Commands longer than this are rejected.
pub const MAX_COMMAND_LENGTH: usize = 128;

/// Names longer than this are accepted with a warning.
pub const MAX_NAME_LENGTH: usize = 127;

/// Individual warnings reported per hex string before they are summarized.
pub const MAX_HEX_STRING_NUM_WARN: usize = 5;

const CONTENT_OPERATORS: &[&str] = &[
    // General graphics state
    "w", "J", "j", "M", "d", "ri", "i", "gs",
    // Special graphics state
    "q", "Q", "cm",
    // Path construction
    "m", "l", "c", "v", "y", "h", "re",
    // Path painting
    "S", "s", "f", "F", "f*", "B", "B*", "b", "b*", "n",
    // Clipping paths
    "W", "W*",
    // Text objects and state
    "BT", "ET", "Tc", "Tw", "Tz", "TL", "Tf", "Tr", "Ts",
    // Text positioning and showing
    "Td", "TD", "Tm", "T*", "Tj", "TJ", "'", "\"",
    // Type 3 fonts
    "d0", "d1",
    // Color
    "CS", "cs", "SC", "SCN", "sc", "scn", "G", "g", "RG", "rg", "K", "k",
    // Shading, inline images and XObjects
    "sh", "BI", "ID", "EI", "Do",
    // Marked content and compatibility
    "MP", "DP", "BMC", "BDC", "EMC", "BX", "EX",
    // Keywords that end up as values
    "true", "false", "null",
];

lazy_static! {
    /// Every content stream operator and all of their prefixes.
    ///
    /// Passing this table to [`Lexer::with_known_commands`] splits operators
    /// that are not separated by whitespace, such as `BTq`.
    pub static ref CONTENT_STREAM_OPERATORS: HashSet<&'static str> = {
        let mut set = HashSet::new();
        for op in CONTENT_OPERATORS {
            for end in 1..=op.len() {
                set.insert(&op[..end]);
            }
        }
        set
    };
}

/// PDF Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Boolean: true or false
    Boolean(bool),

    /// Integer number
    Integer(i64),

    /// Real number
    Real(f64),

    /// String (literal or hexadecimal)
    String(Vec<u8>),

    /// Name object (e.g., /Type)
    Name(PdfName),

    /// Keyword, operator or delimiter (`obj`, `R`, `[`, `<<`, `Tj`, ...)
    Command(PdfCommand),

    /// Null object
    Null,

    /// End of file
    Eof,
}

impl Token {
    pub fn is_command(&self, cmd: &str) -> bool {
        matches!(self, Token::Command(c) if c == cmd)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof)
    }
}

pub(crate) fn is_whitespace(ch: u8) -> bool {
    matches!(ch, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

pub(crate) fn is_delimiter(ch: u8) -> bool {
    matches!(
        ch,
        b'%' | b'(' | b')' | b'/' | b'<' | b'>' | b'[' | b']' | b'{' | b'}'
    )
}

fn is_special(ch: u8) -> bool {
    is_whitespace(ch) || is_delimiter(ch)
}

fn hex_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

/// PDF Lexer for tokenizing PDF content
///
/// The lexer keeps one byte of lookahead, the "current" character, which is
/// read lazily so that constructing a lexer never touches the source.
pub struct Lexer<S> {
    source: S,
    current: Option<Option<u8>>,
    known_commands: Option<&'static HashSet<&'static str>>,
    begin_inline_image_pos: Option<usize>,
    options: ParseOptions,
    diagnostics: Diagnostics,
}

impl<S: ByteSource> Lexer<S> {
    /// Create a new lexer over a byte source
    pub fn new(source: S) -> Self {
        Self::with_options(source, ParseOptions::default())
    }

    /// Create a new lexer with custom options
    pub fn with_options(source: S, options: ParseOptions) -> Self {
        let diagnostics = Diagnostics::new(&options);
        Self {
            source,
            current: None,
            known_commands: None,
            begin_inline_image_pos: None,
            options,
            diagnostics,
        }
    }

    /// Split runs of regular characters only where the result is a known
    /// command, as content stream operators require.
    pub fn with_known_commands(mut self, known: &'static HashSet<&'static str>) -> Self {
        self.known_commands = Some(known);
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        self.diagnostics.warnings()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Borrow the source and the warning sink at the same time.
    pub(crate) fn parts_mut(&mut self) -> (&mut S, &mut Diagnostics) {
        (&mut self.source, &mut self.diagnostics)
    }

    pub fn into_source(self) -> S {
        self.source
    }

    pub fn known_commands(&self) -> Option<&'static HashSet<&'static str>> {
        self.known_commands
    }

    /// Offset just past the most recent `BI` command
    pub fn begin_inline_image_pos(&self) -> Option<usize> {
        self.begin_inline_image_pos
    }

    /// Offset of the current (not yet consumed) character
    pub fn position(&self) -> usize {
        match self.current {
            Some(Some(_)) => self.source.pos().saturating_sub(1),
            _ => self.source.pos(),
        }
    }

    /// Continue lexing at `pos`.
    pub fn set_position(&mut self, pos: usize) {
        self.source.set_pos(pos);
        self.current = None;
    }

    fn current_char(&mut self) -> ParseResult<Option<u8>> {
        match self.current {
            Some(ch) => Ok(ch),
            None => self.next_char(),
        }
    }

    fn next_char(&mut self) -> ParseResult<Option<u8>> {
        let ch = self.source.get_byte()?;
        self.current = Some(ch);
        Ok(ch)
    }

    fn peek_char(&mut self) -> ParseResult<Option<u8>> {
        if self.current.is_none() {
            self.next_char()?;
        }
        self.source.peek_byte()
    }

    /// Get the next token
    pub fn next_token(&mut self) -> ParseResult<Token> {
        let mut ch = self.current_char()?;
        let mut comment = false;
        let first = loop {
            let Some(c) = ch else {
                return Ok(Token::Eof);
            };
            if comment {
                if c == b'\n' || c == b'\r' {
                    comment = false;
                }
            } else if c == b'%' {
                comment = true;
            } else if !is_whitespace(c) {
                break c;
            }
            ch = self.next_char()?;
        };

        match first {
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.read_number(),
            b'(' => self.read_literal_string(),
            b'/' => self.read_name(),
            b'[' | b']' | b'{' | b'}' => {
                self.next_char()?;
                Ok(Token::Command(PdfCommand::new(&latin1(&[first]))))
            }
            b'<' => {
                if self.next_char()? == Some(b'<') {
                    self.next_char()?;
                    Ok(Token::Command(PdfCommand::new("<<")))
                } else {
                    self.read_hex_string()
                }
            }
            b'>' => {
                if self.next_char()? == Some(b'>') {
                    self.next_char()?;
                    Ok(Token::Command(PdfCommand::new(">>")))
                } else {
                    Ok(Token::Command(PdfCommand::new(">")))
                }
            }
            b')' => {
                let position = self.position();
                self.next_char()?;
                Err(ParseError::SyntaxError {
                    position,
                    message: "Illegal character: )".to_string(),
                })
            }
            _ => self.read_command(first),
        }
    }

    /// Skip the rest of the line, including its CR, LF or CRLF terminator.
    pub fn skip_to_next_line(&mut self) -> ParseResult<()> {
        let mut ch = self.current_char()?;
        while let Some(c) = ch {
            if c == b'\r' {
                if self.next_char()? == Some(b'\n') {
                    self.next_char()?;
                }
                break;
            }
            if c == b'\n' {
                self.next_char()?;
                break;
            }
            ch = self.next_char()?;
        }
        Ok(())
    }

    fn read_command(&mut self, first: u8) -> ParseResult<Token> {
        let start = self.position();
        let mut cmd = vec![first];

        // A non-printable byte is a command on its own when a printable one,
        // possibly the start of a real command, follows.
        if !(0x21..=0x7f).contains(&first) {
            if let Some(next) = self.peek_char()? {
                if (0x21..=0x7f).contains(&next) {
                    self.next_char()?;
                    return Ok(Token::Command(PdfCommand::new(&latin1(&cmd))));
                }
            }
        }

        let known = self.known_commands;
        let mut known_found = known.is_some_and(|k| k.contains(latin1(&cmd).as_str()));
        loop {
            let c = match self.next_char()? {
                Some(c) if !is_special(c) => c,
                _ => break,
            };
            if let Some(known) = known {
                let mut possible = cmd.clone();
                possible.push(c);
                if known_found && !known.contains(latin1(&possible).as_str()) {
                    break;
                }
            }
            if cmd.len() == MAX_COMMAND_LENGTH {
                return Err(ParseError::CommandTooLong { position: start });
            }
            cmd.push(c);
            known_found = known.is_some_and(|k| k.contains(latin1(&cmd).as_str()));
        }

        let text = latin1(&cmd);
        match text.as_str() {
            "true" => return Ok(Token::Boolean(true)),
            "false" => return Ok(Token::Boolean(false)),
            "null" => return Ok(Token::Null),
            "BI" => self.begin_inline_image_pos = Some(self.source.pos()),
            _ => {}
        }
        Ok(Token::Command(PdfCommand::new(&text)))
    }

    fn read_number(&mut self) -> ParseResult<Token> {
        let start = self.position();
        let mut ch = self.current_char()?;
        let mut negative = false;

        if ch == Some(b'-') {
            negative = true;
            ch = self.next_char()?;
            // A doubled sign is read as a single one.
            if ch == Some(b'-') {
                ch = self.next_char()?;
            }
        } else if ch == Some(b'+') {
            ch = self.next_char()?;
        }
        while matches!(ch, Some(b'\n' | b'\r')) {
            ch = self.next_char()?;
        }

        let mut divide_by = 0.0_f64;
        if ch == Some(b'.') {
            divide_by = 10.0;
            ch = self.next_char()?;
        }

        let first = match ch {
            Some(c @ b'0'..=b'9') => c - b'0',
            Some(c) if !is_whitespace(c) => {
                return Err(ParseError::InvalidNumber {
                    position: start,
                    found: (c as char).to_string(),
                });
            }
            _ => {
                self.diagnostics.info(
                    WarningKind::BadNumber,
                    Some(start),
                    "Invalid number without digits, using 0",
                );
                return Ok(Token::Integer(0));
            }
        };

        let mut base = f64::from(first);
        let mut int_value = Some(i64::from(first));
        let mut e_notation = false;
        let mut power = 0_i32;
        let mut power_negative = false;

        while let Some(c) = self.next_char()? {
            match c {
                b'0'..=b'9' => {
                    let digit = c - b'0';
                    if e_notation {
                        power = power.saturating_mul(10).saturating_add(i32::from(digit));
                    } else {
                        if divide_by != 0.0 {
                            divide_by *= 10.0;
                        }
                        base = base * 10.0 + f64::from(digit);
                        int_value = int_value
                            .and_then(|v| v.checked_mul(10))
                            .and_then(|v| v.checked_add(i64::from(digit)));
                    }
                }
                b'.' => {
                    if divide_by == 0.0 {
                        divide_by = 1.0;
                    } else {
                        break;
                    }
                }
                b'-' => {
                    self.diagnostics.warn(
                        WarningKind::BadNumber,
                        Some(self.position()),
                        "Badly formatted number: minus sign in the middle",
                    );
                }
                b'e' | b'E' => {
                    // Either an exponent or the start of the next operator.
                    match self.peek_char()? {
                        Some(sign @ (b'+' | b'-')) => {
                            power_negative = sign == b'-';
                            self.next_char()?;
                        }
                        Some(b'0'..=b'9') => {}
                        _ => break,
                    }
                    e_notation = true;
                }
                _ => break,
            }
        }

        if !e_notation && divide_by <= 1.0 {
            if let Some(value) = int_value {
                return Ok(Token::Integer(if negative { -value } else { value }));
            }
        }

        let mut value = base;
        if divide_by > 1.0 {
            value /= divide_by;
        }
        if e_notation {
            let scale = 10f64.powi(power);
            if power_negative {
                value /= scale;
            } else {
                value *= scale;
            }
        }
        Ok(Token::Real(if negative { -value } else { value }))
    }

    fn read_literal_string(&mut self) -> ParseResult<Token> {
        let start = self.position();
        let mut depth = 1usize;
        let mut buf = Vec::new();
        let mut ch = self.next_char()?;

        loop {
            let mut char_buffered = false;
            match ch {
                None => {
                    self.diagnostics.warn(
                        WarningKind::MalformedString,
                        Some(start),
                        "Unterminated string",
                    );
                    break;
                }
                Some(b'(') => {
                    depth += 1;
                    buf.push(b'(');
                }
                Some(b')') => {
                    depth -= 1;
                    if depth == 0 {
                        self.next_char()?;
                        break;
                    }
                    buf.push(b')');
                }
                Some(b'\\') => {
                    ch = self.next_char()?;
                    match ch {
                        None => {
                            self.diagnostics.warn(
                                WarningKind::MalformedString,
                                Some(start),
                                "Unterminated string",
                            );
                            break;
                        }
                        Some(b'n') => buf.push(b'\n'),
                        Some(b'r') => buf.push(b'\r'),
                        Some(b't') => buf.push(b'\t'),
                        Some(b'b') => buf.push(0x08),
                        Some(b'f') => buf.push(0x0C),
                        Some(c @ b'0'..=b'7') => {
                            let mut value = u32::from(c - b'0');
                            char_buffered = true;
                            ch = self.next_char()?;
                            if let Some(c @ b'0'..=b'7') = ch {
                                value = (value << 3) + u32::from(c - b'0');
                                ch = self.next_char()?;
                                if let Some(c @ b'0'..=b'7') = ch {
                                    char_buffered = false;
                                    value = (value << 3) + u32::from(c - b'0');
                                }
                            }
                            buf.push((value & 0xff) as u8);
                        }
                        Some(b'\r') => {
                            // Line continuation: CR, LF or CRLF is dropped.
                            if self.peek_char()? == Some(b'\n') {
                                self.next_char()?;
                            }
                        }
                        Some(b'\n') => {}
                        Some(c) => buf.push(c),
                    }
                }
                Some(c) => buf.push(c),
            }
            if !char_buffered {
                ch = self.next_char()?;
            }
        }
        Ok(Token::String(buf))
    }

    fn read_name(&mut self) -> ParseResult<Token> {
        let start = self.position();
        let mut buf = Vec::new();

        loop {
            let c = match self.next_char()? {
                Some(c) if !is_special(c) => c,
                _ => break,
            };
            if c != b'#' {
                buf.push(c);
                continue;
            }
            let first = match self.next_char()? {
                Some(first) if !is_special(first) => first,
                _ => {
                    self.diagnostics.warn(
                        WarningKind::MalformedName,
                        Some(start),
                        "Number sign (#) in name should be followed by a hexadecimal number",
                    );
                    buf.push(b'#');
                    break;
                }
            };
            let Some(high) = hex_value(first) else {
                buf.push(b'#');
                buf.push(first);
                continue;
            };
            let second = self.next_char()?;
            match second.and_then(hex_value) {
                Some(low) => buf.push((high << 4) | low),
                None => {
                    self.diagnostics.warn(
                        WarningKind::MalformedName,
                        Some(start),
                        format!(
                            "Illegal digit ({}) in hexadecimal number in name",
                            second.map(|c| c as char).unwrap_or(' ')
                        ),
                    );
                    buf.push(b'#');
                    buf.push(first);
                    match second {
                        Some(c) if !is_special(c) => buf.push(c),
                        _ => break,
                    }
                }
            }
        }

        if buf.len() > MAX_NAME_LENGTH {
            self.diagnostics.warn(
                WarningKind::NameTooLong,
                Some(start),
                format!("Name token is longer than {MAX_NAME_LENGTH} bytes: {}", buf.len()),
            );
        }
        Ok(Token::Name(PdfName::from_bytes(&buf)))
    }

    fn read_hex_string(&mut self) -> ParseResult<Token> {
        let start = self.position().saturating_sub(1);
        let mut buf = Vec::new();
        let mut high: Option<u8> = None;
        let mut invalid = 0usize;
        let mut ch = self.current_char()?;

        loop {
            match ch {
                None => {
                    self.diagnostics.warn(
                        WarningKind::MalformedString,
                        Some(start),
                        "Unterminated hex string",
                    );
                    break;
                }
                Some(b'>') => {
                    self.next_char()?;
                    break;
                }
                Some(c) if is_whitespace(c) => {}
                Some(c) => match hex_value(c) {
                    Some(value) => match high.take() {
                        Some(h) => buf.push((h << 4) | value),
                        None => high = Some(value),
                    },
                    None => {
                        // The digit waiting for its pair is dropped with the bad character.
                        high = None;
                        invalid += 1;
                        if invalid <= MAX_HEX_STRING_NUM_WARN {
                            self.diagnostics.warn(
                                WarningKind::InvalidHexCharacter,
                                Some(self.position()),
                                format!("Ignoring invalid character \"{}\" in hex string", c as char),
                            );
                        } else if invalid == MAX_HEX_STRING_NUM_WARN + 1 {
                            self.diagnostics.warn(
                                WarningKind::InvalidHexCharacter,
                                Some(start),
                                "Too many invalid characters in hex string, ignoring the rest",
                            );
                        }
                    }
                },
            }
            ch = self.next_char()?;
        }

        if let Some(h) = high {
            buf.push(h << 4);
        }
        Ok(Token::String(buf))
    }
}
