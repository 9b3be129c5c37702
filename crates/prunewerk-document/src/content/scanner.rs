// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Token scanner for page-description instruction streams.
//
// Splits a decoded content stream into operands and operators without
// interpreting them. Only enough structure is recovered to group the operands
// that precede each operator: strings, names, arrays, and dictionaries are
// delimited; inline image data between `ID` and `EI` is skipped; `n g R`
// triples become indirect-reference operands.

use std::fmt;

use prunewerk_core::ObjectRef;
use thiserror::Error;

/// Arrays and dictionaries nested deeper than this are rejected.
const MAX_NESTING: usize = 64;

/// A typed operand literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f32),
    /// Literal or hexadecimal string, escapes decoded.
    String(Vec<u8>),
    /// Name without the leading slash, `#xx` escapes decoded.
    Name(Vec<u8>),
    Array(Vec<Operand>),
    Dictionary(Vec<(Vec<u8>, Operand)>),
    Reference(ObjectRef),
}

impl Operand {
    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Short label for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::String(_) => "string",
            Self::Name(_) => "name",
            Self::Array(_) => "array",
            Self::Dictionary(_) => "dictionary",
            Self::Reference(_) => "reference",
        }
    }
}

/// One lexical unit of an instruction stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Operand(Operand),
    /// A bare instruction mnemonic such as `Tf` or `Do`.
    Operator(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanErrorKind {
    UnterminatedString,
    UnterminatedHexString,
    UnterminatedArray,
    UnterminatedDictionary,
    UnterminatedInlineImage,
    UnexpectedDelimiter(char),
    /// Dictionary key that is not a name, or a key without a value.
    MalformedDictionary,
    NestingTooDeep,
}

impl fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => f.write_str("unterminated string"),
            Self::UnterminatedHexString => f.write_str("unterminated hex string"),
            Self::UnterminatedArray => f.write_str("unterminated array"),
            Self::UnterminatedDictionary => f.write_str("unterminated dictionary"),
            Self::UnterminatedInlineImage => f.write_str("inline image data without EI"),
            Self::UnexpectedDelimiter(c) => write!(f, "unexpected '{c}'"),
            Self::MalformedDictionary => f.write_str("malformed dictionary"),
            Self::NestingTooDeep => write!(f, "nesting deeper than {MAX_NESTING}"),
        }
    }
}

/// The stream could not be delimited. Scanning stops after this.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at byte {offset}")]
pub struct ScanError {
    pub offset: usize,
    pub kind: ScanErrorKind,
}

/// Lazily scan `bytes` into tokens.
pub fn tokenize(bytes: &[u8]) -> Tokens<'_> {
    Tokens::new(bytes)
}

/// Lazy, finite token sequence over one decoded stream.
///
/// Yields `Err` at most once; the sequence ends after an error or at the end
/// of the input.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Set after an `ID` operator: the next call skips the binary image data.
    inline_data: bool,
    finished: bool,
}

/// Result of lexing one item inside or outside a container.
enum Lexeme<'a> {
    Operand(Operand),
    Keyword(&'a [u8]),
    ArrayEnd,
    DictEnd,
}

impl<'a> Tokens<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            inline_data: false,
            finished: false,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ScanError> {
        if self.inline_data {
            self.inline_data = false;
            return self.skip_inline_data().map(Some);
        }
        let start = self.pos;
        match self.lex(0)? {
            None => Ok(None),
            Some(Lexeme::Operand(operand)) => Ok(Some(Token::Operand(operand))),
            Some(Lexeme::Keyword(word)) => {
                if word == b"ID" {
                    self.inline_data = true;
                }
                Ok(Some(Token::Operator(
                    String::from_utf8_lossy(word).into_owned(),
                )))
            }
            Some(Lexeme::ArrayEnd) => Err(self.error(start, ScanErrorKind::UnexpectedDelimiter(']'))),
            Some(Lexeme::DictEnd) => Err(self.error(start, ScanErrorKind::UnexpectedDelimiter('>'))),
        }
    }

    fn lex(&mut self, depth: usize) -> Result<Option<Lexeme<'a>>, ScanError> {
        self.skip_ws_and_comments();
        let start = self.pos;
        let Some(b) = self.peek() else {
            return Ok(None);
        };
        let lexeme = match b {
            b'/' => Lexeme::Operand(Operand::Name(self.read_name())),
            b'(' => Lexeme::Operand(Operand::String(self.read_literal_string()?)),
            b'<' if self.peek_at(1) == Some(b'<') => {
                self.pos += 2;
                Lexeme::Operand(self.read_dictionary(start, depth + 1)?)
            }
            b'<' => Lexeme::Operand(Operand::String(self.read_hex_string()?)),
            b'>' if self.peek_at(1) == Some(b'>') => {
                self.pos += 2;
                Lexeme::DictEnd
            }
            b'[' => {
                self.pos += 1;
                Lexeme::Operand(self.read_array(start, depth + 1)?)
            }
            b']' => {
                self.pos += 1;
                Lexeme::ArrayEnd
            }
            b')' | b'>' => {
                return Err(self.error(start, ScanErrorKind::UnexpectedDelimiter(b as char)));
            }
            b'{' | b'}' => {
                self.pos += 1;
                let bytes = self.bytes;
                Lexeme::Keyword(&bytes[start..self.pos])
            }
            _ => self.read_word(),
        };
        Ok(Some(lexeme))
    }

    // -- Containers -----------------------------------------------------------

    fn read_array(&mut self, start: usize, depth: usize) -> Result<Operand, ScanError> {
        if depth > MAX_NESTING {
            return Err(self.error(start, ScanErrorKind::NestingTooDeep));
        }
        let mut items = Vec::new();
        loop {
            match self.lex(depth)? {
                None => return Err(self.error(start, ScanErrorKind::UnterminatedArray)),
                Some(Lexeme::ArrayEnd) => return Ok(Operand::Array(items)),
                Some(Lexeme::DictEnd) => {
                    return Err(self.error(self.pos - 2, ScanErrorKind::UnexpectedDelimiter('>')));
                }
                Some(Lexeme::Operand(item)) => items.push(item),
                // Stray keywords inside arrays carry no operand value.
                Some(Lexeme::Keyword(_)) => {}
            }
        }
    }

    fn read_dictionary(&mut self, start: usize, depth: usize) -> Result<Operand, ScanError> {
        if depth > MAX_NESTING {
            return Err(self.error(start, ScanErrorKind::NestingTooDeep));
        }
        let mut entries = Vec::new();
        loop {
            let key = match self.lex(depth)? {
                None => return Err(self.error(start, ScanErrorKind::UnterminatedDictionary)),
                Some(Lexeme::DictEnd) => return Ok(Operand::Dictionary(entries)),
                Some(Lexeme::Operand(Operand::Name(key))) => key,
                Some(_) => return Err(self.error(start, ScanErrorKind::MalformedDictionary)),
            };
            match self.lex(depth)? {
                None => return Err(self.error(start, ScanErrorKind::UnterminatedDictionary)),
                Some(Lexeme::Operand(value)) => entries.push((key, value)),
                Some(_) => return Err(self.error(start, ScanErrorKind::MalformedDictionary)),
            }
        }
    }

    // -- Atoms ----------------------------------------------------------------

    fn read_name(&mut self) -> Vec<u8> {
        self.pos += 1;
        let raw_start = self.pos;
        while let Some(b) = self.peek() {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            self.pos += 1;
        }
        decode_name(&self.bytes[raw_start..self.pos])
    }

    fn read_literal_string(&mut self) -> Result<Vec<u8>, ScanError> {
        let start = self.pos;
        self.pos += 1;
        let mut depth = 1usize;
        let mut out = Vec::new();
        while let Some(b) = self.consume() {
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                b'\\' => {
                    let Some(next) = self.consume() else { break };
                    match next {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut value = u32::from(next - b'0');
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + u32::from(d - b'0');
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xff) as u8);
                        }
                        other => out.push(other),
                    }
                }
                _ => out.push(b),
            }
        }
        Err(self.error(start, ScanErrorKind::UnterminatedString))
    }

    fn read_hex_string(&mut self) -> Result<Vec<u8>, ScanError> {
        let start = self.pos;
        self.pos += 1;
        let mut digits = Vec::new();
        while let Some(b) = self.consume() {
            if b == b'>' {
                if digits.len() % 2 == 1 {
                    digits.push(0);
                }
                return Ok(digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect());
            }
            if let Some(v) = hex_value(b) {
                digits.push(v);
            }
        }
        Err(self.error(start, ScanErrorKind::UnterminatedHexString))
    }

    /// Numbers, booleans, null, references, and operator keywords.
    fn read_word(&mut self) -> Lexeme<'a> {
        let mut word = self.take_regular();
        match word {
            b"true" => return Lexeme::Operand(Operand::Boolean(true)),
            b"false" => return Lexeme::Operand(Operand::Boolean(false)),
            b"null" => return Lexeme::Operand(Operand::Null),
            _ => {}
        }
        if !is_numeric(word) {
            // `12Tf`: the operand ends where the operator begins.
            let split = numeric_prefix(word);
            if split == 0 {
                return Lexeme::Keyword(word);
            }
            self.pos -= word.len() - split;
            word = &word[..split];
        }
        if word.iter().all(u8::is_ascii_digit)
            && let Some(reference) = self.try_reference(word)
        {
            return Lexeme::Operand(Operand::Reference(reference));
        }
        Lexeme::Operand(parse_number(word))
    }

    /// Having read an unsigned integer, look ahead for `<gen> R`.
    fn try_reference(&mut self, number: &[u8]) -> Option<ObjectRef> {
        let mark = self.pos;
        let reference = self.reference_tail(number);
        if reference.is_none() {
            self.pos = mark;
        }
        reference
    }

    fn reference_tail(&mut self, number: &[u8]) -> Option<ObjectRef> {
        self.skip_whitespace();
        let generation = self.take_regular();
        if generation.is_empty() || !generation.iter().all(u8::is_ascii_digit) {
            return None;
        }
        self.skip_whitespace();
        if self.take_regular() != b"R" {
            return None;
        }
        let number = std::str::from_utf8(number).ok()?.parse().ok()?;
        let generation = std::str::from_utf8(generation).ok()?.parse().ok()?;
        Some((number, generation))
    }

    /// Skip binary inline image data up to and including `EI`.
    fn skip_inline_data(&mut self) -> Result<Token, ScanError> {
        let start = self.pos;
        // A single whitespace byte separates `ID` from the data.
        if self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
        let data = &self.bytes[self.pos..];
        let found = (0..data.len().saturating_sub(1)).find(|&i| {
            data[i] == b'E'
                && data[i + 1] == b'I'
                && (i == 0 || is_whitespace(data[i - 1]))
                && data
                    .get(i + 2)
                    .is_none_or(|&b| is_whitespace(b) || is_delimiter(b))
        });
        match found {
            Some(i) => {
                self.pos += i + 2;
                Ok(Token::Operator("EI".to_string()))
            }
            None => Err(self.error(start, ScanErrorKind::UnterminatedInlineImage)),
        }
    }

    // -- Cursor ---------------------------------------------------------------

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.pos + n).copied()
    }

    fn consume(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn take_regular(&mut self) -> &'a [u8] {
        let bytes = self.bytes;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_whitespace(b) || is_delimiter(b) {
                break;
            }
            self.pos += 1;
        }
        &bytes[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'%') {
                break;
            }
            while let Some(b) = self.consume() {
                if b == b'\n' || b == b'\r' {
                    break;
                }
            }
        }
    }

    fn error(&self, offset: usize, kind: ScanErrorKind) -> ScanError {
        ScanError { offset, kind }
    }
}

impl Iterator for Tokens<'_> {
    type Item = Result<Token, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for Tokens<'_> {}

pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\x00' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

pub fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Length of the leading number in `word`, 0 when it does not start with one.
fn numeric_prefix(word: &[u8]) -> usize {
    let len = word
        .iter()
        .take_while(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.'))
        .count();
    if word[..len].iter().any(u8::is_ascii_digit) {
        len
    } else {
        0
    }
}

fn is_numeric(word: &[u8]) -> bool {
    !word.is_empty()
        && word
            .iter()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.'))
}

/// Malformed numbers such as `1.2.3` or a lone `-` read as zero.
fn parse_number(word: &[u8]) -> Operand {
    let text = std::str::from_utf8(word).unwrap_or("0");
    if !text.contains('.')
        && let Ok(value) = text.parse::<i64>()
    {
        return Operand::Integer(value);
    }
    text.parse::<f32>()
        .map(Operand::Real)
        .unwrap_or(Operand::Integer(0))
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn decode_name(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#'
            && let (Some(hi), Some(lo)) = (
                raw.get(i + 1).copied().and_then(hex_value),
                raw.get(i + 2).copied().and_then(hex_value),
            )
        {
            out.push((hi << 4) | lo);
            i += 3;
            continue;
        }
        out.push(raw[i]);
        i += 1;
    }
    out
}
