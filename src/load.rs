//! The grammar compiler: a hand-written recursive-descent parser for the
//! ABNF meta-grammar of RFC 5234 section 4.
//!
//! The parser is lenient about line endings (CRLF or bare LF), discards
//! comments and end-of-line whitespace, folds rule names to lower case for
//! lookup while preserving their original spelling, and reads an optional
//! `!!!`-delimited semantic-action block after each rule. Failures that end
//! the rule list rewind the scanner, so the unrecognized tail is reported
//! exactly as it appears in the source.

use std::error::Error;
use std::fmt;

use crate::grammar::RuleSet;
use crate::rule::builder::RuleSetBuilder;
use crate::rule::{Base, Element};

/// Errors surfaced while compiling a grammar.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoadError {
    /// Grammar text remained after the last rule that parsed.
    IncompleteParsing {
        /// The unrecognized tail of the grammar text.
        tail: String,
        /// The 1-based line the tail starts on.
        line: usize,
    },
    /// No rule parsed at all.
    InvalidGrammar,
    /// A rule name was defined twice without `=/`.
    DuplicateRule(String),
    /// A rule reference, or an `=/` target, has no definition.
    UnresolvedRule(String),
    /// A numeric range whose low bound exceeds its high bound.
    InvalidRange {
        /// The low bound.
        lo: u8,
        /// The high bound.
        hi: u8,
    },
    /// A numeric value that does not fit in an octet.
    ValueOutOfRange(u64),
    /// A repeat whose minimum exceeds its maximum.
    InvalidRepeat {
        /// The least repetition count.
        min: u32,
        /// The greatest repetition count.
        max: u32,
    },
    /// A literal or numeric concatenation with no content.
    EmptyLiteral,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::IncompleteParsing { tail, line } => {
                write!(f, "unrecognized grammar text at line {}: {:?}", line, tail)
            }
            LoadError::InvalidGrammar => write!(f, "no rules found in the grammar text"),
            LoadError::DuplicateRule(name) => write!(f, "rule {:?} is defined twice", name),
            LoadError::UnresolvedRule(name) => write!(f, "rule {:?} has no definition", name),
            LoadError::InvalidRange { lo, hi } => {
                write!(f, "numeric range {}-{} is inverted", lo, hi)
            }
            LoadError::ValueOutOfRange(value) => {
                write!(f, "numeric value {} does not fit in an octet", value)
            }
            LoadError::InvalidRepeat { min, max } => {
                write!(f, "repeat {}*{} is inverted", min, max)
            }
            LoadError::EmptyLiteral => write!(f, "literal with no content"),
        }
    }
}

impl Error for LoadError {}

/// Compiles ABNF grammar text into a [`RuleSet`].
pub fn load(text: &str) -> Result<RuleSet, LoadError> {
    let mut parser = Parser {
        scan: Scanner::new(text),
    };
    let mut builder = RuleSetBuilder::new();
    let count = parser.rulelist(&mut builder)?;
    if count == 0 {
        return Err(LoadError::InvalidGrammar);
    }
    if !parser.scan.at_end() {
        return Err(LoadError::IncompleteParsing {
            tail: String::from_utf8_lossy(parser.scan.tail()).into_owned(),
            line: parser.scan.line,
        });
    }
    builder.finish()
}

struct Scanner<'a> {
    text: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Scanner {
            text: text.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    fn at_end(&self) -> bool {
        self.pos == self.text.len()
    }

    fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
        }
        Some(byte)
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, bytes: &[u8]) -> bool {
        if self.text[self.pos..].starts_with(bytes) {
            for _ in 0..bytes.len() {
                self.bump();
            }
            true
        } else {
            false
        }
    }

    fn mark(&self) -> (usize, usize) {
        (self.pos, self.line)
    }

    fn reset(&mut self, mark: (usize, usize)) {
        self.pos = mark.0;
        self.line = mark.1;
    }

    fn tail(&self) -> &'a [u8] {
        &self.text[self.pos..]
    }
}

struct Parser<'a> {
    scan: Scanner<'a>,
}

impl<'a> Parser<'a> {
    /// Parses `1*( rule / (*WSP c-nl) )`. Returns the number of rules read;
    /// the scanner is left at the first input that is not a rule.
    fn rulelist(&mut self, builder: &mut RuleSetBuilder) -> Result<usize, LoadError> {
        let mut count = 0;
        loop {
            self.skip_blank_lines();
            if self.scan.at_end() {
                break;
            }
            let mark = self.scan.mark();
            if self.rule(builder)? {
                count += 1;
            } else {
                self.scan.reset(mark);
                break;
            }
        }
        Ok(count)
    }

    /// Parses `rulename defined-as elements c-nl [ action-block ]`.
    /// Returns false, consuming nothing, if the input is not a rule.
    fn rule(&mut self, builder: &mut RuleSetBuilder) -> Result<bool, LoadError> {
        let line = self.scan.line;
        let spelling = match self.rulename() {
            Some(spelling) => spelling,
            None => return Ok(false),
        };
        self.skip_cwsp();
        let incremental = if self.scan.eat_str(b"=/") {
            true
        } else if self.scan.eat(b'=') {
            false
        } else {
            return Ok(false);
        };
        self.skip_cwsp();
        let element = match self.alternation()? {
            Some(element) => element,
            None => return Ok(false),
        };
        self.skip_wsp();
        if !self.cnl() && !self.scan.at_end() {
            return Ok(false);
        }
        let action = self.action_block();
        if incremental {
            builder.extend(&spelling, element)?;
        } else {
            builder.rule_at(&spelling, line, element)?;
        }
        if let Some(source) = action {
            builder.action(&spelling, &source)?;
        }
        Ok(true)
    }

    /// Parses `ALPHA *(ALPHA / DIGIT / "-")`, preserving the spelling.
    fn rulename(&mut self) -> Option<String> {
        match self.scan.peek() {
            Some(byte) if byte.is_ascii_alphabetic() => {}
            _ => return None,
        }
        let start = self.scan.pos;
        while let Some(byte) = self.scan.peek() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                self.scan.bump();
            } else {
                break;
            }
        }
        String::from_utf8(self.scan.text[start..self.scan.pos].to_vec()).ok()
    }

    /// Parses `concatenation *( *c-wsp "/" *c-wsp concatenation )`. A lone
    /// alternative is returned without an alternation wrapper.
    fn alternation(&mut self) -> Result<Option<Element>, LoadError> {
        let first = match self.concatenation()? {
            Some(element) => element,
            None => return Ok(None),
        };
        let mut alternatives = vec![first];
        loop {
            let mark = self.scan.mark();
            self.skip_cwsp();
            if !self.scan.eat(b'/') {
                self.scan.reset(mark);
                break;
            }
            self.skip_cwsp();
            match self.concatenation()? {
                Some(element) => alternatives.push(element),
                None => {
                    self.scan.reset(mark);
                    break;
                }
            }
        }
        if alternatives.len() == 1 {
            return Ok(alternatives.pop());
        }
        Ok(Some(Element::Alternation(alternatives)))
    }

    /// Parses `repetition *( 1*c-wsp repetition )`. A lone item is returned
    /// without a concatenation wrapper.
    fn concatenation(&mut self) -> Result<Option<Element>, LoadError> {
        let first = match self.repetition()? {
            Some(element) => element,
            None => return Ok(None),
        };
        let mut items = vec![first];
        loop {
            let mark = self.scan.mark();
            if !self.skip_cwsp1() {
                break;
            }
            match self.repetition()? {
                Some(element) => items.push(element),
                None => {
                    self.scan.reset(mark);
                    break;
                }
            }
        }
        if items.len() == 1 {
            return Ok(items.pop());
        }
        Ok(Some(Element::Concatenation(items)))
    }

    /// Parses `[repeat] element`. Without a repeat prefix the element is
    /// returned bare.
    fn repetition(&mut self) -> Result<Option<Element>, LoadError> {
        let mark = self.scan.mark();
        let repeat = self.repeat();
        match self.element()? {
            Some(inner) => match repeat {
                Some((min, max)) => {
                    if let Some(max) = max {
                        if min > max {
                            return Err(LoadError::InvalidRepeat { min, max });
                        }
                    }
                    Ok(Some(Element::Repetition {
                        min,
                        max,
                        inner: Box::new(inner),
                    }))
                }
                None => Ok(Some(inner)),
            },
            None => {
                self.scan.reset(mark);
                Ok(None)
            }
        }
    }

    /// Parses `1*DIGIT / (*DIGIT "*" *DIGIT)` into inclusive bounds, with
    /// `None` standing for no upper bound.
    fn repeat(&mut self) -> Option<(u32, Option<u32>)> {
        let first = self.digits();
        if self.scan.eat(b'*') {
            Some((first.unwrap_or(0), self.digits()))
        } else {
            first.map(|n| (n, Some(n)))
        }
    }

    fn digits(&mut self) -> Option<u32> {
        let mut value: Option<u32> = None;
        while let Some(byte) = self.scan.peek() {
            if byte.is_ascii_digit() {
                self.scan.bump();
                let digit = u32::from(byte - b'0');
                value = Some(
                    value
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(digit),
                );
            } else {
                break;
            }
        }
        value
    }

    /// Parses `rulename / group / option / char-val / num-val / prose-val`.
    fn element(&mut self) -> Result<Option<Element>, LoadError> {
        if let Some(name) = self.rulename() {
            return Ok(Some(Element::RuleRef(name.to_ascii_lowercase())));
        }
        if let Some(element) = self.group(b'(', b')')? {
            return Ok(Some(element));
        }
        if let Some(element) = self.group(b'[', b']')? {
            return Ok(Some(Element::Repetition {
                min: 0,
                max: Some(1),
                inner: Box::new(element),
            }));
        }
        if let Some(element) = self.char_val() {
            return Ok(Some(element));
        }
        if let Some(element) = self.num_val()? {
            return Ok(Some(element));
        }
        Ok(self.prose_val())
    }

    /// Parses a parenthesized or bracketed alternation.
    fn group(&mut self, open: u8, close: u8) -> Result<Option<Element>, LoadError> {
        let mark = self.scan.mark();
        if !self.scan.eat(open) {
            return Ok(None);
        }
        self.skip_cwsp();
        if let Some(element) = self.alternation()? {
            self.skip_cwsp();
            if self.scan.eat(close) {
                return Ok(Some(element));
            }
        }
        self.scan.reset(mark);
        Ok(None)
    }

    /// Parses a quoted string, with the `%s` / `%i` sensitivity prefixes of
    /// RFC 7405. A string of more than one character compiles to a
    /// concatenation of its characters, so that matches capture character
    /// by character.
    fn char_val(&mut self) -> Option<Element> {
        let mark = self.scan.mark();
        let case_insensitive = if self.scan.eat_str(b"%s") {
            false
        } else {
            self.scan.eat_str(b"%i");
            true
        };
        if !self.scan.eat(b'"') {
            self.scan.reset(mark);
            return None;
        }
        let mut bytes = Vec::new();
        loop {
            match self.scan.peek() {
                Some(b'"') => {
                    self.scan.bump();
                    break;
                }
                Some(byte) if byte == 0x20 || byte == 0x21 || (0x23..=0x7E).contains(&byte) => {
                    self.scan.bump();
                    bytes.push(byte);
                }
                _ => {
                    self.scan.reset(mark);
                    return None;
                }
            }
        }
        if bytes.is_empty() {
            self.scan.reset(mark);
            return None;
        }
        if bytes.len() == 1 {
            return Some(Element::Literal {
                bytes,
                case_insensitive,
            });
        }
        Some(Element::Concatenation(
            bytes
                .into_iter()
                .map(|byte| Element::Literal {
                    bytes: vec![byte],
                    case_insensitive,
                })
                .collect(),
        ))
    }

    /// Parses `"%" (bin-val / dec-val / hex-val)`: a single value, a
    /// dot-separated sequence, or a dashed range.
    fn num_val(&mut self) -> Result<Option<Element>, LoadError> {
        let mark = self.scan.mark();
        if !self.scan.eat(b'%') {
            return Ok(None);
        }
        let base = match self.scan.bump() {
            Some(b'b') | Some(b'B') => Base::Binary,
            Some(b'd') | Some(b'D') => Base::Decimal,
            Some(b'x') | Some(b'X') => Base::Hex,
            _ => {
                self.scan.reset(mark);
                return Ok(None);
            }
        };
        let first = match self.base_digits(base) {
            Some(value) => value,
            None => {
                self.scan.reset(mark);
                return Ok(None);
            }
        };
        if self.scan.eat(b'-') {
            let second = match self.base_digits(base) {
                Some(value) => value,
                None => {
                    self.scan.reset(mark);
                    return Ok(None);
                }
            };
            let lo = octet(first)?;
            let hi = octet(second)?;
            if lo > hi {
                return Err(LoadError::InvalidRange { lo, hi });
            }
            return Ok(Some(Element::NumRange { base, lo, hi }));
        }
        let mut bytes = vec![octet(first)?];
        while self.scan.eat(b'.') {
            match self.base_digits(base) {
                Some(value) => bytes.push(octet(value)?),
                None => {
                    self.scan.reset(mark);
                    return Ok(None);
                }
            }
        }
        Ok(Some(Element::NumConcat { base, bytes }))
    }

    fn base_digits(&mut self, base: Base) -> Option<u64> {
        let mut value: Option<u64> = None;
        while let Some(byte) = self.scan.peek() {
            let digit = match base {
                Base::Binary if byte == b'0' || byte == b'1' => u64::from(byte - b'0'),
                Base::Decimal if byte.is_ascii_digit() => u64::from(byte - b'0'),
                Base::Hex if byte.is_ascii_hexdigit() => {
                    u64::from((byte as char).to_digit(16).unwrap_or(0))
                }
                _ => break,
            };
            self.scan.bump();
            let radix = match base {
                Base::Binary => 2,
                Base::Decimal => 10,
                Base::Hex => 16,
            };
            value = Some(
                value
                    .unwrap_or(0)
                    .saturating_mul(radix)
                    .saturating_add(digit),
            );
        }
        value
    }

    /// Parses `"<" *(%x20-3D / %x3F-7E) ">"`.
    fn prose_val(&mut self) -> Option<Element> {
        let mark = self.scan.mark();
        if !self.scan.eat(b'<') {
            return None;
        }
        let mut bytes = Vec::new();
        loop {
            match self.scan.peek() {
                Some(b'>') => {
                    self.scan.bump();
                    break;
                }
                Some(byte) if (0x20..=0x3D).contains(&byte) || (0x3F..=0x7E).contains(&byte) => {
                    self.scan.bump();
                    bytes.push(byte);
                }
                _ => {
                    self.scan.reset(mark);
                    return None;
                }
            }
        }
        String::from_utf8(bytes).ok().map(Element::Prose)
    }

    /// Reads an optional semantic-action block: a `!!!` opener on its own
    /// line, verbatim content, and a closing `!!!`. An unterminated block is
    /// left unconsumed, so the rule list ends and the tail points at the
    /// opener.
    fn action_block(&mut self) -> Option<String> {
        let mark = self.scan.mark();
        self.skip_wsp();
        if !self.scan.eat_str(b"!!!") {
            self.scan.reset(mark);
            return None;
        }
        self.skip_wsp();
        if !self.cnl() && !self.scan.at_end() {
            self.scan.reset(mark);
            return None;
        }
        let start = self.scan.pos;
        loop {
            if self.scan.at_end() {
                self.scan.reset(mark);
                return None;
            }
            if self.scan.text[self.scan.pos..].starts_with(b"!!!") {
                break;
            }
            self.scan.bump();
        }
        let source = String::from_utf8_lossy(&self.scan.text[start..self.scan.pos]).into_owned();
        self.scan.eat_str(b"!!!");
        self.skip_wsp();
        self.cnl();
        Some(source)
    }

    /// Consumes `*WSP c-nl` lines between rules.
    fn skip_blank_lines(&mut self) {
        loop {
            let mark = self.scan.mark();
            self.skip_wsp();
            if self.scan.at_end() {
                break;
            }
            if !self.cnl() {
                self.scan.reset(mark);
                break;
            }
        }
    }

    fn skip_wsp(&mut self) {
        while let Some(b' ') | Some(b'\t') = self.scan.peek() {
            self.scan.bump();
        }
    }

    /// Consumes `*c-wsp`: whitespace, and line breaks that are followed by
    /// whitespace (continuation lines).
    fn skip_cwsp(&mut self) {
        loop {
            match self.scan.peek() {
                Some(b' ') | Some(b'\t') => {
                    self.scan.bump();
                }
                Some(b';') | Some(b'\r') | Some(b'\n') => {
                    let mark = self.scan.mark();
                    if self.cnl() && matches!(self.scan.peek(), Some(b' ') | Some(b'\t')) {
                        self.scan.bump();
                    } else {
                        self.scan.reset(mark);
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    /// Consumes `1*c-wsp`; returns whether anything was consumed.
    fn skip_cwsp1(&mut self) -> bool {
        let before = self.scan.mark();
        self.skip_cwsp();
        self.scan.mark() != before
    }

    /// Consumes `comment / CRLF`, also accepting a bare LF. Returns false,
    /// consuming nothing, at anything else.
    fn cnl(&mut self) -> bool {
        match self.scan.peek() {
            Some(b';') => {
                while let Some(byte) = self.scan.peek() {
                    self.scan.bump();
                    if byte == b'\n' {
                        break;
                    }
                }
                true
            }
            Some(b'\r') => {
                let mark = self.scan.mark();
                self.scan.bump();
                if self.scan.eat(b'\n') {
                    true
                } else {
                    self.scan.reset(mark);
                    false
                }
            }
            Some(b'\n') => {
                self.scan.bump();
                true
            }
            _ => false,
        }
    }
}

fn octet(value: u64) -> Result<u8, LoadError> {
    if value > 255 {
        Err(LoadError::ValueOutOfRange(value))
    } else {
        Ok(value as u8)
    }
}
