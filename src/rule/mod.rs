//! This module defines grammar rules. Each rule in an ABNF grammar consists
//! of a name on its left-hand side and an element tree on its right-hand
//! side. A rule may carry an opaque semantic-action payload next to its
//! element.

pub mod builder;

use std::fmt;
use std::mem;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The radix a numeric value was written in.
///
/// Only the byte values matter for matching. The base is kept so that a
/// grammar can be written back in the notation it was read in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Base {
    /// `%b` notation.
    Binary,
    /// `%d` notation.
    Decimal,
    /// `%x` notation.
    Hex,
}

/// A node of a rule's right-hand side.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Element {
    /// Ordered alternatives. The first alternative that lets the enclosing
    /// context complete wins.
    Alternation(Vec<Element>),
    /// Elements matched one after another, left to right.
    Concatenation(Vec<Element>),
    /// The inner element repeated between `min` and `max` times, greedily.
    Repetition {
        /// The least number of repetitions.
        min: u32,
        /// The most repetitions allowed, or `None` for no bound.
        max: Option<u32>,
        /// The repeated element.
        inner: Box<Element>,
    },
    /// A reference to another rule, by case-folded name.
    RuleRef(String),
    /// A literal character string.
    Literal {
        /// The literal bytes.
        bytes: Vec<u8>,
        /// Whether ASCII letters match either case.
        case_insensitive: bool,
    },
    /// A single byte whose value lies between `lo` and `hi`, inclusive.
    NumRange {
        /// The notation the bounds were written in.
        base: Base,
        /// The low bound.
        lo: u8,
        /// The high bound.
        hi: u8,
    },
    /// An exact sequence of byte values.
    NumConcat {
        /// The notation the values were written in.
        base: Base,
        /// The byte values, in order.
        bytes: Vec<u8>,
    },
    /// An informational placeholder. Matching through it is an error.
    Prose(String),
}

impl Element {
    /// Returns a case-insensitive literal element.
    pub fn literal(text: &str) -> Self {
        Element::Literal {
            bytes: text.as_bytes().to_vec(),
            case_insensitive: true,
        }
    }

    /// Returns a reference to the named rule.
    pub fn rule_ref(name: &str) -> Self {
        Element::RuleRef(name.to_ascii_lowercase())
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, level: u8) -> fmt::Result {
        match self {
            Element::Alternation(alternatives) => {
                let parens = level > 0;
                if parens {
                    f.write_str("( ")?;
                }
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" / ")?;
                    }
                    alternative.fmt_prec(f, 1)?;
                }
                if parens {
                    f.write_str(" )")?;
                }
                Ok(())
            }
            Element::Concatenation(items) => {
                if let Some((text, case_insensitive)) = literal_run(items) {
                    return write_quoted(f, &text, case_insensitive);
                }
                let parens = level > 1;
                if parens {
                    f.write_str("( ")?;
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    item.fmt_prec(f, 2)?;
                }
                if parens {
                    f.write_str(" )")?;
                }
                Ok(())
            }
            Element::Repetition {
                min: 0,
                max: Some(1),
                inner,
            } => {
                f.write_str("[ ")?;
                inner.fmt_prec(f, 0)?;
                f.write_str(" ]")
            }
            Element::Repetition { min, max, inner } => {
                let parens = level > 2;
                if parens {
                    f.write_str("( ")?;
                }
                match (min, max) {
                    (0, None) => f.write_str("*")?,
                    (m, None) => write!(f, "{}*", m)?,
                    (0, Some(n)) => write!(f, "*{}", n)?,
                    (m, Some(n)) if m == n => write!(f, "{}", m)?,
                    (m, Some(n)) => write!(f, "{}*{}", m, n)?,
                }
                inner.fmt_prec(f, 3)?;
                if parens {
                    f.write_str(" )")?;
                }
                Ok(())
            }
            Element::RuleRef(name) => f.write_str(name),
            Element::Literal {
                bytes,
                case_insensitive,
            } => match quotable(bytes) {
                // Bytes outside %x20-7E have no quoted form. They carry no
                // letter case, so the numeric rendering is equivalent.
                Some(text) => write_quoted(f, &text, *case_insensitive),
                None => write_values(f, Base::Hex, bytes),
            },
            Element::NumRange { base, lo, hi } => {
                write!(f, "%{}", base_marker(*base))?;
                write_value(f, *base, *lo)?;
                f.write_str("-")?;
                write_value(f, *base, *hi)
            }
            Element::NumConcat { base, bytes } => write_values(f, *base, bytes),
            Element::Prose(text) => write!(f, "<{}>", text),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}

fn base_marker(base: Base) -> char {
    match base {
        Base::Binary => 'b',
        Base::Decimal => 'd',
        Base::Hex => 'x',
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, base: Base, value: u8) -> fmt::Result {
    match base {
        Base::Binary => write!(f, "{:b}", value),
        Base::Decimal => write!(f, "{}", value),
        Base::Hex => write!(f, "{:02X}", value),
    }
}

fn write_values(f: &mut fmt::Formatter<'_>, base: Base, bytes: &[u8]) -> fmt::Result {
    write!(f, "%{}", base_marker(base))?;
    for (i, &byte) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(".")?;
        }
        write_value(f, base, byte)?;
    }
    Ok(())
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str, case_insensitive: bool) -> fmt::Result {
    if case_insensitive {
        write!(f, "\"{}\"", text)
    } else {
        write!(f, "%s\"{}\"", text)
    }
}

/// Returns the text of the bytes if every one of them may appear between
/// quotes in a grammar.
fn quotable(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    if bytes
        .iter()
        .all(|&byte| (0x20..=0x7E).contains(&byte) && byte != b'"')
    {
        String::from_utf8(bytes.to_vec()).ok()
    } else {
        None
    }
}

/// Joins a concatenation made entirely of single-byte literals of one case
/// mode back into the quoted string it was read from.
fn literal_run(items: &[Element]) -> Option<(String, bool)> {
    let mut bytes = Vec::with_capacity(items.len());
    let mut mode = None;
    for item in items {
        match item {
            Element::Literal {
                bytes: b,
                case_insensitive,
            } if b.len() == 1 => {
                if *mode.get_or_insert(*case_insensitive) != *case_insensitive {
                    return None;
                }
                bytes.push(b[0]);
            }
            _ => return None,
        }
    }
    let case_insensitive = mode?;
    quotable(&bytes).map(|text| (text, case_insensitive))
}

/// A named grammar production.
#[derive(Clone, Debug)]
pub struct Rule {
    name: String,
    spelling: String,
    line: usize,
    element: Element,
    action: Option<String>,
}

impl Rule {
    pub(crate) fn new(spelling: &str, line: usize, element: Element) -> Self {
        Rule {
            name: spelling.to_ascii_lowercase(),
            spelling: spelling.to_string(),
            line,
            element,
            action: None,
        }
    }

    /// Returns the case-folded name the rule is looked up by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name as it was spelled at the defining occurrence.
    pub fn spelling(&self) -> &str {
        &self.spelling
    }

    /// Returns the 1-based grammar line the rule was defined on, or 0 for
    /// rules that were not read from text.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns the rule's right-hand side.
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Returns the verbatim semantic-action payload, if the rule has one.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub(crate) fn set_action(&mut self, source: String) {
        self.action = Some(source);
    }

    /// Appends alternatives to the rule, wrapping its element in an
    /// alternation first if it is not one already.
    pub(crate) fn extend_alternation(&mut self, element: Element) {
        let old = mem::replace(&mut self.element, Element::Alternation(vec![]));
        let mut alternatives = match old {
            Element::Alternation(alternatives) => alternatives,
            other => vec![other],
        };
        match element {
            Element::Alternation(mut new) => alternatives.append(&mut new),
            other => alternatives.push(other),
        }
        self.element = Element::Alternation(alternatives);
    }
}
