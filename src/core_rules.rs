//! The core rules of RFC 5234, Appendix B. Rule references that a grammar
//! leaves undefined are satisfied from here, so every grammar can use
//! `ALPHA`, `DIGIT`, `CRLF` and the rest without spelling them out. A
//! grammar's own definition of one of these names takes precedence.

use crate::rule::{Base, Element};

/// Looks up a core rule by case-folded name. Returns the canonical spelling
/// and the rule's element.
pub fn core_rule(name: &str) -> Option<(&'static str, Element)> {
    let (spelling, element) = match name {
        "alpha" => ("ALPHA", alts(vec![range(0x41, 0x5A), range(0x61, 0x7A)])),
        "bit" => ("BIT", alts(vec![Element::literal("0"), Element::literal("1")])),
        "char" => ("CHAR", range(0x01, 0x7F)),
        "cr" => ("CR", byte(0x0D)),
        "crlf" => ("CRLF", seq(vec![rule("cr"), rule("lf")])),
        "ctl" => ("CTL", alts(vec![range(0x00, 0x1F), byte(0x7F)])),
        "digit" => ("DIGIT", range(0x30, 0x39)),
        "dquote" => ("DQUOTE", byte(0x22)),
        "hexdig" => (
            "HEXDIG",
            alts(vec![
                rule("digit"),
                Element::literal("A"),
                Element::literal("B"),
                Element::literal("C"),
                Element::literal("D"),
                Element::literal("E"),
                Element::literal("F"),
            ]),
        ),
        "htab" => ("HTAB", byte(0x09)),
        "lf" => ("LF", byte(0x0A)),
        "lwsp" => (
            "LWSP",
            Element::Repetition {
                min: 0,
                max: None,
                inner: Box::new(alts(vec![
                    rule("wsp"),
                    seq(vec![rule("crlf"), rule("wsp")]),
                ])),
            },
        ),
        "octet" => ("OCTET", range(0x00, 0xFF)),
        "sp" => ("SP", byte(0x20)),
        "vchar" => ("VCHAR", range(0x21, 0x7E)),
        "wsp" => ("WSP", alts(vec![rule("sp"), rule("htab")])),
        _ => return None,
    };
    Some((spelling, element))
}

fn alts(alternatives: Vec<Element>) -> Element {
    Element::Alternation(alternatives)
}

fn seq(items: Vec<Element>) -> Element {
    Element::Concatenation(items)
}

fn range(lo: u8, hi: u8) -> Element {
    Element::NumRange {
        base: Base::Hex,
        lo,
        hi,
    }
}

fn byte(value: u8) -> Element {
    Element::NumConcat {
        base: Base::Hex,
        bytes: vec![value],
    }
}

fn rule(name: &str) -> Element {
    Element::RuleRef(name.to_string())
}
