mod grammars;

use abnf::{load, Base, Element, LoadError, RuleSetBuilder};
use test_case::test_case;

use grammars::rfc5234;

fn lit(ch: char) -> Element {
    Element::Literal {
        bytes: vec![ch as u8],
        case_insensitive: true,
    }
}

#[test]
fn test_single_literal_rule() {
    let rules = load("string1 = \"test\"\n").unwrap();
    assert_eq!(rules.len(), 1);
    let rule = rules.get("STRING1").unwrap();
    assert_eq!(rule.name(), "string1");
    assert_eq!(rule.spelling(), "string1");
    assert_eq!(rule.line(), 1);
    assert_eq!(
        *rule.element(),
        Element::Concatenation(vec![lit('t'), lit('e'), lit('s'), lit('t')])
    );
}

#[test_case("*DIGIT", 0, None ; "any count")]
#[test_case("1*DIGIT", 1, None ; "at least one")]
#[test_case("*4DIGIT", 0, Some(4) ; "at most four")]
#[test_case("2*4DIGIT", 2, Some(4) ; "two to four")]
#[test_case("3DIGIT", 3, Some(3) ; "exactly three")]
fn test_repeat_forms(rhs: &str, min: u32, max: Option<u32>) {
    let text = format!("r = {}\n", rhs);
    let rules = load(&text).unwrap();
    match rules.get("r").unwrap().element() {
        Element::Repetition {
            min: parsed_min,
            max: parsed_max,
            inner,
        } => {
            assert_eq!((*parsed_min, *parsed_max), (min, max));
            assert_eq!(**inner, Element::RuleRef("digit".to_string()));
        }
        other => panic!("expected a repetition, got {}", other),
    }
}

#[test]
fn test_num_val_forms() {
    let rules = load("eol = %d13.10\n").unwrap();
    assert_eq!(
        *rules.get("eol").unwrap().element(),
        Element::NumConcat {
            base: Base::Decimal,
            bytes: vec![13, 10],
        }
    );

    let rules = load("nonzero = %x31-39\n").unwrap();
    assert_eq!(
        *rules.get("nonzero").unwrap().element(),
        Element::NumRange {
            base: Base::Hex,
            lo: 0x31,
            hi: 0x39,
        }
    );

    let rules = load("one = %b1\n").unwrap();
    assert_eq!(
        *rules.get("one").unwrap().element(),
        Element::NumConcat {
            base: Base::Binary,
            bytes: vec![1],
        }
    );

    let rules = load("del = %x7F\n").unwrap();
    assert_eq!(
        *rules.get("del").unwrap().element(),
        Element::NumConcat {
            base: Base::Hex,
            bytes: vec![0x7F],
        }
    );
}

#[test]
fn test_value_out_of_range() {
    assert_eq!(
        load("r = %d256\n").unwrap_err(),
        LoadError::ValueOutOfRange(256)
    );
}

#[test]
fn test_inverted_range() {
    assert_eq!(
        load("r = %x39-30\n").unwrap_err(),
        LoadError::InvalidRange { lo: 0x39, hi: 0x30 }
    );
}

#[test]
fn test_inverted_repeat() {
    assert_eq!(
        load("r = 5*2\"a\"\n").unwrap_err(),
        LoadError::InvalidRepeat { min: 5, max: 2 }
    );
}

#[test]
fn test_duplicate_rule() {
    assert_eq!(
        load("a = \"x\"\na = \"y\"\n").unwrap_err(),
        LoadError::DuplicateRule("a".to_string())
    );
}

#[test]
fn test_incremental_alternative() {
    let extended = load("a = \"x\"\na =/ \"y\"\n").unwrap();
    let spelled_out = load("a = \"x\" / \"y\"\n").unwrap();
    assert_eq!(
        extended.get("a").unwrap().element(),
        spelled_out.get("a").unwrap().element()
    );
    assert_eq!(
        *extended.get("a").unwrap().element(),
        Element::Alternation(vec![lit('x'), lit('y')])
    );
}

#[test]
fn test_extending_undefined_rule() {
    assert_eq!(
        load("a =/ \"x\"\n").unwrap_err(),
        LoadError::UnresolvedRule("a".to_string())
    );
}

#[test]
fn test_unresolved_reference() {
    assert_eq!(
        load("a = b\n").unwrap_err(),
        LoadError::UnresolvedRule("b".to_string())
    );
}

#[test]
fn test_core_rules_are_provided() {
    let rules = load("token = 1*ALPHA\n").unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules.get("alpha").unwrap().spelling(), "ALPHA");
}

#[test]
fn test_user_definition_overrides_core() {
    let rules = load("digit = \"x\"\nnum = 1*digit\n").unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(*rules.get("digit").unwrap().element(), lit('x'));
}

#[test]
fn test_comments_and_blank_lines() {
    let text = "; a grammar\n\na = \"x\" ; trailing note\n\n   ; indented comment\nb = a\n";
    let rules = load(text).unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(rules.get("b").unwrap().line(), 6);
}

#[test]
fn test_continuation_line() {
    let rules = load("a = \"x\"\n      / \"y\"\n").unwrap();
    assert_eq!(
        *rules.get("a").unwrap().element(),
        Element::Alternation(vec![lit('x'), lit('y')])
    );
}

#[test]
fn test_crlf_line_endings() {
    let rules = load("a = \"x\"\r\nb = a\r\n").unwrap();
    assert_eq!(rules.len(), 2);
}

#[test]
fn test_incomplete_parsing() {
    match load("a = \"x\"\nb = \n") {
        Err(LoadError::IncompleteParsing { tail, line }) => {
            assert!(tail.starts_with("b = "));
            assert_eq!(line, 2);
        }
        other => panic!("expected an incomplete parse, got {:?}", other),
    }
}

#[test]
fn test_invalid_grammar() {
    assert_eq!(load("12345\n").unwrap_err(), LoadError::InvalidGrammar);
    assert_eq!(load("").unwrap_err(), LoadError::InvalidGrammar);
}

#[test]
fn test_action_block() {
    let text = "port = 1*DIGIT\n!!!\nstate + 1\n!!!\nhost = 1*ALPHA\n";
    let rules = load(text).unwrap();
    assert_eq!(rules.get("port").unwrap().action(), Some("state + 1\n"));
    assert_eq!(rules.get("host").unwrap().action(), None);
}

#[test]
fn test_unterminated_action_block() {
    match load("a = \"x\"\n!!!\nnever closed\n") {
        Err(LoadError::IncompleteParsing { tail, .. }) => {
            assert!(tail.starts_with("!!!"));
        }
        other => panic!("expected an incomplete parse, got {:?}", other),
    }
}

#[test]
fn test_literal_sensitivity_prefixes() {
    let rules = load("a = %s\"aB\"\n").unwrap();
    assert_eq!(
        *rules.get("a").unwrap().element(),
        Element::Concatenation(vec![
            Element::Literal {
                bytes: vec![b'a'],
                case_insensitive: false,
            },
            Element::Literal {
                bytes: vec![b'B'],
                case_insensitive: false,
            },
        ])
    );

    let rules = load("b = %i\"c\"\n").unwrap();
    assert_eq!(*rules.get("b").unwrap().element(), lit('c'));
}

#[test]
fn test_prose_value() {
    let rules = load("a = <any octets>\n").unwrap();
    assert_eq!(
        *rules.get("a").unwrap().element(),
        Element::Prose("any octets".to_string())
    );
}

#[test]
fn test_lookup_folds_case() {
    let rules = load("MyRule = \"x\"\n").unwrap();
    let rule = rules.get("myrule").unwrap();
    assert_eq!(rule.spelling(), "MyRule");
    assert_eq!(rule.name(), "myrule");
}

#[test]
fn test_display_round_trip() {
    let text = concat!(
        "a = 2*4\"ab\" [ \"c\" ]\n",
        "b = %x41-5A / %d10.13 / a\n",
        "c = *( \"x\" / %b1 )\n",
        "d = %s\"Qq\"\n",
        "e = 1*DIGIT\n",
        "!!!\nstate\n!!!\n",
    );
    let rules = load(text).unwrap();
    let printed = rules.to_string();
    let reloaded = load(&printed).unwrap();
    let originals: Vec<_> = rules
        .rules()
        .map(|rule| (rule.name().to_string(), rule.element().clone(), rule.action().map(str::to_string)))
        .collect();
    let round_tripped: Vec<_> = reloaded
        .rules()
        .map(|rule| (rule.name().to_string(), rule.element().clone(), rule.action().map(str::to_string)))
        .collect();
    assert_eq!(originals, round_tripped);
}

#[test]
fn test_self_description_loads() {
    let rules = load(rfc5234::GRAMMAR).unwrap();
    assert_eq!(rules.len(), 33);
    assert!(rules.get("rulelist").is_some());
    assert!(rules.get("char-val").is_some());
    assert!(rules.get("crlf").is_some());
}

#[test]
fn test_builder() {
    let mut builder = RuleSetBuilder::new();
    builder
        .rule("greeting", Element::literal("hello"))
        .unwrap()
        .rule("item", Element::rule_ref("Greeting"))
        .unwrap();
    let rules = builder.finish().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(
        *rules.get("item").unwrap().element(),
        Element::RuleRef("greeting".to_string())
    );
}

#[test]
fn test_builder_rejects_bad_elements() {
    let mut builder = RuleSetBuilder::new();
    let inverted = Element::Repetition {
        min: 3,
        max: Some(1),
        inner: Box::new(Element::literal("x")),
    };
    assert_eq!(
        builder.rule("a", inverted).unwrap_err(),
        LoadError::InvalidRepeat { min: 3, max: 1 }
    );
    assert_eq!(
        builder.rule("b", Element::literal("")).unwrap_err(),
        LoadError::EmptyLiteral
    );

    let mut builder = RuleSetBuilder::new();
    builder.rule("a", Element::rule_ref("missing")).unwrap();
    assert_eq!(
        builder.finish().unwrap_err(),
        LoadError::UnresolvedRule("missing".to_string())
    );
}
