//! Definition of the rule-set type, the compiled form of a grammar.

use std::collections::HashMap;
use std::fmt;
use std::slice;

use crate::rule::Rule;

/// A compiled grammar: every rule of the grammar text, in definition order,
/// indexed by case-folded name.
///
/// A rule set is immutable once built and may be shared freely between any
/// number of concurrent matches.
#[derive(Clone, Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
    by_name: HashMap<String, usize>,
}

impl RuleSet {
    pub(crate) fn from_rules(rules: Vec<Rule>) -> Self {
        let by_name = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (rule.name().to_string(), i))
            .collect();
        RuleSet { rules, by_name }
    }

    /// Looks up a rule. The name is matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        let folded = name.to_ascii_lowercase();
        self.by_name.get(&folded).map(|&i| &self.rules[i])
    }

    /// Returns an iterator over the rules in definition order.
    pub fn rules(&self) -> slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Display for RuleSet {
    /// Writes the rule set back as ABNF grammar text. Loading the output
    /// produces an equal rule set.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            write!(f, "{} = {}\r\n", rule.spelling(), rule.element())?;
            if let Some(action) = rule.action() {
                write!(f, "!!!\r\n{}!!!\r\n", action)?;
            }
        }
        Ok(())
    }
}
