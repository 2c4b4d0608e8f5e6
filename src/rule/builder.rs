//! Rule sets can be built with the builder pattern. The grammar loader goes
//! through this builder; it can also be used directly to assemble a grammar
//! programmatically.

use std::collections::HashMap;

use log::debug;

use crate::core_rules::core_rule;
use crate::grammar::RuleSet;
use crate::load::LoadError;
use crate::rule::{Element, Rule};

/// The rule-set builder.
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    rules: Vec<Rule>,
    by_name: HashMap<String, usize>,
}

impl RuleSetBuilder {
    /// Creates a rule-set builder.
    pub fn new() -> Self {
        RuleSetBuilder::default()
    }

    /// Defines a rule. Defining the same name twice is an error; use
    /// [`extend`](RuleSetBuilder::extend) to add alternatives instead.
    pub fn rule(&mut self, spelling: &str, element: Element) -> Result<&mut Self, LoadError> {
        self.rule_at(spelling, 0, element)
    }

    /// Defines a rule, recording the grammar line it came from.
    pub fn rule_at(
        &mut self,
        spelling: &str,
        line: usize,
        element: Element,
    ) -> Result<&mut Self, LoadError> {
        validate(&element)?;
        let name = spelling.to_ascii_lowercase();
        if self.by_name.contains_key(&name) {
            return Err(LoadError::DuplicateRule(spelling.to_string()));
        }
        debug!("defined rule {:?}", spelling);
        self.by_name.insert(name, self.rules.len());
        self.rules.push(Rule::new(spelling, line, element));
        Ok(self)
    }

    /// Appends alternatives to an already-defined rule, as `=/` does.
    /// Extending an undefined rule is an error.
    pub fn extend(&mut self, spelling: &str, element: Element) -> Result<&mut Self, LoadError> {
        validate(&element)?;
        let name = spelling.to_ascii_lowercase();
        match self.by_name.get(&name) {
            Some(&i) => {
                debug!("extended rule {:?}", spelling);
                self.rules[i].extend_alternation(element);
                Ok(self)
            }
            None => Err(LoadError::UnresolvedRule(spelling.to_string())),
        }
    }

    /// Attaches a semantic-action payload to an already-defined rule,
    /// replacing any previous payload.
    pub fn action(&mut self, spelling: &str, source: &str) -> Result<&mut Self, LoadError> {
        let name = spelling.to_ascii_lowercase();
        match self.by_name.get(&name) {
            Some(&i) => {
                self.rules[i].set_action(source.to_string());
                Ok(self)
            }
            None => Err(LoadError::UnresolvedRule(spelling.to_string())),
        }
    }

    /// Checks that every rule reference resolves and returns the finished
    /// set. References to core-rule names that the grammar does not define
    /// are satisfied from [`core_rules`](crate::core_rules); any other
    /// unresolved reference is an error.
    pub fn finish(mut self) -> Result<RuleSet, LoadError> {
        let mut queue = Vec::new();
        for rule in &self.rules {
            refs_of(rule.element(), &mut queue);
        }
        while let Some(name) = queue.pop() {
            if self.by_name.contains_key(&name) {
                continue;
            }
            match core_rule(&name) {
                Some((spelling, element)) => {
                    debug!("providing core rule {:?}", spelling);
                    refs_of(&element, &mut queue);
                    self.by_name.insert(name, self.rules.len());
                    self.rules.push(Rule::new(spelling, 0, element));
                }
                None => return Err(LoadError::UnresolvedRule(name)),
            }
        }
        Ok(RuleSet::from_rules(self.rules))
    }
}

fn refs_of(element: &Element, out: &mut Vec<String>) {
    match element {
        Element::Alternation(list) | Element::Concatenation(list) => {
            for item in list {
                refs_of(item, out);
            }
        }
        Element::Repetition { inner, .. } => refs_of(inner, out),
        Element::RuleRef(name) => out.push(name.clone()),
        Element::Literal { .. }
        | Element::NumRange { .. }
        | Element::NumConcat { .. }
        | Element::Prose(_) => {}
    }
}

fn validate(element: &Element) -> Result<(), LoadError> {
    match element {
        Element::Alternation(list) | Element::Concatenation(list) => {
            for item in list {
                validate(item)?;
            }
            Ok(())
        }
        Element::Repetition { min, max, inner } => {
            if let Some(max) = *max {
                if *min > max {
                    return Err(LoadError::InvalidRepeat { min: *min, max });
                }
            }
            validate(inner)
        }
        Element::Literal { bytes, .. } | Element::NumConcat { bytes, .. } => {
            if bytes.is_empty() {
                Err(LoadError::EmptyLiteral)
            } else {
                Ok(())
            }
        }
        Element::NumRange { lo, hi, .. } => {
            if lo > hi {
                Err(LoadError::InvalidRange { lo: *lo, hi: *hi })
            } else {
                Ok(())
            }
        }
        Element::RuleRef(_) | Element::Prose(_) => Ok(()),
    }
}
