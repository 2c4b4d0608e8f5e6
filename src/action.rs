//! Semantic actions: host callbacks bound to rule names, invoked whenever
//! the rule matches. An action receives the matched text, the rule's
//! capture tree and the user state, and decides whether the match stands.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use crate::apply::Value;

/// A hard failure raised by an action. It aborts the whole match and is
/// handed back to the caller unchanged.
pub type ActionError = Box<dyn Error + Send + Sync>;

/// The boxed callback type bound to a rule name.
pub type ActionFn<S> =
    Box<dyn Fn(&[u8], &Value, S) -> Result<ActionOutcome<S>, ActionError> + Send + Sync>;

/// What an action decided about a successful rule match.
pub enum ActionOutcome<S> {
    /// Accept the match, keeping the rule's capture.
    Keep(S),
    /// Accept the match, substituting the given value for the rule's
    /// capture.
    Replace(S, Value),
    /// Reject the match. The rule fails as if its body had not matched and
    /// backtracking resumes.
    Fail,
}

/// Callbacks registered per rule name.
pub struct Actions<S> {
    handlers: HashMap<String, ActionFn<S>>,
}

impl<S> Actions<S> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Actions {
            handlers: HashMap::new(),
        }
    }

    /// Binds a callback to a rule name. The name is matched
    /// case-insensitively; a later binding replaces an earlier one.
    pub fn bind<F>(&mut self, rule: &str, handler: F)
    where
        F: Fn(&[u8], &Value, S) -> Result<ActionOutcome<S>, ActionError> + Send + Sync + 'static,
    {
        self.handlers
            .insert(rule.to_ascii_lowercase(), Box::new(handler));
    }

    /// Looks up the callback bound to a rule name.
    pub fn get(&self, rule: &str) -> Option<&ActionFn<S>> {
        self.handlers.get(&rule.to_ascii_lowercase())
    }

    /// Returns true if no callback is bound.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<S> Default for Actions<S> {
    fn default() -> Self {
        Actions::new()
    }
}

impl<S> fmt::Debug for Actions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions")
            .field("rules", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
