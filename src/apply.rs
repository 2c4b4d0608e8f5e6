//! The grammar interpreter: a backtracking matcher that walks a rule's
//! element tree against input bytes.
//!
//! Matching is written in continuation-passing style. Every element hands
//! each candidate match to a sink closure standing for the rest of the
//! enclosing context; the sink answers whether the whole match completed.
//! Alternatives are tried in source order and repetitions are greedy, so
//! the first completed match is the leftmost-greediest one. Failures inside
//! the walk are ordinary control flow; only action aborts, prose values,
//! and the depth cap surface as errors.

use std::error::Error;
use std::fmt;

use log::{debug, trace};

use crate::action::{ActionError, ActionOutcome, Actions};
use crate::grammar::RuleSet;
use crate::rule::Element;

/// The default bound on interpreter recursion.
pub const DEFAULT_DEPTH_LIMIT: usize = 4096;

/// A capture produced by a match, or a replacement supplied by an action.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// The bytes a terminal element consumed.
    Bytes(Vec<u8>),
    /// The captures of an element's children.
    List(Vec<Value>),
    /// An integer produced by an action.
    Int(i64),
    /// A string produced by an action.
    Str(String),
}

impl Value {
    /// Returns the byte capture, if this is one.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the child captures, if this is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

/// The result of a successful top-level match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaptureResult<S> {
    /// The original input.
    pub input: Vec<u8>,
    /// The consumed prefix of the input.
    pub string_text: Vec<u8>,
    /// The unconsumed suffix of the input.
    pub rest: Vec<u8>,
    /// The byte slices consumed at the immediate children of the start
    /// rule's element.
    pub string_tokens: Vec<Vec<u8>>,
    /// The capture tree, or whatever the start rule's action returned.
    pub values: Value,
    /// The user state after the last semantic action.
    pub state: S,
}

/// Errors surfaced while matching.
#[derive(Debug)]
pub enum ApplyError {
    /// The start rule is not in the rule set.
    UnknownRule(String),
    /// No derivation of the start rule matches a prefix of the input.
    NoMatch,
    /// Matching reached a prose value, which cannot be resolved.
    Prose(String),
    /// The recursion depth cap was exceeded.
    DepthLimit(usize),
    /// A semantic action raised a hard failure.
    Action(ActionError),
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyError::UnknownRule(name) => write!(f, "no rule named {:?}", name),
            ApplyError::NoMatch => write!(f, "the input does not match the rule"),
            ApplyError::Prose(text) => {
                write!(f, "matching reached unresolvable prose value <{}>", text)
            }
            ApplyError::DepthLimit(limit) => {
                write!(f, "recursion depth limit of {} exceeded", limit)
            }
            ApplyError::Action(error) => write!(f, "semantic action failed: {}", error),
        }
    }
}

impl Error for ApplyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApplyError::Action(error) => Some(&**error),
            _ => None,
        }
    }
}

/// Matches a rule against a prefix of the input without semantic actions.
///
/// Rules that carry action payloads match as if they had none. Bind
/// callbacks with a [`Matcher`] to execute actions.
pub fn apply<S: Clone>(
    rules: &RuleSet,
    rule: &str,
    input: &[u8],
    state: S,
) -> Result<CaptureResult<S>, ApplyError> {
    Matcher::new(rules).apply(rule, input, state)
}

/// A matcher: a rule set together with bound action callbacks and resource
/// bounds. Built in the builder style; reusable for any number of calls.
#[derive(Debug)]
pub struct Matcher<'g, S> {
    rules: &'g RuleSet,
    actions: Actions<S>,
    depth_limit: usize,
}

impl<'g, S: Clone> Matcher<'g, S> {
    /// Creates a matcher over a rule set with no bound actions.
    pub fn new(rules: &'g RuleSet) -> Self {
        Matcher {
            rules,
            actions: Actions::new(),
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }

    /// Binds an action callback to a rule name.
    pub fn action<F>(mut self, rule: &str, handler: F) -> Self
    where
        F: Fn(&[u8], &Value, S) -> Result<ActionOutcome<S>, ActionError> + Send + Sync + 'static,
    {
        self.actions.bind(rule, handler);
        self
    }

    /// Assigns the bound on interpreter recursion. Exceeding it aborts the
    /// match with [`ApplyError::DepthLimit`] instead of exhausting the
    /// stack.
    pub fn depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit;
        self
    }

    /// Matches a rule against a prefix of the input, starting from an
    /// initial state.
    pub fn apply(
        &self,
        rule: &str,
        input: &[u8],
        state: S,
    ) -> Result<CaptureResult<S>, ApplyError> {
        let folded = rule.to_ascii_lowercase();
        let rule = match self.rules.get(&folded) {
            Some(rule) => rule,
            None => return Err(ApplyError::UnknownRule(folded)),
        };
        for unbound in self.rules.rules() {
            if unbound.action().is_some() && self.actions.get(unbound.name()).is_none() {
                debug!(
                    "rule {:?} has an action block but no bound handler",
                    unbound.name()
                );
            }
        }
        let ctx = Ctx {
            rules: self.rules,
            actions: &self.actions,
            input,
            depth_limit: self.depth_limit,
        };
        let handler = self.actions.get(rule.name());
        let mut outcome = None;
        let completed = ctx.walk(rule.element(), 0, 0, state, &mut |found: Found<S>| {
            let Found {
                end,
                value,
                tokens,
                state,
            } = found;
            let text = &input[..end];
            let (values, state) = match handler {
                Some(handler) => match handler(text, &value, state).map_err(ApplyError::Action)? {
                    ActionOutcome::Keep(state) => (value, state),
                    ActionOutcome::Replace(state, replacement) => (replacement, state),
                    ActionOutcome::Fail => return Ok(false),
                },
                None => (value, state),
            };
            outcome = Some(CaptureResult {
                input: input.to_vec(),
                string_text: text.to_vec(),
                rest: input[end..].to_vec(),
                string_tokens: tokens.iter().map(|&(a, b)| input[a..b].to_vec()).collect(),
                values,
                state,
            });
            Ok(true)
        })?;
        if completed {
            if let Some(result) = outcome {
                return Ok(result);
            }
        }
        Err(ApplyError::NoMatch)
    }
}

/// One candidate match of an element, handed to the enclosing context.
struct Found<S> {
    /// The position right after the consumed bytes.
    end: usize,
    /// The element's capture.
    value: Value,
    /// The extents consumed at the element's immediate children.
    tokens: Vec<(usize, usize)>,
    /// The state after any actions along this candidate.
    state: S,
}

/// The rest of the enclosing match. Answers whether the whole match
/// completed with this candidate; an `Err` aborts the walk.
type Sink<'s, S> = dyn FnMut(Found<S>) -> Result<bool, ApplyError> + 's;

struct Ctx<'m, S> {
    rules: &'m RuleSet,
    actions: &'m Actions<S>,
    input: &'m [u8],
    depth_limit: usize,
}

impl<'m, S: Clone> Ctx<'m, S> {
    /// Offers every match of `element` at `at` to `sink`, most-preferred
    /// first, until the sink reports completion.
    fn walk(
        &self,
        element: &Element,
        at: usize,
        depth: usize,
        state: S,
        sink: &mut Sink<'_, S>,
    ) -> Result<bool, ApplyError> {
        if depth > self.depth_limit {
            return Err(ApplyError::DepthLimit(self.depth_limit));
        }
        match element {
            Element::Literal {
                bytes,
                case_insensitive,
            } => {
                let end = at + bytes.len();
                if end <= self.input.len()
                    && literal_eq(&self.input[at..end], bytes, *case_insensitive)
                {
                    sink(Found {
                        end,
                        value: Value::Bytes(self.input[at..end].to_vec()),
                        tokens: vec![(at, end)],
                        state,
                    })
                } else {
                    Ok(false)
                }
            }
            Element::NumConcat { bytes, .. } => {
                let end = at + bytes.len();
                if end <= self.input.len() && self.input[at..end] == bytes[..] {
                    sink(Found {
                        end,
                        value: Value::Bytes(self.input[at..end].to_vec()),
                        tokens: vec![(at, end)],
                        state,
                    })
                } else {
                    Ok(false)
                }
            }
            Element::NumRange { lo, hi, .. } => match self.input.get(at) {
                Some(&byte) if *lo <= byte && byte <= *hi => sink(Found {
                    end: at + 1,
                    value: Value::Bytes(vec![byte]),
                    tokens: vec![(at, at + 1)],
                    state,
                }),
                _ => Ok(false),
            },
            Element::Prose(text) => Err(ApplyError::Prose(text.clone())),
            Element::Concatenation(items) => self.walk_seq(
                items,
                0,
                at,
                depth,
                state,
                &mut Vec::new(),
                &mut Vec::new(),
                sink,
            ),
            Element::Alternation(alternatives) => {
                for alternative in alternatives {
                    let chosen = &mut |found: Found<S>| {
                        sink(Found {
                            end: found.end,
                            value: Value::List(vec![found.value]),
                            tokens: vec![(at, found.end)],
                            state: found.state,
                        })
                    };
                    if self.walk(alternative, at, depth + 1, state.clone(), chosen)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Element::Repetition { min, max, inner } => self.walk_rep(
                inner,
                *min,
                *max,
                0,
                at,
                depth,
                state,
                &mut Vec::new(),
                &mut Vec::new(),
                sink,
            ),
            Element::RuleRef(name) => {
                let rule = match self.rules.get(name) {
                    Some(rule) => rule,
                    None => return Err(ApplyError::UnknownRule(name.clone())),
                };
                trace!("rule {:?} at {}", name, at);
                let handler = self.actions.get(name);
                self.walk(rule.element(), at, depth + 1, state, &mut |found: Found<S>| {
                    let Found {
                        end, value, state, ..
                    } = found;
                    match handler {
                        Some(handler) => {
                            let text = &self.input[at..end];
                            match handler(text, &value, state).map_err(ApplyError::Action)? {
                                ActionOutcome::Keep(state) => sink(Found {
                                    end,
                                    value,
                                    tokens: vec![(at, end)],
                                    state,
                                }),
                                ActionOutcome::Replace(state, value) => sink(Found {
                                    end,
                                    value,
                                    tokens: vec![(at, end)],
                                    state,
                                }),
                                ActionOutcome::Fail => Ok(false),
                            }
                        }
                        None => sink(Found {
                            end,
                            value: Value::List(vec![value]),
                            tokens: vec![(at, end)],
                            state,
                        }),
                    }
                })
            }
        }
    }

    /// Matches the items of a concatenation from `index` on, accumulating
    /// child captures and extents.
    #[allow(clippy::too_many_arguments)]
    fn walk_seq(
        &self,
        items: &[Element],
        index: usize,
        at: usize,
        depth: usize,
        state: S,
        values: &mut Vec<Value>,
        spans: &mut Vec<(usize, usize)>,
        sink: &mut Sink<'_, S>,
    ) -> Result<bool, ApplyError> {
        if index == items.len() {
            return sink(Found {
                end: at,
                value: Value::List(values.clone()),
                tokens: spans.clone(),
                state,
            });
        }
        self.walk(&items[index], at, depth + 1, state, &mut |found: Found<S>| {
            values.push(found.value);
            spans.push((at, found.end));
            let completed = self.walk_seq(
                items,
                index + 1,
                found.end,
                depth + 1,
                found.state,
                values,
                spans,
                sink,
            )?;
            if !completed {
                values.pop();
                spans.pop();
            }
            Ok(completed)
        })
    }

    /// Matches a repetition greedily: extends by one more iteration while
    /// allowed, then falls back to yielding the iterations gathered so far.
    #[allow(clippy::too_many_arguments)]
    fn walk_rep(
        &self,
        inner: &Element,
        min: u32,
        max: Option<u32>,
        count: u32,
        at: usize,
        depth: usize,
        state: S,
        values: &mut Vec<Value>,
        spans: &mut Vec<(usize, usize)>,
        sink: &mut Sink<'_, S>,
    ) -> Result<bool, ApplyError> {
        let may_extend = max.map_or(true, |max| count < max);
        if may_extend {
            let completed =
                self.walk(inner, at, depth + 1, state.clone(), &mut |found: Found<S>| {
                    if found.end == at && count + 1 > min {
                        // A zero-width iteration is taken only while needed
                        // to reach the minimum; repeating it would never
                        // advance.
                        return Ok(false);
                    }
                    values.push(found.value);
                    spans.push((at, found.end));
                    let completed = self.walk_rep(
                        inner,
                        min,
                        max,
                        count + 1,
                        found.end,
                        depth + 1,
                        found.state,
                        values,
                        spans,
                        sink,
                    )?;
                    if !completed {
                        values.pop();
                        spans.pop();
                    }
                    Ok(completed)
                })?;
            if completed {
                return Ok(true);
            }
        }
        if count >= min {
            sink(Found {
                end: at,
                value: Value::List(values.clone()),
                tokens: spans.clone(),
                state,
            })
        } else {
            Ok(false)
        }
    }
}

fn literal_eq(input: &[u8], literal: &[u8], case_insensitive: bool) -> bool {
    if case_insensitive {
        input.eq_ignore_ascii_case(literal)
    } else {
        input == literal
    }
}
