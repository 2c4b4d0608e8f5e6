//! Library for compiling and interpreting ABNF grammars, as specified by
//! RFC 4234 and RFC 5234.
//!
//! [`load`] compiles grammar text into a [`RuleSet`]. [`apply`] matches a
//! rule of the set against a prefix of an input byte sequence and returns
//! the structured captures together with the unconsumed suffix. A
//! [`Matcher`] additionally binds semantic-action callbacks that run on
//! each successful reduction of their rule, and may rewrite the capture,
//! thread user state, or reject the match.

#![deny(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]

mod action;
mod apply;
pub mod core_rules;
mod grammar;
mod load;
pub mod rule;

pub use action::{ActionError, ActionFn, ActionOutcome, Actions};
pub use apply::{apply, ApplyError, CaptureResult, Matcher, Value, DEFAULT_DEPTH_LIMIT};
pub use grammar::RuleSet;
pub use load::{load, LoadError};
pub use rule::builder::RuleSetBuilder;
pub use rule::{Base, Element, Rule};
