//! Filtering Log Rule Synthesis
//!
//! Turns an observed request into candidate URL match patterns and assembles
//! a chosen pattern plus modifiers into filter rule text. Both steps are pure
//! functions; the grammar they emit is checked by [`syntax::parse_rule`].

pub mod compose;
pub mod patterns;
pub mod syntax;

pub use compose::{compose_rule, RuleModifiers};
pub use patterns::{generate_patterns, PATTERNS_COUNT};
pub use syntax::{parse_rule, ParsedRule, RuleKind, RuleSyntaxError, RuleValidator, UrlRuleSyntax};
