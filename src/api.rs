//! Convenience API over the engine.
//!
//! The engine itself works on pre-tokenized word sequences; this module adds
//! the raw-text entry points most callers want: normalize a sentence with
//! [`tokenize`], then match it with [`parse`] / [`parse_all`].

use crate::engine::{GrammarRegistry, Matcher, ParseResult};
use crate::{Grammar, GrammarError};

/// Normalize raw text into matcher input: whitespace-split and lowercased.
///
/// # Example
/// ```
/// use voxgram::tokenize;
///
/// assert_eq!(tokenize("  Turn  the Light ON "), vec!["turn", "the", "light", "on"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    regex!(r"\S+").find_iter(text).map(|word| word.as_str().to_lowercase()).collect()
}

/// Match raw `text` against `grammar`, returning the first complete parse
/// whose start rule is public (see [`Matcher::match_first`]).
///
/// `start` restricts matching to one rule; with `None`, every enabled rule
/// is a candidate in declaration order.
pub fn parse(
    text: &str,
    grammar: &Grammar,
    registry: &dyn GrammarRegistry,
    start: Option<&str>,
) -> Result<Option<ParseResult>, GrammarError> {
    Matcher::new(grammar, registry).match_first(&tokenize(text), start)
}

/// Match raw `text` against `grammar`, returning every complete parse
/// across every candidate rule (see [`Matcher::match_all`]).
pub fn parse_all(
    text: &str,
    grammar: &Grammar,
    registry: &dyn GrammarRegistry,
    start: Option<&str>,
) -> Result<Vec<ParseResult>, GrammarError> {
    Matcher::new(grammar, registry).match_all(&tokenize(text), start)
}
