//! Cross-grammar rule resolution.
//!
//! A rule reference can name a rule in another grammar, either explicitly
//! (`<other.rule>`) or through the owning grammar's import list. The engine
//! never holds a back-pointer to a live grammar manager; instead it is handed
//! a [`GrammarRegistry`] lookup capability, which keeps resolution pure and
//! lets tests substitute a fake registry.

use crate::{Grammar, GrammarError, RuleNode};
use std::collections::HashMap;

/// Lookup capability for resolving grammar names to loaded grammars.
pub trait GrammarRegistry {
    fn resolve_grammar(&self, name: &str) -> Option<&Grammar>;
}

/// The empty registry, for self-contained grammars.
impl GrammarRegistry for () {
    fn resolve_grammar(&self, _name: &str) -> Option<&Grammar> {
        None
    }
}

/// An in-memory registry keyed by grammar name.
#[derive(Debug, Default)]
pub struct GrammarSet {
    grammars: HashMap<String, Grammar>,
}

impl GrammarSet {
    pub fn new() -> Self {
        GrammarSet::default()
    }

    /// Insert a grammar under its own name, replacing any previous one.
    pub fn insert(&mut self, grammar: Grammar) {
        self.grammars.insert(grammar.name().to_string(), grammar);
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Grammar> {
        self.grammars.get_mut(name)
    }
}

impl GrammarRegistry for GrammarSet {
    fn resolve_grammar(&self, name: &str) -> Option<&Grammar> {
        self.grammars.get(name)
    }
}

/// Resolve a rule reference from `current`, following the registry for
/// qualified references and import declarations.
///
/// Returns the owning grammar together with the rule tree so traversals can
/// continue resolving later references in the right grammar. Resolution
/// failures are fatal: they indicate a malformed grammar, not a non-match.
pub(crate) fn resolve_rule<'a>(
    current: &'a Grammar,
    registry: &'a dyn GrammarRegistry,
    rule: &str,
    qualifier: Option<&str>,
) -> Result<(&'a Grammar, &'a RuleNode), GrammarError> {
    if let Some(grammar_name) = qualifier {
        if grammar_name != current.name() {
            let grammar = registry
                .resolve_grammar(grammar_name)
                .ok_or_else(|| GrammarError::UnknownGrammar(grammar_name.to_string()))?;
            let node = grammar
                .rule(rule)
                .ok_or_else(|| GrammarError::UnknownRule(format!("{grammar_name}.{rule}")))?;
            return Ok((grammar, node));
        }
    }

    if let Some(node) = current.rule(rule) {
        return Ok((current, node));
    }

    // Unqualified and not local: scan the import list for a declaration that
    // could supply the rule.
    for import in current.imports() {
        let Some((grammar_name, imported_rule)) = import.rsplit_once('.') else {
            continue;
        };
        if imported_rule != rule && imported_rule != "*" {
            continue;
        }
        let grammar = registry
            .resolve_grammar(grammar_name)
            .ok_or_else(|| GrammarError::UnknownGrammar(grammar_name.to_string()))?;
        if let Some(node) = grammar.rule(rule) {
            return Ok((grammar, node));
        }
    }

    Err(GrammarError::UnknownRule(rule.to_string()))
}
