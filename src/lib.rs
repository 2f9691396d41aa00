extern crate self as voxgram;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

#[macro_use]
mod macros;
mod api;
mod engine;

pub use api::{parse, parse_all, tokenize};
pub use engine::{
    GenOptions, Generator, GrammarRegistry, GrammarSet, Matcher, ParseResult, ParseTree, RandomSource, SeededRng,
    Sentences, TagMode, write_grammar,
};

// --- Reserved names ----------------------------------------------------------

/// Reserved rule name that matches the empty word sequence.
pub const NULL_RULE: &str = "NULL";

/// Reserved rule name that never matches and never generates.
pub const VOID_RULE: &str = "VOID";

/// Filler token. It may appear in rule trees (for recognizer silence
/// modeling) but contributes no words to generated or rendered sentences.
pub const FILLER_TOKEN: &str = "<sil>";

// --- Rule tree ---------------------------------------------------------------

/// Repetition operators of the grammar dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepeatKind {
    /// `[x]` - zero or one occurrence.
    Optional,
    /// `x *` - any number of occurrences, including none.
    ZeroOrMore,
    /// `x +` - at least one occurrence.
    OneOrMore,
}

/// One branch of an [`RuleNode::Alternatives`] node.
///
/// A missing weight counts as probability mass `1.0` during sampling, so a
/// fully unweighted alternation is uniform.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub node: RuleNode,
    pub weight: Option<f32>,
}

impl Alternative {
    pub fn unweighted(node: RuleNode) -> Self {
        Alternative { node, weight: None }
    }

    pub fn weighted(node: RuleNode, weight: f32) -> Self {
        Alternative { node, weight: Some(weight) }
    }
}

/// The AST of one compiled grammar rule.
///
/// This is pure structure: all behavior lives in the engine traversals
/// ([`Matcher`], [`Generator`], [`write_grammar`]). Malformed trees (for
/// example a dangling [`RuleNode::RuleRef`]) are representable and fail
/// lazily when traversed.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    /// A literal token. The text may contain internal whitespace, in which
    /// case it matches a contiguous run of input words and generates one
    /// output word per whitespace-separated part.
    Token(String),
    /// An ordered sequence of sub-rules. The empty sequence is the
    /// null/epsilon rule.
    Sequence(Vec<RuleNode>),
    /// A choice among branches, optionally weighted. The empty alternation
    /// is the unsatisfiable/void rule.
    Alternatives(Vec<Alternative>),
    /// A repetition operator applied to a sub-rule.
    Repeat { node: Box<RuleNode>, kind: RepeatKind },
    /// A tag annotation. Tags are transparent for matching and generation
    /// and only surface in parse rendering.
    Tag { node: Box<RuleNode>, tag: String },
    /// A named reference to another rule, in this grammar (`grammar: None`)
    /// or an imported one.
    RuleRef { rule: String, grammar: Option<String> },
}

impl RuleNode {
    /// Convenience constructor for a same-grammar rule reference.
    pub fn rule_ref(rule: impl Into<String>) -> Self {
        RuleNode::RuleRef { rule: rule.into(), grammar: None }
    }

    /// Convenience constructor for a cross-grammar rule reference.
    pub fn qualified_ref(grammar: impl Into<String>, rule: impl Into<String>) -> Self {
        RuleNode::RuleRef { rule: rule.into(), grammar: Some(grammar.into()) }
    }
}

// --- Grammar -----------------------------------------------------------------

bitflags::bitflags! {
    /// Per-rule attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RuleFlags: u8 {
        /// The rule is a default entry point for matching and is rendered
        /// with a `public` prefix by the serializer.
        const PUBLIC  = 1 << 0;
        /// The rule participates in matching when no explicit start rule is
        /// given. Freshly added rules are enabled.
        const ENABLED = 1 << 1;
    }
}

/// A named rule inside a [`Grammar`].
#[derive(Debug, Clone)]
pub struct GrammarRule {
    pub name: String,
    pub node: RuleNode,
    pub flags: RuleFlags,
}

/// A compiled grammar: a name, import declarations, and an ordered rule map.
///
/// Grammars are produced by an external grammar-text compiler and are
/// immutable during traversal; the only mutating operations are
/// [`Grammar::substitute_rule`] and [`Grammar::set_enabled`], which require
/// exclusive access (`&mut self`).
///
/// Rule declaration order is preserved: it drives serializer output and the
/// candidate order of [`Matcher::match_first`].
#[derive(Debug, Clone)]
pub struct Grammar {
    name: String,
    /// Qualified `grammar.rule` import declarations, in declaration order.
    /// A trailing `*` rule part imports every rule of that grammar.
    imports: Vec<String>,
    rules: Vec<GrammarRule>,
    index: HashMap<String, usize>,
}

impl Grammar {
    pub fn new(name: impl Into<String>) -> Self {
        Grammar { name: name.into(), imports: Vec::new(), rules: Vec::new(), index: HashMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Declare an import. `reference` must be qualified (`grammar.rule` or
    /// `grammar.*`).
    pub fn add_import(&mut self, reference: impl Into<String>) {
        self.imports.push(reference.into());
    }

    /// Add a rule. A rule added twice replaces the earlier tree but keeps
    /// its original position in declaration order.
    pub fn add_rule(&mut self, name: impl Into<String>, node: RuleNode, flags: RuleFlags) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&at) => {
                self.rules[at].node = node;
                self.rules[at].flags = flags;
            }
            None => {
                self.index.insert(name.clone(), self.rules.len());
                self.rules.push(GrammarRule { name, node, flags });
            }
        }
    }

    /// Add a rule with the default flags (enabled, not public).
    pub fn add_private_rule(&mut self, name: impl Into<String>, node: RuleNode) {
        self.add_rule(name, node, RuleFlags::ENABLED);
    }

    /// Add a public rule.
    pub fn add_public_rule(&mut self, name: impl Into<String>, node: RuleNode) {
        self.add_rule(name, node, RuleFlags::PUBLIC | RuleFlags::ENABLED);
    }

    /// Look up a rule tree by simple name.
    pub fn rule(&self, name: &str) -> Option<&RuleNode> {
        self.index.get(name).map(|&at| &self.rules[at].node)
    }

    /// All rules in declaration order.
    pub fn rules(&self) -> &[GrammarRule] {
        &self.rules
    }

    /// Rule names in declaration order.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    pub fn is_public(&self, name: &str) -> bool {
        self.flags(name).contains(RuleFlags::PUBLIC)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.flags(name).contains(RuleFlags::ENABLED)
    }

    /// Enable or disable a rule for implicit matching. Unknown names are
    /// ignored.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if let Some(&at) = self.index.get(name) {
            self.rules[at].flags.set(RuleFlags::ENABLED, enabled);
        }
    }

    fn flags(&self, name: &str) -> RuleFlags {
        self.index.get(name).map(|&at| self.rules[at].flags).unwrap_or(RuleFlags::empty())
    }

    /// Replace the named rule's alternatives with one token sequence per
    /// phrase. Each phrase splits on whitespace into literal tokens.
    ///
    /// Fails with [`GrammarError::InvalidSubstitution`] if the rule is
    /// missing or is not an [`RuleNode::Alternatives`] node; the rule is
    /// left untouched in that case.
    pub fn substitute_rule(&mut self, name: &str, phrases: &[String]) -> Result<(), GrammarError> {
        let at = match self.index.get(name) {
            Some(&at) if matches!(self.rules[at].node, RuleNode::Alternatives(_)) => at,
            _ => return Err(GrammarError::InvalidSubstitution(name.to_string())),
        };

        let branches = phrases
            .iter()
            .map(|phrase| {
                let words = phrase.split_whitespace().map(|w| RuleNode::Token(w.to_string())).collect();
                Alternative::unweighted(RuleNode::Sequence(words))
            })
            .collect();

        self.rules[at].node = RuleNode::Alternatives(branches);
        Ok(())
    }

    /// Apply [`Grammar::substitute_rule`] for every entry of `phrases` that
    /// names a rule of this grammar. Invalid targets are skipped with a
    /// warning; remaining entries are still applied.
    pub fn substitute_rules(&mut self, phrases: &HashMap<String, Vec<String>>) {
        let names: Vec<String> = self.rule_names().map(str::to_string).collect();
        for name in names {
            let Some(words) = phrases.get(&name) else {
                continue;
            };
            if let Err(err) = self.substitute_rule(&name, words) {
                log::warn!("skipping substitution: {err}");
            }
        }
    }

    /// Every distinct word reachable in this grammar's rule trees, sorted.
    ///
    /// Multi-word token literals contribute one entry per word; the filler
    /// token contributes nothing. References are not followed: each grammar
    /// reports its own vocabulary.
    pub fn vocabulary(&self) -> BTreeSet<String> {
        fn collect(node: &RuleNode, words: &mut BTreeSet<String>) {
            match node {
                RuleNode::Token(text) => {
                    if text != FILLER_TOKEN {
                        words.extend(text.split_whitespace().map(str::to_string));
                    }
                }
                RuleNode::Sequence(items) => items.iter().for_each(|n| collect(n, words)),
                RuleNode::Alternatives(alts) => alts.iter().for_each(|a| collect(&a.node, words)),
                RuleNode::Repeat { node, .. } | RuleNode::Tag { node, .. } => collect(node, words),
                RuleNode::RuleRef { .. } => {}
            }
        }

        let mut words = BTreeSet::new();
        for rule in &self.rules {
            collect(&rule.node, &mut words);
        }
        words
    }
}

// --- Errors ------------------------------------------------------------------

/// Failures surfaced by grammar traversals and mutations.
///
/// "No parse" is not in this taxonomy: the matcher reports it as an empty
/// result set, and ambiguous inputs report every parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// A rule reference names a rule absent from its grammar and from all
    /// resolvable imports. Indicates a malformed grammar, not a non-match.
    UnknownRule(String),
    /// A qualified rule reference names a grammar the registry cannot
    /// resolve.
    UnknownGrammar(String),
    /// Random sampling unwound to the root with no viable branch left.
    /// Callers retry with a fresh draw or give up after a bounded number
    /// of attempts.
    GenerationExhausted,
    /// A substitution target was missing or not an alternatives rule.
    InvalidSubstitution(String),
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::UnknownRule(name) => write!(f, "unknown rule <{name}>"),
            GrammarError::UnknownGrammar(name) => write!(f, "unknown grammar {name}"),
            GrammarError::GenerationExhausted => write!(f, "generation exhausted: no viable branch"),
            GrammarError::InvalidSubstitution(name) => {
                write!(f, "rule <{name}> is missing or not an alternatives rule")
            }
        }
    }
}

impl std::error::Error for GrammarError {}
