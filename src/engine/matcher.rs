//! Backtracking sentence-to-rule matching.
//!
//! The matcher answers: given a tokenized sentence, which rules could have
//! produced it, and how? Because the dialect is ambiguous (alternatives may
//! overlap, repetitions may absorb variable word counts), the recursive parse
//! returns the *set of all* partial parses at every node, not a single best
//! one. Backtracking falls out of that shape for free: a dead branch is just
//! an empty result set, and the caller unions whatever the siblings found.
//!
//! ## Shape of a match
//!
//! Each recursive call answers "from position `pos`, what can this node
//! consume?" and returns zero or more [`Partial`]s:
//!
//! ```text
//! rule:  "turn" ( "on" | "off" ) [ "now" ]
//! input: ["turn", "off"]
//!
//! Token "turn" @0 -> [tree=turn, pos=1]
//! Alts        @1 -> [tree=off,  pos=2]
//! Optional    @2 -> [tree=now?, ..] none; [tree=Empty, pos=2]
//! Sequence       -> [tree=(turn off), pos=2]   <- Empty propagates, unfolded
//! ```
//!
//! The position-after value travels *next to* the tree in [`Partial`], never
//! inside it; parse trees stay plain data.
//!
//! ## Empty placeholders
//!
//! A zero-occurrence repetition produces [`ParseTree::Empty`] at an unchanged
//! position. Sequence combination, tag wrapping, and reference wrapping all
//! pass these through untouched, so an absent optional never shows up as a
//! spurious tree node.
//!
//! ## Failure vs. error
//!
//! "No parse" is an empty result set and perfectly normal. A reference to a
//! rule or grammar that cannot be resolved is a [`GrammarError`], reported
//! eagerly: it means the grammar is malformed, not that the input mismatched.

use super::registry::{GrammarRegistry, resolve_rule};
use crate::{Grammar, GrammarError, NULL_RULE, RepeatKind, RuleNode, VOID_RULE};

/// An annotated parse tree for one complete match, isomorphic to the matched
/// subset of the rule tree.
///
/// Parse trees are freshly built values: branches of ambiguous parses never
/// share nodes with each other or with the grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseTree {
    /// Zero-occurrence placeholder from an absent optional/zero-or-more.
    Empty,
    /// A matched literal token, original (unlowercased) text.
    Token(String),
    Sequence(Vec<ParseTree>),
    /// A tag boundary that was traversed.
    Tag { tree: Box<ParseTree>, tag: String },
    /// A rule reference boundary that was traversed; `name` is grammar
    /// qualified (`grammar.rule`).
    Rule { name: String, tree: Box<ParseTree> },
}

/// One complete parse of an input sentence, anchored at a start rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    /// Simple name of the start rule that produced this parse.
    pub rule: String,
    pub tree: ParseTree,
}

impl ParseResult {
    /// Tag names traversed by this parse, in depth-first order.
    ///
    /// Only outermost tag boundaries are listed: a tag nested inside another
    /// tag contributes text to the outer span, not a separate entry.
    pub fn tags(&self) -> Vec<&str> {
        fn collect<'t>(tree: &'t ParseTree, out: &mut Vec<&'t str>) {
            match tree {
                ParseTree::Tag { tag, .. } => out.push(tag),
                ParseTree::Sequence(items) => items.iter().for_each(|t| collect(t, out)),
                ParseTree::Rule { tree, .. } => collect(tree, out),
                ParseTree::Empty | ParseTree::Token(_) => {}
            }
        }

        let mut out = Vec::new();
        collect(&self.tree, &mut out);
        out
    }
}

/// A partial parse: the tree built so far plus the input position after it.
#[derive(Debug, Clone)]
struct Partial {
    tree: ParseTree,
    pos: usize,
}

impl Partial {
    fn empty(pos: usize) -> Self {
        Partial { tree: ParseTree::Empty, pos }
    }

    fn is_empty(&self) -> bool {
        matches!(self.tree, ParseTree::Empty)
    }
}

/// Matches tokenized sentences against a grammar's rules.
///
/// Input tokens are expected lowercased and whitespace-split (see
/// [`crate::tokenize`]). Two input words are wildcards: `%` matches any
/// single literal token, and `*` matches a literal token while yielding both
/// an advancing and a non-advancing parse, which lets one input word absorb
/// a run of grammar tokens.
pub struct Matcher<'a> {
    grammar: &'a Grammar,
    registry: &'a dyn GrammarRegistry,
}

impl<'a> Matcher<'a> {
    pub fn new(grammar: &'a Grammar, registry: &'a dyn GrammarRegistry) -> Self {
        Matcher { grammar, registry }
    }

    /// Every complete parse of `tokens`, across every candidate start rule.
    ///
    /// With an explicit `start` rule only that rule is tried (whether or not
    /// it is enabled). Otherwise every currently enabled rule is a candidate,
    /// in declaration order.
    pub fn match_all(&self, tokens: &[String], start: Option<&str>) -> Result<Vec<ParseResult>, GrammarError> {
        let candidates: Vec<&str> = match start {
            Some(name) => vec![name],
            None => self.grammar.rule_names().filter(|name| self.grammar.is_enabled(name)).collect(),
        };

        let mut results = Vec::new();
        for name in candidates {
            let node = self.grammar.rule(name).ok_or_else(|| GrammarError::UnknownRule(name.to_string()))?;
            let partials = self.parse_node(self.grammar, node, tokens, 0)?;
            log::debug!("<{name}>: {} partial parse(s) for {} token(s)", partials.len(), tokens.len());
            for partial in partials {
                if partial.pos == tokens.len() {
                    results.push(ParseResult { rule: name.to_string(), tree: partial.tree });
                }
            }
        }
        Ok(results)
    }

    /// The first complete parse whose start rule is public, in rule
    /// declaration order, or `None` when no public rule matches.
    pub fn match_first(&self, tokens: &[String], start: Option<&str>) -> Result<Option<ParseResult>, GrammarError> {
        let results = self.match_all(tokens, start)?;
        Ok(results.into_iter().find(|result| self.grammar.is_public(&result.rule)))
    }

    /// Dispatch on the node kind. `grammar` is the grammar currently being
    /// traversed; it changes when a reference crosses a grammar boundary.
    fn parse_node(
        &self,
        grammar: &'a Grammar,
        node: &RuleNode,
        input: &[String],
        pos: usize,
    ) -> Result<Vec<Partial>, GrammarError> {
        match node {
            RuleNode::Token(text) => Ok(self.parse_token(text, input, pos)),
            RuleNode::Sequence(items) => self.parse_sequence(grammar, items, input, pos),
            RuleNode::Alternatives(alts) => {
                // Union of all branches at the same position; ambiguous
                // parses all survive.
                let mut results = Vec::new();
                for alt in alts {
                    results.extend(self.parse_node(grammar, &alt.node, input, pos)?);
                }
                Ok(results)
            }
            RuleNode::Repeat { node, kind } => self.parse_repeat(grammar, node, *kind, input, pos),
            RuleNode::Tag { node, tag } => {
                let inner = self.parse_node(grammar, node, input, pos)?;
                Ok(inner
                    .into_iter()
                    .map(|partial| {
                        if partial.is_empty() {
                            partial
                        } else {
                            Partial {
                                pos: partial.pos,
                                tree: ParseTree::Tag { tree: Box::new(partial.tree), tag: tag.clone() },
                            }
                        }
                    })
                    .collect())
            }
            RuleNode::RuleRef { rule, grammar: qualifier } => {
                self.parse_reference(grammar, rule, qualifier.as_deref(), input, pos)
            }
        }
    }

    /// Literal tokens. Case-insensitive; multi-word literals sub-tokenize
    /// and must match a contiguous run of input words.
    fn parse_token(&self, text: &str, input: &[String], pos: usize) -> Vec<Partial> {
        if pos >= input.len() {
            return Vec::new();
        }
        let literal = text.to_lowercase();
        let word = input[pos].as_str();

        if literal == word || word == "%" || word == "*" {
            let mut results = vec![Partial { tree: ParseTree::Token(text.to_string()), pos: pos + 1 }];
            if word == "*" {
                // The non-advancing result lets the same `*` cover the next
                // grammar token too.
                results.push(Partial { tree: ParseTree::Token(text.to_string()), pos });
            }
            return results;
        }

        if !literal.contains(' ') || !literal.starts_with(word) {
            return Vec::new();
        }
        let mut at = pos;
        for part in literal.split_whitespace() {
            if at >= input.len() || input[at] != part {
                return Vec::new();
            }
            at += 1;
        }
        vec![Partial { tree: ParseTree::Token(text.to_string()), pos: at }]
    }

    /// Sequences: match the head, then the tail from every head position;
    /// combine by concatenation, keeping empty placeholders unfolded.
    ///
    /// The empty sequence never matches here: epsilon is expressed by the
    /// `NULL` reference or an absent optional, both of which produce
    /// placeholders instead.
    fn parse_sequence(
        &self,
        grammar: &'a Grammar,
        items: &[RuleNode],
        input: &[String],
        pos: usize,
    ) -> Result<Vec<Partial>, GrammarError> {
        let Some((first, rest)) = items.split_first() else {
            return Ok(Vec::new());
        };

        let heads = self.parse_node(grammar, first, input, pos)?;
        let mut results = Vec::new();
        for head in heads {
            if rest.is_empty() {
                if head.is_empty() {
                    results.push(head);
                } else {
                    results.push(Partial { pos: head.pos, tree: ParseTree::Sequence(vec![head.tree]) });
                }
                continue;
            }

            let tails = self.parse_sequence(grammar, rest, input, head.pos)?;
            for tail in tails {
                if tail.is_empty() {
                    results.push(head.clone());
                } else if head.is_empty() {
                    results.push(tail);
                } else {
                    let mut parts = vec![head.tree.clone()];
                    match tail.tree {
                        ParseTree::Sequence(tail_parts) => parts.extend(tail_parts),
                        other => parts.push(other),
                    }
                    results.push(Partial { tree: ParseTree::Sequence(parts), pos: tail.pos });
                }
            }
        }
        Ok(results)
    }

    /// Repetitions. One inner match seeds the result set; higher occurrence
    /// counts are tried as m-fold sequences while they fit in the remaining
    /// input, stopping at the first count that yields nothing.
    fn parse_repeat(
        &self,
        grammar: &'a Grammar,
        inner: &RuleNode,
        kind: RepeatKind,
        input: &[String],
        pos: usize,
    ) -> Result<Vec<Partial>, GrammarError> {
        let once = self.parse_node(grammar, inner, input, pos)?;
        if once.is_empty() {
            if kind == RepeatKind::OneOrMore {
                return Ok(Vec::new());
            }
            return Ok(vec![Partial::empty(pos)]);
        }

        let mut results = once;
        if kind != RepeatKind::OneOrMore {
            results.push(Partial::empty(pos));
        }
        if kind == RepeatKind::Optional {
            return Ok(results);
        }

        let mut count = 2;
        while pos + count <= input.len() {
            let copies = vec![inner.clone(); count];
            let more = self.parse_sequence(grammar, &copies, input, pos)?;
            if more.is_empty() {
                break;
            }
            results.extend(more);
            count += 1;
        }
        Ok(results)
    }

    /// Rule references. `NULL` and `VOID` bypass resolution; everything else
    /// resolves through the owning grammar and the registry, and successful
    /// matches are wrapped with the qualified rule name for rendering.
    fn parse_reference(
        &self,
        grammar: &'a Grammar,
        rule: &str,
        qualifier: Option<&str>,
        input: &[String],
        pos: usize,
    ) -> Result<Vec<Partial>, GrammarError> {
        if rule == VOID_RULE {
            return Ok(Vec::new());
        }
        if rule == NULL_RULE {
            let name = format!("{}.{NULL_RULE}", qualifier.unwrap_or(grammar.name()));
            return Ok(vec![Partial { tree: ParseTree::Rule { name, tree: Box::new(ParseTree::Empty) }, pos }]);
        }

        let (owner, node) = resolve_rule(grammar, self.registry, rule, qualifier)?;
        let qualified = format!("{}.{rule}", owner.name());
        let inner = self.parse_node(owner, node, input, pos)?;
        Ok(inner
            .into_iter()
            .map(|partial| {
                if partial.is_empty() {
                    partial
                } else {
                    Partial {
                        pos: partial.pos,
                        tree: ParseTree::Rule { name: qualified.clone(), tree: Box::new(partial.tree) },
                    }
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Grammar, RuleNode, tokenize};

    fn words(text: &str) -> Vec<String> {
        tokenize(text)
    }

    fn go_home_grammar() -> Grammar {
        // A = "go" ["to"] "home" | "go" "home" "now"
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule(
            "A",
            alt![seq![tok!("go"), opt!(tok!("to")), tok!("home")], seq![tok!("go"), tok!("home"), tok!("now")]],
        );
        grammar
    }

    #[test]
    fn overlapping_alternatives_stay_unambiguous_per_input() {
        let grammar = go_home_grammar();
        let matcher = Matcher::new(&grammar, &());

        for (input, expected) in [("go home", 1), ("go to home", 1), ("go home now", 1), ("go now", 0)] {
            let results = matcher.match_all(&words(input), Some("A")).unwrap();
            assert_eq!(results.len(), expected, "input {input:?}");
        }
    }

    #[test]
    fn repetition_counts_are_bounded_by_input() {
        // B = "ok"+ "go"
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("B", seq![plus!(tok!("ok")), tok!("go")]);
        let matcher = Matcher::new(&grammar, &());

        let results = matcher.match_all(&words("ok ok ok go"), Some("B")).unwrap();
        assert_eq!(results.len(), 1);

        assert!(matcher.match_all(&words("go"), Some("B")).unwrap().is_empty());
        assert_eq!(matcher.match_all(&words("ok go"), Some("B")).unwrap().len(), 1);
    }

    #[test]
    fn zero_or_more_matches_empty_prefix() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("B", seq![star!(tok!("very")), tok!("good")]);
        let matcher = Matcher::new(&grammar, &());

        assert_eq!(matcher.match_all(&words("good"), Some("B")).unwrap().len(), 1);
        assert_eq!(matcher.match_all(&words("very very good"), Some("B")).unwrap().len(), 1);
    }

    #[test]
    fn multi_word_literals_need_a_contiguous_run() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("greet", seq![tok!("good morning"), tok!("all")]);
        let matcher = Matcher::new(&grammar, &());

        assert_eq!(matcher.match_all(&words("good morning all"), Some("greet")).unwrap().len(), 1);
        assert!(matcher.match_all(&words("good evening all"), Some("greet")).unwrap().is_empty());
        assert!(matcher.match_all(&words("good all"), Some("greet")).unwrap().is_empty());
    }

    #[test]
    fn token_matching_is_case_insensitive() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("greet", tok!("Hello"));
        let matcher = Matcher::new(&grammar, &());

        assert_eq!(matcher.match_all(&words("hello"), Some("greet")).unwrap().len(), 1);
    }

    #[test]
    fn percent_wildcard_consumes_one_word() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("pair", seq![tok!("a"), tok!("b")]);
        let matcher = Matcher::new(&grammar, &());

        assert_eq!(matcher.match_all(&words("% b"), Some("pair")).unwrap().len(), 1);
        assert!(matcher.match_all(&words("%"), Some("pair")).unwrap().is_empty());
    }

    #[test]
    fn star_wildcard_can_cover_a_token_run() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("pair", seq![tok!("a"), tok!("b")]);
        let matcher = Matcher::new(&grammar, &());

        // One `*` absorbs both grammar tokens via the non-advancing result.
        assert!(!matcher.match_all(&words("*"), Some("pair")).unwrap().is_empty());
    }

    #[test]
    fn null_matches_empty_and_void_never_matches() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("nothing", RuleNode::rule_ref(NULL_RULE));
        grammar.add_public_rule("never", seq![RuleNode::rule_ref(VOID_RULE), tok!("x")]);
        let matcher = Matcher::new(&grammar, &());

        let results = matcher.match_all(&[], Some("nothing")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tree, ParseTree::Rule { name: "test.NULL".to_string(), tree: Box::new(ParseTree::Empty) });

        assert!(matcher.match_all(&words("x"), Some("never")).unwrap().is_empty());
    }

    #[test]
    fn unknown_rule_is_an_error_not_a_non_match() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("top", RuleNode::rule_ref("missing"));
        let matcher = Matcher::new(&grammar, &());

        let err = matcher.match_all(&words("anything"), Some("top")).unwrap_err();
        assert_eq!(err, GrammarError::UnknownRule("missing".to_string()));
    }

    #[test]
    fn implicit_candidates_respect_enabled_flags() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("yes", tok!("yes"));
        grammar.add_public_rule("also_yes", tok!("yes"));
        grammar.set_enabled("also_yes", false);
        let matcher = Matcher::new(&grammar, &());

        let results = matcher.match_all(&words("yes"), None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule, "yes");

        // An explicit start rule ignores the enabled flag.
        assert_eq!(matcher.match_all(&words("yes"), Some("also_yes")).unwrap().len(), 1);
    }

    #[test]
    fn match_first_prefers_public_rules_in_declaration_order() {
        let mut grammar = Grammar::new("test");
        grammar.add_private_rule("internal", tok!("hi"));
        grammar.add_public_rule("second", tok!("hi"));
        grammar.add_public_rule("third", tok!("hi"));
        let matcher = Matcher::new(&grammar, &());

        let first = matcher.match_first(&words("hi"), None).unwrap().unwrap();
        assert_eq!(first.rule, "second");

        // No public match at all -> None, not an error.
        grammar.set_enabled("second", false);
        grammar.set_enabled("third", false);
        let matcher = Matcher::new(&grammar, &());
        assert!(matcher.match_first(&words("hi"), None).unwrap().is_none());
    }

    #[test]
    fn references_record_qualified_names() {
        use super::super::registry::GrammarSet;

        let mut colors = Grammar::new("colors");
        colors.add_public_rule("color", alt![tok!("red"), tok!("green")]);
        let mut main = Grammar::new("main");
        main.add_import("colors.color");
        main.add_public_rule("pick", seq![tok!("pick"), RuleNode::rule_ref("color")]);

        let mut set = GrammarSet::new();
        set.insert(colors);
        set.insert(main);

        let main = set.resolve_grammar("main").unwrap();
        let matcher = Matcher::new(main, &set);
        let results = matcher.match_all(&words("pick red"), Some("pick")).unwrap();
        assert_eq!(results.len(), 1);

        let expected = ParseTree::Sequence(vec![
            ParseTree::Token("pick".to_string()),
            ParseTree::Rule { name: "colors.color".to_string(), tree: Box::new(ParseTree::Token("red".to_string())) },
        ]);
        assert_eq!(results[0].tree, expected);
    }

    #[test]
    fn tags_list_outermost_boundaries_only() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule(
            "cmd",
            seq![tag!(seq![tag!(tok!("please"), "politeness"), tok!("stop")], "action"), tok!("now")],
        );
        let matcher = Matcher::new(&grammar, &());

        let result = matcher.match_first(&words("please stop now"), Some("cmd")).unwrap().unwrap();
        assert_eq!(result.tags(), vec!["action"]);
    }
}
