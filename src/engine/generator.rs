//! Sentence generation.
//!
//! Two generation strategies over the same rule tree:
//!
//! - [`Generator::random_sentence`]: one weighted-random walk. Alternatives
//!   draw from their normalized branch weights, repetitions flip a
//!   continuation coin, and a void dead end unwinds to the nearest choice
//!   point that still has an untried option.
//! - [`Generator::enumerate`]: a lazy depth-first enumeration that forks at
//!   every choice point instead of drawing, deduplicates by rendered text,
//!   and bounds repetition unrolling so it always terminates.
//!
//! ```text
//! "turn" ( /3/ "on" | "off" ) [ "please" ]
//!
//! random:     turn ──draw──> on (p=3/4)  ──coin──> please?
//! exhaustive: turn on | turn on please | turn off | turn off please
//! ```
//!
//! ## Randomness
//!
//! All draws come from a caller-injected [`RandomSource`], so a fixed seed
//! reproduces the exact sentence sequence. [`SeededRng`] is a SplitMix64
//! generator: tiny, fast, and stable across platforms and releases, which
//! keeps recorded test expectations valid.
//!
//! ## Termination policy
//!
//! The dialect does not define occurrence-count probabilities for `*`/`+`,
//! so two tunables in [`GenOptions`] pin the behavior down:
//!
//! - `continue_probability` (default 0.5): chance of generating one more
//!   occurrence after each instance during random walks.
//! - `max_repeats` (default 3): repetition unrolling ceiling during
//!   exhaustive enumeration, which would otherwise be infinite.

use super::registry::{GrammarRegistry, resolve_rule};
use crate::{Alternative, FILLER_TOKEN, Grammar, GrammarError, NULL_RULE, RepeatKind, RuleNode, VOID_RULE};
use std::collections::HashSet;

// --- Random source -----------------------------------------------------------

/// Uniform randomness injected into every sampling call.
pub trait RandomSource {
    /// The next uniform value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;
}

/// Deterministic SplitMix64 random source.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        SeededRng { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl RandomSource for SeededRng {
    fn next_f64(&mut self) -> f64 {
        // 53 high bits, the double-precision mantissa width.
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

// --- Options -----------------------------------------------------------------

/// Generation tunables.
#[derive(Debug, Clone)]
pub struct GenOptions {
    /// Repetition unrolling ceiling for exhaustive enumeration.
    pub max_repeats: usize,
    /// Probability of another `*`/`+` occurrence during random walks.
    pub continue_probability: f64,
    /// Consecutive duplicate/exhausted draws tolerated while collecting
    /// distinct sentences before giving up.
    pub max_retries: usize,
}

impl Default for GenOptions {
    fn default() -> Self {
        GenOptions { max_repeats: 3, continue_probability: 0.5, max_retries: 100 }
    }
}

// --- Generator ---------------------------------------------------------------

/// Produces sentences from a grammar's rule trees.
pub struct Generator<'a> {
    grammar: &'a Grammar,
    registry: &'a dyn GrammarRegistry,
    options: GenOptions,
}

impl<'a> Generator<'a> {
    pub fn new(grammar: &'a Grammar, registry: &'a dyn GrammarRegistry) -> Self {
        Generator { grammar, registry, options: GenOptions::default() }
    }

    pub fn with_options(grammar: &'a Grammar, registry: &'a dyn GrammarRegistry, options: GenOptions) -> Self {
        Generator { grammar, registry, options }
    }

    /// One weighted-random sentence from `rule`, as output words.
    ///
    /// Fails with [`GrammarError::GenerationExhausted`] when every branch of
    /// the walk dead-ends in void; callers may retry with further draws from
    /// the same source.
    pub fn random_sentence(&self, rule: &str, rng: &mut dyn RandomSource) -> Result<Vec<String>, GrammarError> {
        let node = self.grammar.rule(rule).ok_or_else(|| GrammarError::UnknownRule(rule.to_string()))?;
        match self.walk(self.grammar, node, rng)? {
            Some(words) => Ok(words),
            None => Err(GrammarError::GenerationExhausted),
        }
    }

    /// Up to `count` *distinct* random sentences, joined with spaces.
    ///
    /// Duplicate and exhausted draws are retried; after
    /// [`GenOptions::max_retries`] consecutive misses the sentences found so
    /// far are returned, or [`GrammarError::GenerationExhausted`] if there
    /// are none.
    pub fn random_sentences(
        &self,
        rule: &str,
        count: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<Vec<String>, GrammarError> {
        let mut seen = HashSet::new();
        let mut sentences = Vec::new();
        let mut misses = 0;

        while sentences.len() < count && misses < self.options.max_retries {
            match self.random_sentence(rule, rng) {
                Ok(words) => {
                    let sentence = words.join(" ");
                    if seen.insert(sentence.clone()) {
                        sentences.push(sentence);
                        misses = 0;
                    } else {
                        misses += 1;
                    }
                }
                Err(GrammarError::GenerationExhausted) => misses += 1,
                Err(err) => return Err(err),
            }
        }

        if sentences.is_empty() && count > 0 {
            return Err(GrammarError::GenerationExhausted);
        }
        log::debug!("collected {}/{count} distinct sentence(s) from <{rule}>", sentences.len());
        Ok(sentences)
    }

    /// Lazily enumerate every distinct sentence reachable from `rule`.
    ///
    /// The iterator is finite (repetitions unroll at most
    /// [`GenOptions::max_repeats`] times) and yields each rendered sentence
    /// once, in depth-first choice order. It is not restartable mid-stream;
    /// call `enumerate` again for a fresh pass.
    pub fn enumerate(&self, rule: &str) -> Result<Sentences<'a>, GrammarError> {
        let node = self.grammar.rule(rule).ok_or_else(|| GrammarError::UnknownRule(rule.to_string()))?;
        Ok(Sentences {
            registry: self.registry,
            max_repeats: self.options.max_repeats,
            stack: vec![Branch { words: Vec::new(), next: vec![(self.grammar, node)] }],
            seen: HashSet::new(),
            failed: false,
        })
    }

    /// Recursive random walk. `Ok(None)` is a dead end (void reached with no
    /// viable sibling), which the nearest enclosing choice point absorbs.
    fn walk(
        &self,
        grammar: &'a Grammar,
        node: &'a RuleNode,
        rng: &mut dyn RandomSource,
    ) -> Result<Option<Vec<String>>, GrammarError> {
        match node {
            RuleNode::Token(text) => {
                if text == FILLER_TOKEN {
                    return Ok(Some(Vec::new()));
                }
                Ok(Some(text.split_whitespace().map(str::to_string).collect()))
            }
            RuleNode::Sequence(items) => {
                let mut words = Vec::new();
                for item in items {
                    match self.walk(grammar, item, rng)? {
                        Some(more) => words.extend(more),
                        None => return Ok(None),
                    }
                }
                Ok(Some(words))
            }
            RuleNode::Alternatives(alts) => self.walk_alternatives(grammar, alts, rng),
            RuleNode::Repeat { node, kind } => self.walk_repeat(grammar, node, *kind, rng),
            RuleNode::Tag { node, .. } => self.walk(grammar, node, rng),
            RuleNode::RuleRef { rule, grammar: qualifier } => {
                if rule == NULL_RULE {
                    return Ok(Some(Vec::new()));
                }
                if rule == VOID_RULE {
                    return Ok(None);
                }
                let (owner, node) = resolve_rule(grammar, self.registry, rule, qualifier.as_deref())?;
                self.walk(owner, node, rng)
            }
        }
    }

    /// Weighted branch selection with dead-branch retry: a failed branch is
    /// removed from the pool and the remaining weights are redrawn, so the
    /// walk unwinds here instead of failing outright.
    fn walk_alternatives(
        &self,
        grammar: &'a Grammar,
        alts: &'a [Alternative],
        rng: &mut dyn RandomSource,
    ) -> Result<Option<Vec<String>>, GrammarError> {
        let mut remaining: Vec<&Alternative> = alts.iter().collect();
        while !remaining.is_empty() {
            let choice = if remaining.len() == 1 { 0 } else { pick_weighted(&remaining, rng) };
            if let Some(words) = self.walk(grammar, &remaining[choice].node, rng)? {
                return Ok(Some(words));
            }
            log::trace!("dead branch {choice} of {} removed, redrawing", remaining.len());
            remaining.remove(choice);
        }
        Ok(None)
    }

    fn walk_repeat(
        &self,
        grammar: &'a Grammar,
        inner: &'a RuleNode,
        kind: RepeatKind,
        rng: &mut dyn RandomSource,
    ) -> Result<Option<Vec<String>>, GrammarError> {
        match kind {
            RepeatKind::Optional => {
                if rng.next_f64() < 0.5 {
                    // A void inner falls back to the untried "absent" option.
                    if let Some(words) = self.walk(grammar, inner, rng)? {
                        return Ok(Some(words));
                    }
                }
                Ok(Some(Vec::new()))
            }
            RepeatKind::ZeroOrMore => {
                let mut words = Vec::new();
                while rng.next_f64() < self.options.continue_probability {
                    match self.walk(grammar, inner, rng)? {
                        Some(more) => words.extend(more),
                        None => break,
                    }
                }
                Ok(Some(words))
            }
            RepeatKind::OneOrMore => {
                let mut words = match self.walk(grammar, inner, rng)? {
                    Some(words) => words,
                    None => return Ok(None),
                };
                while rng.next_f64() < self.options.continue_probability {
                    match self.walk(grammar, inner, rng)? {
                        Some(more) => words.extend(more),
                        None => break,
                    }
                }
                Ok(Some(words))
            }
        }
    }
}

/// Cumulative-weight scan in declaration order; absent weights count as 1.0.
fn pick_weighted(alts: &[&Alternative], rng: &mut dyn RandomSource) -> usize {
    let total: f64 = alts.iter().map(|alt| f64::from(alt.weight.unwrap_or(1.0))).sum();
    if total <= 0.0 {
        return (rng.next_f64() * alts.len() as f64) as usize;
    }

    let draw = rng.next_f64() * total;
    let mut cumulative = 0.0;
    for (index, alt) in alts.iter().enumerate() {
        cumulative += f64::from(alt.weight.unwrap_or(1.0));
        if draw < cumulative {
            return index;
        }
    }
    alts.len() - 1
}

// --- Exhaustive enumeration --------------------------------------------------

/// One pending enumeration branch: the words emitted so far plus the nodes
/// still to walk (back of `next` is walked first). Branches never share
/// mutable output state; forking clones the prefix.
#[derive(Clone)]
struct Branch<'a> {
    words: Vec<String>,
    next: Vec<(&'a Grammar, &'a RuleNode)>,
}

/// Lazy, finite, deduplicated stream of every sentence a rule can produce.
/// See [`Generator::enumerate`].
pub struct Sentences<'a> {
    registry: &'a dyn GrammarRegistry,
    max_repeats: usize,
    stack: Vec<Branch<'a>>,
    seen: HashSet<String>,
    failed: bool,
}

impl<'a> Iterator for Sentences<'a> {
    type Item = Result<String, GrammarError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        while let Some(mut branch) = self.stack.pop() {
            let Some((grammar, node)) = branch.next.pop() else {
                let sentence = branch.words.join(" ");
                if self.seen.insert(sentence.clone()) {
                    return Some(Ok(sentence));
                }
                continue;
            };

            match node {
                RuleNode::Token(text) => {
                    if text != FILLER_TOKEN {
                        branch.words.extend(text.split_whitespace().map(str::to_string));
                    }
                    self.stack.push(branch);
                }
                RuleNode::Sequence(items) => {
                    branch.next.extend(items.iter().rev().map(|item| (grammar, item)));
                    self.stack.push(branch);
                }
                RuleNode::Alternatives(alts) => {
                    // Reversed push so the stack pops branches in
                    // declaration order. Empty alternatives push nothing:
                    // the branch dies here.
                    for alt in alts.iter().rev() {
                        let mut fork = branch.clone();
                        fork.next.push((grammar, &alt.node));
                        self.stack.push(fork);
                    }
                }
                RuleNode::Repeat { node: inner, kind } => {
                    let (low, high) = match kind {
                        RepeatKind::Optional => (0, 1),
                        RepeatKind::ZeroOrMore => (0, self.max_repeats),
                        RepeatKind::OneOrMore => (1, self.max_repeats),
                    };
                    for count in (low..=high).rev() {
                        let mut fork = branch.clone();
                        for _ in 0..count {
                            fork.next.push((grammar, inner));
                        }
                        self.stack.push(fork);
                    }
                }
                RuleNode::Tag { node: inner, .. } => {
                    branch.next.push((grammar, inner));
                    self.stack.push(branch);
                }
                RuleNode::RuleRef { rule, grammar: qualifier } => {
                    if rule == VOID_RULE {
                        continue;
                    }
                    if rule == NULL_RULE {
                        self.stack.push(branch);
                        continue;
                    }
                    match resolve_rule(grammar, self.registry, rule, qualifier.as_deref()) {
                        Ok((owner, node)) => {
                            branch.next.push((owner, node));
                            self.stack.push(branch);
                        }
                        Err(err) => {
                            self.failed = true;
                            return Some(Err(err));
                        }
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Grammar, Matcher, RuleNode};

    fn light_grammar() -> Grammar {
        let mut grammar = Grammar::new("lights");
        grammar.add_public_rule(
            "command",
            seq![tok!("turn"), RuleNode::rule_ref("state"), opt!(tok!("please"))],
        );
        grammar.add_private_rule("state", alt![tok!("on"), tok!("off")]);
        grammar
    }

    #[test]
    fn sampling_is_seed_reproducible() {
        let grammar = light_grammar();
        let generator = Generator::new(&grammar, &());

        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..50 {
            assert_eq!(
                generator.random_sentence("command", &mut a).unwrap(),
                generator.random_sentence("command", &mut b).unwrap()
            );
        }
    }

    #[test]
    fn samples_always_match_their_grammar() {
        let mut grammar = light_grammar();
        grammar.add_public_rule("chatty", seq![plus!(tok!("very")), star!(tok!("much")), tok!("bright")]);
        let generator = Generator::new(&grammar, &());
        let matcher = Matcher::new(&grammar, &());

        for seed in 0..200 {
            let mut rng = SeededRng::new(seed);
            for rule in ["command", "chatty"] {
                let words = generator.random_sentence(rule, &mut rng).unwrap();
                let tokens: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
                let parses = matcher.match_all(&tokens, Some(rule)).unwrap();
                assert!(!parses.is_empty(), "seed {seed}: {words:?} does not match <{rule}>");
            }
        }
    }

    #[test]
    fn weighted_branches_converge_to_their_ratio() {
        let mut grammar = Grammar::new("coin");
        grammar.add_public_rule("flip", walt![(3.0, tok!("heads")), (1.0, tok!("tails"))]);
        let generator = Generator::new(&grammar, &());

        let mut rng = SeededRng::new(7);
        let mut heads = 0usize;
        let draws = 10_000;
        for _ in 0..draws {
            if generator.random_sentence("flip", &mut rng).unwrap() == vec!["heads"] {
                heads += 1;
            }
        }

        let observed = heads as f64 / draws as f64;
        assert!((observed - 0.75).abs() < 0.05, "observed heads ratio {observed}");
    }

    #[test]
    fn void_branches_unwind_to_a_viable_sibling() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("pick", alt![RuleNode::rule_ref(VOID_RULE), tok!("only")]);
        let generator = Generator::new(&grammar, &());

        let mut rng = SeededRng::new(0);
        for _ in 0..20 {
            assert_eq!(generator.random_sentence("pick", &mut rng).unwrap(), vec!["only"]);
        }
    }

    #[test]
    fn fully_void_rules_exhaust_generation() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("nope", seq![tok!("x"), RuleNode::rule_ref(VOID_RULE)]);
        let generator = Generator::new(&grammar, &());

        let mut rng = SeededRng::new(0);
        let err = generator.random_sentence("nope", &mut rng).unwrap_err();
        assert_eq!(err, GrammarError::GenerationExhausted);
    }

    #[test]
    fn filler_and_null_emit_no_words() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule(
            "quiet",
            seq![tok!(FILLER_TOKEN), RuleNode::rule_ref(NULL_RULE), tok!("done")],
        );
        let generator = Generator::new(&grammar, &());

        let mut rng = SeededRng::new(0);
        assert_eq!(generator.random_sentence("quiet", &mut rng).unwrap(), vec!["done"]);
    }

    #[test]
    fn multi_word_tokens_emit_one_word_per_part() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("greet", tok!("good morning"));
        let generator = Generator::new(&grammar, &());

        let mut rng = SeededRng::new(0);
        assert_eq!(generator.random_sentence("greet", &mut rng).unwrap(), vec!["good", "morning"]);
    }

    #[test]
    fn distinct_sampling_deduplicates_by_text() {
        let grammar = light_grammar();
        let generator = Generator::new(&grammar, &());

        let mut rng = SeededRng::new(3);
        let sentences = generator.random_sentences("command", 4, &mut rng).unwrap();
        assert_eq!(sentences.len(), 4);
        let unique: HashSet<&String> = sentences.iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn exhaustive_enumeration_is_exact_on_finite_grammars() {
        let grammar = light_grammar();
        let generator = Generator::new(&grammar, &());

        let mut sentences: Vec<String> = generator.enumerate("command").unwrap().map(Result::unwrap).collect();
        sentences.sort();
        assert_eq!(
            sentences,
            vec!["turn off", "turn off please", "turn on", "turn on please"]
        );
    }

    #[test]
    fn enumeration_deduplicates_identical_sentences() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("dup", alt![tok!("same"), tok!("same"), tok!("other")]);
        let generator = Generator::new(&grammar, &());

        let sentences: Vec<String> = generator.enumerate("dup").unwrap().map(Result::unwrap).collect();
        assert_eq!(sentences, vec!["same", "other"]);
    }

    #[test]
    fn enumeration_bounds_repetitions() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("n", plus!(tok!("ha")));
        let options = GenOptions { max_repeats: 2, ..GenOptions::default() };
        let generator = Generator::with_options(&grammar, &(), options);

        let mut sentences: Vec<String> = generator.enumerate("n").unwrap().map(Result::unwrap).collect();
        sentences.sort();
        assert_eq!(sentences, vec!["ha", "ha ha"]);
    }

    #[test]
    fn enumeration_surfaces_resolution_errors() {
        let mut grammar = Grammar::new("test");
        grammar.add_public_rule("broken", RuleNode::rule_ref("missing"));
        let generator = Generator::new(&grammar, &());

        let mut stream = generator.enumerate("broken").unwrap();
        assert_eq!(stream.next(), Some(Err(GrammarError::UnknownRule("missing".to_string()))));
        assert_eq!(stream.next(), None);
    }
}
