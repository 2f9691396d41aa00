//! Canonical grammar source rendering.
//!
//! Renders a [`Grammar`] back to rule-language text: header, grammar name,
//! imports, then every rule in declaration order. The output is meant to be
//! fed back through the external grammar compiler, so the rules here are
//! round-trip safe:
//!
//! - Self-references render *unqualified*. Writing `<grammar.rule>` for a
//!   rule of the grammar being serialized makes each recompile-serialize
//!   cycle stack another qualifier onto the name, so that form is reserved
//!   for genuine cross-grammar references.
//! - Parentheses are inserted exactly where the dialect's precedence needs
//!   them: alternations inside alternations, alternations/sequences inside
//!   sequences, and any non-atomic repetition body.
//! - The empty alternation and empty sequence render as the reserved
//!   `<VOID>` and `<NULL>` rules.
//!
//! Weight text need not match the original source byte for byte (trailing
//! zeros are not preserved); the recompiled tree behaves identically.

use crate::{Grammar, NULL_RULE, RepeatKind, RuleNode, VOID_RULE};

/// Render `grammar` as canonical rule-language source text.
pub fn write_grammar(grammar: &Grammar) -> String {
    let mut out = String::new();
    out.push_str("#JSGF V1.0;\n\n");
    out.push_str(&format!("grammar {};\n\n", grammar.name()));

    for import in grammar.imports() {
        out.push_str(&format!("import <{import}>;\n\n"));
    }

    for rule in grammar.rules() {
        if grammar.is_public(&rule.name) {
            out.push_str("public ");
        }
        out.push_str(&format!("<{}> = {};\n\n", rule.name, write_rule(grammar.name(), &rule.node)));
    }
    out
}

/// Render one rule tree. `grammar_name` decides which references may stay
/// unqualified.
fn write_rule(grammar_name: &str, node: &RuleNode) -> String {
    match node {
        RuleNode::Token(text) => {
            if text.contains(char::is_whitespace) {
                format!("\"{text}\"")
            } else {
                text.clone()
            }
        }
        RuleNode::Sequence(items) => {
            if items.is_empty() {
                return format!("<{NULL_RULE}>");
            }
            let parts: Vec<String> = items
                .iter()
                .map(|item| {
                    let text = write_rule(grammar_name, item);
                    if matches!(item, RuleNode::Alternatives(_) | RuleNode::Sequence(_)) {
                        format!("( {text} )")
                    } else {
                        text
                    }
                })
                .collect();
            parts.join(" ")
        }
        RuleNode::Alternatives(alts) => {
            if alts.is_empty() {
                return format!("<{VOID_RULE}>");
            }
            let parts: Vec<String> = alts
                .iter()
                .map(|alt| {
                    let text = write_rule(grammar_name, &alt.node);
                    let text = if matches!(alt.node, RuleNode::Alternatives(_)) {
                        format!("( {text} )")
                    } else {
                        text
                    };
                    match alt.weight {
                        Some(weight) => format!("/{weight}/ {text}"),
                        None => text,
                    }
                })
                .collect();
            parts.join(" | ")
        }
        RuleNode::Repeat { node, kind } => {
            let inner = write_rule(grammar_name, node);
            if *kind == RepeatKind::Optional {
                return format!("[{inner}]");
            }
            let inner = if matches!(**node, RuleNode::Token(_) | RuleNode::RuleRef { .. }) {
                inner
            } else {
                format!("({inner})")
            };
            match kind {
                RepeatKind::ZeroOrMore => format!("{inner} *"),
                RepeatKind::OneOrMore => format!("{inner} +"),
                RepeatKind::Optional => unreachable!(),
            }
        }
        RuleNode::Tag { node, tag } => {
            let inner = write_rule(grammar_name, node);
            let inner = if matches!(**node, RuleNode::Alternatives(_) | RuleNode::Sequence(_)) {
                format!("({inner})")
            } else {
                inner
            };
            format!("{inner} {{{tag}}}")
        }
        RuleNode::RuleRef { rule, grammar } => match grammar {
            Some(owner) if owner != grammar_name => format!("<{owner}.{rule}>"),
            _ => format!("<{rule}>"),
        },
    }
}
