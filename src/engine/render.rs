//! Parse rendering.
//!
//! Turns a [`ParseResult`] back into text, with tag boundaries handled per
//! [`TagMode`]. Rule-reference wrappers are transparent; only tags change
//! the output, and only the innermost tag around a span gets a marker - a
//! tag nested inside another tag contributes plain words to the outer span.

use super::matcher::{ParseResult, ParseTree};

/// How tag boundaries appear in rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    /// Tags are transparent; inner text is emitted unchanged.
    Plain,
    /// Markdown entity style: `[inner text](tag name)`.
    InlineTag,
    /// The tag name, uppercased, replaces the inner text.
    ClassLabel,
}

impl ParseResult {
    /// Render this parse as a sentence, space-joined and trimmed.
    pub fn render(&self, mode: TagMode) -> String {
        self.tree.render(mode)
    }
}

impl ParseTree {
    pub fn render(&self, mode: TagMode) -> String {
        let mut parts = Vec::new();
        collect(self, mode, &mut parts, true);
        parts.join(" ")
    }
}

/// Depth-first text collection. `include_tags` flips off inside a tag so
/// nested tags flatten to plain words.
fn collect(tree: &ParseTree, mode: TagMode, out: &mut Vec<String>, include_tags: bool) {
    match tree {
        ParseTree::Empty => {}
        ParseTree::Token(text) => out.push(text.clone()),
        ParseTree::Sequence(items) => {
            for item in items {
                collect(item, mode, out, include_tags);
            }
        }
        ParseTree::Rule { tree, .. } => collect(tree, mode, out, include_tags),
        ParseTree::Tag { tree, tag } => {
            let mut inner = Vec::new();
            collect(tree, mode, &mut inner, false);
            if !include_tags {
                out.extend(inner);
                return;
            }
            match mode {
                TagMode::Plain => out.extend(inner),
                TagMode::InlineTag => out.push(format!("[{}]({})", inner.join(" "), tag)),
                TagMode::ClassLabel => out.push(tag.to_uppercase()),
            }
        }
    }
}
