#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// A literal token node.
#[macro_export]
macro_rules! tok {
    ($text:expr) => {
        $crate::RuleNode::Token($text.to_string())
    };
}

/// A sequence node. `seq![]` is the null/epsilon rule.
#[macro_export]
macro_rules! seq {
    ( $($node:expr),* $(,)? ) => {
        $crate::RuleNode::Sequence(vec![ $($node),* ])
    };
}

/// An unweighted alternatives node. `alt![]` is the void rule.
#[macro_export]
macro_rules! alt {
    ( $($node:expr),* $(,)? ) => {
        $crate::RuleNode::Alternatives(vec![ $($crate::Alternative::unweighted($node)),* ])
    };
}

/// A weighted alternatives node: `walt![(3.0, a), (1.0, b)]`.
#[macro_export]
macro_rules! walt {
    ( $( ($weight:expr, $node:expr) ),* $(,)? ) => {
        $crate::RuleNode::Alternatives(vec![ $($crate::Alternative::weighted($node, $weight)),* ])
    };
}

/// `[x]` - an optional node.
#[macro_export]
macro_rules! opt {
    ($node:expr) => {
        $crate::RuleNode::Repeat { node: Box::new($node), kind: $crate::RepeatKind::Optional }
    };
}

/// `x *` - a zero-or-more node.
#[macro_export]
macro_rules! star {
    ($node:expr) => {
        $crate::RuleNode::Repeat { node: Box::new($node), kind: $crate::RepeatKind::ZeroOrMore }
    };
}

/// `x +` - a one-or-more node.
#[macro_export]
macro_rules! plus {
    ($node:expr) => {
        $crate::RuleNode::Repeat { node: Box::new($node), kind: $crate::RepeatKind::OneOrMore }
    };
}

/// `x {tag}` - a tagged node.
#[macro_export]
macro_rules! tag {
    ($node:expr, $tag:expr) => {
        $crate::RuleNode::Tag { node: Box::new($node), tag: $tag.to_string() }
    };
}
