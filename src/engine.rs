//! Grammar traversal engine.
//!
//! This module is the operational core of the crate. The rule tree defined in
//! the crate root is pure data; every behavior is a read-only traversal that
//! lives in a focused submodule under `src/engine/`:
//!
//! ```text
//!                 Grammar + RuleNode tree (crate root)
//!                   │
//!       ┌───────────┼──────────────┬────────────────┐
//!       v           v              v                v
//!   Generator    Matcher       write_grammar    vocabulary
//! (generator.rs) (matcher.rs)  (writer.rs)      (lib.rs)
//!       │           │
//!       v           v
//!   sentences   ParseResult ── render/tags (render.rs)
//! ```
//!
//! Cross-grammar rule references are resolved through the [`GrammarRegistry`]
//! capability (registry.rs); the engine never reaches for global grammar
//! state, so resolution is testable with an in-memory [`GrammarSet`].
//!
//! ## Responsibilities by module
//!
//! - `matcher.rs`: recursive backtracking parse of a tokenized sentence
//!   against a start rule, returning *every* complete parse (the grammar
//!   dialect is ambiguous by design).
//! - `generator.rs`: weighted random sampling and exhaustive enumeration of
//!   sentences, with an injected [`RandomSource`] for seed-reproducible runs.
//! - `render.rs`: turns a [`ParseResult`] into plain, inline-tagged, or
//!   class-labeled text.
//! - `writer.rs`: canonical grammar source rendering, round-trip safe.
//! - `registry.rs`: the grammar lookup capability and an in-memory impl.
//!
//! ## Concurrency
//!
//! All traversals take `&Grammar` and are side-effect free; they may run
//! concurrently against the same grammar. Rule substitution takes
//! `&mut Grammar` and therefore excludes concurrent traversal by borrow rule.
//!
//! ## Debugging
//!
//! The matcher and generator emit `log::debug!`/`log::trace!` records; wire
//! up any `log` backend to see candidate rules, branch choices, and result
//! counts.

#[path = "engine/generator.rs"]
mod generator;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/registry.rs"]
mod registry;
#[path = "engine/render.rs"]
mod render;
#[path = "engine/writer.rs"]
mod writer;

pub use generator::{GenOptions, Generator, RandomSource, SeededRng, Sentences};
pub use matcher::{Matcher, ParseResult, ParseTree};
pub use registry::{GrammarRegistry, GrammarSet};
pub use render::TagMode;
pub use writer::write_grammar;
