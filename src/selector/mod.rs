//! Selector language: parsing, scoring, and matching.
//!
//! This module implements the structural query language rules register
//! against. It supports:
//! - Type tests: literal tags, `*`, and category pseudo-classes backed by an
//!   explicit table
//! - Attribute tests on dotted field paths with typed comparison operators
//! - Position pseudo-classes and field tests
//! - Grouping via `:not(...)`, `:matches(...)`, and comma lists
//! - Relationship combinators (descendant, child, adjacent/general sibling)
//!   with backtracking
//!
//! Compilation is pure: it never inspects a tree, and a failed compilation
//! leaves nothing behind.

mod ast;
mod matcher;
mod parse;
mod specificity;

// Re-export public API from the structure module
pub use ast::{AnchorSet, AttrOp, AttrValue, Combinator, CompiledSelector, Selector, Test};

// Re-export public API from the parser module
pub use parse::SelectorError;

// Re-export public API from the scoring module
pub use specificity::Specificity;

pub(crate) use ast::canonical_key;
pub(crate) use matcher::{matches, Cursor, MatchContext};
