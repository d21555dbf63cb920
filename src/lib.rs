//! Selector-based rule dispatch for syntax tree analysis.
//!
//! This crate is the dispatch backbone of a static-analysis engine: rules
//! register structural patterns ("selectors") over a parsed syntax tree and
//! are invoked, in a reproducible total order, as a single traversal pass
//! visits matching nodes. It provides:
//! - A selector compiler and matcher for a CSS-selector-like query language
//! - A specificity scorer and anchor-tag index that keep matching tractable
//! - A dispatch coordinator driving ordered, deterministic notification
//! - A collision-safe string-keyed publish/subscribe primitive
//! - A traversal driver with per-tag child keys and a fallback enumerator
//!
//! The tree is a borrowed `serde_json::Value`: an object whose type-tag
//! field (default `"type"`) holds a string, with children reachable through
//! configured field names. The crate never constructs or mutates the tree.
//!
//! ```
//! use serde_json::json;
//! use treesift::{Engine, Phase};
//!
//! let mut engine = Engine::new();
//! engine.on("BinaryExpression > Identifier", Phase::Enter, |node| {
//!     println!("operand: {}", node["name"]);
//!     Ok(())
//! })?;
//!
//! let tree = json!({
//!     "type": "BinaryExpression",
//!     "left": { "type": "Identifier", "name": "a" },
//!     "right": { "type": "Identifier", "name": "b" },
//! });
//! let stats = engine.run(&tree)?;
//! assert_eq!(stats.events_emitted, 2);
//! # Ok::<(), treesift::SiftError>(())
//! ```

mod dispatch;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod index;
mod node;
pub mod selector;
pub mod traverse;
pub mod types;

pub use emitter::{Emitter, Listener, ListenerError, ListenerFailure};
pub use engine::{Engine, EngineConfig};
pub use error::{RunError, SiftError};
pub use index::SelectorIndex;
pub use selector::{
    AnchorSet, AttrOp, AttrValue, Combinator, CompiledSelector, Selector, SelectorError,
    Specificity, Test,
};
pub use traverse::{walk, ChildKeyMap, Visit};
pub use types::{CategoryTable, FailurePolicy, Phase, RunStats};
