//! Registration and run surface.
//!
//! The [`Engine`] owns the listener registrations and drives traversal
//! sessions. `on` compiles, scores, and indexes a selector once, atomically;
//! `run` walks a borrowed tree and dispatches in the deterministic order the
//! coordinator guarantees. Registrations are fixed for the duration of a
//! run: the engine is mutably borrowed for the whole pass, so a listener
//! cannot re-enter it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::emitter::{Emitter, ListenerError};
use crate::error::RunError;
use crate::index::SelectorIndex;
use crate::selector::{canonical_key, CompiledSelector, SelectorError};
use crate::types::{CategoryTable, FailurePolicy, Phase, RunStats};
use crate::traverse::{walk, ChildKeyMap};

// ============================================================================
// Configuration
// ============================================================================

/// Engine configuration.
///
/// The category table is part of the configuration (rather than a run
/// option) so that a selector naming an unknown category fails at
/// registration time, before any traversal starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The field naming a node's type tag.
    pub node_type_field: String,
    /// Per-tag ordered child-field lists; absent tags use the fallback
    /// enumerator.
    pub child_keys: ChildKeyMap,
    /// Expansion table for category pseudo-classes.
    pub categories: CategoryTable,
    /// What to do when a listener returns an error mid-dispatch.
    pub on_listener_error: FailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_type_field: "type".to_string(),
            child_keys: ChildKeyMap::default(),
            categories: CategoryTable::default(),
            on_listener_error: FailurePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_type_field(mut self, field: impl Into<String>) -> Self {
        self.node_type_field = field.into();
        self
    }

    pub fn with_child_keys(mut self, child_keys: ChildKeyMap) -> Self {
        self.child_keys = child_keys;
        self
    }

    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_listener_error_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_listener_error = policy;
        self
    }
}

// ============================================================================
// Selector Registry
// ============================================================================

/// Explicit registry of compiled selectors keyed by canonical text.
///
/// Duplicate registrations of the same selector share one compiled entry
/// and one index slot; their listeners still accumulate in the emitter.
#[derive(Debug, Default)]
struct SelectorRegistry {
    by_text: HashMap<String, Arc<CompiledSelector>>,
    ordered: Vec<Arc<CompiledSelector>>,
}

impl SelectorRegistry {
    fn has(&self, key: &str) -> bool {
        self.by_text.contains_key(key)
    }

    fn get(&self, key: &str) -> Option<&Arc<CompiledSelector>> {
        self.by_text.get(key)
    }

    fn insert(&mut self, selector: CompiledSelector) {
        let shared = Arc::new(selector);
        self.by_text
            .insert(shared.text().to_string(), Arc::clone(&shared));
        self.ordered.push(shared);
    }

    fn for_phase(&self, phase: Phase) -> impl Iterator<Item = &Arc<CompiledSelector>> {
        self.ordered.iter().filter(move |sel| sel.phase() == phase)
    }
}

// ============================================================================
// Engine
// ============================================================================

struct Indexes {
    enter: SelectorIndex,
    exit: SelectorIndex,
}

/// The rule-dispatch engine: registration surface plus session driver.
pub struct Engine {
    config: EngineConfig,
    registry: SelectorRegistry,
    emitter: Emitter,
    indexes: Option<Indexes>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            registry: SelectorRegistry::default(),
            emitter: Emitter::default(),
            indexes: None,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a listener for a selector and phase.
    ///
    /// The selector is compiled, scored, and indexed once; a malformed
    /// selector or unknown category fails here, atomically, and never
    /// reaches traversal time. A trailing `:exit` marker in the text forces
    /// the exit phase regardless of `phase`.
    pub fn on<F>(&mut self, selector: &str, phase: Phase, listener: F) -> Result<(), SelectorError>
    where
        F: FnMut(&Value) -> Result<(), ListenerError> + 'static,
    {
        let (key, _) = canonical_key(selector, phase);
        if !self.registry.has(&key) {
            let compiled = CompiledSelector::compile(selector, phase, &self.config.categories)?;
            self.registry.insert(compiled);
            self.indexes = None;
        }
        if let Some(compiled) = self.registry.get(&key) {
            debug!(
                selector = compiled.text(),
                attributes = compiled.specificity().attributes,
                types = compiled.specificity().types,
                "listener registered"
            );
        }
        self.emitter.on(key, Box::new(listener));
        Ok(())
    }

    /// Run one traversal session over a borrowed tree.
    ///
    /// The tree must not be mutated for the duration of the pass (it is
    /// borrowed immutably, so the borrow checker enforces this for safe
    /// callers), and the root must be a node. Re-running with the same
    /// registrations over the same tree produces an identical ordered event
    /// sequence.
    pub fn run(&mut self, tree: &Value) -> Result<RunStats, RunError> {
        let registry = &self.registry;
        let indexes = self.indexes.get_or_insert_with(|| Indexes {
            enter: SelectorIndex::build(registry.for_phase(Phase::Enter)),
            exit: SelectorIndex::build(registry.for_phase(Phase::Exit)),
        });

        let mut dispatcher =
            Dispatcher::new(&self.config, &indexes.enter, &indexes.exit, &mut self.emitter);
        walk(
            tree,
            &self.config.node_type_field,
            &self.config.child_keys,
            &mut dispatcher,
        )?;

        let (stats, failures) = dispatcher.finish();
        if !failures.is_empty() {
            return Err(RunError::Listeners { failures });
        }
        debug!(
            nodes = stats.nodes_visited,
            events = stats.events_emitted,
            "traversal finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn noop() -> impl FnMut(&Value) -> Result<(), ListenerError> + 'static {
        |_| Ok(())
    }

    #[test]
    fn registration_compiles_once_per_canonical_selector() {
        let mut engine = Engine::new();
        engine.on("Identifier", Phase::Enter, noop()).unwrap();
        engine.on("Identifier", Phase::Enter, noop()).unwrap();
        engine.on("Identifier", Phase::Exit, noop()).unwrap();

        assert!(engine.registry.has("Identifier"));
        assert!(engine.registry.has("Identifier:exit"));
        assert_eq!(engine.registry.ordered.len(), 2);
        assert_eq!(
            engine.registry.get("Identifier").unwrap().phase(),
            Phase::Enter
        );
    }

    #[test]
    fn malformed_selector_fails_without_partial_registration() {
        let mut engine = Engine::new();
        let err = engine.on("Foo >", Phase::Enter, noop()).unwrap_err();
        assert!(matches!(err, SelectorError::Syntax { offset: 5, .. }));

        assert!(!engine.registry.has("Foo >"));
        assert!(!engine.emitter.has_listeners("Foo >"));

        // The engine is still fully usable afterwards.
        engine.on("Foo", Phase::Enter, noop()).unwrap();
        let stats = engine.run(&json!({ "type": "Foo" })).unwrap();
        assert_eq!(stats.nodes_visited, 1);
        assert_eq!(stats.events_emitted, 1);
    }

    #[test]
    fn unknown_category_fails_registration() {
        let mut engine = Engine::new();
        let err = engine.on(":statement", Phase::Enter, noop()).unwrap_err();
        assert!(matches!(err, SelectorError::UnknownCategory { .. }));
    }

    #[test]
    fn run_rejects_a_non_node_root() {
        let mut engine = Engine::new();
        let err = engine.run(&json!("just a string")).unwrap_err();
        assert!(matches!(err, RunError::InvalidRoot { .. }));
    }

    #[test]
    fn stats_count_nodes_candidates_and_events() {
        let mut engine = Engine::new();
        engine.on("Leaf", Phase::Enter, noop()).unwrap();
        engine.on("[name]", Phase::Enter, noop()).unwrap();

        let tree = json!({
            "type": "Pair",
            "left": { "type": "Leaf", "name": "l" },
            "right": { "type": "Leaf", "name": "r" },
        });
        let stats = engine.run(&tree).unwrap();

        assert_eq!(stats.nodes_visited, 3);
        // "[name]" is evaluated at every node; "Leaf" only at Leaf nodes.
        assert_eq!(stats.candidates_evaluated, 5);
        // Both selectors match both leaves; the root matches neither.
        assert_eq!(stats.events_emitted, 4);
    }

    #[test]
    fn registrations_between_runs_rebuild_the_index() {
        let log = Rc::new(RefCell::new(Vec::<String>::new()));
        let tree = json!({ "type": "Leaf", "name": "x" });

        let mut engine = Engine::new();
        let sink = Rc::clone(&log);
        engine
            .on("Leaf", Phase::Enter, move |_| {
                sink.borrow_mut().push("first".to_string());
                Ok(())
            })
            .unwrap();
        engine.run(&tree).unwrap();

        let sink = Rc::clone(&log);
        engine
            .on("[name]", Phase::Enter, move |_| {
                sink.borrow_mut().push("second".to_string());
                Ok(())
            })
            .unwrap();
        engine.run(&tree).unwrap();

        assert_eq!(*log.borrow(), vec!["first", "first", "second"]);
    }

    #[test]
    fn config_builder() {
        let config = EngineConfig::new()
            .with_node_type_field("kind")
            .with_listener_error_policy(FailurePolicy::Continue);
        assert_eq!(config.node_type_field, "kind");
        assert_eq!(config.on_listener_error, FailurePolicy::Continue);

        let mut engine = Engine::with_config(config);
        engine.on("Foo", Phase::Enter, noop()).unwrap();
        let stats = engine.run(&json!({ "kind": "Foo" })).unwrap();
        assert_eq!(stats.events_emitted, 1);
    }
}
