//! Dispatch coordinator.
//!
//! One `Dispatcher` lives for the duration of a single traversal run. At
//! each node and phase it pulls the merged candidate sequence from the
//! index, evaluates each candidate against the node and its ancestor
//! context, and emits matches in dispatch order. Because the index buckets
//! are pre-sorted and merged by the same comparator, evaluation order *is*
//! firing order: wildcard before type selectors before attribute selectors,
//! ties broken on canonical text, independent of registration order.

use serde_json::Value;
use tracing::trace;

use crate::emitter::{Emitter, ListenerFailure};
use crate::engine::EngineConfig;
use crate::error::RunError;
use crate::index::SelectorIndex;
use crate::node::tag_of;
use crate::selector::{matches, Cursor, MatchContext};
use crate::traverse::Visit;
use crate::types::{FailurePolicy, Phase, RunStats};

pub(crate) struct Dispatcher<'e> {
    config: &'e EngineConfig,
    enter_index: &'e SelectorIndex,
    exit_index: &'e SelectorIndex,
    emitter: &'e mut Emitter,
    stats: RunStats,
    failures: Vec<ListenerFailure>,
}

impl<'e> Dispatcher<'e> {
    pub(crate) fn new(
        config: &'e EngineConfig,
        enter_index: &'e SelectorIndex,
        exit_index: &'e SelectorIndex,
        emitter: &'e mut Emitter,
    ) -> Self {
        Self {
            config,
            enter_index,
            exit_index,
            emitter,
            stats: RunStats::default(),
            failures: Vec::new(),
        }
    }

    /// Tear down after a completed walk, yielding the statistics and any
    /// failures collected under `FailurePolicy::Continue`.
    pub(crate) fn finish(self) -> (RunStats, Vec<ListenerFailure>) {
        (self.stats, self.failures)
    }

    fn dispatch(
        &mut self,
        node: &Value,
        ancestry: &[&Value],
        phase: Phase,
    ) -> Result<(), RunError> {
        let config = self.config;
        let Some(tag) = tag_of(node, &config.node_type_field) else {
            return Ok(());
        };
        let index = match phase {
            Phase::Enter => self.enter_index,
            Phase::Exit => self.exit_index,
        };
        let ctx = MatchContext {
            type_field: &config.node_type_field,
            child_keys: &config.child_keys,
            categories: &config.categories,
        };
        let cursor = Cursor { node, ancestry };

        for candidate in index.candidates(tag) {
            self.stats.candidates_evaluated += 1;
            if !matches(candidate.selector(), cursor, &ctx) {
                continue;
            }
            self.stats.events_emitted += 1;
            trace!(selector = candidate.text(), tag, "selector matched");
            match config.on_listener_error {
                FailurePolicy::Abort => {
                    self.emitter
                        .emit(candidate.text(), node)
                        .map_err(|failure| RunError::Listener {
                            selector: failure.selector,
                            error: failure.error,
                        })?;
                }
                FailurePolicy::Continue => {
                    self.emitter
                        .emit_collect(candidate.text(), node, &mut self.failures);
                }
            }
        }
        Ok(())
    }
}

impl<'t> Visit<'t> for Dispatcher<'_> {
    fn enter(&mut self, node: &'t Value, ancestry: &[&'t Value]) -> Result<(), RunError> {
        self.stats.nodes_visited += 1;
        self.dispatch(node, ancestry, Phase::Enter)
    }

    fn leave(&mut self, node: &'t Value, ancestry: &[&'t Value]) -> Result<(), RunError> {
        self.dispatch(node, ancestry, Phase::Exit)
    }
}
