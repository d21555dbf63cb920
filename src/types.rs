//! Shared vocabulary types for registration and dispatch.
//!
//! These are the small value types that cross module boundaries: the
//! traversal phase a registration is bound to, the listener failure policy,
//! the category table backing category pseudo-classes, and the statistics
//! record returned by a traversal run.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

// ============================================================================
// Phase
// ============================================================================

/// The traversal moment a registration is bound to.
///
/// Every node dispatches `Enter` before any of its children are visited and
/// `Exit` after all of its children have entered and exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Dispatched pre-order, before descending into children.
    Enter,
    /// Dispatched post-order, after all children have been visited.
    Exit,
}

// ============================================================================
// Failure Policy
// ============================================================================

/// What to do when a listener callback returns an error during dispatch.
///
/// Neither policy discards errors: `Abort` surfaces the first failure
/// immediately, `Continue` surfaces every collected failure once the
/// traversal finishes. The deterministic ordering of listeners that do run
/// is never perturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the pass at the first listener error and surface it.
    #[default]
    Abort,
    /// Run the remaining listeners for the node and phase in their
    /// deterministic order, then report every failure when the run returns.
    Continue,
}

// ============================================================================
// Category Table
// ============================================================================

/// Static expansion table for category pseudo-classes.
///
/// A selector such as `:statement` matches a node whose type tag is in the
/// set registered under `"statement"`. The table is an explicit value handed
/// to the compiler at engine construction; there is no implicit global
/// registry, and a selector naming an absent category fails registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTable {
    entries: HashMap<String, BTreeSet<String>>,
}

impl CategoryTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with<N, T, I>(mut self, name: N, tags: I) -> Self
    where
        N: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = T>,
    {
        self.insert(name, tags);
        self
    }

    /// Register the tag set for a category name, replacing any previous set.
    pub fn insert<N, T, I>(&mut self, name: N, tags: I)
    where
        N: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = T>,
    {
        self.entries
            .insert(name.into(), tags.into_iter().map(Into::into).collect());
    }

    /// Look up the tag set for a category name.
    pub fn get(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(name)
    }

    /// Whether a category name is registered.
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

// ============================================================================
// Run Statistics
// ============================================================================

/// Statistics from a single traversal run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Nodes visited by the walk (each node counts once).
    pub nodes_visited: usize,
    /// Candidate selectors evaluated across all nodes and phases.
    pub candidates_evaluated: usize,
    /// Matched selector events emitted (one per match per phase).
    pub events_emitted: usize,
}
