//! Collision-safe publish/subscribe primitive.
//!
//! Listeners are stored under arbitrary string keys (selector text is
//! author-controlled and untrusted), so the store must be an associative
//! structure keyed strictly by string equality. A `HashMap<String, _>` makes
//! keys like `constructor` or `__proto__` behave as ordinary values; nothing
//! here can alias a reserved member name.
//!
//! The emitter has no tree knowledge: it appends listeners in insertion
//! order and invokes them with an opaque payload.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

/// Error type a listener callback may return.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A boxed listener callback.
pub type Listener = Box<dyn FnMut(&Value) -> Result<(), ListenerError>>;

/// A recorded listener failure: which key's listener failed, and how.
#[derive(Debug)]
pub struct ListenerFailure {
    /// The event key (canonical selector text) whose listener failed.
    pub selector: String,
    /// The error the listener returned.
    pub error: ListenerError,
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener for '{}' failed: {}", self.selector, self.error)
    }
}

/// String-keyed listener store.
#[derive(Default)]
pub struct Emitter {
    listeners: HashMap<String, Vec<Listener>>,
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("keys", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Emitter {
    /// Create an empty emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener under a key, preserving insertion order.
    pub fn on(&mut self, key: impl Into<String>, listener: Listener) {
        self.listeners.entry(key.into()).or_default().push(listener);
    }

    /// Whether any listener is registered under a key.
    pub fn has_listeners(&self, key: &str) -> bool {
        self.listeners.get(key).is_some_and(|list| !list.is_empty())
    }

    /// Invoke the listeners for a key in insertion order, stopping at the
    /// first failure. Emitting a key with no listeners is a no-op.
    pub fn emit(&mut self, key: &str, payload: &Value) -> Result<(), ListenerFailure> {
        if let Some(list) = self.listeners.get_mut(key) {
            for listener in list {
                listener(payload).map_err(|error| ListenerFailure {
                    selector: key.to_string(),
                    error,
                })?;
            }
        }
        Ok(())
    }

    /// Invoke every listener for a key in insertion order, collecting
    /// failures instead of stopping at the first one.
    pub fn emit_collect(&mut self, key: &str, payload: &Value, failures: &mut Vec<ListenerFailure>) {
        if let Some(list) = self.listeners.get_mut(key) {
            for listener in list {
                if let Err(error) = listener(payload) {
                    failures.push(ListenerFailure {
                        selector: key.to_string(),
                        error,
                    });
                }
            }
        }
    }
}
