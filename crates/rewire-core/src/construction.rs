//! Construction-suppression registry.
//!
//! Per-class activation flag plus a FIFO queue of suppressed-construction
//! instances. Independent of the advice registry; the interception mechanism
//! consults it at constructor call sites.
//!
//! Known limitation: flipping a class to active is a registry-side mutation
//! only. Code whose constructors are not instrumented keeps constructing
//! normally while `is_mock` reports active; the registry cannot know the
//! environment's rewriting capability, so this is documented rather than
//! raised as an error.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::callsite::TypeName;

/// A suppressed-construction instance as handed out by the queue.
pub type MockInstance = Arc<dyn Any + Send + Sync>;

/// Process-wide construction registry used by instrumented constructors.
static GLOBAL: Lazy<ConstructionRegistry> = Lazy::new(ConstructionRegistry::new);

/// Per-class suppression state, created lazily on first activation.
#[derive(Default)]
struct ConstructionState {
    active: bool,
    pending: VecDeque<MockInstance>,
}

/// Registry of per-class construction-suppression states.
///
/// Queues support concurrent push from many threads and pop from any thread;
/// the per-key map shard lock guarantees no lost or duplicated entries.
/// Poll never blocks: an empty queue answers `None` immediately.
pub struct ConstructionRegistry {
    classes: DashMap<TypeName, ConstructionState>,
}

impl ConstructionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            classes: DashMap::new(),
        }
    }

    /// The process-wide registry used by instrumented code.
    pub fn global() -> &'static ConstructionRegistry {
        &GLOBAL
    }

    /// Switch constructor suppression on for a class. Idempotent; this is a
    /// process-wide mutation with no rollback.
    pub fn activate(&self, class: &TypeName) {
        let mut state = self.classes.entry(class.clone()).or_default();
        if !state.active {
            state.active = true;
            debug!(%class, "construction suppression activated");
        }
    }

    /// Switch constructor suppression off for a class. Idempotent. Pending
    /// instances stay queued until polled.
    pub fn deactivate(&self, class: &TypeName) {
        if let Some(mut state) = self.classes.get_mut(class) {
            if state.active {
                state.active = false;
                debug!(%class, "construction suppression deactivated");
            }
        }
    }

    /// Current activation state for a class.
    pub fn is_mock(&self, class: &TypeName) -> bool {
        self.classes
            .get(class)
            .map(|state| state.active)
            .unwrap_or(false)
    }

    /// Append a suppressed-construction instance to the class's queue.
    ///
    /// Called by the interception mechanism for every suppressed
    /// construction while the class is active.
    pub fn push_pending(&self, class: &TypeName, instance: MockInstance) {
        self.classes
            .entry(class.clone())
            .or_default()
            .pending
            .push_back(instance);
    }

    /// Dequeue the oldest pending instance for a class, if any.
    ///
    /// Exists for code paths where the constructed object is not otherwise
    /// reachable by the caller that needs to assert on it (construction
    /// happens inside a collaborator).
    pub fn poll_mock_instance(&self, class: &TypeName) -> Option<MockInstance> {
        self.classes.get_mut(class)?.pending.pop_front()
    }

    /// Typed variant of [`poll_mock_instance`](Self::poll_mock_instance).
    ///
    /// Answers `None` both for an empty queue and for an instance of an
    /// unexpected type (the latter indicates a mis-keyed queue and is a
    /// caller bug).
    pub fn poll<T: Any + Send + Sync>(&self, class: &TypeName) -> Option<Arc<T>> {
        self.poll_mock_instance(class)
            .and_then(|instance| instance.downcast::<T>().ok())
    }

    /// Number of queued instances for a class.
    pub fn pending_count(&self, class: &TypeName) -> usize {
        self.classes
            .get(class)
            .map(|state| state.pending.len())
            .unwrap_or(0)
    }
}

impl Default for ConstructionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
