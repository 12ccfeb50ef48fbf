//! Advice registry: the ordered multi-map from targets to advice bindings,
//! and the per-call resolution algorithm.
//!
//! All mutations and resolutions go through one coarse lock; the workload is
//! control-plane, not hot-path. The lock is always released before any user
//! callback runs.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::advice::AroundAdvice;
use crate::callsite::{CallKind, CallMatcher, CallSite};
use crate::error::MockError;
use crate::target::{InstanceId, Target};

/// Process-wide registry consulted by every intercepted call.
static GLOBAL: Lazy<AdviceRegistry> = Lazy::new(AdviceRegistry::new);

/// Internal binding identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BindingId(u64);

/// Handle to a registered binding, used to attach/detach targets and to
/// unregister. Cloneable; all clones refer to the same binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingHandle {
    id: BindingId,
}

struct Binding {
    matcher: CallMatcher,
    advice: Arc<AroundAdvice>,
}

/// Registry state behind the coarse lock.
///
/// Invariant: `targets_of[id]` is exactly the set of targets whose
/// `by_target` sequence contains `id`. Removing a target drops only its own
/// attachment, never the binding's other attachments.
#[derive(Default)]
pub(crate) struct RegistryState {
    next_id: u64,
    bindings: FxHashMap<BindingId, Binding>,
    by_target: FxHashMap<Target, Vec<BindingId>>,
    targets_of: FxHashMap<BindingId, FxHashSet<Target>>,
}

impl RegistryState {
    /// Create a binding without attaching it to any target yet.
    pub(crate) fn insert_binding(
        &mut self,
        matcher: CallMatcher,
        advice: AroundAdvice,
    ) -> BindingHandle {
        self.next_id += 1;
        let id = BindingId(self.next_id);
        self.bindings.insert(
            id,
            Binding {
                matcher,
                advice: Arc::new(advice),
            },
        );
        self.targets_of.insert(id, FxHashSet::default());
        BindingHandle { id }
    }

    /// Attach a binding to an additional target. Appending keeps the
    /// significant registration order per target; re-attaching is a no-op.
    pub(crate) fn attach(&mut self, target: Target, handle: &BindingHandle) -> Result<(), MockError> {
        let targets = self
            .targets_of
            .get_mut(&handle.id)
            .ok_or(MockError::StaleBinding)?;
        if !targets.insert(target.clone()) {
            return Ok(());
        }
        self.by_target.entry(target).or_default().push(handle.id);
        Ok(())
    }

    /// Detach a binding from one target; its other attachments survive.
    pub(crate) fn detach(&mut self, target: &Target, handle: &BindingHandle) {
        if let Some(targets) = self.targets_of.get_mut(&handle.id) {
            if !targets.remove(target) {
                return;
            }
        } else {
            return;
        }
        if let Some(seq) = self.by_target.get_mut(target) {
            seq.retain(|id| *id != handle.id);
            if seq.is_empty() {
                self.by_target.remove(target);
            }
        }
    }

    /// Remove a binding from every target it was attached to.
    pub(crate) fn remove_binding(&mut self, handle: &BindingHandle) {
        let Some(targets) = self.targets_of.remove(&handle.id) else {
            return;
        };
        for target in targets {
            if let Some(seq) = self.by_target.get_mut(&target) {
                seq.retain(|id| *id != handle.id);
                if seq.is_empty() {
                    self.by_target.remove(&target);
                }
            }
        }
        self.bindings.remove(&handle.id);
    }

    /// First binding attached to `target` whose kind and matcher accept the
    /// call site, in registration order. First-registered-first-tried: a
    /// broad matcher registered earlier permanently shadows a narrower one
    /// registered later for the same target.
    fn first_match(&self, target: &Target, call: &CallSite) -> Option<BindingId> {
        let seq = self.by_target.get(target)?;
        seq.iter()
            .copied()
            .find(|id| {
                let binding = &self.bindings[id];
                binding.advice.kind().applies_to(call.kind) && binding.matcher.matches(call)
            })
    }

    fn has_instance_attachment(&self, id: BindingId) -> bool {
        self.targets_of
            .get(&id)
            .map(|targets| targets.iter().any(Target::is_instance))
            .unwrap_or(false)
    }

    fn advice_of(&self, id: BindingId) -> Arc<AroundAdvice> {
        self.bindings[&id].advice.clone()
    }
}

/// Synchronized facade over the binding multi-map.
///
/// One registry instance normally exists per process ([`AdviceRegistry::global`]);
/// independent instances are used in tests.
pub struct AdviceRegistry {
    state: Mutex<RegistryState>,
}

impl AdviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// The process-wide registry used by instrumented code.
    pub fn global() -> &'static AdviceRegistry {
        &GLOBAL
    }

    pub(crate) fn locked(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock()
    }

    /// Register advice for a target. The binding is appended to the
    /// target's sequence; ordering equals registration order.
    pub fn register(
        &self,
        target: Target,
        matcher: CallMatcher,
        advice: AroundAdvice,
    ) -> BindingHandle {
        let mut state = self.state.lock();
        let handle = state.insert_binding(matcher, advice);
        // Attaching a freshly inserted binding cannot fail.
        let _ = state.attach(target.clone(), &handle);
        debug!(?target, binding = ?handle, "registered advice binding");
        handle
    }

    /// Remove a binding from every target it was attached to. Idempotent.
    pub fn unregister(&self, handle: &BindingHandle) {
        let mut state = self.state.lock();
        state.remove_binding(handle);
        debug!(binding = ?handle, "unregistered advice binding");
    }

    /// Attach an existing binding to an additional target without changing
    /// its matcher or advice.
    pub fn add_target(&self, target: Target, handle: &BindingHandle) -> Result<(), MockError> {
        let mut state = self.state.lock();
        state.attach(target.clone(), handle)?;
        debug!(?target, binding = ?handle, "attached target");
        Ok(())
    }

    /// Detach a binding from one target. Idempotent.
    pub fn remove_target(&self, target: &Target, handle: &BindingHandle) {
        let mut state = self.state.lock();
        state.detach(target, handle);
        debug!(?target, binding = ?handle, "detached target");
    }

    /// Resolve the single advice governing a call, if any.
    ///
    /// Instance calls: the caller's own bindings win outright; global
    /// instance bindings of the declaring type are the fallback. Static and
    /// constructor calls: class bindings of the declaring type, except that
    /// a binding which is also attached to at least one `Instance` target
    /// anywhere is suppressed — advice scoped to specific instances must
    /// never leak into unscoped static/constructor dispatch.
    ///
    /// No match is not an error; the call then proceeds unmodified.
    pub fn resolve(
        &self,
        caller: Option<InstanceId>,
        call: &CallSite,
    ) -> Option<Arc<AroundAdvice>> {
        let state = self.state.lock();
        match call.kind {
            CallKind::InstanceMethod => {
                let id = caller?;
                if let Some(found) = state.first_match(&Target::Instance(id), call) {
                    return Some(state.advice_of(found));
                }
                let global = Target::GlobalInstance(call.declaring_type.clone());
                state
                    .first_match(&global, call)
                    .map(|found| state.advice_of(found))
            }
            CallKind::StaticMethod | CallKind::Constructor => {
                let class = Target::Class(call.declaring_type.clone());
                let found = state.first_match(&class, call)?;
                if state.has_instance_attachment(found) {
                    return None;
                }
                Some(state.advice_of(found))
            }
        }
    }

    /// Number of live bindings (diagnostics and tests).
    pub fn binding_count(&self) -> usize {
        self.state.lock().bindings.len()
    }
}

impl Default for AdviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
