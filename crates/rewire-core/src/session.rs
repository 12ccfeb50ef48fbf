//! Scoped mock sessions: a builder that accumulates registrations and an
//! RAII handle that reverts them all on close.
//!
//! `build()` applies every registration under one registry guard, so no
//! intercepted call observes a partially-applied session. `close()` tears
//! everything down in reverse order, exactly once, from any thread; dropping
//! the handle closes it too.

use std::marker::PhantomData;

use parking_lot::Mutex;
use tracing::debug;

use crate::advice::{AdviceKind, AroundAdvice};
use crate::callsite::{CallMatcher, TypeName};
use crate::construction::ConstructionRegistry;
use crate::error::MockError;
use crate::intercept::Mockable;
use crate::registry::{AdviceRegistry, BindingHandle};
use crate::target::Target;

/// Accumulates desired registrations for one class without applying
/// anything until [`build`](MockBuilder::build).
pub struct MockBuilder<T: Mockable> {
    advices: Vec<(CallMatcher, AroundAdvice)>,
    spy: bool,
    mock_static_methods: bool,
    mock_constructors: bool,
    global_instance: bool,
    excluded_super_types: Vec<TypeName>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Mockable> MockBuilder<T> {
    fn new() -> Self {
        Self {
            advices: Vec::new(),
            spy: false,
            mock_static_methods: false,
            mock_constructors: false,
            global_instance: false,
            excluded_super_types: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Add an advice of any kind; registration order is matching order.
    pub fn advise(mut self, matcher: CallMatcher, advice: AroundAdvice) -> Self {
        self.advices.push((matcher, advice));
        self
    }

    /// Spy mode: no catch-all stub advice, only what was added explicitly.
    pub fn spy(mut self) -> Self {
        self.spy = true;
        self
    }

    /// Also stub static methods with the catch-all advice (non-spy mode).
    pub fn mock_static_methods(mut self, enabled: bool) -> Self {
        self.mock_static_methods = enabled;
        self
    }

    /// Suppress constructors of the class and its ancestry while the
    /// session is open.
    pub fn mock_constructors(mut self) -> Self {
        self.mock_constructors = true;
        self
    }

    /// Attach the session's instance advice to all instances of the class,
    /// as if each had been registered individually.
    pub fn add_global_instance(mut self) -> Self {
        self.global_instance = true;
        self
    }

    /// Leave the given ancestor classes out of constructor suppression.
    pub fn exclude_super_types(mut self, names: impl IntoIterator<Item = TypeName>) -> Self {
        self.excluded_super_types.extend(names);
        self
    }

    /// Apply all registrations atomically and return the session handle.
    pub fn build(self) -> MockFactory<T> {
        let registry = AdviceRegistry::global();
        let construction = ConstructionRegistry::global();

        let mut advices: Vec<(CallMatcher, AroundAdvice)> = Vec::new();
        if !self.spy {
            advices.push((
                CallMatcher::any(),
                AroundAdvice::mock(AdviceKind::InstanceMethod),
            ));
            if self.mock_static_methods {
                advices.push((
                    CallMatcher::any(),
                    AroundAdvice::mock(AdviceKind::StaticMethod),
                ));
            }
        }
        advices.extend(self.advices);

        let mut bindings = Vec::new();
        let mut activations = Vec::new();
        {
            // One guard across the whole application: no intercepted call
            // observes a partially-applied session.
            let mut state = registry.locked();
            for (matcher, advice) in advices {
                let kind = advice.kind();
                let handle = state.insert_binding(matcher, advice);
                let initial_target = match kind {
                    AdviceKind::InstanceMethod => self
                        .global_instance
                        .then(|| Target::GlobalInstance(T::type_name())),
                    AdviceKind::StaticMethod | AdviceKind::Constructor => {
                        Some(Target::Class(T::type_name()))
                    }
                };
                if let Some(target) = initial_target {
                    // Freshly inserted bindings cannot be stale.
                    let _ = state.attach(target, &handle);
                }
                bindings.push(handle);
            }

            if self.mock_constructors {
                let mut chain = vec![T::type_name()];
                chain.extend(T::super_type_names());
                for class in chain {
                    if self.excluded_super_types.contains(&class) {
                        continue;
                    }
                    construction.activate(&class);
                    activations.push(class);
                }
            }
        }

        debug!(
            class = %T::type_name(),
            bindings = bindings.len(),
            activations = activations.len(),
            "mock session applied"
        );
        MockFactory {
            session: Mutex::new(SessionState {
                closed: false,
                bindings,
                activations,
            }),
            _marker: PhantomData,
        }
    }
}

struct SessionState {
    closed: bool,
    bindings: Vec<BindingHandle>,
    activations: Vec<TypeName>,
}

/// A live mock session for one class.
///
/// Every registration and construction activation it applied is reverted on
/// [`close`](MockFactory::close) — or on drop, whichever comes first.
pub struct MockFactory<T: Mockable> {
    session: Mutex<SessionState>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Mockable> MockFactory<T> {
    /// Start building a session for `T`.
    pub fn for_class() -> MockBuilder<T> {
        MockBuilder::new()
    }

    /// Construct an instance of `T` through the normal path (constructor
    /// suppression, if configured, takes effect) and, if `auto_register`,
    /// attach it as an instance target of every binding in this session.
    pub fn create_instance(&self, auto_register: bool) -> Result<std::sync::Arc<T>, MockError> {
        let bindings = self.live_bindings()?;
        let instance = T::new_instance()?;
        if auto_register {
            let target = Target::Instance(instance.instance_id());
            let registry = AdviceRegistry::global();
            for handle in &bindings {
                registry.add_target(target.clone(), handle)?;
            }
        }
        Ok(instance)
    }

    /// Scope this session's advice to an instance constructed elsewhere.
    pub fn add_target(&self, instance: &T) -> Result<(), MockError> {
        let bindings = self.live_bindings()?;
        let target = Target::Instance(instance.instance_id());
        let registry = AdviceRegistry::global();
        for handle in &bindings {
            registry.add_target(target.clone(), handle)?;
        }
        Ok(())
    }

    /// Detach an instance from this session's advice. Idempotent.
    pub fn remove_target(&self, instance: &T) -> Result<(), MockError> {
        let bindings = self.live_bindings()?;
        let target = Target::Instance(instance.instance_id());
        let registry = AdviceRegistry::global();
        for handle in &bindings {
            registry.remove_target(&target, handle);
        }
        Ok(())
    }

    /// Revert everything this session applied, in reverse order. Safe to
    /// call multiple times and from any thread; only the first call has an
    /// effect.
    pub fn close(&self) {
        let mut session = self.session.lock();
        if session.closed {
            return;
        }
        session.closed = true;

        let construction = ConstructionRegistry::global();
        for class in session.activations.iter().rev() {
            construction.deactivate(class);
        }

        let registry = AdviceRegistry::global();
        {
            let mut state = registry.locked();
            for handle in session.bindings.iter().rev() {
                state.remove_binding(handle);
            }
        }
        session.bindings.clear();
        session.activations.clear();
        debug!(class = %T::type_name(), "mock session closed");
    }

    fn live_bindings(&self) -> Result<Vec<BindingHandle>, MockError> {
        let session = self.session.lock();
        if session.closed {
            return Err(MockError::SessionClosed);
        }
        Ok(session.bindings.clone())
    }
}

impl<T: Mockable> Drop for MockFactory<T> {
    fn drop(&mut self) {
        self.close();
    }
}
