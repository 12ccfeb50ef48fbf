//! Canonical call interception points.
//!
//! The core consumes exactly one capability from its environment: something
//! that wraps every instrumented call in `enter`/`exit` and obeys the
//! proceed verdict. These helpers are that wrapper in its canonical form,
//! used by hand-instrumented types (and by any embedder that rewrites call
//! sites itself). They always operate on the process-wide registries.

use std::any::Any;
use std::sync::Arc;

use crate::callsite::{CallSite, TypeName};
use crate::construction::{ConstructionRegistry, MockInstance};
use crate::dispatch;
use crate::error::CallError;
use crate::registry::AdviceRegistry;
use crate::target::InstanceId;
use crate::value::Value;

/// Contract an instrumented type fulfils so that mock sessions can identify
/// its instances and construct new ones through the normal (interceptable)
/// path.
pub trait Mockable: Any + Send + Sync + Sized {
    /// Name of the instrumented type.
    fn type_name() -> TypeName;

    /// Ancestor type names, nearest first. Used when a session suppresses
    /// constructors along the inheritance chain.
    fn super_type_names() -> Vec<TypeName> {
        Vec::new()
    }

    /// Identity of this instance.
    fn instance_id(&self) -> InstanceId;

    /// Construct an instance through the normal path, so that constructor
    /// suppression and constructor advice take effect.
    fn new_instance() -> Result<Arc<Self>, CallError>;
}

/// Run an instrumented instance method call.
///
/// `body` is the original method body, operating on the (possibly
/// advice-mutated) argument slots.
pub fn instance_call(
    target: InstanceId,
    call: &CallSite,
    args: Vec<Value>,
    body: impl FnOnce(&[Value]) -> Result<Value, CallError>,
) -> Result<Value, CallError> {
    let mut args = args;
    let token = dispatch::enter(AdviceRegistry::global(), Some(target), call, &mut args);
    let (result, error) = if token.proceed() {
        match body(&args) {
            Ok(value) => (value, None),
            Err(err) => (Value::Null, Some(err)),
        }
    } else {
        (Value::Null, None)
    };
    dispatch::exit(Some(target), call, &mut args, token, result, error)
}

/// Run an instrumented static method call.
pub fn static_call(
    call: &CallSite,
    args: Vec<Value>,
    body: impl FnOnce(&[Value]) -> Result<Value, CallError>,
) -> Result<Value, CallError> {
    let mut args = args;
    let token = dispatch::enter(AdviceRegistry::global(), None, call, &mut args);
    let (result, error) = if token.proceed() {
        match body(&args) {
            Ok(value) => (value, None),
            Err(err) => (Value::Null, Some(err)),
        }
    } else {
        (Value::Null, None)
    };
    dispatch::exit(None, call, &mut args, token, result, error)
}

/// Run an instrumented constructor call for `T`.
///
/// `init(args, run_own_body)` builds the instance. When `run_own_body` is
/// false (the class is suppressed, or constructor advice vetoed the body),
/// the closure must leave `T`'s own declared fields at their defaults and
/// hand default-valued arguments to any super-level initializers — which in
/// turn consult their own classes' activation flags, keeping each level of
/// the chain independent.
///
/// A suppressed construction is appended to `T`'s pending queue.
pub fn constructor_call<T, F>(
    call: &CallSite,
    args: Vec<Value>,
    init: F,
) -> Result<Arc<T>, CallError>
where
    T: Mockable,
    F: FnOnce(&[Value], bool) -> T,
{
    let construction = ConstructionRegistry::global();
    let mut args = args;
    let token = dispatch::enter(AdviceRegistry::global(), None, call, &mut args);
    let suppressed = construction.is_mock(&T::type_name());
    let instance = Arc::new(init(&args, token.proceed() && !suppressed));
    if suppressed {
        let pending: MockInstance = instance.clone();
        construction.push_pending(&T::type_name(), pending);
    }
    dispatch::exit(None, call, &mut args, token, Value::Null, None)?;
    Ok(instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::{AdviceKind, AroundAdvice};
    use crate::callsite::CallMatcher;
    use crate::target::Target;
    use crate::value::TypeSig;

    // Minimal hand-instrumented type. Namespaced type name so these tests
    // never collide with other suites sharing the global registries.
    struct Probe {
        id: InstanceId,
        level: i64,
    }

    impl Probe {
        fn call_site() -> CallSite {
            CallSite::constructor("intercept::Probe", vec![TypeSig::Int])
        }

        fn build(level: i64) -> Result<Arc<Probe>, CallError> {
            constructor_call::<Probe, _>(
                &Self::call_site(),
                vec![Value::Int(level)],
                |args, own| Probe {
                    id: InstanceId::next(),
                    level: if own {
                        args[0].as_int().unwrap_or(0)
                    } else {
                        0
                    },
                },
            )
        }

        fn level(&self) -> Result<i64, CallError> {
            let call = CallSite::method("intercept::Probe", "level", vec![], TypeSig::Int);
            instance_call(self.id, &call, vec![], |_| Ok(Value::Int(self.level)))?.as_int()
        }
    }

    impl Mockable for Probe {
        fn type_name() -> TypeName {
            TypeName::new("intercept::Probe")
        }

        fn instance_id(&self) -> InstanceId {
            self.id
        }

        fn new_instance() -> Result<Arc<Self>, CallError> {
            Self::build(0)
        }
    }

    #[test]
    fn test_unadvised_instance_call_runs_body() {
        let probe = Probe::build(7).unwrap();
        assert_eq!(probe.level().unwrap(), 7);
    }

    #[test]
    fn test_advised_instance_call() {
        let registry = AdviceRegistry::global();
        let probe = Probe::build(5).unwrap();
        let handle = registry.register(
            Target::instance(probe.id),
            CallMatcher::named("level"),
            AroundAdvice::with_kind(AdviceKind::InstanceMethod).on_after(
                |_, _, _, _, result, _| Ok(Value::Int(result.as_int()? * 11)),
            ),
        );

        assert_eq!(probe.level().unwrap(), 55);

        let sibling = Probe::build(5).unwrap();
        assert_eq!(sibling.level().unwrap(), 5);

        registry.unregister(&handle);
        assert_eq!(probe.level().unwrap(), 5);
    }

    #[test]
    fn test_static_call_stub() {
        let call = CallSite::static_method("intercept::ProbeUtil", "answer", vec![], TypeSig::Int);
        let registry = AdviceRegistry::global();
        let handle = registry.register(
            Target::class("intercept::ProbeUtil"),
            CallMatcher::named("answer"),
            AroundAdvice::with_kind(AdviceKind::StaticMethod)
                .on_before(|_, _, _| false)
                .on_after(|_, _, _, _, _, _| Ok(Value::Int(42))),
        );

        let out = static_call(&call, vec![], |_| Ok(Value::Int(1))).unwrap();
        assert_eq!(out, Value::Int(42));

        registry.unregister(&handle);
        let out = static_call(&call, vec![], |_| Ok(Value::Int(1))).unwrap();
        assert_eq!(out, Value::Int(1));
    }

    // Own type so that activating suppression cannot interfere with the
    // Probe tests running in parallel against the shared registries.
    struct QueuedProbe {
        id: InstanceId,
        level: i64,
    }

    impl QueuedProbe {
        fn build(level: i64) -> Result<Arc<QueuedProbe>, CallError> {
            let call = CallSite::constructor("intercept::QueuedProbe", vec![TypeSig::Int]);
            constructor_call::<QueuedProbe, _>(&call, vec![Value::Int(level)], |args, own| {
                QueuedProbe {
                    id: InstanceId::next(),
                    level: if own {
                        args[0].as_int().unwrap_or(0)
                    } else {
                        0
                    },
                }
            })
        }
    }

    impl Mockable for QueuedProbe {
        fn type_name() -> TypeName {
            TypeName::new("intercept::QueuedProbe")
        }

        fn instance_id(&self) -> InstanceId {
            self.id
        }

        fn new_instance() -> Result<Arc<Self>, CallError> {
            Self::build(0)
        }
    }

    #[test]
    fn test_suppressed_construction_enqueues() {
        let construction = ConstructionRegistry::global();
        let class = QueuedProbe::type_name();

        construction.activate(&class);
        let probe = QueuedProbe::build(9).unwrap();
        assert_eq!(probe.level, 0);

        let pending = construction.poll::<QueuedProbe>(&class).unwrap();
        assert_eq!(pending.id, probe.id);
        assert!(construction.poll_mock_instance(&class).is_none());
        construction.deactivate(&class);

        let probe = QueuedProbe::build(9).unwrap();
        assert_eq!(probe.level, 9);
        assert!(construction.poll_mock_instance(&class).is_none());
    }
}
