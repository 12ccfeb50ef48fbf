//! Dispatch engine: the `enter`/`exit` entry points invoked by the
//! interception mechanism at every intercepted call.
//!
//! `enter` resolves the governing advice once and carries it in the returned
//! [`DispatchToken`]; `exit` never performs a second lookup. The registry
//! lock is held only during resolution, never while user callbacks run.

use std::cell::RefCell;
use std::sync::Arc;

use tracing::warn;

use crate::advice::AroundAdvice;
use crate::callsite::CallSite;
use crate::error::CallError;
use crate::registry::AdviceRegistry;
use crate::target::InstanceId;
use crate::value::Value;

thread_local! {
    // Targets currently being advised on this thread. Recursion is a
    // single-thread concern; the stack is never shared.
    static ACTIVE_TARGETS: RefCell<Vec<InstanceId>> = const { RefCell::new(Vec::new()) };
}

/// RAII frame on the per-thread target stack.
struct GuardFrame;

impl GuardFrame {
    fn push(id: InstanceId) -> Self {
        ACTIVE_TARGETS.with(|stack| stack.borrow_mut().push(id));
        GuardFrame
    }
}

impl Drop for GuardFrame {
    fn drop(&mut self) {
        ACTIVE_TARGETS.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

fn is_reentrant(id: InstanceId) -> bool {
    ACTIVE_TARGETS.with(|stack| stack.borrow().last() == Some(&id))
}

/// Outcome of [`enter`], to be handed back to [`exit`].
///
/// Carries the proceed verdict and the resolved advice so that `exit` works
/// on exactly the advice that saw the call begin.
#[derive(Debug)]
pub struct DispatchToken {
    proceed: bool,
    advice: Option<Arc<AroundAdvice>>,
}

impl DispatchToken {
    fn pass() -> Self {
        Self {
            proceed: true,
            advice: None,
        }
    }

    /// Whether the interception mechanism must run the original call body.
    pub fn proceed(&self) -> bool {
        self.proceed
    }

    /// Whether any advice governs this call.
    pub fn advised(&self) -> bool {
        self.advice.is_some()
    }
}

/// Entry point invoked before the call body runs.
///
/// Resolves the governing advice and invokes its `before` callback on a
/// copy of the arguments, assigning the copy back so mutations reach the
/// intercepted call. No advice means the call proceeds unconditionally.
///
/// If the same live target is already being advised on this thread (advice
/// internals calling back into the intercepted object), advice lookup is
/// skipped and the call proceeds normally; this recovers from what would
/// otherwise be unbounded recursion.
pub fn enter(
    registry: &AdviceRegistry,
    target: Option<InstanceId>,
    call: &CallSite,
    args: &mut Vec<Value>,
) -> DispatchToken {
    if let Some(id) = target {
        if is_reentrant(id) {
            warn!(target_id = id.as_u64(), %call, "recursive dispatch detected, proceeding unadvised");
            return DispatchToken::pass();
        }
    }
    let _frame = target.map(GuardFrame::push);

    let Some(advice) = registry.resolve(target, call) else {
        return DispatchToken::pass();
    };

    let mut args_copy = args.clone();
    let proceed = advice.invoke_before(target, call, &mut args_copy);
    *args = args_copy;

    DispatchToken {
        proceed,
        advice: Some(advice),
    }
}

/// Entry point invoked after the call body completed, threw, or was
/// skipped.
///
/// Without advice the result and error pass through untouched. With advice,
/// a vetoed `proceed` seeds the result with the return type's default
/// before `after` runs; a failing `after` replaces the call's error and
/// nulls the result, a successful one clears it.
pub fn exit(
    target: Option<InstanceId>,
    call: &CallSite,
    args: &mut Vec<Value>,
    token: DispatchToken,
    result: Value,
    error: Option<CallError>,
) -> Result<Value, CallError> {
    let DispatchToken { proceed, advice } = token;
    let Some(advice) = advice else {
        return match error {
            Some(err) => Err(err),
            None => Ok(result),
        };
    };

    let _frame = target.map(GuardFrame::push);

    let seeded = if proceed {
        result
    } else {
        call.return_type.default_value()
    };
    advice.invoke_after(target, call, args, proceed, seeded, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::AdviceKind;
    use crate::callsite::CallMatcher;
    use crate::target::Target;
    use crate::value::TypeSig;

    fn add_call() -> CallSite {
        CallSite::method("Calculator", "add", vec![TypeSig::Int, TypeSig::Int], TypeSig::Int)
    }

    #[test]
    fn test_unadvised_call_passes_through() {
        let registry = AdviceRegistry::new();
        let id = InstanceId::next();
        let mut args = vec![Value::Int(2), Value::Int(3)];

        let token = enter(&registry, Some(id), &add_call(), &mut args);
        assert!(token.proceed());
        assert!(!token.advised());

        let out = exit(Some(id), &add_call(), &mut args, token, Value::Int(5), None);
        assert_eq!(out.unwrap(), Value::Int(5));
    }

    #[test]
    fn test_unadvised_error_passes_through() {
        let registry = AdviceRegistry::new();
        let id = InstanceId::next();
        let mut args = vec![];
        let token = enter(&registry, Some(id), &add_call(), &mut args);
        let out = exit(
            Some(id),
            &add_call(),
            &mut args,
            token,
            Value::Null,
            Some(CallError::new("boom")),
        );
        assert_eq!(out.unwrap_err().to_string(), "boom");
    }

    #[test]
    fn test_after_replaces_result() {
        let registry = AdviceRegistry::new();
        let id = InstanceId::next();
        registry.register(
            Target::instance(id),
            CallMatcher::named("add"),
            AroundAdvice::with_kind(AdviceKind::InstanceMethod).on_after(
                |_, _, _, _, result, _| Ok(Value::Int(result.as_int()? * 11)),
            ),
        );

        let mut args = vec![Value::Int(2), Value::Int(3)];
        let token = enter(&registry, Some(id), &add_call(), &mut args);
        assert!(token.proceed());
        let out = exit(Some(id), &add_call(), &mut args, token, Value::Int(5), None);
        assert_eq!(out.unwrap(), Value::Int(55));
    }

    #[test]
    fn test_veto_seeds_type_default() {
        let registry = AdviceRegistry::new();
        let id = InstanceId::next();
        registry.register(
            Target::instance(id),
            CallMatcher::any(),
            AroundAdvice::mock(AdviceKind::InstanceMethod),
        );

        let mut args = vec![Value::Int(2), Value::Int(3)];
        let token = enter(&registry, Some(id), &add_call(), &mut args);
        assert!(!token.proceed());
        // The body did not run; the engine seeds Int's default.
        let out = exit(Some(id), &add_call(), &mut args, token, Value::Null, None);
        assert_eq!(out.unwrap(), Value::Int(0));
    }

    #[test]
    fn test_before_argument_mutation_is_visible() {
        let registry = AdviceRegistry::new();
        let id = InstanceId::next();
        registry.register(
            Target::instance(id),
            CallMatcher::any(),
            AroundAdvice::with_kind(AdviceKind::InstanceMethod).on_before(|_, _, args| {
                args[0] = Value::Int(100);
                true
            }),
        );

        let mut args = vec![Value::Int(2), Value::Int(3)];
        let token = enter(&registry, Some(id), &add_call(), &mut args);
        assert!(token.proceed());
        assert_eq!(args[0], Value::Int(100));
    }

    #[test]
    fn test_failing_after_replaces_error() {
        let registry = AdviceRegistry::new();
        let id = InstanceId::next();
        registry.register(
            Target::instance(id),
            CallMatcher::any(),
            AroundAdvice::with_kind(AdviceKind::InstanceMethod)
                .on_after(|_, _, _, _, _, _| Err(CallError::new("advice failed"))),
        );

        let mut args = vec![];
        let token = enter(&registry, Some(id), &add_call(), &mut args);
        let out = exit(
            Some(id),
            &add_call(),
            &mut args,
            token,
            Value::Int(5),
            Some(CallError::new("original")),
        );
        assert_eq!(out.unwrap_err().to_string(), "advice failed");
    }

    #[test]
    fn test_successful_after_clears_error() {
        let registry = AdviceRegistry::new();
        let id = InstanceId::next();
        registry.register(
            Target::instance(id),
            CallMatcher::any(),
            AroundAdvice::with_kind(AdviceKind::InstanceMethod).on_after(
                |_, _, _, _, _, error| {
                    assert!(error.is_some());
                    Ok(Value::str("recovered"))
                },
            ),
        );

        let mut args = vec![];
        let token = enter(&registry, Some(id), &add_call(), &mut args);
        let out = exit(
            Some(id),
            &add_call(),
            &mut args,
            token,
            Value::Null,
            Some(CallError::new("original")),
        );
        assert_eq!(out.unwrap(), Value::str("recovered"));
    }

    #[test]
    fn test_recursion_guard_skips_nested_dispatch() {
        use std::sync::Arc as StdArc;
        let registry = StdArc::new(AdviceRegistry::new());
        let id = InstanceId::next();

        // Advice whose `before` re-enters dispatch for the same target, as
        // user advice computing something on the intercepted object would.
        let inner_registry = registry.clone();
        registry.register(
            Target::instance(id),
            CallMatcher::any(),
            AroundAdvice::with_kind(AdviceKind::InstanceMethod).on_before(move |target, call, _| {
                let mut nested_args = vec![];
                let token = enter(&inner_registry, target, call, &mut nested_args);
                // The nested dispatch must be treated as unadvised.
                assert!(token.proceed());
                assert!(!token.advised());
                true
            }),
        );

        let mut args = vec![];
        let token = enter(&registry, Some(id), &add_call(), &mut args);
        assert!(token.proceed());
        assert!(token.advised());
    }

    #[test]
    fn test_guard_is_per_target() {
        use std::sync::Arc as StdArc;
        let registry = StdArc::new(AdviceRegistry::new());
        let a = InstanceId::next();
        let b = InstanceId::next();

        let inner_registry = registry.clone();
        registry.register(
            Target::instance(a),
            CallMatcher::any(),
            AroundAdvice::with_kind(AdviceKind::InstanceMethod).on_before(move |_, call, _| {
                // Dispatching for a different target is not recursion.
                let mut nested_args = vec![];
                let token = enter(&inner_registry, Some(b), call, &mut nested_args);
                assert!(token.advised());
                true
            }),
        );
        registry.register(
            Target::instance(b),
            CallMatcher::any(),
            AroundAdvice::with_kind(AdviceKind::InstanceMethod),
        );

        let mut args = vec![];
        let token = enter(&registry, Some(a), &add_call(), &mut args);
        assert!(token.advised());
    }
}
