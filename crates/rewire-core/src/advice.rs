//! User-supplied advice: a before/after callback pair governing one
//! intercepted call.

use std::fmt;

use crate::callsite::{CallKind, CallSite};
use crate::error::CallError;
use crate::target::InstanceId;
use crate::value::Value;

/// Which kind of call site a binding applies to.
///
/// A binding only ever governs call sites of its own kind; the kind filter
/// is applied during resolution, before the matcher runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceKind {
    /// Instance method calls.
    InstanceMethod,
    /// Static method calls.
    StaticMethod,
    /// Constructor calls.
    Constructor,
}

impl AdviceKind {
    /// Kind filter used by resolution.
    pub fn applies_to(self, call: CallKind) -> bool {
        matches!(
            (self, call),
            (AdviceKind::InstanceMethod, CallKind::InstanceMethod)
                | (AdviceKind::StaticMethod, CallKind::StaticMethod)
                | (AdviceKind::Constructor, CallKind::Constructor)
        )
    }
}

/// `before` callback: may mutate arguments, returns the proceed verdict.
pub type BeforeFn =
    dyn Fn(Option<InstanceId>, &CallSite, &mut Vec<Value>) -> bool + Send + Sync;

/// `after` callback: receives the proceed mode, the (possibly seeded)
/// result, and the call's error slot; returns the final result or replaces
/// the error.
pub type AfterFn = dyn Fn(
        Option<InstanceId>,
        &CallSite,
        &mut Vec<Value>,
        bool,
        Value,
        Option<CallError>,
    ) -> Result<Value, CallError>
    + Send
    + Sync;

/// A before/after callback pair.
///
/// Either callback may be absent: a missing `before` always proceeds, a
/// missing `after` passes the result and error through untouched.
pub struct AroundAdvice {
    kind: AdviceKind,
    before: Option<Box<BeforeFn>>,
    after: Option<Box<AfterFn>>,
}

impl AroundAdvice {
    /// Advice of the given kind with no callbacks (pure pass-through).
    pub fn with_kind(kind: AdviceKind) -> Self {
        Self {
            kind,
            before: None,
            after: None,
        }
    }

    /// Attach the `before` callback.
    pub fn on_before(
        mut self,
        f: impl Fn(Option<InstanceId>, &CallSite, &mut Vec<Value>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.before = Some(Box::new(f));
        self
    }

    /// Attach the `after` callback.
    pub fn on_after(
        mut self,
        f: impl Fn(
                Option<InstanceId>,
                &CallSite,
                &mut Vec<Value>,
                bool,
                Value,
                Option<CallError>,
            ) -> Result<Value, CallError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.after = Some(Box::new(f));
        self
    }

    /// The classic stub: never proceed, return the call's type default.
    pub fn mock(kind: AdviceKind) -> Self {
        Self::with_kind(kind)
            .on_before(|_, _, _| false)
            .on_after(|_, _, _, _, result, _| Ok(result))
    }

    /// Kind of call site this advice applies to.
    pub fn kind(&self) -> AdviceKind {
        self.kind
    }

    pub(crate) fn invoke_before(
        &self,
        target: Option<InstanceId>,
        call: &CallSite,
        args: &mut Vec<Value>,
    ) -> bool {
        match &self.before {
            Some(f) => f(target, call, args),
            None => true,
        }
    }

    pub(crate) fn invoke_after(
        &self,
        target: Option<InstanceId>,
        call: &CallSite,
        args: &mut Vec<Value>,
        proceed: bool,
        result: Value,
        error: Option<CallError>,
    ) -> Result<Value, CallError> {
        match &self.after {
            Some(f) => f(target, call, args, proceed, result, error),
            // Pass-through must preserve an incoming error; only an actual
            // `after` callback is allowed to clear it.
            None => match error {
                Some(err) => Err(err),
                None => Ok(result),
            },
        }
    }
}

impl fmt::Debug for AroundAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AroundAdvice")
            .field("kind", &self.kind)
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}
