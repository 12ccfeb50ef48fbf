//! Calculator fixture.
//!
//! Mirrors the shape rewriting would give a small arithmetic class: a
//! string-argument constructor, a handful of instance methods, and one
//! static method, all routed through the interception points.

use std::sync::Arc;

use once_cell::sync::Lazy;
use rewire_core::{
    constructor_call, instance_call, static_call, CallError, CallSite, InstanceId, Mockable,
    TypeName, TypeSig, Value,
};

static CTOR: Lazy<CallSite> =
    Lazy::new(|| CallSite::constructor("Calculator", vec![TypeSig::Str]));
static ADD: Lazy<CallSite> = Lazy::new(|| {
    CallSite::method(
        "Calculator",
        "add",
        vec![TypeSig::Int, TypeSig::Int],
        TypeSig::Int,
    )
});
static MULTIPLY: Lazy<CallSite> = Lazy::new(|| {
    CallSite::method(
        "Calculator",
        "multiply",
        vec![TypeSig::Int, TypeSig::Int],
        TypeSig::Int,
    )
});
static NEGATE: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("Calculator", "negate", vec![TypeSig::Int], TypeSig::Int));
static GET_NAME: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("Calculator", "get_name", vec![], TypeSig::Str));
static GREET: Lazy<CallSite> = Lazy::new(|| {
    CallSite::static_method("Calculator", "greet", vec![TypeSig::Str], TypeSig::Str)
});

/// Small arithmetic fixture with a name.
pub struct Calculator {
    id: InstanceId,
    name: Option<String>,
}

impl Calculator {
    /// Instrumented constructor.
    pub fn new(name: &str) -> Result<Arc<Calculator>, CallError> {
        constructor_call::<Calculator, _>(&CTOR, vec![Value::str(name)], |args, own| Calculator {
            id: InstanceId::next(),
            name: if own {
                args[0].as_str().ok().map(str::to_string)
            } else {
                None
            },
        })
    }

    /// Sum of two integers.
    pub fn add(&self, a: i64, b: i64) -> Result<i64, CallError> {
        instance_call(self.id, &ADD, vec![Value::Int(a), Value::Int(b)], |args| {
            Ok(Value::Int(args[0].as_int()? + args[1].as_int()?))
        })?
        .as_int()
    }

    /// Product of two integers.
    pub fn multiply(&self, a: i64, b: i64) -> Result<i64, CallError> {
        instance_call(
            self.id,
            &MULTIPLY,
            vec![Value::Int(a), Value::Int(b)],
            |args| Ok(Value::Int(args[0].as_int()? * args[1].as_int()?)),
        )?
        .as_int()
    }

    /// Arithmetic negation.
    pub fn negate(&self, a: i64) -> Result<i64, CallError> {
        instance_call(self.id, &NEGATE, vec![Value::Int(a)], |args| {
            Ok(Value::Int(-args[0].as_int()?))
        })?
        .as_int()
    }

    /// The name given at construction; `None` when the constructor was
    /// suppressed or the call is mocked.
    pub fn get_name(&self) -> Result<Option<String>, CallError> {
        let out = instance_call(self.id, &GET_NAME, vec![], |_| {
            Ok(match &self.name {
                Some(name) => Value::str(name.clone()),
                None => Value::Null,
            })
        })?;
        match out {
            Value::Null => Ok(None),
            other => Ok(Some(other.as_str()?.to_string())),
        }
    }

    /// Instrumented static method.
    pub fn greet(who: &str) -> Result<Option<String>, CallError> {
        let out = static_call(&GREET, vec![Value::str(who)], |args| {
            Ok(Value::str(format!("Hello {}", args[0].as_str()?)))
        })?;
        match out {
            Value::Null => Ok(None),
            other => Ok(Some(other.as_str()?.to_string())),
        }
    }
}

impl Mockable for Calculator {
    fn type_name() -> TypeName {
        TypeName::new("Calculator")
    }

    fn instance_id(&self) -> InstanceId {
        self.id
    }

    fn new_instance() -> Result<Arc<Self>, CallError> {
        Self::new("")
    }
}
