//! Uniform value model for intercepted argument, result, and error slots.
//!
//! Every intercepted call moves its arguments and result through [`Value`]
//! slots so that advice bodies can inspect and mutate them without knowing
//! the concrete signature. [`TypeSig`] carries the per-type default used to
//! seed the result slot when an advice vetoes `proceed`.

use crate::callsite::TypeName;
use crate::error::CallError;
use crate::target::InstanceId;

/// A single argument/result slot of an intercepted call.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Empty reference.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer (covers all integral widths of the instrumented code).
    Int(i64),
    /// Floating point.
    Float(f64),
    /// String.
    Str(String),
    /// Reference to an instrumented object, by identity.
    Obj(InstanceId),
}

impl Value {
    /// Convenience constructor for string slots.
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// True if this slot holds the empty reference.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Variant name, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "Str",
            Value::Obj(_) => "Obj",
        }
    }

    /// Read the slot as a boolean.
    ///
    /// A mismatch becomes the call's thrown error, so a sloppy advice body
    /// that assumes the wrong parameter type fails the call it advises
    /// instead of crashing the dispatch machinery.
    pub fn as_bool(&self) -> Result<bool, CallError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(CallError::type_mismatch("Bool", other.kind_name())),
        }
    }

    /// Read the slot as an integer.
    pub fn as_int(&self) -> Result<i64, CallError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(CallError::type_mismatch("Int", other.kind_name())),
        }
    }

    /// Read the slot as a float.
    pub fn as_float(&self) -> Result<f64, CallError> {
        match self {
            Value::Float(f) => Ok(*f),
            other => Err(CallError::type_mismatch("Float", other.kind_name())),
        }
    }

    /// Read the slot as a string.
    pub fn as_str(&self) -> Result<&str, CallError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(CallError::type_mismatch("Str", other.kind_name())),
        }
    }

    /// Read the slot as an object reference.
    pub fn as_obj(&self) -> Result<InstanceId, CallError> {
        match self {
            Value::Obj(id) => Ok(*id),
            other => Err(CallError::type_mismatch("Obj", other.kind_name())),
        }
    }
}

/// Type signature of a parameter or return slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSig {
    /// No value (constructor and void-returning call sites).
    Void,
    /// Boolean.
    Bool,
    /// Integer.
    Int,
    /// Floating point.
    Float,
    /// String (a reference type; its default is the empty reference).
    Str,
    /// Reference to an instrumented type.
    Ref(TypeName),
}

impl TypeSig {
    /// The default value seeded into the result slot when an advice skips
    /// the call body: zero, false, or the empty reference.
    pub fn default_value(&self) -> Value {
        match self {
            TypeSig::Void => Value::Null,
            TypeSig::Bool => Value::Bool(false),
            TypeSig::Int => Value::Int(0),
            TypeSig::Float => Value::Float(0.0),
            TypeSig::Str | TypeSig::Ref(_) => Value::Null,
        }
    }
}
