//! Immutable call-site descriptors and the opaque call matcher.
//!
//! A [`CallSite`] is created once per instrumented call site by the
//! interception mechanism and never mutated afterwards. Matching is an
//! opaque predicate over call sites; there is no expression language.

use std::fmt;
use std::sync::Arc;

use crate::value::TypeSig;

/// Interned name of an instrumented type. Cheap to clone, compared and
/// hashed by content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(Arc<str>);

impl TypeName {
    /// Intern a type name.
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Kind of an intercepted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Object construction.
    Constructor,
    /// Call on a specific instance.
    InstanceMethod,
    /// Call with no receiver.
    StaticMethod,
}

/// Immutable description of a method or constructor call site.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    /// Type declaring the called member.
    pub declaring_type: TypeName,
    /// Member name (`"new"` for constructors).
    pub name: String,
    /// Call kind.
    pub kind: CallKind,
    /// Parameter signatures, in order.
    pub param_types: Vec<TypeSig>,
    /// Return signature.
    pub return_type: TypeSig,
}

impl CallSite {
    /// Describe an instance method call site.
    pub fn method(
        declaring_type: &str,
        name: &str,
        param_types: Vec<TypeSig>,
        return_type: TypeSig,
    ) -> Self {
        Self {
            declaring_type: TypeName::new(declaring_type),
            name: name.to_string(),
            kind: CallKind::InstanceMethod,
            param_types,
            return_type,
        }
    }

    /// Describe a static method call site.
    pub fn static_method(
        declaring_type: &str,
        name: &str,
        param_types: Vec<TypeSig>,
        return_type: TypeSig,
    ) -> Self {
        Self {
            declaring_type: TypeName::new(declaring_type),
            name: name.to_string(),
            kind: CallKind::StaticMethod,
            param_types,
            return_type,
        }
    }

    /// Describe a constructor call site.
    pub fn constructor(declaring_type: &str, param_types: Vec<TypeSig>) -> Self {
        Self {
            declaring_type: TypeName::new(declaring_type),
            name: "new".to_string(),
            kind: CallKind::Constructor,
            param_types,
            return_type: TypeSig::Void,
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// Opaque predicate over call sites.
///
/// Shared so that one matcher can back a binding attached to several
/// targets.
#[derive(Clone)]
pub struct CallMatcher(Arc<dyn Fn(&CallSite) -> bool + Send + Sync>);

impl CallMatcher {
    /// Wrap an arbitrary predicate.
    pub fn new(predicate: impl Fn(&CallSite) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// Matches every call site.
    pub fn any() -> Self {
        Self::new(|_| true)
    }

    /// Matches call sites by member name.
    pub fn named(name: &str) -> Self {
        let name = name.to_string();
        Self::new(move |call| call.name == name)
    }

    /// Apply the predicate.
    pub fn matches(&self, call: &CallSite) -> bool {
        (self.0)(call)
    }
}

impl fmt::Debug for CallMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallMatcher(..)")
    }
}
