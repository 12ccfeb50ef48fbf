//! Inheritance-chain fixtures.
//!
//! Base, Sub, AnotherSub, and ExtendsSub mimic a flattened class hierarchy:
//! each constructor runs its own field initializer and then the next level's
//! initializer, and each level consults its *own* class's suppression flag.
//! A suppressed level leaves its declared fields at their defaults and hands
//! default-valued arguments up the chain; levels that are not suppressed
//! keep initializing normally.

use std::sync::Arc;

use once_cell::sync::Lazy;
use rewire_core::{
    constructor_call, instance_call, CallError, CallSite, ConstructionRegistry, InstanceId,
    Mockable, TypeName, TypeSig, Value,
};

fn is_suppressed(class: &str) -> bool {
    ConstructionRegistry::global().is_mock(&TypeName::new(class))
}

// ============================================================================
// Base
// ============================================================================

static BASE_CTOR: Lazy<CallSite> =
    Lazy::new(|| CallSite::constructor("Base", vec![TypeSig::Int]));
static BASE_GET_ID: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("Base", "get_id", vec![], TypeSig::Int));

/// Root of the fixture hierarchy.
pub struct Base {
    identity: InstanceId,
    id: i64,
}

impl Base {
    /// Base-level field initializer, shared by every subclass constructor.
    fn init_id(id: i64) -> i64 {
        if is_suppressed("Base") {
            0
        } else {
            id
        }
    }

    /// Instrumented constructor.
    pub fn new(id: i64) -> Result<Arc<Base>, CallError> {
        constructor_call::<Base, _>(&BASE_CTOR, vec![Value::Int(id)], |args, own| Base {
            identity: InstanceId::next(),
            id: Base::init_id(if own { args[0].as_int().unwrap_or(0) } else { 0 }),
        })
    }

    /// The id given at construction.
    pub fn get_id(&self) -> Result<i64, CallError> {
        instance_call(self.identity, &BASE_GET_ID, vec![], |_| {
            Ok(Value::Int(self.id))
        })?
        .as_int()
    }
}

impl Mockable for Base {
    fn type_name() -> TypeName {
        TypeName::new("Base")
    }

    fn instance_id(&self) -> InstanceId {
        self.identity
    }

    fn new_instance() -> Result<Arc<Self>, CallError> {
        Self::new(0)
    }
}

// ============================================================================
// Sub
// ============================================================================

static SUB_CTOR: Lazy<CallSite> =
    Lazy::new(|| CallSite::constructor("Sub", vec![TypeSig::Int, TypeSig::Str]));
static SUB_GET_ID: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("Sub", "get_id", vec![], TypeSig::Int));
static SUB_GET_NAME: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("Sub", "get_name", vec![], TypeSig::Str));

/// Direct subclass of [`Base`] adding a name.
pub struct Sub {
    identity: InstanceId,
    id: i64,
    name: Option<String>,
}

impl Sub {
    /// Sub-level initializer: own name field plus the base-level id. A
    /// suppressed Sub level zeroes both its own field and the arguments it
    /// passes down; the base level still applies its own flag on top.
    fn init_parts(id: i64, name: Option<String>) -> (i64, Option<String>) {
        if is_suppressed("Sub") {
            (Base::init_id(0), None)
        } else {
            (Base::init_id(id), name)
        }
    }

    /// Instrumented constructor.
    pub fn new(id: i64, name: &str) -> Result<Arc<Sub>, CallError> {
        constructor_call::<Sub, _>(
            &SUB_CTOR,
            vec![Value::Int(id), Value::str(name)],
            |args, own| {
                let (id, name) = if own {
                    Sub::init_parts(
                        args[0].as_int().unwrap_or(0),
                        args[1].as_str().ok().map(str::to_string),
                    )
                } else {
                    Sub::init_parts(0, None)
                };
                Sub {
                    identity: InstanceId::next(),
                    id,
                    name,
                }
            },
        )
    }

    /// The id given at construction.
    pub fn get_id(&self) -> Result<i64, CallError> {
        instance_call(self.identity, &SUB_GET_ID, vec![], |_| Ok(Value::Int(self.id)))?.as_int()
    }

    /// The name given at construction.
    pub fn get_name(&self) -> Result<Option<String>, CallError> {
        let out = instance_call(self.identity, &SUB_GET_NAME, vec![], |_| {
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
}

impl Mockable for Sub {
    fn type_name() -> TypeName {
        TypeName::new("Sub")
    }

    fn super_type_names() -> Vec<TypeName> {
        vec![TypeName::new("Base")]
    }

    fn instance_id(&self) -> InstanceId {
        self.identity
    }

    fn new_instance() -> Result<Arc<Self>, CallError> {
        Self::new(0, "")
    }
}

// ============================================================================
// AnotherSub
// ============================================================================

static ANOTHER_SUB_CTOR: Lazy<CallSite> =
    Lazy::new(|| CallSite::constructor("AnotherSub", vec![TypeSig::Int, TypeSig::Str]));
static ANOTHER_SUB_GET_ID: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("AnotherSub", "get_id", vec![], TypeSig::Int));
static ANOTHER_SUB_GET_NAME: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("AnotherSub", "get_name", vec![], TypeSig::Str));

/// Sibling subclass of [`Base`]; suppressing Sub must not touch it.
pub struct AnotherSub {
    identity: InstanceId,
    id: i64,
    name: Option<String>,
}

impl AnotherSub {
    fn init_parts(id: i64, name: Option<String>) -> (i64, Option<String>) {
        if is_suppressed("AnotherSub") {
            (Base::init_id(0), None)
        } else {
            (Base::init_id(id), name)
        }
    }

    /// Instrumented constructor.
    pub fn new(id: i64, name: &str) -> Result<Arc<AnotherSub>, CallError> {
        constructor_call::<AnotherSub, _>(
            &ANOTHER_SUB_CTOR,
            vec![Value::Int(id), Value::str(name)],
            |args, own| {
                let (id, name) = if own {
                    AnotherSub::init_parts(
                        args[0].as_int().unwrap_or(0),
                        args[1].as_str().ok().map(str::to_string),
                    )
                } else {
                    AnotherSub::init_parts(0, None)
                };
                AnotherSub {
                    identity: InstanceId::next(),
                    id,
                    name,
                }
            },
        )
    }

    /// The id given at construction.
    pub fn get_id(&self) -> Result<i64, CallError> {
        instance_call(self.identity, &ANOTHER_SUB_GET_ID, vec![], |_| {
            Ok(Value::Int(self.id))
        })?
        .as_int()
    }

    /// The name given at construction.
    pub fn get_name(&self) -> Result<Option<String>, CallError> {
        let out = instance_call(self.identity, &ANOTHER_SUB_GET_NAME, vec![], |_| {
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
}

impl Mockable for AnotherSub {
    fn type_name() -> TypeName {
        TypeName::new("AnotherSub")
    }

    fn super_type_names() -> Vec<TypeName> {
        vec![TypeName::new("Base")]
    }

    fn instance_id(&self) -> InstanceId {
        self.identity
    }

    fn new_instance() -> Result<Arc<Self>, CallError> {
        Self::new(0, "")
    }
}

// ============================================================================
// ExtendsSub
// ============================================================================

static EXTENDS_SUB_CTOR: Lazy<CallSite> = Lazy::new(|| {
    CallSite::constructor("ExtendsSub", vec![TypeSig::Int, TypeSig::Str, TypeSig::Str])
});
static EXTENDS_SUB_GET_ID: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("ExtendsSub", "get_id", vec![], TypeSig::Int));
static EXTENDS_SUB_GET_NAME: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("ExtendsSub", "get_name", vec![], TypeSig::Str));
static EXTENDS_SUB_STAMP: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("ExtendsSub", "stamp", vec![], TypeSig::Str));

/// Grandchild of [`Base`] through [`Sub`], adding a stamp field. Its own
/// level runs normally while Sub or Base are suppressed; only its own flag
/// can blank the stamp.
pub struct ExtendsSub {
    identity: InstanceId,
    id: i64,
    name: Option<String>,
    stamp: Option<String>,
}

impl ExtendsSub {
    /// Instrumented constructor.
    pub fn new(id: i64, name: &str, stamp: &str) -> Result<Arc<ExtendsSub>, CallError> {
        constructor_call::<ExtendsSub, _>(
            &EXTENDS_SUB_CTOR,
            vec![Value::Int(id), Value::str(name), Value::str(stamp)],
            |args, own| {
                let (id, name, stamp) = if own {
                    let (id, name) = Sub::init_parts(
                        args[0].as_int().unwrap_or(0),
                        args[1].as_str().ok().map(str::to_string),
                    );
                    (id, name, args[2].as_str().ok().map(str::to_string))
                } else {
                    let (id, name) = Sub::init_parts(0, None);
                    (id, name, None)
                };
                ExtendsSub {
                    identity: InstanceId::next(),
                    id,
                    name,
                    stamp,
                }
            },
        )
    }

    /// The id given at construction.
    pub fn get_id(&self) -> Result<i64, CallError> {
        instance_call(self.identity, &EXTENDS_SUB_GET_ID, vec![], |_| {
            Ok(Value::Int(self.id))
        })?
        .as_int()
    }

    /// The name given at construction.
    pub fn get_name(&self) -> Result<Option<String>, CallError> {
        let out = instance_call(self.identity, &EXTENDS_SUB_GET_NAME, vec![], |_| {
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

    /// The stamp given at construction.
    pub fn stamp(&self) -> Result<Option<String>, CallError> {
        let out = instance_call(self.identity, &EXTENDS_SUB_STAMP, vec![], |_| {
            Ok(match &self.stamp {
                Some(stamp) => Value::str(stamp.clone()),
                None => Value::Null,
            })
        })?;
        match out {
            Value::Null => Ok(None),
            other => Ok(Some(other.as_str()?.to_string())),
        }
    }
}

impl Mockable for ExtendsSub {
    fn type_name() -> TypeName {
        TypeName::new("ExtendsSub")
    }

    fn super_type_names() -> Vec<TypeName> {
        vec![TypeName::new("Sub"), TypeName::new("Base")]
    }

    fn instance_id(&self) -> InstanceId {
        self.identity
    }

    fn new_instance() -> Result<Arc<Self>, CallError> {
        Self::new(0, "", "")
    }
}
