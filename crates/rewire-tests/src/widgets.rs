//! Widget and Gadget fixtures.
//!
//! Widget exercises constructor advice (argument mutation, veto); Gadget
//! plus its collaborator exercise the pending-instance queue, where the
//! constructed object is never reachable by the asserting caller.

use std::sync::Arc;

use once_cell::sync::Lazy;
use rewire_core::{
    constructor_call, instance_call, static_call, CallError, CallSite, InstanceId, Mockable,
    TypeName, TypeSig, Value,
};

static WIDGET_CTOR: Lazy<CallSite> =
    Lazy::new(|| CallSite::constructor("Widget", vec![TypeSig::Str]));
static WIDGET_GET_LABEL: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("Widget", "get_label", vec![], TypeSig::Str));
static WIDGET_DESCRIBE: Lazy<CallSite> =
    Lazy::new(|| CallSite::static_method("Widget", "describe", vec![], TypeSig::Str));

/// Labelled fixture with an advisable constructor.
pub struct Widget {
    id: InstanceId,
    label: Option<String>,
}

impl Widget {
    /// Instrumented constructor. Constructor advice sees (and may rewrite)
    /// the label argument before it reaches the field initializer.
    pub fn new(label: &str) -> Result<Arc<Widget>, CallError> {
        constructor_call::<Widget, _>(&WIDGET_CTOR, vec![Value::str(label)], |args, own| Widget {
            id: InstanceId::next(),
            label: if own {
                args[0].as_str().ok().map(str::to_string)
            } else {
                None
            },
        })
    }

    /// The label given at construction.
    pub fn get_label(&self) -> Result<Option<String>, CallError> {
        let out = instance_call(self.id, &WIDGET_GET_LABEL, vec![], |_| {
            Ok(match &self.label {
                Some(label) => Value::str(label.clone()),
                None => Value::Null,
            })
        })?;
        match out {
            Value::Null => Ok(None),
            other => Ok(Some(other.as_str()?.to_string())),
        }
    }

    /// Instrumented static method.
    pub fn describe() -> Result<Option<String>, CallError> {
        let out = static_call(&WIDGET_DESCRIBE, vec![], |_| {
            Ok(Value::str("widgets hold labels"))
        })?;
        match out {
            Value::Null => Ok(None),
            other => Ok(Some(other.as_str()?.to_string())),
        }
    }
}

impl Mockable for Widget {
    fn type_name() -> TypeName {
        TypeName::new("Widget")
    }

    fn instance_id(&self) -> InstanceId {
        self.id
    }

    fn new_instance() -> Result<Arc<Self>, CallError> {
        Self::new("")
    }
}

static GADGET_CTOR: Lazy<CallSite> =
    Lazy::new(|| CallSite::constructor("Gadget", vec![TypeSig::Int]));
static GADGET_SERIAL: Lazy<CallSite> =
    Lazy::new(|| CallSite::method("Gadget", "serial", vec![], TypeSig::Int));

/// Serial-numbered fixture constructed by a collaborator.
pub struct Gadget {
    id: InstanceId,
    serial: i64,
}

impl Gadget {
    /// Instrumented constructor.
    pub fn new(serial: i64) -> Result<Arc<Gadget>, CallError> {
        constructor_call::<Gadget, _>(&GADGET_CTOR, vec![Value::Int(serial)], |args, own| Gadget {
            id: InstanceId::next(),
            serial: if own { args[0].as_int().unwrap_or(0) } else { 0 },
        })
    }

    /// The serial number given at construction.
    pub fn serial(&self) -> Result<i64, CallError> {
        instance_call(self.id, &GADGET_SERIAL, vec![], |_| {
            Ok(Value::Int(self.serial))
        })?
        .as_int()
    }
}

impl Mockable for Gadget {
    fn type_name() -> TypeName {
        TypeName::new("Gadget")
    }

    fn instance_id(&self) -> InstanceId {
        self.id
    }

    fn new_instance() -> Result<Arc<Self>, CallError> {
        Self::new(0)
    }
}

/// Collaborator that constructs a [`Gadget`] internally and drops it, so the
/// only way a test can reach the instance is through the pending queue.
pub struct GadgetUser;

impl GadgetUser {
    /// Construct a gadget with a fixed serial and discard it.
    pub fn run_once() -> Result<(), CallError> {
        let _gadget = Gadget::new(7)?;
        Ok(())
    }
}
