//! Target model: what a piece of advice governs.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::callsite::TypeName;

/// Global counter for generating unique instance IDs
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a single instrumented object.
///
/// A plain numeric key minted at construction time. Holding an `InstanceId`
/// owns nothing and never extends the lifetime of the object it identifies;
/// a stale id simply stops matching anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Mint a fresh, process-unique id.
    pub fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// The key identifying what an advice binding governs.
///
/// A closed variant rather than a trait hierarchy: the same binding can be
/// attached to several kinds at once, and resolution handles each kind with
/// its own rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// One specific instance.
    Instance(InstanceId),
    /// A class: governs its static calls and constructors.
    Class(TypeName),
    /// Every instance of a class, as if each had been registered
    /// individually.
    GlobalInstance(TypeName),
}

impl Target {
    /// Target a specific instance.
    pub fn instance(id: InstanceId) -> Self {
        Target::Instance(id)
    }

    /// Target a class (static calls and constructors).
    pub fn class(name: &str) -> Self {
        Target::Class(TypeName::new(name))
    }

    /// Target all instances of a class.
    pub fn global_instance(name: &str) -> Self {
        Target::GlobalInstance(TypeName::new(name))
    }

    /// True for the per-instance variant.
    pub fn is_instance(&self) -> bool {
        matches!(self, Target::Instance(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_ids_are_unique() {
        let a = InstanceId::next();
        let b = InstanceId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_target_equality_by_type_identity() {
        assert_eq!(Target::class("Sub"), Target::class("Sub"));
        assert_ne!(Target::class("Sub"), Target::global_instance("Sub"));
        let id = InstanceId::next();
        assert_eq!(Target::instance(id), Target::instance(id));
        assert!(Target::instance(id).is_instance());
        assert!(!Target::class("Sub").is_instance());
    }
}
