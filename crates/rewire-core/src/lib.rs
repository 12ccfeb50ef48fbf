//! Rewire interception core
//!
//! Replaces selected behavior of instrumented types with programmable
//! stand-ins ("advice"), scoped to specific instances, specific classes, or
//! globally, and reversible at any time without restarting the process:
//! - **Advice registry**: binds (target, matcher, advice) triples and
//!   resolves the single advice governing a call (`registry` module)
//! - **Dispatch engine**: the `enter`/`exit` entry points every intercepted
//!   call runs through (`dispatch` module)
//! - **Construction registry**: per-class constructor suppression with a
//!   FIFO queue of the resulting empty instances (`construction` module)
//! - **Mock sessions**: builder plus RAII handle bundling registrations
//!   with guaranteed reverse-order teardown (`session` module)
//!
//! How calls are physically intercepted is the embedder's concern; the
//! `intercept` module provides the canonical wrappers used by
//! hand-instrumented types.
//!
//! # Example
//!
//! ```rust,ignore
//! use rewire_core::{
//!     AdviceKind, AroundAdvice, CallMatcher, MockFactory, Value,
//! };
//!
//! let factory = MockFactory::<Calculator>::for_class()
//!     .spy()
//!     .advise(
//!         CallMatcher::named("add"),
//!         AroundAdvice::with_kind(AdviceKind::InstanceMethod)
//!             .on_after(|_, _, _, _, result, _| Ok(Value::Int(result.as_int()? * 11))),
//!     )
//!     .build();
//!
//! let calc = factory.create_instance(true)?;
//! assert_eq!(calc.add(2, 3)?, 55);
//! factory.close();
//! assert_eq!(calc.add(2, 3)?, 5);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Advice model: before/after callback pairs and their kinds
pub mod advice;

/// Call-site descriptors and the opaque call matcher
pub mod callsite;

/// Construction-suppression registry
pub mod construction;

/// Dispatch engine: per-call enter/exit entry points
pub mod dispatch;

/// Error taxonomy
pub mod error;

/// Canonical call interception points and the `Mockable` contract
pub mod intercept;

/// Advice registry and resolution
pub mod registry;

/// Scoped mock sessions
pub mod session;

/// Target model: instances, classes, global instances
pub mod target;

/// Uniform value model for intercepted slots
pub mod value;

// ============================================================================
// Re-exports
// ============================================================================

pub use advice::{AdviceKind, AroundAdvice};
pub use callsite::{CallKind, CallMatcher, CallSite, TypeName};
pub use construction::{ConstructionRegistry, MockInstance};
pub use dispatch::{enter, exit, DispatchToken};
pub use error::{CallError, MockError};
pub use intercept::{constructor_call, instance_call, static_call, Mockable};
pub use registry::{AdviceRegistry, BindingHandle};
pub use session::{MockBuilder, MockFactory};
pub use target::{InstanceId, Target};
pub use value::{TypeSig, Value};
