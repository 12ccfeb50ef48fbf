//! Hand-instrumented fixture types for exercising rewire-core end to end.
//!
//! These types are written the way an automatic call-site rewriter would
//! emit them: every constructor and method body is wrapped in the canonical
//! interception points from `rewire_core::intercept`, with a lazily built
//! [`CallSite`](rewire_core::CallSite) per member. The integration tests in
//! `tests/` drive the whole machinery through them.

#![warn(rust_2018_idioms)]

/// Calculator fixture: instance methods plus a static method.
pub mod calculator;

/// Base/Sub/AnotherSub/ExtendsSub inheritance chain.
pub mod chain;

/// Widget and Gadget fixtures for constructor-centric tests.
pub mod widgets;

pub use calculator::Calculator;
pub use chain::{AnotherSub, Base, ExtendsSub, Sub};
pub use widgets::{Gadget, GadgetUser, Widget};
