//! Class-targeted advice: static method stubbing, constructor argument
//! rewriting and vetoing, and the rule that instance-scoped bindings never
//! leak into unscoped static dispatch.
//!
//! Each test owns a distinct (class, member) combination, so the file's
//! tests can run in parallel against the shared global registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rewire_core::{
    AdviceKind, AdviceRegistry, AroundAdvice, CallMatcher, Mockable, Target, Value,
};
use rewire_tests::{Calculator, Gadget, Widget};

#[test]
fn test_static_method_stub() {
    let registry = AdviceRegistry::global();
    let calc = Calculator::new("bystander").unwrap();

    let handle = registry.register(
        Target::class("Calculator"),
        CallMatcher::named("greet"),
        AroundAdvice::with_kind(AdviceKind::StaticMethod)
            .on_before(|_, _, _| false)
            .on_after(|_, _, _, _, _, _| Ok(Value::str("Hi world!"))),
    );

    assert_eq!(Calculator::greet("Sir").unwrap(), Some("Hi world!".to_string()));
    // The static-kind binding leaves instance dispatch alone.
    assert_eq!(calc.add(2, 3).unwrap(), 5);

    registry.unregister(&handle);
    assert_eq!(Calculator::greet("Sir").unwrap(), Some("Hello Sir".to_string()));
}

#[test]
fn test_constructor_advice_rewrites_arguments() {
    let registry = AdviceRegistry::global();

    let constructions = Arc::new(AtomicUsize::new(0));
    let counter = constructions.clone();
    let handle = registry.register(
        Target::class("Widget"),
        CallMatcher::any(),
        AroundAdvice::with_kind(AdviceKind::Constructor).on_before(move |_, _, args| {
            counter.fetch_add(1, Ordering::SeqCst);
            args[0] = Value::str("ADVISED");
            true
        }),
    );

    let first = Widget::new("original").unwrap();
    let second = Widget::new("also original").unwrap();
    assert_eq!(first.get_label().unwrap(), Some("ADVISED".to_string()));
    assert_eq!(second.get_label().unwrap(), Some("ADVISED".to_string()));
    assert_eq!(constructions.load(Ordering::SeqCst), 2);

    registry.unregister(&handle);
    let plain = Widget::new("plain").unwrap();
    assert_eq!(plain.get_label().unwrap(), Some("plain".to_string()));
}

#[test]
fn test_constructor_veto_leaves_fields_default() {
    let registry = AdviceRegistry::global();

    let handle = registry.register(
        Target::class("Gadget"),
        CallMatcher::any(),
        AroundAdvice::with_kind(AdviceKind::Constructor).on_before(|_, _, _| false),
    );

    // The body was skipped; the instance still exists, with default fields.
    let gadget = Gadget::new(9).unwrap();
    assert_eq!(gadget.serial().unwrap(), 0);

    registry.unregister(&handle);
    assert_eq!(Gadget::new(9).unwrap().serial().unwrap(), 9);
}

#[test]
fn test_instance_attachment_removes_class_effect() {
    let registry = AdviceRegistry::global();
    // Any instance attachment counts, whatever its class; using a Gadget
    // here also keeps this test from bumping the Widget construction
    // counter of the test above.
    let scoping_instance = Gadget::new(1).unwrap();

    let handle = registry.register(
        Target::class("Widget"),
        CallMatcher::named("describe"),
        AroundAdvice::with_kind(AdviceKind::StaticMethod)
            .on_before(|_, _, _| false)
            .on_after(|_, _, _, _, _, _| Ok(Value::str("stubbed"))),
    );
    assert_eq!(Widget::describe().unwrap(), Some("stubbed".to_string()));

    // Scoping the binding to one instance withdraws it from unscoped
    // static dispatch entirely.
    registry
        .add_target(Target::instance(scoping_instance.instance_id()), &handle)
        .unwrap();
    assert_eq!(Widget::describe().unwrap(), Some("widgets hold labels".to_string()));

    registry.remove_target(&Target::instance(scoping_instance.instance_id()), &handle);
    assert_eq!(Widget::describe().unwrap(), Some("stubbed".to_string()));

    registry.unregister(&handle);
    assert_eq!(Widget::describe().unwrap(), Some("widgets hold labels".to_string()));
}
