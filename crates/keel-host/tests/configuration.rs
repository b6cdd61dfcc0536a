//! Configuration lifecycle tests against the public registry surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use keel_host::{ConfigRegistry, HostError, HostOps, PropertyFlags};
use keel_value::{ArgKind, Args, HostRef, MarshalPolicy, ResultSlot, ScriptValue};

struct Sensor {
    reading: AtomicUsize,
}

#[test]
fn test_full_lifecycle_through_the_registry() {
    let registry = ConfigRegistry::new();
    registry
        .configure::<Sensor, _>(|c| {
            c.property_getter("reading", true, |s: &Sensor| {
                s.reading.load(Ordering::Relaxed) as u64
            });
            c.method("reset", 0, |s: &Sensor, _args| {
                s.reading.store(0, Ordering::Relaxed);
                Ok(())
            });
            Ok(())
        })
        .unwrap();

    let target = HostRef::new(Sensor { reading: AtomicUsize::new(12) });
    let ops = registry.lookup_for(&target).unwrap();

    assert_eq!(
        ops.query_property("reading"),
        PropertyFlags::AVAILABLE | PropertyFlags::ENUMERABLE
    );
    assert_eq!(
        ops.query_property("reset"),
        PropertyFlags::AVAILABLE | PropertyFlags::CACHEABLE
    );

    let policy = MarshalPolicy::default();
    let mut cell = ScriptValue::Nonexistent;
    let mut ret = ResultSlot::new(&mut cell, &policy);
    assert!(ops.get_property(&target, "reading", &mut ret).unwrap());
    assert_eq!(cell.as_number(), Some(12.0));
}

#[test]
fn test_shared_table_across_instances() {
    let registry = ConfigRegistry::new();
    registry
        .configure::<Sensor, _>(|c| {
            c.property_getter("reading", false, |s: &Sensor| {
                s.reading.load(Ordering::Relaxed) as u64
            });
            Ok(())
        })
        .unwrap();

    let a = HostRef::new(Sensor { reading: AtomicUsize::new(1) });
    let b = HostRef::new(Sensor { reading: AtomicUsize::new(2) });
    let ops_a = registry.lookup_for(&a).unwrap();
    let ops_b = registry.lookup_for(&b).unwrap();
    // One table per type, not per instance.
    assert!(Arc::ptr_eq(&ops_a, &ops_b));
}

#[test]
fn test_configuration_window_is_single_use() {
    let registry = ConfigRegistry::new();
    registry.configure::<Sensor, _>(|_c| Ok(())).unwrap();

    let err = registry
        .configure::<Sensor, _>(|c| {
            c.property_getter("late", false, |_s: &Sensor| 0_u64);
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, HostError::InvalidOperation(_)));

    // The immutable table never saw the late registration.
    let ops = registry.lookup_for(&HostRef::new(Sensor { reading: AtomicUsize::new(0) })).unwrap();
    assert_eq!(ops.query_property("late"), PropertyFlags::empty());
}

#[test]
fn test_write_through_setter_requires_registration() {
    let registry = ConfigRegistry::new();
    registry
        .configure::<Sensor, _>(|c| {
            c.property_getter("reading", false, |s: &Sensor| {
                s.reading.load(Ordering::Relaxed) as u64
            });
            Ok(())
        })
        .unwrap();

    let target = HostRef::new(Sensor { reading: AtomicUsize::new(3) });
    let ops = registry.lookup_for(&target).unwrap();
    let slots = [ScriptValue::Number(4.0)];
    let args = Args::new(&slots, ArgKind::PropertyValue);
    assert_eq!(
        ops.set_property(&target, "reading", &args).unwrap_err(),
        HostError::PropertyReadOnly("reading".into())
    );
}
