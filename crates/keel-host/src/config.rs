//! Object Configuration
//!
//! Per-type table of property, method, invocation and enumeration
//! bindings, built once through [`TypeConfigurator`] and shared
//! immutably across every instance of the type afterwards. Instances
//! carry no dispatch tables of their own.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use keel_value::{Args, FromScript, HostRef, IntoScript, ResultSlot};

use crate::capability::{HostOps, InvokeKind, InvokerSpec, PropertyFlags};
use crate::enumerate::{AsyncHostEnumerator, HostEnumerator, SyncToAsyncEnumerator};
use crate::error::HostError;
use crate::method::{BoundMethod, MethodInvoker};

type Getter =
    Arc<dyn Fn(&HostRef, &mut ResultSlot<'_>) -> Result<(), HostError> + Send + Sync>;
type Setter = Arc<dyn Fn(&HostRef, &Args<'_>) -> Result<(), HostError> + Send + Sync>;
type EnumFactory =
    Arc<dyn Fn(&HostRef) -> Option<Box<dyn HostEnumerator>> + Send + Sync>;
type AsyncEnumFactory =
    Arc<dyn Fn(&HostRef) -> Option<Box<dyn AsyncHostEnumerator>> + Send + Sync>;

struct PropertyBinding {
    getter: Getter,
    setter: Option<Setter>,
    flags: PropertyFlags,
}

/// Immutable, type-erased configuration table. Built by
/// [`TypeConfigurator`]; shared as `Arc<TypeConfiguration>` through the
/// registry.
pub struct TypeConfiguration {
    properties: HashMap<Arc<str>, PropertyBinding>,
    dynamic_properties: bool,
    enumerate_indices: bool,
    invoker: Option<InvokerSpec>,
    enumerator: Option<EnumFactory>,
    async_enumerator: Option<AsyncEnumFactory>,
}

fn concrete<'a, T: Any>(target: &'a HostRef) -> Result<&'a T, HostError> {
    target
        .downcast_ref::<T>()
        .ok_or(HostError::InvalidOperation("host target type mismatch"))
}

impl HostOps for TypeConfiguration {
    fn get_property(
        &self,
        target: &HostRef,
        name: &str,
        ret: &mut ResultSlot<'_>,
    ) -> Result<bool, HostError> {
        match self.properties.get(name) {
            Some(binding) => {
                (binding.getter)(target, ret)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn set_property(&self, target: &HostRef, name: &str, args: &Args<'_>) -> Result<bool, HostError> {
        match self.properties.get(name) {
            Some(binding) => match &binding.setter {
                Some(setter) => {
                    setter(target, args)?;
                    Ok(true)
                }
                None => Err(HostError::PropertyReadOnly(name.to_owned())),
            },
            None => Ok(false),
        }
    }

    fn query_property(&self, name: &str) -> PropertyFlags {
        self.properties
            .get(name)
            .map_or(PropertyFlags::empty(), |binding| binding.flags)
    }

    fn enumerable_names(&self) -> Vec<Arc<str>> {
        self.properties
            .iter()
            .filter(|(_, b)| b.flags.contains(PropertyFlags::ENUMERABLE))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn supports_dynamic_properties(&self) -> bool {
        self.dynamic_properties
    }

    fn enumerates_indexed_properties(&self) -> bool {
        self.enumerate_indices
    }

    fn invoker(&self) -> Option<&InvokerSpec> {
        self.invoker.as_ref()
    }

    fn create_enumerator(
        &self,
        target: &HostRef,
    ) -> Result<Option<Box<dyn HostEnumerator>>, HostError> {
        match &self.enumerator {
            Some(factory) => Ok(factory(target)),
            None => Ok(None),
        }
    }

    fn create_async_enumerator(
        &self,
        target: &HostRef,
    ) -> Result<Option<Box<dyn AsyncHostEnumerator>>, HostError> {
        if let Some(factory) = &self.async_enumerator {
            return Ok(factory(target));
        }
        // Only a synchronous factory registered: synthesize the async
        // shape so instances stay async-enumerable.
        match &self.enumerator {
            Some(factory) => {
                tracing::trace!("synthesizing async enumerator from sync factory");
                Ok(factory(target).map(|e| {
                    Box::new(SyncToAsyncEnumerator::new(e)) as Box<dyn AsyncHostEnumerator>
                }))
            }
            None => Ok(None),
        }
    }
}

/// Builder passed to the configurator closure of
/// [`ConfigRegistry::configure`](crate::ConfigRegistry::configure).
///
/// Mutation is only possible here, inside the one-time configuration
/// window; the finished table is immutable.
pub struct TypeConfigurator<T> {
    config: TypeConfiguration,
    _target: std::marker::PhantomData<fn(T)>,
}

impl<T: Any + Send + Sync> TypeConfigurator<T> {
    pub(crate) fn new() -> Self {
        Self {
            config: TypeConfiguration {
                properties: HashMap::new(),
                dynamic_properties: false,
                enumerate_indices: false,
                invoker: None,
                enumerator: None,
                async_enumerator: None,
            },
            _target: std::marker::PhantomData,
        }
    }

    pub(crate) fn finish(self) -> TypeConfiguration {
        self.config
    }

    fn insert(&mut self, name: &str, getter: Getter, setter: Option<Setter>, enumerable: bool) {
        let mut flags = PropertyFlags::AVAILABLE;
        if enumerable {
            flags |= PropertyFlags::ENUMERABLE;
        }
        if setter.is_some() {
            flags |= PropertyFlags::WRITABLE;
        }
        self.config
            .properties
            .insert(Arc::from(name), PropertyBinding { getter, setter, flags });
    }

    /// Register a read-only property.
    pub fn property_getter<V, G>(&mut self, name: &str, enumerable: bool, get: G) -> &mut Self
    where
        V: IntoScript,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        let getter: Getter = Arc::new(move |target, ret| {
            ret.set(get(concrete::<T>(target)?))?;
            Ok(())
        });
        self.insert(name, getter, None, enumerable);
        self
    }

    /// Register a read-write property. The setter coerces the incoming
    /// value and reports the property name on failure.
    pub fn property_accessors<V, G, S>(
        &mut self,
        name: &str,
        enumerable: bool,
        get: G,
        set: S,
    ) -> &mut Self
    where
        V: IntoScript + FromScript,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&T, V) + Send + Sync + 'static,
    {
        let getter: Getter = Arc::new(move |target, ret| {
            ret.set(get(concrete::<T>(target)?))?;
            Ok(())
        });
        let prop: Arc<str> = Arc::from(name);
        let setter: Setter = Arc::new(move |target, args| {
            let value: V = args.get(0, &prop)?;
            set(concrete::<T>(target)?, value);
            Ok(())
        });
        self.insert(name, getter, Some(setter), enumerable);
        self
    }

    /// Register a read-only property at slot level, for getters that
    /// need the result slot directly.
    pub fn property_getter_raw<G>(&mut self, name: &str, enumerable: bool, get: G) -> &mut Self
    where
        G: Fn(&T, &mut ResultSlot<'_>) -> Result<(), HostError> + Send + Sync + 'static,
    {
        let getter: Getter = Arc::new(move |target, ret| get(concrete::<T>(target)?, ret));
        self.insert(name, getter, None, enumerable);
        self
    }

    /// Register a read-write property at slot level.
    pub fn property_accessors_raw<G, S>(
        &mut self,
        name: &str,
        enumerable: bool,
        get: G,
        set: S,
    ) -> &mut Self
    where
        G: Fn(&T, &mut ResultSlot<'_>) -> Result<(), HostError> + Send + Sync + 'static,
        S: Fn(&T, &Args<'_>) -> Result<(), HostError> + Send + Sync + 'static,
    {
        let getter: Getter = Arc::new(move |target, ret| get(concrete::<T>(target)?, ret));
        let setter: Setter = Arc::new(move |target, args| set(concrete::<T>(target)?, args));
        self.insert(name, getter, Some(setter), enumerable);
        self
    }

    /// Register a method. Sugar over property registration: the name
    /// becomes a cacheable read-only property whose fetched value is a
    /// freshly built [`BoundMethod`] wrapping the target and invoker.
    pub fn method<R, F>(&mut self, name: &str, required_args: usize, body: F) -> &mut Self
    where
        R: IntoScript,
        F: Fn(&T, &Args<'_>) -> Result<R, HostError> + Send + Sync + 'static,
    {
        let invoker: MethodInvoker = Arc::new(move |target, args, ret| {
            let out = body(concrete::<T>(target)?, args)?;
            ret.set(out)?;
            Ok(())
        });
        let method_name: Arc<str> = Arc::from(name);
        let getter: Getter = Arc::new(move |target, ret| {
            let bound = BoundMethod::new(
                target.clone(),
                method_name.clone(),
                required_args,
                invoker.clone(),
            );
            ret.set_host(HostRef::new(bound))?;
            Ok(())
        });
        let flags = PropertyFlags::AVAILABLE | PropertyFlags::CACHEABLE;
        self.config
            .properties
            .insert(Arc::from(name), PropertyBinding { getter, setter: None, flags });
        self
    }

    /// Make instances of the type directly invocable as a script
    /// function. `constructible` additionally allows constructor-style
    /// invocation.
    pub fn function_invoker<R, F>(
        &mut self,
        required_args: usize,
        constructible: bool,
        body: F,
    ) -> &mut Self
    where
        R: IntoScript,
        F: Fn(&T, &Args<'_>) -> Result<R, HostError> + Send + Sync + 'static,
    {
        let invoke = Arc::new(
            move |target: &HostRef, args: &Args<'_>, ret: &mut ResultSlot<'_>| {
                let out = body(concrete::<T>(target)?, args)?;
                ret.set(out)?;
                Ok(())
            },
        );
        self.config.invoker = Some(InvokerSpec {
            kind: InvokeKind::Function,
            required_args,
            constructible,
            invoke,
        });
        self
    }

    /// Opt instances into the per-instance dynamic property overlay.
    pub fn enable_dynamic_properties(&mut self) -> &mut Self {
        self.config.dynamic_properties = true;
        self
    }

    /// Include overlay indices in property-name enumeration.
    pub fn enumerate_indexed_properties(&mut self, enabled: bool) -> &mut Self {
        self.config.enumerate_indices = enabled;
        self
    }

    /// Register synchronous enumeration support.
    pub fn enumerator_factory<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(&T) -> Option<Box<dyn HostEnumerator>> + Send + Sync + 'static,
    {
        let erased: EnumFactory =
            Arc::new(move |target| concrete::<T>(target).ok().and_then(&factory));
        self.config.enumerator = Some(erased);
        self
    }

    /// Register asynchronous enumeration support. Without this, a
    /// registered synchronous factory is wrapped automatically.
    pub fn async_enumerator_factory<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(&T) -> Option<Box<dyn AsyncHostEnumerator>> + Send + Sync + 'static,
    {
        let erased: AsyncEnumFactory =
            Arc::new(move |target| concrete::<T>(target).ok().and_then(&factory));
        self.config.async_enumerator = Some(erased);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_value::{ArgKind, MarshalPolicy, ScriptValue};
    use std::sync::atomic::{AtomicI64, Ordering};

    struct Counter {
        count: AtomicI64,
    }

    fn configured() -> TypeConfiguration {
        let mut c = TypeConfigurator::<Counter>::new();
        c.property_accessors(
            "count",
            false,
            |t: &Counter| t.count.load(Ordering::Relaxed),
            |t: &Counter, v: i64| t.count.store(v, Ordering::Relaxed),
        );
        c.property_getter("label", true, |_t: &Counter| "counter");
        c.method("increment", 0, |t: &Counter, _args| {
            t.count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
        c.finish()
    }

    fn get(config: &TypeConfiguration, target: &HostRef, name: &str) -> ScriptValue {
        let policy = MarshalPolicy::default();
        let mut cell = ScriptValue::Nonexistent;
        let mut ret = ResultSlot::new(&mut cell, &policy);
        config.get_property(target, name, &mut ret).unwrap();
        cell
    }

    #[test]
    fn test_accessor_round_trip() {
        let config = configured();
        let target = HostRef::new(Counter { count: AtomicI64::new(5) });

        assert_eq!(get(&config, &target, "count").as_number(), Some(5.0));

        let slots = [ScriptValue::Number(9.0)];
        let args = Args::new(&slots, ArgKind::PropertyValue);
        assert!(config.set_property(&target, "count", &args).unwrap());
        assert_eq!(get(&config, &target, "count").as_number(), Some(9.0));
    }

    #[test]
    fn test_setter_coercion_failure_names_the_property() {
        let config = configured();
        let target = HostRef::new(Counter { count: AtomicI64::new(0) });
        let slots = [ScriptValue::Number(1.5)];
        let args = Args::new(&slots, ArgKind::PropertyValue);
        let err = config.set_property(&target, "count", &args).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value specified for property 'count'");
    }

    #[test]
    fn test_read_only_property() {
        let config = configured();
        let target = HostRef::new(Counter { count: AtomicI64::new(0) });
        let slots = [ScriptValue::Number(1.0)];
        let args = Args::new(&slots, ArgKind::PropertyValue);
        let err = config.set_property(&target, "label", &args).unwrap_err();
        assert_eq!(err, HostError::PropertyReadOnly("label".into()));
    }

    #[test]
    fn test_unknown_name_reports_not_found() {
        let config = configured();
        let target = HostRef::new(Counter { count: AtomicI64::new(0) });
        let policy = MarshalPolicy::default();
        let mut cell = ScriptValue::Nonexistent;
        let mut ret = ResultSlot::new(&mut cell, &policy);
        assert!(!config.get_property(&target, "missing", &mut ret).unwrap());
        assert!(cell.is_nonexistent());
        assert_eq!(config.query_property("missing"), PropertyFlags::empty());
    }

    #[test]
    fn test_flag_derivation() {
        let config = configured();
        assert_eq!(
            config.query_property("count"),
            PropertyFlags::AVAILABLE | PropertyFlags::WRITABLE
        );
        assert_eq!(
            config.query_property("label"),
            PropertyFlags::AVAILABLE | PropertyFlags::ENUMERABLE
        );
        assert_eq!(
            config.query_property("increment"),
            PropertyFlags::AVAILABLE | PropertyFlags::CACHEABLE
        );
    }

    #[test]
    fn test_enumerable_names_respect_the_flag() {
        let config = configured();
        let names = config.enumerable_names();
        assert_eq!(names.len(), 1);
        assert_eq!(&*names[0], "label");
    }

    #[test]
    fn test_method_getter_builds_fresh_bound_callables() {
        let config = configured();
        let target = HostRef::new(Counter { count: AtomicI64::new(5) });

        let first = get(&config, &target, "increment");
        let second = get(&config, &target, "increment");
        let first = first.as_host().unwrap();
        let second = second.as_host().unwrap();
        assert!(!first.ptr_eq(second));

        let bound = first.downcast_ref::<BoundMethod>().unwrap();
        assert_eq!(bound.name(), "increment");
        assert_eq!(bound.required_args(), 0);
        assert!(bound.target().ptr_eq(&target));
    }

    #[test]
    fn test_async_enumerator_synthesis() {
        use futures::executor::block_on;
        use crate::enumerate::IterEnumerator;

        let mut c = TypeConfigurator::<Counter>::new();
        c.enumerator_factory(|t: &Counter| {
            let upto = t.count.load(Ordering::Relaxed);
            Some(IterEnumerator::boxed(0..upto, MarshalPolicy::default()))
        });
        let config = c.finish();

        let target = HostRef::new(Counter { count: AtomicI64::new(2) });
        let mut e = config.create_async_enumerator(&target).unwrap().unwrap();
        assert!(block_on(e.move_next()).unwrap());
        assert_eq!(e.current().unwrap().as_number(), Some(0.0));
        assert!(block_on(e.move_next()).unwrap());
        assert!(!block_on(e.move_next()).unwrap());
    }

    #[test]
    fn test_unregistered_enumeration_yields_none() {
        let config = configured();
        let target = HostRef::new(Counter { count: AtomicI64::new(0) });
        assert!(config.create_enumerator(&target).unwrap().is_none());
        assert!(config.create_async_enumerator(&target).unwrap().is_none());
    }
}
