//! Host Item Adapter
//!
//! Receives raw engine callbacks (by name, index, or argument buffer),
//! resolves them against the target type's configuration and the
//! per-instance dynamic overlay, and writes into caller-allocated
//! result cells. Property names arriving as raw buffers are interned
//! before any lookup.
//!
//! Every callback here runs under the engine's per-instance
//! serialization boundary; the adapter itself takes no locks.

use std::cell::{RefCell, RefMut};
use std::sync::Arc;

use bitflags::bitflags;
use keel_host::{
    AsyncHostEnumerator, BoundMethod, ConfigRegistry, DynamicOverlay, HostEnumerator, HostError,
    HostOps, InvokeKind, InvokerSpec, PropertyFlags,
};
use keel_value::{ArgKind, Args, HostRef, ObjectRef, ResultSlot, ScriptValue};

use crate::engine::ScriptEngine;
use crate::intern::{NameSource, intern};

bitflags! {
    /// Per-adapter behavior switches. Adapters are cached per
    /// `(target, flags)` pair; differing flags yield distinct adapters.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ItemFlags: u8 {
        /// Disable the dynamic overlay for this adapter even when the
        /// target type opted in.
        const HIDE_DYNAMIC_MEMBERS = 1 << 0;
    }
}

/// Flags reported for dynamic-overlay entries.
const OVERLAY_FLAGS: PropertyFlags = PropertyFlags::AVAILABLE
    .union(PropertyFlags::WRITABLE)
    .union(PropertyFlags::ENUMERABLE)
    .union(PropertyFlags::DELETABLE);

/// Adapter binding one host object to one engine instance.
pub struct HostItem {
    engine: Arc<dyn ScriptEngine>,
    target: HostRef,
    flags: ItemFlags,
    ops: Arc<dyn HostOps>,
    overlay: RefCell<Option<DynamicOverlay>>,
}

impl HostItem {
    /// Bind `target` for exposure to the engine. Fails when the target's
    /// type has no registered configuration (bound methods carry their
    /// own capability and need none).
    pub fn new(
        engine: Arc<dyn ScriptEngine>,
        registry: &ConfigRegistry,
        target: HostRef,
        flags: ItemFlags,
    ) -> Result<Self, HostError> {
        let ops: Arc<dyn HostOps> = if let Some(bound) = target.downcast_ref::<BoundMethod>() {
            Arc::new(BoundMethodOps::for_method(bound))
        } else {
            registry
                .lookup_for(&target)
                .ok_or(HostError::NotSupported("the host type is not configured"))?
        };
        Ok(Self { engine, target, flags, ops, overlay: RefCell::new(None) })
    }

    pub fn target(&self) -> &HostRef {
        &self.target
    }

    pub fn flags(&self) -> ItemFlags {
        self.flags
    }

    fn dynamic_enabled(&self) -> bool {
        self.ops.supports_dynamic_properties()
            && !self.flags.contains(ItemFlags::HIDE_DYNAMIC_MEMBERS)
    }

    fn overlay_write(&self) -> RefMut<'_, DynamicOverlay> {
        RefMut::map(self.overlay.borrow_mut(), |slot| {
            slot.get_or_insert_with(DynamicOverlay::new)
        })
    }

    /// Promote an engine-owned object to a persistent reference before
    /// it is stored beyond the current callback.
    fn promote(&self, value: ScriptValue) -> ScriptValue {
        if matches!(value, ScriptValue::Object(ObjectRef::Script(_))) {
            if let Some(handle) = self.engine.make_persistent(&value) {
                return ScriptValue::Object(ObjectRef::Script(handle));
            }
        }
        value
    }

    fn release(&self, value: &ScriptValue) {
        if let ScriptValue::Object(ObjectRef::Script(handle)) = value {
            self.engine.release_persistent(handle.clone());
        }
    }

    /// Named property get. A miss leaves the cell `Nonexistent`; the
    /// engine treats that as "absent" and falls back to its own chain.
    pub fn get_property<N: NameSource + ?Sized>(
        &self,
        name: &N,
        cell: &mut ScriptValue,
    ) -> Result<(), HostError> {
        let name = intern(name);
        let mut ret = ResultSlot::new(cell, self.engine.marshal_policy());
        if self.ops.get_property(&self.target, &name, &mut ret)? {
            return Ok(());
        }
        if self.dynamic_enabled() {
            let overlay = self.overlay.borrow();
            if let Some(value) = overlay.as_ref().and_then(|o| o.get_named(&name)) {
                ret.set_value(value.clone())?;
            }
        }
        Ok(())
    }

    /// Named property set. Unknown names land in the overlay when the
    /// type supports it.
    pub fn set_property<N: NameSource + ?Sized>(
        &self,
        name: &N,
        value: &ScriptValue,
    ) -> Result<(), HostError> {
        let name = intern(name);
        let slots = std::slice::from_ref(value);
        let args = Args::new(slots, ArgKind::PropertyValue);
        if self.ops.set_property(&self.target, &name, &args)? {
            return Ok(());
        }
        if self.dynamic_enabled() {
            let stored = self.promote(value.clone());
            let mut overlay = self.overlay_write();
            if let Some(old) = overlay.get_named(&name) {
                self.release(&old.clone());
            }
            overlay.set_named(name, stored);
            return Ok(());
        }
        Err(HostError::NotSupported("the object does not support property assignment"))
    }

    pub fn query_property<N: NameSource + ?Sized>(&self, name: &N) -> PropertyFlags {
        let name = intern(name);
        let flags = self.ops.query_property(&name);
        if !flags.is_empty() {
            return flags;
        }
        if self.dynamic_enabled() {
            let overlay = self.overlay.borrow();
            if overlay.as_ref().is_some_and(|o| o.has_named(&name)) {
                return OVERLAY_FLAGS;
            }
        }
        PropertyFlags::empty()
    }

    /// Named property delete. Lenient by design: statically configured
    /// and unknown names report "not deleted" rather than failing;
    /// overlay deletes on an overlay-capable target always succeed.
    pub fn delete_property<N: NameSource + ?Sized>(&self, name: &N) -> Result<bool, HostError> {
        let name = intern(name);
        if !self.ops.query_property(&name).is_empty() {
            return Ok(false);
        }
        if self.dynamic_enabled() {
            let mut overlay = self.overlay.borrow_mut();
            if let Some(overlay) = overlay.as_mut() {
                if let Some(old) = overlay.get_named(&name).cloned() {
                    overlay.delete_named(&name);
                    self.release(&old);
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Names visible to enumeration: statically configured enumerable
    /// names, overlay names, and (when configured) overlay indices.
    pub fn property_names(&self) -> Vec<Arc<str>> {
        let mut names = self.ops.enumerable_names();
        if self.dynamic_enabled() {
            let overlay = self.overlay.borrow();
            if let Some(overlay) = overlay.as_ref() {
                names.extend(overlay.names());
                if self.ops.enumerates_indexed_properties() {
                    names.extend(overlay.indices().into_iter().map(|i| Arc::from(i.to_string())));
                }
            }
        }
        names
    }

    /// Occupied overlay indices in ascending order.
    pub fn property_indices(&self) -> Vec<u32> {
        if !self.dynamic_enabled() {
            return Vec::new();
        }
        let overlay = self.overlay.borrow();
        overlay.as_ref().map_or_else(Vec::new, |o| o.indices())
    }

    /// Indexed property get. Indexed storage exists only on the overlay.
    pub fn get_index(&self, index: u32, cell: &mut ScriptValue) -> Result<(), HostError> {
        if !self.dynamic_enabled() {
            return Err(HostError::NotSupported("the object does not support indexed properties"));
        }
        let mut ret = ResultSlot::new(cell, self.engine.marshal_policy());
        let overlay = self.overlay.borrow();
        if let Some(value) = overlay.as_ref().and_then(|o| o.get_index(index)) {
            ret.set_value(value.clone())?;
        }
        Ok(())
    }

    pub fn set_index(&self, index: u32, value: &ScriptValue) -> Result<(), HostError> {
        if !self.dynamic_enabled() {
            return Err(HostError::NotSupported("the object does not support indexed properties"));
        }
        let stored = self.promote(value.clone());
        let mut overlay = self.overlay_write();
        if let Some(old) = overlay.get_index(index) {
            self.release(&old.clone());
        }
        overlay.set_index(index, stored);
        Ok(())
    }

    /// Indexed delete; always succeeds on an overlay-capable target,
    /// whether or not an entry existed.
    pub fn delete_index(&self, index: u32) -> Result<bool, HostError> {
        if !self.dynamic_enabled() {
            return Err(HostError::NotSupported("the object does not support indexed properties"));
        }
        let mut overlay = self.overlay.borrow_mut();
        if let Some(overlay) = overlay.as_mut() {
            if let Some(old) = overlay.get_index(index).cloned() {
                overlay.delete_index(index);
                self.release(&old);
            }
        }
        Ok(true)
    }

    /// Invoke the target as a function (or constructor). The cell is
    /// guaranteed to be observably set on success.
    pub fn invoke(
        &self,
        as_constructor: bool,
        argv: &[ScriptValue],
        cell: &mut ScriptValue,
    ) -> Result<(), HostError> {
        let spec = self
            .ops
            .invoker()
            .ok_or(HostError::NotSupported("the object does not support invocation"))?;
        if as_constructor && !(spec.kind == InvokeKind::Function && spec.constructible) {
            return Err(HostError::NotSupported(
                "the object does not support constructor invocation",
            ));
        }
        self.run_invoker(spec, argv, cell)
    }

    /// Invoke a named member: fetch it through the ordinary property
    /// path and call the resulting bound method.
    pub fn invoke_method<N: NameSource + ?Sized>(
        &self,
        name: &N,
        argv: &[ScriptValue],
        cell: &mut ScriptValue,
    ) -> Result<(), HostError> {
        let mut member = ScriptValue::Nonexistent;
        self.get_property(name, &mut member)?;
        let bound = member
            .as_host()
            .and_then(|h| h.downcast_arc::<BoundMethod>())
            .ok_or(HostError::NotSupported("the requested member is not invocable"))?;

        let args = Args::new(argv, ArgKind::MethodArg);
        let mut ret = ResultSlot::new(cell, self.engine.marshal_policy());
        bound.invoke(&args, &mut ret)?;
        if !ret.is_set() {
            ret.set_undefined()?;
        }
        Ok(())
    }

    fn run_invoker(
        &self,
        spec: &InvokerSpec,
        argv: &[ScriptValue],
        cell: &mut ScriptValue,
    ) -> Result<(), HostError> {
        if argv.len() < spec.required_args {
            let name = self
                .target
                .downcast_ref::<BoundMethod>()
                .map_or_else(|| "function".to_owned(), |b| b.name().to_owned());
            return Err(HostError::TooFewArguments {
                name,
                required: spec.required_args,
                supplied: argv.len(),
            });
        }
        let kind = match spec.kind {
            InvokeKind::Method => ArgKind::MethodArg,
            InvokeKind::Function => ArgKind::FunctionArg,
        };
        let args = Args::new(argv, kind);
        let mut ret = ResultSlot::new(cell, self.engine.marshal_policy());
        (spec.invoke)(&self.target, &args, &mut ret)?;
        // An invocation that produced nothing still yields a defined
        // result by the time the engine reads the cell.
        if !ret.is_set() {
            ret.set_undefined()?;
        }
        Ok(())
    }

    pub fn create_enumerator(&self) -> Result<Box<dyn HostEnumerator>, HostError> {
        self.ops
            .create_enumerator(&self.target)?
            .ok_or(HostError::NotSupported("the object is not enumerable"))
    }

    pub fn create_async_enumerator(&self) -> Result<Box<dyn AsyncHostEnumerator>, HostError> {
        self.ops
            .create_async_enumerator(&self.target)?
            .ok_or(HostError::NotSupported("the object is not async-enumerable"))
    }
}

/// Capability surface of a bound-method target: invocation only.
struct BoundMethodOps {
    spec: InvokerSpec,
}

impl BoundMethodOps {
    fn for_method(bound: &BoundMethod) -> Self {
        Self {
            spec: InvokerSpec {
                kind: InvokeKind::Method,
                required_args: bound.required_args(),
                constructible: false,
                invoke: Arc::new(|target, args, ret| {
                    let bound = target
                        .downcast_ref::<BoundMethod>()
                        .ok_or(HostError::InvalidOperation("host target type mismatch"))?;
                    bound.invoke(args, ret)
                }),
            },
        }
    }
}

impl HostOps for BoundMethodOps {
    fn get_property(
        &self,
        _target: &HostRef,
        _name: &str,
        _ret: &mut ResultSlot<'_>,
    ) -> Result<bool, HostError> {
        Ok(false)
    }

    fn set_property(
        &self,
        _target: &HostRef,
        _name: &str,
        _args: &Args<'_>,
    ) -> Result<bool, HostError> {
        Ok(false)
    }

    fn query_property(&self, _name: &str) -> PropertyFlags {
        PropertyFlags::empty()
    }

    fn enumerable_names(&self) -> Vec<Arc<str>> {
        Vec::new()
    }

    fn invoker(&self) -> Option<&InvokerSpec> {
        Some(&self.spec)
    }

    fn create_enumerator(
        &self,
        _target: &HostRef,
    ) -> Result<Option<Box<dyn HostEnumerator>>, HostError> {
        Ok(None)
    }

    fn create_async_enumerator(
        &self,
        _target: &HostRef,
    ) -> Result<Option<Box<dyn AsyncHostEnumerator>>, HostError> {
        Ok(None)
    }
}
