//! Engine Collaborator Interface
//!
//! The narrow outbound surface the bridge consumes from the script
//! engine: the active marshaling policy, the general (slow-path)
//! marshaling routes for value shapes the fast path does not
//! special-case, and persistent handle management for script values
//! stored beyond the current callback.
//!
//! All inbound callbacks execute under the engine's per-instance
//! serialization boundary; the bridge adds no locking of its own.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use keel_value::{HostRef, MarshalPolicy, ObjectRef, ScriptHandle, ScriptValue};

pub trait ScriptEngine {
    /// Marshaling switches consulted by result-slot writes.
    fn marshal_policy(&self) -> &MarshalPolicy;

    /// General host-to-script marshaling for arbitrary host values.
    fn marshal_to_script(&self, value: HostRef) -> ScriptValue;

    /// General script-to-host marshaling.
    fn marshal_to_host(&self, value: &ScriptValue) -> HostRef;

    /// Allocate a persistent handle for a script object about to be
    /// stored beyond the current callback. `None` if the value holds no
    /// engine-owned object.
    fn make_persistent(&self, value: &ScriptValue) -> Option<ScriptHandle>;

    /// Release a persistent handle allocated by [`make_persistent`].
    ///
    /// [`make_persistent`]: ScriptEngine::make_persistent
    fn release_persistent(&self, handle: ScriptHandle);
}

/// Stand-in engine used when no real engine is attached: opaque-object
/// marshaling and counted persistent handles. Tests assert against the
/// counters.
#[derive(Default)]
pub struct StubEngine {
    policy: MarshalPolicy,
    next_handle: AtomicU64,
    live_handles: AtomicUsize,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MarshalPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    /// Persistent handles currently outstanding.
    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::Relaxed)
    }
}

impl ScriptEngine for StubEngine {
    fn marshal_policy(&self) -> &MarshalPolicy {
        &self.policy
    }

    fn marshal_to_script(&self, value: HostRef) -> ScriptValue {
        ScriptValue::Object(ObjectRef::Host(value))
    }

    fn marshal_to_host(&self, value: &ScriptValue) -> HostRef {
        match value {
            ScriptValue::Object(ObjectRef::Host(h)) => h.clone(),
            other => HostRef::new(other.clone()),
        }
    }

    fn make_persistent(&self, value: &ScriptValue) -> Option<ScriptHandle> {
        match value {
            ScriptValue::Object(ObjectRef::Script(_)) => {
                self.live_handles.fetch_add(1, Ordering::Relaxed);
                let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
                Some(ScriptHandle::new(id))
            }
            _ => None,
        }
    }

    fn release_persistent(&self, _handle: ScriptHandle) {
        self.live_handles.fetch_sub(1, Ordering::Relaxed);
    }
}
