//! Enumerator Bridges
//!
//! Uniform enumerator shapes consumed by the adapter, plus the wrappers
//! that fit ordinary iterators, streams, and synchronous enumerators
//! into them.

use std::pin::Pin;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use futures::stream::{Stream, StreamExt};
use keel_value::{IntoScript, MarshalPolicy, ScriptValue};

use crate::error::HostError;

const NOT_POSITIONED: HostError =
    HostError::InvalidOperation("the enumerator is not positioned on an element");

/// Synchronous enumeration capability.
pub trait HostEnumerator {
    /// Value at the current position. Fails until the first successful
    /// `move_next` and after exhaustion.
    fn current(&self) -> Result<ScriptValue, HostError>;

    /// Advance; `Ok(false)` on exhaustion.
    fn move_next(&mut self) -> Result<bool, HostError>;

    /// Always forwarded by the bridges, a no-op where the underlying
    /// source has nothing to release. Never an error in that case.
    fn dispose(&mut self) -> Result<(), HostError>;
}

/// Asynchronous enumeration capability. `move_next`/`dispose` may
/// suspend; the engine collaborator re-acquires its serialization
/// boundary before delivering the result.
pub trait AsyncHostEnumerator {
    fn current(&self) -> Result<ScriptValue, HostError>;

    fn move_next(&mut self) -> LocalBoxFuture<'_, Result<bool, HostError>>;

    fn dispose(&mut self) -> LocalBoxFuture<'_, Result<(), HostError>>;
}

/// Presents a synchronous enumerator as an asynchronous one; every step
/// completes immediately.
pub struct SyncToAsyncEnumerator {
    inner: Box<dyn HostEnumerator>,
}

impl SyncToAsyncEnumerator {
    pub fn new(inner: Box<dyn HostEnumerator>) -> Self {
        Self { inner }
    }
}

impl AsyncHostEnumerator for SyncToAsyncEnumerator {
    fn current(&self) -> Result<ScriptValue, HostError> {
        self.inner.current()
    }

    fn move_next(&mut self) -> LocalBoxFuture<'_, Result<bool, HostError>> {
        futures::future::ready(self.inner.move_next()).boxed_local()
    }

    fn dispose(&mut self) -> LocalBoxFuture<'_, Result<(), HostError>> {
        futures::future::ready(self.inner.dispose()).boxed_local()
    }
}

/// Adapts any ordinary iterator into the enumerator capability.
pub struct IterEnumerator<I> {
    iter: I,
    current: Option<ScriptValue>,
    policy: MarshalPolicy,
}

impl<I> IterEnumerator<I>
where
    I: Iterator,
    I::Item: IntoScript,
{
    pub fn new(iter: I, policy: MarshalPolicy) -> Self {
        Self { iter, current: None, policy }
    }

    pub fn boxed(iter: I, policy: MarshalPolicy) -> Box<dyn HostEnumerator>
    where
        I: 'static,
    {
        Box::new(Self::new(iter, policy))
    }
}

impl<I> HostEnumerator for IterEnumerator<I>
where
    I: Iterator,
    I::Item: IntoScript,
{
    fn current(&self) -> Result<ScriptValue, HostError> {
        self.current.clone().ok_or(NOT_POSITIONED)
    }

    fn move_next(&mut self) -> Result<bool, HostError> {
        match self.iter.next() {
            Some(item) => {
                self.current = Some(item.into_script(&self.policy));
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn dispose(&mut self) -> Result<(), HostError> {
        self.current = None;
        Ok(())
    }
}

/// Adapts any stream into the asynchronous enumerator capability.
pub struct StreamEnumerator<S> {
    stream: Pin<Box<S>>,
    current: Option<ScriptValue>,
    policy: MarshalPolicy,
}

impl<S> StreamEnumerator<S>
where
    S: Stream,
    S::Item: IntoScript,
{
    pub fn new(stream: S, policy: MarshalPolicy) -> Self {
        Self { stream: Box::pin(stream), current: None, policy }
    }

    pub fn boxed(stream: S, policy: MarshalPolicy) -> Box<dyn AsyncHostEnumerator>
    where
        S: 'static,
    {
        Box::new(Self::new(stream, policy))
    }
}

impl<S> AsyncHostEnumerator for StreamEnumerator<S>
where
    S: Stream,
    S::Item: IntoScript,
{
    fn current(&self) -> Result<ScriptValue, HostError> {
        self.current.clone().ok_or(NOT_POSITIONED)
    }

    fn move_next(&mut self) -> LocalBoxFuture<'_, Result<bool, HostError>> {
        async move {
            match self.stream.as_mut().next().await {
                Some(item) => {
                    self.current = Some(item.into_script(&self.policy));
                    Ok(true)
                }
                None => {
                    self.current = None;
                    Ok(false)
                }
            }
        }
        .boxed_local()
    }

    fn dispose(&mut self) -> LocalBoxFuture<'_, Result<(), HostError>> {
        self.current = None;
        futures::future::ready(Ok(())).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn policy() -> MarshalPolicy {
        MarshalPolicy::default()
    }

    #[test]
    fn test_iter_enumeration() {
        let mut e = IterEnumerator::new(vec![1_i32, 2, 3].into_iter(), policy());
        assert!(e.current().is_err());
        let mut seen = Vec::new();
        while e.move_next().unwrap() {
            seen.push(e.current().unwrap().as_number().unwrap());
        }
        assert_eq!(seen, [1.0, 2.0, 3.0]);
        assert!(e.current().is_err());
        e.dispose().unwrap();
    }

    #[test]
    fn test_current_before_first_step_is_invalid() {
        let e = IterEnumerator::new(std::iter::empty::<i32>(), policy());
        assert!(matches!(e.current(), Err(HostError::InvalidOperation(_))));
    }

    #[test]
    fn test_sync_to_async_wrapper() {
        let inner = IterEnumerator::boxed(vec!["a", "b"].into_iter(), policy());
        let mut e = SyncToAsyncEnumerator::new(inner);
        assert!(block_on(e.move_next()).unwrap());
        assert_eq!(e.current().unwrap().as_str(), Some("a"));
        assert!(block_on(e.move_next()).unwrap());
        assert!(!block_on(e.move_next()).unwrap());
        block_on(e.dispose()).unwrap();
    }

    #[test]
    fn test_stream_enumeration() {
        let mut e = StreamEnumerator::new(futures::stream::iter(vec![10_u8, 20]), policy());
        assert!(block_on(e.move_next()).unwrap());
        assert_eq!(e.current().unwrap().as_number(), Some(10.0));
        assert!(block_on(e.move_next()).unwrap());
        assert!(!block_on(e.move_next()).unwrap());
        assert!(e.current().is_err());
        block_on(e.dispose()).unwrap();
    }

    #[test]
    fn test_dispose_on_undisposable_source_is_a_no_op() {
        let mut e = IterEnumerator::new(vec![1_i8].into_iter(), policy());
        assert!(e.dispose().is_ok());
        assert!(e.dispose().is_ok());
    }
}
