//! Observable state channels.
//!
//! Every piece of reactive state is an [`Observable`]: it holds the latest value and notifies
//! subscribers synchronously when it changes. Late subscribers see the latest value immediately.
//! Dropping a [`watch::Receiver`] is the unsubscribe.
//!
//! Results of asynchronous work are guarded by a [`GenerationGuard`], so a response that arrives
//! after newer work has started is discarded instead of overwriting newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// A single-slot, last-value-wins broadcast of `T`.
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Observable<T> {
    /// Creates a new observable holding `initial`.
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Inspects the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Registers a new subscriber. The current value is considered seen.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Publishes `value` to all subscribers, returning the previous value.
    pub fn set(&self, value: T) -> T {
        self.tx.send_replace(value)
    }

    /// Mutates the value in place. Subscribers are notified only if `f` returns `true`.
    pub fn update(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + PartialEq> Observable<T> {
    /// Publishes `value` only if it differs from the current value.
    pub fn set_if_changed(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// A ticket identifying one unit of asynchronous work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

/// Monotonic counter used to drop results of superseded work.
#[derive(Debug, Default)]
pub struct GenerationGuard {
    current: AtomicU64,
}

impl GenerationGuard {
    /// Creates a new guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts new work, superseding everything started before.
    pub fn next(&self) -> Generation {
        Generation(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns `true` if no work was started after `generation`.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.current.load(Ordering::SeqCst) == generation.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_subscriber_sees_latest() {
        let obs = Observable::new(0u32);
        obs.set(1);
        obs.set(2);
        let rx = obs.subscribe();
        assert_eq!(*rx.borrow(), 2);
    }

    #[tokio::test]
    async fn notifies_on_change() {
        let obs = Observable::new(false);
        let mut rx = obs.subscribe();
        assert!(!rx.has_changed().unwrap());
        obs.set(true);
        assert!(rx.has_changed().unwrap());
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[test]
    fn set_if_changed_skips_equal_values() {
        let obs = Observable::new(Some("alice".to_string()));
        let rx = obs.subscribe();
        assert!(!obs.set_if_changed(Some("alice".to_string())));
        assert!(!rx.has_changed().unwrap());
        assert!(obs.set_if_changed(None));
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn dropping_receiver_unsubscribes() {
        let obs = Observable::new(0u8);
        let rx = obs.subscribe();
        assert_eq!(obs.subscriber_count(), 1);
        drop(rx);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn newer_generation_supersedes_older() {
        let guard = GenerationGuard::new();
        let first = guard.next();
        assert!(guard.is_current(first));
        let second = guard.next();
        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));
        assert!(second > first);
    }
}
