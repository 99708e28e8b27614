//! Explicit subscription registry and unsubscribe tokens.
//!
//! Channels keep their listeners in a [`Listeners`] list keyed by a
//! monotonically increasing id. Subscribing hands back a [`Subscription`]
//! that removes the listener again; cancellation is an explicit call (or
//! the token being dropped), never implicit reclamation of a closure.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Every critical section in this crate is a plain read-modify-write on a
/// value that is valid at every step, so a poisoned lock still guards a
/// consistent value.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type Listener<T> = Box<dyn FnMut(&T) + Send>;

/// Listeners registered on one channel.
pub(crate) struct Listeners<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

impl<T> Listeners<T> {
    pub(crate) const fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Register a listener and return its id.
    pub(crate) fn insert(&mut self, listener: Listener<T>) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push((id, listener));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub(crate) fn remove(&mut self, id: u64) {
        self.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    /// Invoke every listener with `value`, in registration order.
    pub(crate) fn notify(&mut self, value: &T) {
        for (_, listener) in &mut self.entries {
            listener(value);
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Handle returned by every `subscribe*` call.
///
/// [`Subscription::unsubscribe`] removes the listener; calling it again is
/// a no-op. Dropping the handle unsubscribes as well, so a subscription
/// held by a connection is torn down whenever the connection goes away.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    /// Wrap a cancellation closure.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Combine several subscriptions into one that tears all of them down.
    pub fn combine(parts: Vec<Self>) -> Self {
        Self::new(move || {
            for part in parts {
                part.unsubscribe();
            }
        })
    }

    /// Remove the listener(s). Idempotent.
    pub fn unsubscribe(&self) {
        let cancel = lock(&self.cancel).take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) already ran.
    pub fn is_cancelled(&self) -> bool {
        lock(&self.cancel).is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn unsubscribe_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();
        sub.unsubscribe();
        drop(sub);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_unsubscribes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!sub.is_cancelled());
        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn combined_tears_down_every_part() {
        let calls = Arc::new(AtomicUsize::new(0));
        let parts = (0..3)
            .map(|_| {
                let counter = Arc::clone(&calls);
                Subscription::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        let combined = Subscription::combine(parts);
        combined.unsubscribe();
        combined.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn listeners_remove_unknown_id_is_noop() {
        let mut listeners: Listeners<u32> = Listeners::new();
        let id = listeners.insert(Box::new(|_| {}));
        listeners.remove(id.wrapping_add(10));
        assert_eq!(listeners.len(), 1);
        listeners.remove(id);
        assert_eq!(listeners.len(), 0);
    }
}
