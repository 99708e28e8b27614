//! Single-value holder with change notification.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::subscription::{Listeners, Subscription, lock};

struct FieldInner<T> {
    value: T,
    listeners: Listeners<T>,
}

/// A scalar channel value.
///
/// [`set`](Self::set) notifies unconditionally, even when the new value
/// equals the old one. Listeners run while the field is locked, which
/// keeps notifications in production order; a listener must not call
/// back into the same field.
pub struct ObservableField<T> {
    inner: Arc<Mutex<FieldInner<T>>>,
}

impl<T> ObservableField<T>
where
    T: Clone + Send + 'static,
{
    /// Create a field holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FieldInner {
                value,
                listeners: Listeners::new(),
            })),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        lock(&self.inner).value.clone()
    }

    /// Replace the value and notify every listener.
    pub fn set(&self, value: T) {
        let mut inner = lock(&self.inner);
        inner.value = value;
        let FieldInner { value, listeners } = &mut *inner;
        listeners.notify(value);
    }

    /// Replace the value only if `accept` holds for the current one.
    ///
    /// The check and the write happen under the same lock. Returns whether
    /// the value was replaced (and listeners notified).
    pub fn set_if(&self, accept: impl FnOnce(&T) -> bool, value: T) -> bool {
        let mut inner = lock(&self.inner);
        if !accept(&inner.value) {
            return false;
        }
        inner.value = value;
        let FieldInner { value, listeners } = &mut *inner;
        listeners.notify(value);
        true
    }

    /// Register `callback`. It fires immediately with the current value,
    /// then after every [`set`](Self::set).
    pub fn subscribe(&self, callback: impl FnMut(&T) + Send + 'static) -> Subscription {
        let mut callback = callback;
        let id = {
            let mut inner = lock(&self.inner);
            callback(&inner.value);
            inner.listeners.insert(Box::new(callback))
        };

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.remove(id);
            }
        })
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}

impl<T> fmt::Debug for ObservableField<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("ObservableField")
            .field("value", &inner.value)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl FnMut(&T) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v: &T| lock(&sink).push(v.clone()))
    }

    #[test]
    fn subscribe_fires_with_current_value() {
        let field = ObservableField::new(String::from("a"));
        let (seen, cb) = recorder();
        let _sub = field.subscribe(cb);
        assert_eq!(*lock(&seen), vec![String::from("a")]);
    }

    #[test]
    fn set_notifies_even_when_unchanged() {
        let field = ObservableField::new(1_u32);
        let (seen, cb) = recorder();
        let _sub = field.subscribe(cb);
        field.set(1);
        field.set(1);
        assert_eq!(*lock(&seen), vec![1, 1, 1]);
    }

    #[test]
    fn set_if_rejects_without_notifying() {
        let field: ObservableField<Option<u32>> = ObservableField::new(None);
        let (seen, cb) = recorder();
        let _sub = field.subscribe(cb);

        assert!(field.set_if(Option::is_none, Some(3)));
        assert!(!field.set_if(Option::is_none, Some(4)));
        assert_eq!(field.get(), Some(3));
        assert_eq!(*lock(&seen), vec![None, Some(3)]);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let field = ObservableField::new(0_u32);
        let (seen, cb) = recorder();
        let sub = field.subscribe(cb);
        assert_eq!(field.listener_count(), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        field.set(5);

        assert_eq!(field.listener_count(), 0);
        assert_eq!(*lock(&seen), vec![0]);
    }
}
