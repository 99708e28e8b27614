//! Keyed container with diff emission and null-delete merge semantics.
//!
//! A [`DiffableMap`] backs every dictionary-shaped channel. Diffs are
//! [`MapDiff`]s: `Some(value)` inserts or replaces an entry, `None` deletes
//! it, and absent keys are unchanged. Values are never merged field by
//! field; an incoming value replaces the old one whole.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use vertigo_types::MapDiff;

use crate::subscription::{Listeners, Subscription, lock};

/// Compute the diff that turns `old` into `new`.
///
/// Keys only in `old` map to `None`, keys whose value differs or that are
/// only in `new` map to the new value. Equal entries are omitted.
pub fn diff<V>(old: &BTreeMap<String, V>, new: &BTreeMap<String, V>) -> MapDiff<V>
where
    V: Clone + PartialEq,
{
    let mut out = MapDiff::new();
    for (key, old_value) in old {
        match new.get(key) {
            None => {
                out.insert(key.clone(), None);
            }
            Some(new_value) if new_value != old_value => {
                out.insert(key.clone(), Some(new_value.clone()));
            }
            Some(_) => {}
        }
    }
    for (key, new_value) in new {
        if !old.contains_key(key) {
            out.insert(key.clone(), Some(new_value.clone()));
        }
    }
    out
}

/// Fold `partial` into `contents`. Deleting an absent key is a no-op.
pub fn apply_diff<V>(contents: &mut BTreeMap<String, V>, partial: &MapDiff<V>)
where
    V: Clone,
{
    for (key, value) in partial {
        match value {
            Some(value) => {
                contents.insert(key.clone(), value.clone());
            }
            None => {
                contents.remove(key);
            }
        }
    }
}

/// Express a whole map as a diff (every entry present).
pub fn as_full_diff<V>(contents: &BTreeMap<String, V>) -> MapDiff<V>
where
    V: Clone,
{
    contents
        .iter()
        .map(|(key, value)| (key.clone(), Some(value.clone())))
        .collect()
}

struct MapInner<V> {
    contents: BTreeMap<String, V>,
    last_merge: Option<MapDiff<V>>,
    listeners: Listeners<BTreeMap<String, V>>,
}

/// A map channel value.
///
/// Listeners receive the full contents after every change. Use
/// [`subscribe_with_diff`](Self::subscribe_with_diff) to receive diffs
/// instead. As with [`ObservableField`](crate::ObservableField),
/// listeners run under the map's lock and must not call back into it.
pub struct DiffableMap<V> {
    inner: Arc<Mutex<MapInner<V>>>,
}

impl<V> DiffableMap<V>
where
    V: Clone + PartialEq + Send + 'static,
{
    /// Create a map with `contents`.
    pub fn new(contents: BTreeMap<String, V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MapInner {
                contents,
                last_merge: None,
                listeners: Listeners::new(),
            })),
        }
    }

    /// Snapshot of the full contents.
    pub fn get(&self) -> BTreeMap<String, V> {
        lock(&self.inner).contents.clone()
    }

    /// A single entry.
    pub fn entry(&self, key: &str) -> Option<V> {
        lock(&self.inner).contents.get(key).cloned()
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        lock(&self.inner).contents.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        lock(&self.inner).contents.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        lock(&self.inner).contents.is_empty()
    }

    /// Replace the entire contents and notify.
    pub fn set(&self, whole: BTreeMap<String, V>) {
        let mut inner = lock(&self.inner);
        inner.contents = whole;
        inner.last_merge = None;
        let MapInner {
            contents,
            listeners,
            ..
        } = &mut *inner;
        listeners.notify(contents);
    }

    /// Fold `partial` into the contents and notify with the result.
    ///
    /// An empty diff changes nothing but still notifies. The diff itself
    /// stays available through [`last_merge`](Self::last_merge).
    pub fn merge_diff(&self, partial: MapDiff<V>) {
        let mut inner = lock(&self.inner);
        apply_diff(&mut inner.contents, &partial);
        inner.last_merge = Some(partial);
        let MapInner {
            contents,
            listeners,
            ..
        } = &mut *inner;
        listeners.notify(contents);
    }

    /// Upsert a single entry through [`merge_diff`](Self::merge_diff).
    pub fn upsert(&self, key: impl Into<String>, value: V) {
        let mut partial = MapDiff::new();
        partial.insert(key.into(), Some(value));
        self.merge_diff(partial);
    }

    /// The diff applied by the most recent [`merge_diff`](Self::merge_diff),
    /// or `None` if the last change was a whole [`set`](Self::set).
    pub fn last_merge(&self) -> Option<MapDiff<V>> {
        lock(&self.inner).last_merge.clone()
    }

    /// Register `callback` for the full contents. It fires immediately,
    /// then after every change.
    pub fn subscribe(
        &self,
        callback: impl FnMut(&BTreeMap<String, V>) + Send + 'static,
    ) -> Subscription {
        let mut callback = callback;
        let id = {
            let mut inner = lock(&self.inner);
            callback(&inner.contents);
            inner.listeners.insert(Box::new(callback))
        };

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.remove(id);
            }
        })
    }

    /// Register `callback` for diffs.
    ///
    /// The first call carries the full current contents as a diff. Every
    /// later call carries the diff against the previously emitted state,
    /// which may be empty.
    pub fn subscribe_with_diff(
        &self,
        callback: impl FnMut(&MapDiff<V>) + Send + 'static,
    ) -> Subscription {
        let mut callback = callback;
        let mut previous: Option<BTreeMap<String, V>> = None;
        self.subscribe(move |current| {
            let partial = previous
                .as_ref()
                .map_or_else(|| as_full_diff(current), |prev| diff(prev, current));
            callback(&partial);
            previous = Some(current.clone());
        })
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}

impl<V> fmt::Debug for DiffableMap<V>
where
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("DiffableMap")
            .field("contents", &inner.contents)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl<V> Default for DiffableMap<V>
where
    V: Clone + PartialEq + Send + 'static,
{
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}
