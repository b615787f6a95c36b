//! Keyed observable store with write notification.
//!
//! # Design
//!
//! [`ObservableStore<K, V>`] keeps one value per key in shared,
//! reference-counted storage (`Rc<RefCell<..>>`). Cloning a store hands out
//! another handle to the same state and listeners, which is how a listener
//! writes back into the store it observes.
//!
//! A write commits the value first and then calls every listener registered
//! for that key, in registration order, with the new value and a snapshot of
//! the whole state taken right after the commit. The listener list and the
//! snapshot are captured before the first call: listeners added or removed
//! during a dispatch take effect on the next write.
//!
//! # Failure Modes
//!
//! - **Listener error**: the first failing listener aborts the rest of that
//!   dispatch and its error is returned from `set`. The committed value stays.
//! - **Write cycles**: nested writes from listeners are bounded by the
//!   store's maximum dispatch depth. The write that would go deeper fails with
//!   [`Error::DispatchDepth`] without committing.

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::rc::Rc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace, warn};

/// Nested dispatch depth allowed unless configured otherwise.
pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 32;

/// Callback invoked on every write to a key.
pub type Listener<K, V> = Rc<dyn Fn(&V, &Snapshot<K, V>) -> Result<()>>;

/// Read-only view of the full state at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot<K, V> {
    values: HashMap<K, V>,
}

impl<K: Eq + Hash, V> Snapshot<K, V> {
    pub fn get(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.values.iter()
    }
}

/// A write forwarded to an async consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange<K, V> {
    pub key: K,
    pub value: V,
}

struct StoreInner<K, V> {
    state: HashMap<K, V>,
    listeners: HashMap<K, Vec<Listener<K, V>>>,
    depth: usize,
    max_depth: usize,
}

/// Keyed state with synchronous per-key listeners.
pub struct ObservableStore<K, V> {
    inner: Rc<RefCell<StoreInner<K, V>>>,
}

// Manual Clone: shares the same Rc.
impl<K, V> Clone for ObservableStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K: Debug, V> Debug for ObservableStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ObservableStore")
            .field("keys", &inner.state.keys().collect::<Vec<_>>())
            .field(
                "listener_count",
                &inner.listeners.values().map(Vec::len).sum::<usize>(),
            )
            .field("depth", &inner.depth)
            .field("max_depth", &inner.max_depth)
            .finish()
    }
}

impl<K, V> Default for ObservableStore<K, V>
where
    K: Copy + Eq + Hash + Debug + 'static,
    V: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ObservableStore<K, V>
where
    K: Copy + Eq + Hash + Debug + 'static,
    V: Clone + 'static,
{
    /// Create an empty store with the default dispatch depth.
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DISPATCH_DEPTH)
    }

    /// Create an empty store allowing `max_depth` nested dispatches.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                state: HashMap::new(),
                listeners: HashMap::new(),
                depth: 0,
                max_depth: max_depth.max(1),
            })),
        }
    }

    /// Current value for `key`.
    pub fn get(&self, key: K) -> Option<V> {
        self.inner.borrow().state.get(&key).cloned()
    }

    /// Copy of the full state.
    pub fn snapshot(&self) -> Snapshot<K, V> {
        Snapshot {
            values: self.inner.borrow().state.clone(),
        }
    }

    /// Store `value` under `key`, then call the key's listeners.
    pub fn set(&self, key: K, value: V) -> Result<()> {
        let (listeners, snapshot) = {
            let mut inner = self.inner.borrow_mut();
            if inner.depth >= inner.max_depth {
                return Err(Error::DispatchDepth {
                    key: format!("{key:?}"),
                    depth: inner.max_depth,
                });
            }
            inner.state.insert(key, value.clone());

            let listeners = inner.listeners.get(&key).cloned().unwrap_or_default();
            if listeners.is_empty() {
                trace!(?key, "state updated");
                return Ok(());
            }
            let snapshot = Snapshot {
                values: inner.state.clone(),
            };
            (listeners, snapshot)
        };

        trace!(?key, listeners = listeners.len(), "dispatching state change");
        let _depth = DepthGuard::enter(&self.inner);
        let result = listeners
            .iter()
            .try_for_each(|listener| listener(&value, &snapshot));
        if let Err(e) = &result {
            warn!(?key, error = %e, "state listener failed, remaining listeners skipped");
        }
        result
    }

    /// Append a listener for `key`. The same callback may be added twice.
    pub fn on_change<F>(&self, key: K, callback: F)
    where
        F: Fn(&V, &Snapshot<K, V>) -> Result<()> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let listeners = inner.listeners.entry(key).or_default();
        listeners.push(Rc::new(callback));
        debug!(?key, count = listeners.len(), "registered state listener");
    }

    /// Remove every listener for `key`.
    pub fn unlisten(&self, key: K) {
        if let Some(removed) = self.inner.borrow_mut().listeners.remove(&key) {
            debug!(?key, count = removed.len(), "removed state listeners");
        }
    }

    pub fn listener_count(&self, key: K) -> usize {
        self.inner
            .borrow()
            .listeners
            .get(&key)
            .map_or(0, Vec::len)
    }

    /// Push every write to `key` into `tx`.
    ///
    /// The receiving side runs independently of `set`. A closed channel
    /// makes the write fail with [`Error::Channel`].
    pub fn forward(&self, key: K, tx: mpsc::UnboundedSender<StateChange<K, V>>) {
        self.on_change(key, move |value, _| {
            tx.send(StateChange {
                key,
                value: value.clone(),
            })
            .map_err(|e| Error::channel(e.to_string()))
        });
    }

    /// Stream of writes to `key`.
    pub fn changes(&self, key: K) -> UnboundedReceiverStream<StateChange<K, V>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.forward(key, tx);
        UnboundedReceiverStream::new(rx)
    }
}

/// Tracks one level of listener dispatch, released on drop so a panicking
/// listener does not leave the depth raised.
struct DepthGuard<'a, K, V> {
    inner: &'a Rc<RefCell<StoreInner<K, V>>>,
}

impl<'a, K, V> DepthGuard<'a, K, V> {
    fn enter(inner: &'a Rc<RefCell<StoreInner<K, V>>>) -> Self {
        inner.borrow_mut().depth += 1;
        Self { inner }
    }
}

impl<K, V> Drop for DepthGuard<'_, K, V> {
    fn drop(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.depth = inner.depth.saturating_sub(1);
    }
}
