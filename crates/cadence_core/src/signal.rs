//! Reactive value container
//!
//! A [`Signal`] holds a value and notifies subscribers whenever it changes.
//! Clones share the same value, so an animation can publish through one
//! clone while the UI reads or subscribes through another.

use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

new_key_type! {
    /// Handle to a signal subscription
    pub struct SubscriptionId;
}

type Subscriber<T> = Rc<dyn Fn(&T)>;

struct SignalInner<T> {
    value: T,
    version: u64,
    subscribers: SlotMap<SubscriptionId, Subscriber<T>>,
}

/// A shared, observable value
pub struct Signal<T> {
    inner: Rc<RefCell<SignalInner<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                value,
                version: 0,
                subscribers: SlotMap::with_key(),
            })),
        }
    }

    /// Get a copy of the current value
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Read the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Number of changes published so far
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the value, notifying subscribers if it changed
    ///
    /// Returns `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        let (snapshot, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.value = value;
            inner.version += 1;
            let subscribers: Vec<Subscriber<T>> = inner.subscribers.values().cloned().collect();
            (inner.value.clone(), subscribers)
        };

        // Borrow released: subscribers may read, write, or unsubscribe
        for subscriber in subscribers {
            subscriber(&snapshot);
        }
        true
    }

    /// Modify the value in place, notifying subscribers if it changed
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut value = self.get();
        f(&mut value);
        self.set(value)
    }

    /// Run `f` with every new value
    pub fn subscribe<F>(&self, f: F) -> SubscriptionId
    where
        F: Fn(&T) + 'static,
    {
        self.inner.borrow_mut().subscribers.insert(Rc::new(f))
    }

    /// Remove a subscription
    ///
    /// Returns `false` if it was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.borrow_mut().subscribers.remove(id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Signal")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}
