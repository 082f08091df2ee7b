//! Observable profile cache.
//!
//! Profiles are keyed by the author's hex pubkey. The store is a cheap
//! `Rc` handle: clones share the same map. Only the profile loader writes to
//! it, in bulk; readers register callbacks and are notified once per bulk
//! update.
//!
//! A thread-local instance lives for the page session and is reachable
//! through [`profiles`].

use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Decoded profile metadata (`name`, `picture`, `about`, ...).
pub type Profile = Map<String, Value>;

type Listener = Rc<dyn Fn()>;

struct StoreInner {
    profiles: RefCell<HashMap<String, Profile>>,
    listeners: RefCell<Vec<(usize, Listener)>>,
    next_listener: Cell<usize>,
}

#[derive(Clone)]
pub struct ProfileStore {
    inner: Rc<StoreInner>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ProfileStore {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl ProfileStore {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(StoreInner {
                profiles: RefCell::new(HashMap::with_capacity(256)),
                listeners: RefCell::new(Vec::new()),
                next_listener: Cell::new(0),
            }),
        }
    }

    pub fn get(&self, pubkey: &str) -> Option<Profile> {
        self.inner.profiles.borrow().get(pubkey).cloned()
    }

    pub fn contains(&self, pubkey: &str) -> bool {
        self.inner.profiles.borrow().contains_key(pubkey)
    }

    pub fn len(&self) -> usize {
        self.inner.profiles.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to the map, then notify every listener once.
    pub fn update<R>(&self, f: impl FnOnce(&mut HashMap<String, Profile>) -> R) -> R {
        let out = f(&mut self.inner.profiles.borrow_mut());
        self.notify();
        out
    }

    /// Register `listener`; it stays registered until the returned guard is dropped.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> StoreSubscription {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        StoreSubscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn notify(&self) {
        // Listeners may subscribe, unsubscribe or read while being notified.
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

/// Unregisters its listener on drop.
pub struct StoreSubscription {
    store: Weak<StoreInner>,
    id: usize,
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner.listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

thread_local! {
    /// Page-session profile cache.
    static PROFILES: ProfileStore = ProfileStore::new();
}

/// Handle to the thread-local profile cache.
pub fn profiles() -> ProfileStore {
    PROFILES.with(ProfileStore::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(name: &str) -> Profile {
        match json!({ "name": name }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn clones_share_state() {
        let store = ProfileStore::new();
        let other = store.clone();
        store.update(|m| {
            m.insert("a".into(), profile("alice"));
        });
        assert_eq!(other.get("a"), Some(profile("alice")));
        assert!(other.contains("a"));
        assert_eq!(other.len(), 1);
        assert!(store == other);
        assert!(store != ProfileStore::new());
    }

    #[test]
    fn one_notification_per_update() {
        let store = ProfileStore::new();
        let hits = Rc::new(Cell::new(0));
        let _sub = {
            let hits = Rc::clone(&hits);
            store.subscribe(move || hits.set(hits.get() + 1))
        };

        store.update(|m| {
            m.insert("a".into(), profile("alice"));
            m.insert("b".into(), profile("bob"));
        });
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn dropping_the_guard_unsubscribes() {
        let store = ProfileStore::new();
        let hits = Rc::new(Cell::new(0));
        let sub = {
            let hits = Rc::clone(&hits);
            store.subscribe(move || hits.set(hits.get() + 1))
        };
        assert_eq!(store.listener_count(), 1);
        drop(sub);
        assert_eq!(store.listener_count(), 0);
        store.update(|_| ());
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn listeners_can_read_during_notification() {
        let store = ProfileStore::new();
        let seen = Rc::new(RefCell::new(None));
        let _sub = {
            let seen = Rc::clone(&seen);
            let reader = store.clone();
            store.subscribe(move || *seen.borrow_mut() = reader.get("a"))
        };
        store.update(|m| {
            m.insert("a".into(), profile("alice"));
        });
        assert_eq!(*seen.borrow(), Some(profile("alice")));
    }

    #[test]
    fn thread_local_store_is_shared() {
        profiles().update(|m| {
            m.insert("tl".into(), profile("thread"));
        });
        assert!(profiles().contains("tl"));
    }
}
