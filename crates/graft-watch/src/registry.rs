//! Watcher registry
//!
//! One instance per page context. Oneshot watchers are keyed by id and
//! replaced on re-registration; background watchers just accumulate until
//! `disconnect_all`. Every operation finishes updating the lists before it
//! calls into any watcher, so a watcher reacting to its own disconnect never
//! sees a half-applied registration.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ChangeWatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherKind {
    /// Disconnects itself once satisfied; unique per id
    Oneshot,
    /// Lives until the context is torn down
    Background,
}

#[derive(Default)]
pub struct WatcherRegistry {
    oneshot: RefCell<Vec<(String, Rc<dyn ChangeWatcher>)>>,
    background: RefCell<Vec<Rc<dyn ChangeWatcher>>>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `watcher` under `id`, disconnecting whatever held that id
    pub fn upsert_oneshot(&self, id: &str, watcher: Rc<dyn ChangeWatcher>) {
        let replaced = {
            let mut oneshot = self.oneshot.borrow_mut();
            let index = oneshot.iter().position(|(key, _)| key == id);
            let replaced = index.map(|index| oneshot.remove(index).1);
            oneshot.push((id.to_string(), watcher));
            replaced
        };
        if let Some(old) = replaced {
            tracing::debug!("Replacing oneshot watcher {}", id);
            old.disconnect();
        } else {
            tracing::debug!("Registered oneshot watcher {}", id);
        }
    }

    pub fn add_background(&self, watcher: Rc<dyn ChangeWatcher>) {
        self.background.borrow_mut().push(watcher);
        tracing::debug!("Registered background watcher ({} total)", self.background_count());
    }

    /// Disconnect and forget the oneshot watcher under `id`
    pub fn remove_oneshot(&self, id: &str) -> bool {
        self.take_oneshot(id, |_| true)
    }

    /// Like [`remove_oneshot`](Self::remove_oneshot), but only if `id` still
    /// maps to this very watcher. A finished waiter must not tear down a
    /// newer registration that reused its id.
    pub fn remove_oneshot_if(&self, id: &str, watcher: &Rc<dyn ChangeWatcher>) -> bool {
        self.take_oneshot(id, |registered| Rc::ptr_eq(registered, watcher))
    }

    fn take_oneshot(&self, id: &str, accept: impl Fn(&Rc<dyn ChangeWatcher>) -> bool) -> bool {
        let removed = {
            let mut oneshot = self.oneshot.borrow_mut();
            let index = oneshot
                .iter()
                .position(|(key, registered)| key == id && accept(registered));
            index.map(|index| oneshot.remove(index).1)
        };
        match removed {
            Some(watcher) => {
                watcher.disconnect();
                tracing::debug!("Removed oneshot watcher {}", id);
                true
            }
            None => false,
        }
    }

    /// Disconnect every watcher exactly once and empty the registry
    pub fn disconnect_all(&self) {
        let oneshot = std::mem::take(&mut *self.oneshot.borrow_mut());
        let background = std::mem::take(&mut *self.background.borrow_mut());
        if oneshot.is_empty() && background.is_empty() {
            return;
        }
        tracing::debug!(
            "Disconnecting {} oneshot and {} background watchers",
            oneshot.len(),
            background.len()
        );
        for (_, watcher) in oneshot {
            watcher.disconnect();
        }
        for watcher in background {
            watcher.disconnect();
        }
    }

    pub fn contains_oneshot(&self, id: &str) -> bool {
        self.oneshot.borrow().iter().any(|(key, _)| key == id)
    }

    pub fn oneshot_count(&self) -> usize {
        self.oneshot.borrow().len()
    }

    pub fn background_count(&self) -> usize {
        self.background.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.oneshot_count() == 0 && self.background_count() == 0
    }

    /// Kind of the registration holding exactly this watcher
    pub fn kind_of(&self, watcher: &Rc<dyn ChangeWatcher>) -> Option<WatcherKind> {
        if self.oneshot.borrow().iter().any(|(_, w)| Rc::ptr_eq(w, watcher)) {
            Some(WatcherKind::Oneshot)
        } else if self.background.borrow().iter().any(|w| Rc::ptr_eq(w, watcher)) {
            Some(WatcherKind::Background)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for WatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self.oneshot.borrow().iter().map(|(id, _)| id.clone()).collect();
        f.debug_struct("WatcherRegistry")
            .field("oneshot", &ids)
            .field("background", &self.background_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingWatcher {
        observing: Cell<bool>,
        disconnects: Cell<u32>,
    }

    impl ChangeWatcher for CountingWatcher {
        fn observe(&self) {
            self.observing.set(true);
        }

        fn disconnect(&self) {
            self.observing.set(false);
            self.disconnects.set(self.disconnects.get() + 1);
        }

        fn is_observing(&self) -> bool {
            self.observing.get()
        }
    }

    fn counting() -> (Rc<CountingWatcher>, Rc<dyn ChangeWatcher>) {
        let watcher = Rc::new(CountingWatcher::default());
        let erased: Rc<dyn ChangeWatcher> = watcher.clone();
        (watcher, erased)
    }

    #[test]
    fn test_upsert_disconnects_previous_once() {
        let registry = WatcherRegistry::new();
        let (w1, e1) = counting();
        let (w2, e2) = counting();

        registry.upsert_oneshot("menu", e1);
        registry.upsert_oneshot("menu", e2.clone());

        assert_eq!(w1.disconnects.get(), 1);
        assert_eq!(w2.disconnects.get(), 0);
        assert_eq!(registry.oneshot_count(), 1);
        assert_eq!(registry.kind_of(&e2), Some(WatcherKind::Oneshot));
    }

    #[test]
    fn test_background_is_not_deduplicated() {
        let registry = WatcherRegistry::new();
        let (_, erased) = counting();
        registry.add_background(erased.clone());
        registry.add_background(erased.clone());

        assert_eq!(registry.background_count(), 2);
        assert_eq!(registry.kind_of(&erased), Some(WatcherKind::Background));
    }

    #[test]
    fn test_disconnect_all_exactly_once_and_idempotent() {
        let registry = WatcherRegistry::new();
        let (a, ea) = counting();
        let (b, eb) = counting();
        let (c, ec) = counting();
        registry.upsert_oneshot("a", ea);
        registry.upsert_oneshot("b", eb);
        registry.add_background(ec);

        registry.disconnect_all();
        registry.disconnect_all();

        for watcher in [&a, &b, &c] {
            assert_eq!(watcher.disconnects.get(), 1);
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_oneshot_if_respects_identity() {
        let registry = WatcherRegistry::new();
        let (old, e_old) = counting();
        let (new, e_new) = counting();
        registry.upsert_oneshot("waiter", e_old.clone());
        registry.upsert_oneshot("waiter", e_new);

        // The stale owner cannot remove the newer registration
        assert!(!registry.remove_oneshot_if("waiter", &e_old));
        assert!(registry.contains_oneshot("waiter"));
        assert_eq!(new.disconnects.get(), 0);

        assert!(registry.remove_oneshot("waiter"));
        assert_eq!(new.disconnects.get(), 1);
        assert_eq!(old.disconnects.get(), 1);
        assert!(!registry.remove_oneshot("waiter"));
    }

    #[test]
    fn test_reentrant_disconnect_sees_consistent_registry() {
        struct Reentrant {
            registry: Rc<WatcherRegistry>,
            seen: Cell<Option<usize>>,
        }
        impl ChangeWatcher for Reentrant {
            fn observe(&self) {}
            fn disconnect(&self) {
                self.seen.set(Some(self.registry.oneshot_count()));
            }
            fn is_observing(&self) -> bool {
                false
            }
        }

        let registry = Rc::new(WatcherRegistry::new());
        let first = Rc::new(Reentrant { registry: Rc::clone(&registry), seen: Cell::new(None) });
        registry.upsert_oneshot("x", first.clone());
        let (_, replacement) = counting();
        registry.upsert_oneshot("x", replacement);

        // Replacement was already registered when the old watcher was told to stop
        assert_eq!(first.seen.get(), Some(1));
        registry.disconnect_all();
    }
}
