// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{NavigationState, NavigatorTurn};
use crate::Route;

/// Receives notifications from a [Navigator](crate::Navigator).
///
/// Notifications are delivered synchronously on the thread driving the navigator,
/// in the order: route change, turn change, state change. All methods default to
/// doing nothing.
pub trait NavigatorObserver: Send + Sync {
    /// Called when a route is installed ([Some]) or removed ([None]).
    fn on_route(&self, _route: Option<&Route>) {}

    /// Called when the upcoming turns change.
    fn on_turn(
        &self,
        _first: &NavigatorTurn,
        _second: Option<&NavigatorTurn>,
        _continuation: Option<&NavigatorTurn>,
    ) {
    }

    /// Called when the navigation state changes.
    fn on_state(&self, _state: NavigationState) {}
}

/// Identifies a registration in an [ObserverRegistry].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

#[derive(Default)]
struct Registrations {
    next_id: u64,
    entries: Vec<(ObserverHandle, Arc<dyn NavigatorObserver>)>,
}

/// A shared set of [NavigatorObservers](NavigatorObserver).
///
/// Clones refer to the same set, so observers may keep a clone to add or remove
/// registrations, even while being notified: every notification is dispatched over
/// a snapshot of the registrations taken before the first observer is called.
#[derive(Clone, Default)]
pub struct ObserverRegistry(Arc<Mutex<Registrations>>);

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registrations> {
        // A panicking observer can't leave the registrations in an inconsistent state.
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add(&self, observer: Arc<dyn NavigatorObserver>) -> ObserverHandle {
        let mut r = self.lock();
        r.next_id += 1;
        let handle = ObserverHandle(r.next_id);
        r.entries.push((handle, observer));
        return handle;
    }

    /// Removes a registration, returning false if it didn't exist.
    pub fn remove(&self, handle: ObserverHandle) -> bool {
        let mut r = self.lock();
        let before = r.entries.len();
        r.entries.retain(|(h, _)| *h != handle);
        r.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn NavigatorObserver>> {
        self.lock()
            .entries
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect()
    }

    pub(crate) fn notify_route(&self, route: Option<&Route>) {
        for o in self.snapshot() {
            o.on_route(route);
        }
    }

    pub(crate) fn notify_turn(
        &self,
        first: &NavigatorTurn,
        second: Option<&NavigatorTurn>,
        continuation: Option<&NavigatorTurn>,
    ) {
        for o in self.snapshot() {
            o.on_turn(first, second, continuation);
        }
    }

    pub(crate) fn notify_state(&self, state: NavigationState) {
        for o in self.snapshot() {
            o.on_state(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter(Mutex<Vec<NavigationState>>);

    impl NavigatorObserver for Counter {
        fn on_state(&self, state: NavigationState) {
            self.0.lock().unwrap().push(state);
        }
    }

    /// Removes itself from the registry on the first notification.
    struct OneShot {
        registry: ObserverRegistry,
        handle: Mutex<Option<ObserverHandle>>,
        calls: Mutex<usize>,
    }

    impl NavigatorObserver for OneShot {
        fn on_state(&self, _state: NavigationState) {
            *self.calls.lock().unwrap() += 1;
            if let Some(h) = self.handle.lock().unwrap().take() {
                self.registry.remove(h);
            }
        }
    }

    #[test]
    fn add_remove() {
        let r = ObserverRegistry::new();
        let c = Arc::new(Counter::default());
        let h = r.add(c.clone());
        assert_eq!(r.len(), 1);

        r.notify_state(NavigationState::Turn);
        assert!(r.remove(h));
        assert!(!r.remove(h));
        r.notify_state(NavigationState::Arrival);

        assert_eq!(*c.0.lock().unwrap(), vec![NavigationState::Turn]);
        assert!(r.is_empty());
    }

    #[test]
    fn removal_during_dispatch() {
        let r = ObserverRegistry::new();
        let one_shot = Arc::new(OneShot {
            registry: r.clone(),
            handle: Mutex::new(None),
            calls: Mutex::new(0),
        });
        let h = r.add(one_shot.clone());
        *one_shot.handle.lock().unwrap() = Some(h);
        let c = Arc::new(Counter::default());
        r.add(c.clone());

        r.notify_state(NavigationState::Turn);
        r.notify_state(NavigationState::OffRoute);

        assert_eq!(*one_shot.calls.lock().unwrap(), 1);
        assert_eq!(c.0.lock().unwrap().len(), 2);
        assert_eq!(r.len(), 1);
    }
}
