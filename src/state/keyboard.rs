//! Keyboard Module - Function-key handler registry
//!
//! Maps key codes to ordered callback lists. The input reader offers every
//! key it reads to the registry before returning it; handlers observe keys,
//! they never swallow them.
//!
//! # API
//!
//! - `register(key, fn)` - Append a handler for `key` (`Key::ANY` for every key)
//! - `clear(key)` - Remove every handler for `key`
//! - `remove(id)` - Remove one handler
//! - `dispatch(key)` - Run the handlers for `key`
//!
//! # Example
//!
//! ```ignore
//! use gridterm::{Key, FunctionKeyRegistry};
//!
//! let keys = FunctionKeyRegistry::new();
//!
//! // F1 toggles help
//! keys.register(Key::f(1), |_| toggle_help());
//!
//! // Log every key
//! keys.register(Key::ANY, |key| tracing::debug!(%key, "key"));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::HandlerId;
use crate::error::lock;
use crate::types::Key;

// =============================================================================
// TYPES
// =============================================================================

/// Handler for a key. Receives the key that fired it.
pub type KeyCallback = Arc<dyn Fn(Key) + Send + Sync>;

/// Internal handler that may consume a key before it reaches the caller.
pub(crate) type KeyInterceptor = Arc<dyn Fn(Key) -> bool + Send + Sync>;

// =============================================================================
// HANDLER REGISTRY
// =============================================================================

#[derive(Default)]
struct HandlerRegistry {
    key_handlers: HashMap<Key, Vec<(HandlerId, KeyCallback)>>,
    interceptors: Vec<(HandlerId, KeyInterceptor)>,
    next_id: u64,
}

impl HandlerRegistry {
    fn next_id(&mut self) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Key code → ordered callback list.
///
/// Shared between threads; handlers run without the registry lock held, so
/// a handler may register or clear handlers itself.
#[derive(Default)]
pub struct FunctionKeyRegistry {
    inner: Mutex<HandlerRegistry>,
}

impl std::fmt::Debug for FunctionKeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reg = lock(&self.inner);
        f.debug_struct("FunctionKeyRegistry")
            .field("keys", &reg.key_handlers.keys().collect::<Vec<_>>())
            .field("interceptors", &reg.interceptors.len())
            .finish()
    }
}

impl FunctionKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `key`. `Key::ANY` fires on every key.
    ///
    /// The same handler may be registered more than once; it then runs once
    /// per registration.
    pub fn register<F>(&self, key: Key, handler: F) -> HandlerId
    where
        F: Fn(Key) + Send + Sync + 'static,
    {
        let mut reg = lock(&self.inner);
        let id = reg.next_id();
        reg.key_handlers
            .entry(key)
            .or_default()
            .push((id, Arc::new(handler)));
        tracing::debug!(%key, ?id, "registered key handler");
        id
    }

    /// Remove the whole handler list for `key`.
    pub fn clear(&self, key: Key) {
        lock(&self.inner).key_handlers.remove(&key);
    }

    /// Remove one handler. Returns false if it was not registered.
    pub fn remove(&self, id: HandlerId) -> bool {
        let mut reg = lock(&self.inner);
        let mut found = false;
        reg.key_handlers.retain(|_, handlers| {
            let before = handlers.len();
            handlers.retain(|(handler_id, _)| *handler_id != id);
            found |= handlers.len() != before;
            !handlers.is_empty()
        });
        found
    }

    /// True if `key` itself (not just the wildcard) has handlers.
    pub fn is_registered(&self, key: Key) -> bool {
        key != Key::ANY && lock(&self.inner).key_handlers.contains_key(&key)
    }

    pub fn handler_count(&self, key: Key) -> usize {
        lock(&self.inner)
            .key_handlers
            .get(&key)
            .map_or(0, |handlers| handlers.len())
    }

    /// Run the handlers for `key`, then the wildcard handlers, each list in
    /// registration order.
    ///
    /// Returns true if `key` had handlers of its own.
    pub fn dispatch(&self, key: Key) -> bool {
        let (specific, wildcard) = {
            let reg = lock(&self.inner);
            let snapshot = |k: Key| -> Vec<KeyCallback> {
                reg.key_handlers
                    .get(&k)
                    .map(|handlers| handlers.iter().map(|(_, h)| h.clone()).collect())
                    .unwrap_or_default()
            };
            let specific = if key == Key::ANY {
                Vec::new()
            } else {
                snapshot(key)
            };
            (specific, snapshot(Key::ANY))
        };

        for handler in specific.iter().chain(wildcard.iter()) {
            handler(key);
        }
        !specific.is_empty()
    }

    // -------------------------------------------------------------------------
    // Interceptors
    // -------------------------------------------------------------------------

    pub(crate) fn add_interceptor<F>(&self, interceptor: F) -> HandlerId
    where
        F: Fn(Key) -> bool + Send + Sync + 'static,
    {
        let mut reg = lock(&self.inner);
        let id = reg.next_id();
        reg.interceptors.push((id, Arc::new(interceptor)));
        id
    }

    pub(crate) fn remove_interceptor(&self, id: HandlerId) {
        lock(&self.inner)
            .interceptors
            .retain(|(handler_id, _)| *handler_id != id);
    }

    /// Offer `key` to the interceptors. Returns true if one consumed it.
    pub(crate) fn intercept(&self, key: Key) -> bool {
        let interceptors: Vec<KeyInterceptor> = lock(&self.inner)
            .interceptors
            .iter()
            .map(|(_, i)| i.clone())
            .collect();
        interceptors.iter().any(|interceptor| interceptor(key))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (count.clone(), count)
    }

    #[test]
    fn test_specific_handler() {
        let keys = FunctionKeyRegistry::new();
        let (count, count_clone) = counter();

        keys.register(Key::f(1), move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(keys.dispatch(Key::f(1)));
        assert!(!keys.dispatch(Key::f(2)));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wildcard_fires_on_every_key() {
        let keys = FunctionKeyRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        keys.register(Key::ANY, move |key| s.lock().unwrap().push(("any", key)));
        let s = seen.clone();
        keys.register(Key::f(1), move |key| s.lock().unwrap().push(("f1", key)));

        keys.dispatch(Key::from('a'));
        keys.dispatch(Key::f(1));

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                ("any", Key::from('a')),
                ("f1", Key::f(1)),
                ("any", Key::f(1)),
            ]
        );
    }

    #[test]
    fn test_registration_order_and_duplicates() {
        let keys = FunctionKeyRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let o = order.clone();
            keys.register(Key::f(5), move |_| o.lock().unwrap().push(n));
        }
        let o = order.clone();
        let twice = move |_: Key| o.lock().unwrap().push(9);
        keys.register(Key::f(5), twice.clone());
        keys.register(Key::f(5), twice);

        keys.dispatch(Key::f(5));
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 9, 9]);
        assert_eq!(keys.handler_count(Key::f(5)), 5);
    }

    #[test]
    fn test_clear_removes_list() {
        let keys = FunctionKeyRegistry::new();
        let (count, count_clone) = counter();
        keys.register(Key::f(2), move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(keys.is_registered(Key::f(2)));

        keys.clear(Key::f(2));
        assert!(!keys.is_registered(Key::f(2)));
        assert!(!keys.dispatch(Key::f(2)));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_single_handler() {
        let keys = FunctionKeyRegistry::new();
        let (count, count_clone) = counter();
        let id = keys.register(Key::f(3), |_| {});
        keys.register(Key::f(3), move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(keys.remove(id));
        assert!(!keys.remove(id));
        keys.dispatch(Key::f(3));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(keys.handler_count(Key::f(3)), 1);
    }

    #[test]
    fn test_handler_may_register_during_dispatch() {
        let keys = Arc::new(FunctionKeyRegistry::new());
        let inner = keys.clone();
        keys.register(Key::f(4), move |_| {
            inner.register(Key::f(6), |_| {});
        });
        keys.dispatch(Key::f(4));
        assert!(keys.is_registered(Key::f(6)));
    }

    #[test]
    fn test_interceptor_consumes() {
        let keys = FunctionKeyRegistry::new();
        let id = keys.add_interceptor(|key| key == Key::ESC);
        assert!(keys.intercept(Key::ESC));
        assert!(!keys.intercept(Key::from('a')));

        keys.remove_interceptor(id);
        assert!(!keys.intercept(Key::ESC));
    }
}
