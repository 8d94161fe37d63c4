//! Mutex-guarded value that pushes every change to its subscribers.

use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};

struct Inner<T> {
    value: T,
    subscribers: Vec<mpsc::Sender<T>>,
}

/// Single source of truth for a value read from several threads.
///
/// Readers take snapshots with [`Observable::get`]; writers go through
/// [`Observable::set`] or [`Observable::update`], which notify subscribers.
pub struct Observable<T> {
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> Inner<T> {
    fn notify(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.value.clone();
        self.subscribers
            .retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

impl<T: Clone> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                value,
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Read without cloning the whole value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock().value)
    }

    pub fn set(&self, value: T) {
        self.update(|v| *v = value);
    }

    /// Mutate in place and notify subscribers with the new value.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut inner = self.lock();
        let res = f(&mut inner.value);
        inner.notify();
        res
    }

    /// Mutate in place under the lock; subscribers are notified only when
    /// `f` returns `Ok(true)`.
    pub fn try_update<E>(&self, f: impl FnOnce(&mut T) -> Result<bool, E>) -> Result<bool, E> {
        let mut inner = self.lock();
        let changed = f(&mut inner.value)?;
        if changed {
            inner.notify();
        }
        Ok(changed)
    }

    /// Receive every value written from now on. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> mpsc::Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.lock().subscribers.push(tx);
        rx
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn subscribers_see_each_update() {
        let obs = Observable::new(0);
        let rx = obs.subscribe();
        obs.set(1);
        obs.update(|v| *v += 1);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(obs.get(), 2);
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let obs = Observable::new(String::new());
        drop(obs.subscribe());
        let rx = obs.subscribe();
        obs.set("a".into());
        assert_eq!(obs.lock().subscribers.len(), 1);
        assert_eq!(rx.recv().unwrap(), "a");
    }

    #[derive(Debug)]
    struct Counted(Arc<AtomicUsize>);

    impl Clone for Counted {
        fn clone(&self) -> Self {
            self.0.fetch_add(1, Ordering::SeqCst);
            Self(self.0.clone())
        }
    }

    #[test]
    fn updates_without_subscribers_do_not_copy_the_value() {
        let clones = Arc::new(AtomicUsize::new(0));
        let obs = Observable::new(Counted(clones.clone()));
        obs.update(|_| ());
        obs.with(|_| ());
        assert_eq!(clones.load(Ordering::SeqCst), 0);

        let rx = obs.subscribe();
        obs.update(|_| ());
        assert!(rx.try_recv().is_ok());
        assert!(clones.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn try_update_notifies_only_on_change() {
        let obs = Observable::new(1);
        let rx = obs.subscribe();
        assert_eq!(obs.try_update(|_| Ok::<_, ()>(false)), Ok(false));
        assert_eq!(obs.try_update(|_| Err::<bool, _>("nope")), Err("nope"));
        assert!(rx.try_recv().is_err());
        assert_eq!(
            obs.try_update(|v| {
                *v = 5;
                Ok::<_, ()>(true)
            }),
            Ok(true)
        );
        assert_eq!(rx.try_recv().unwrap(), 5);
    }

    #[test]
    fn update_returns_closure_result() {
        let obs = Observable::new(vec![1, 2, 3]);
        let len = obs.update(|v| {
            v.push(4);
            v.len()
        });
        assert_eq!(len, 4);
        assert_eq!(obs.with(|v| v[3]), 4);
    }
}
