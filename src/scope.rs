//! Background tasks bound to the lifetime of a screen.
//!
//! Every task of a screen is launched through its [`TaskScope`]. Failures
//! (errors and panics) are turned into an [`ErrorMessage`] and handed to the
//! scope's failure handler instead of tearing anything down. Cancelling the
//! scope stops new launches; running tasks check [`TaskScope::is_cancelled`]
//! before writing their results.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use anyhow::Result;

use crate::types::ErrorMessage;

type FailureHandler = Box<dyn Fn(ErrorMessage) + Send + Sync>;

struct ScopeInner {
    cancelled: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
    on_failure: FailureHandler,
}

#[derive(Clone)]
pub struct TaskScope {
    inner: Arc<ScopeInner>,
}

impl TaskScope {
    pub fn new(on_failure: impl Fn(ErrorMessage) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                cancelled: AtomicBool::new(false),
                handles: Mutex::new(Vec::new()),
                on_failure: Box::new(on_failure),
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            log::debug!("Task scope cancelled");
        }
    }

    /// Launch a one-shot task. Returns `false` when the scope is cancelled.
    pub fn launch<F>(&self, name: &str, task: F) -> bool
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let scope = self.clone();
        let task_name = name.to_string();
        match self.spawn_thread(name, move || scope.run_guarded(&task_name, task)) {
            Some(handle) => {
                let mut handles = self.handles();
                handles.retain(|h| !h.is_finished());
                handles.push(handle);
                true
            }
            None => false,
        }
    }

    /// Launch a long-lived loop. The loop itself must watch for cancellation.
    pub fn launch_loop<F>(&self, name: &str, body: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn_thread(name, body).is_some()
    }

    /// Run `task`, reporting an error or panic through the failure handler.
    pub fn run_guarded<F>(&self, name: &str, task: F)
    where
        F: FnOnce() -> Result<()>,
    {
        let failure = match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => ErrorMessage::from_error(&e),
            Err(payload) => ErrorMessage {
                message: format!("Task {name} panicked"),
                detail: Some(panic_message(payload.as_ref())),
            },
        };
        log::error!("{name} failed: {failure:?}");
        if !self.is_cancelled() {
            self.report(failure);
        }
    }

    pub fn report(&self, failure: ErrorMessage) {
        (self.inner.on_failure)(failure);
    }

    /// Wait for every one-shot task, including ones launched while waiting.
    pub fn join_all(&self) {
        loop {
            let pending: Vec<JoinHandle<()>> = self.handles().drain(..).collect();
            if pending.is_empty() {
                return;
            }
            for handle in pending {
                let _ = handle.join();
            }
        }
    }

    fn spawn_thread<F>(&self, name: &str, body: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_cancelled() {
            log::debug!("Not launching {name}: scope cancelled");
            return None;
        }
        match thread::Builder::new().name(name.to_string()).spawn(body) {
            Ok(handle) => Some(handle),
            Err(e) => {
                self.report(ErrorMessage {
                    message: format!("Cannot start {name}"),
                    detail: Some(e.to_string()),
                });
                None
            }
        }
    }

    fn handles(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn collecting_scope() -> (TaskScope, Arc<Mutex<Vec<ErrorMessage>>>) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let scope = TaskScope::new(move |e| sink.lock().unwrap().push(e));
        (scope, errors)
    }

    #[test]
    fn task_errors_reach_failure_handler() {
        let (scope, errors) = collecting_scope();
        assert!(scope.launch("failing", || anyhow::bail!("boom")));
        scope.join_all();
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "boom");
    }

    #[test]
    fn panics_are_captured() {
        let (scope, errors) = collecting_scope();
        scope.launch("panicking", || panic!("kaboom"));
        scope.join_all();
        let errors = errors.lock().unwrap();
        assert_eq!(errors[0].message, "Task panicking panicked");
        assert_eq!(errors[0].detail.as_deref(), Some("kaboom"));
    }

    #[test]
    fn cancelled_scope_refuses_new_tasks() {
        let (scope, _errors) = collecting_scope();
        scope.cancel();
        let (tx, rx) = mpsc::channel::<()>();
        assert!(!scope.launch("late", move || {
            let _ = tx.send(());
            Ok(())
        }));
        assert!(!scope.launch_loop("late-loop", || {}));
        assert!(rx.recv().is_err());
    }

    #[test]
    fn failures_after_cancel_are_not_reported() {
        let (scope, errors) = collecting_scope();
        let (go_tx, go_rx) = mpsc::channel::<()>();
        scope.launch("slow", move || {
            let _ = go_rx.recv();
            anyhow::bail!("too late")
        });
        scope.cancel();
        go_tx.send(()).unwrap();
        scope.join_all();
        assert!(errors.lock().unwrap().is_empty());
    }
}
