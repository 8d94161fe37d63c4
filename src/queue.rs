//! Unbounded FIFO of deferred jobs drained by a single worker thread.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::Result;

use crate::scope::TaskScope;

type Job = Box<dyn FnOnce() -> Result<()> + Send>;

/// How often an idle worker looks at the cancellation flag.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Runs submitted jobs one at a time, in submission order.
///
/// The worker lives as long as the owning scope. Once the scope is cancelled
/// the worker exits and jobs that have not started are dropped unrun.
pub struct SequentialQueue {
    tx: mpsc::Sender<Job>,
    scope: TaskScope,
}

impl SequentialQueue {
    pub fn new(scope: TaskScope, name: &str) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let worker_scope = scope.clone();
        let worker_name = name.to_string();
        if !scope.launch_loop(name, move || run_worker(&worker_name, rx, worker_scope)) {
            log::warn!("{name} worker not started");
        }
        Self { tx, scope }
    }

    /// Enqueue `job`. Never waits for running jobs; `false` once shut down.
    pub fn submit<F>(&self, job: F) -> bool
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        if self.scope.is_cancelled() {
            return false;
        }
        self.tx.send(Box::new(job)).is_ok()
    }
}

fn run_worker(name: &str, rx: mpsc::Receiver<Job>, scope: TaskScope) {
    log::debug!("{name} worker started");
    loop {
        match rx.recv_timeout(CANCEL_POLL) {
            Ok(job) => {
                if scope.is_cancelled() {
                    break;
                }
                scope.run_guarded(name, job);
            }
            Err(RecvTimeoutError::Timeout) => {
                if scope.is_cancelled() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    let abandoned = rx.try_iter().count();
    log::debug!("{name} worker stopped, {abandoned} queued job(s) abandoned");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorMessage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    const WAIT: Duration = Duration::from_secs(5);

    fn queue() -> (SequentialQueue, TaskScope, Arc<Mutex<Vec<ErrorMessage>>>) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let scope = TaskScope::new(move |e| sink.lock().unwrap().push(e));
        (SequentialQueue::new(scope.clone(), "test-queue"), scope, errors)
    }

    #[test]
    fn jobs_run_in_order_one_at_a_time() {
        let (queue, _scope, _errors) = queue();
        let order = Arc::new(Mutex::new(Vec::new()));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        for i in 0..5 {
            let order = order.clone();
            let in_flight = in_flight.clone();
            let max_in_flight = max_in_flight.clone();
            assert!(queue.submit(move || {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                order.lock().unwrap().push(i);
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }));
        }
        let (done_tx, done_rx) = mpsc::channel();
        queue.submit(move || {
            let _ = done_tx.send(());
            Ok(())
        });
        done_rx.recv_timeout(WAIT).unwrap();

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_job_does_not_stop_the_queue() {
        let (queue, _scope, errors) = queue();
        queue.submit(|| anyhow::bail!("lookup failed"));
        queue.submit(|| panic!("worse"));
        let (done_tx, done_rx) = mpsc::channel();
        queue.submit(move || {
            let _ = done_tx.send(());
            Ok(())
        });
        done_rx.recv_timeout(WAIT).unwrap();

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "lookup failed");
    }

    #[test]
    fn submit_does_not_wait_for_running_job() {
        let (queue, scope, _errors) = queue();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        queue.submit(move || {
            let _ = gate_rx.recv();
            Ok(())
        });
        // accepted while the first job is still blocked
        assert!(queue.submit(|| Ok(())));
        gate_tx.send(()).unwrap();
        scope.cancel();
    }

    #[test]
    fn cancel_abandons_pending_jobs() {
        let (queue, scope, _errors) = queue();
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (ran_tx, ran_rx) = mpsc::channel::<()>();

        queue.submit(move || {
            let _ = started_tx.send(());
            let _ = gate_rx.recv();
            Ok(())
        });
        queue.submit(move || {
            let _ = ran_tx.send(());
            Ok(())
        });
        started_rx.recv_timeout(WAIT).unwrap();

        scope.cancel();
        gate_tx.send(()).unwrap();

        assert!(ran_rx.recv_timeout(Duration::from_millis(300)).is_err());
        assert!(!queue.submit(|| Ok(())));
    }
}
