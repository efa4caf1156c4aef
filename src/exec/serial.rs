// src/exec/serial.rs

//! Serialized execution context.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tracing::trace;

use super::service::{Job, Service, run_job};

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    draining: bool,
    suspended: bool,
}

/// Runs submitted jobs strictly one at a time, in submission order.
///
/// There is no dedicated thread: whichever caller finds the queue idle drains
/// it, and everyone else just enqueues. While suspended, jobs accumulate and
/// the drain stops after the job in flight; `resume` drains on the resuming
/// thread.
pub struct SerialQueue {
    label: String,
    state: Mutex<QueueState>,
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SerialQueue")
            .field("label", &self.label)
            .field("queued", &state.jobs.len())
            .field("draining", &state.draining)
            .field("suspended", &state.suspended)
            .finish()
    }
}

impl SerialQueue {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn suspend(&self) {
        self.lock().suspended = true;
        trace!(queue = %self.label, "serial queue suspended");
    }

    pub fn resume(&self) {
        self.lock().suspended = false;
        trace!(queue = %self.label, "serial queue resumed");
        self.drain();
    }

    pub fn is_suspended(&self) -> bool {
        self.lock().suspended
    }

    /// Number of jobs waiting to run.
    pub fn queued(&self) -> usize {
        self.lock().jobs.len()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn drain(&self) {
        {
            let mut state = self.lock();
            if state.draining || state.suspended {
                return;
            }
            state.draining = true;
        }

        loop {
            let job = {
                let mut state = self.lock();
                let next = if state.suspended {
                    None
                } else {
                    state.jobs.pop_front()
                };
                match next {
                    Some(job) => job,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };
            run_job(job);
        }
    }
}

impl Service for SerialQueue {
    fn run(&self, job: Job) {
        self.lock().jobs.push_back(job);
        self.drain();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn reentrant_submissions_run_in_order() {
        let queue = Arc::new(SerialQueue::new("test"));
        let log = Arc::new(Mutex::new(Vec::new()));

        let (q, l) = (Arc::clone(&queue), Arc::clone(&log));
        queue.run(Box::new(move || {
            let inner = Arc::clone(&l);
            q.run(Box::new(move || inner.lock().unwrap().push(2)));
            l.lock().unwrap().push(1);
        }));

        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn suspended_queue_holds_jobs_until_resume() {
        let queue = SerialQueue::new("held");
        let log = Arc::new(Mutex::new(Vec::new()));

        queue.suspend();
        for i in 0..3 {
            let l = Arc::clone(&log);
            queue.run(Box::new(move || l.lock().unwrap().push(i)));
        }
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(queue.queued(), 3);

        queue.resume();
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(queue.queued(), 0);
    }
}
