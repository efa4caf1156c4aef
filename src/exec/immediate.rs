// src/exec/immediate.rs

//! Synchronous service that runs jobs on the calling thread.

use std::cell::RefCell;
use std::collections::VecDeque;

use super::service::{Job, Service, run_job};

thread_local! {
    /// Jobs submitted while this thread is already inside an immediate job.
    static TRAMPOLINE: RefCell<Option<VecDeque<Job>>> = const { RefCell::new(None) };
}

/// Runs jobs immediately, on the submitting thread.
///
/// Submissions made from inside a running job are queued and run as soon as
/// that job returns, still before the outermost `run` call returns. A chain of
/// N synchronous steps therefore uses constant stack depth.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateService;

impl ImmediateService {
    pub fn new() -> Self {
        Self
    }
}

impl Service for ImmediateService {
    fn run(&self, job: Job) {
        let outermost = TRAMPOLINE.with(|cell| {
            let mut slot = cell.borrow_mut();
            match slot.as_mut() {
                Some(queue) => {
                    queue.push_back(job);
                    None
                }
                None => {
                    *slot = Some(VecDeque::new());
                    Some(job)
                }
            }
        });

        let Some(first) = outermost else {
            return;
        };

        run_job(first);
        while let Some(next) =
            TRAMPOLINE.with(|cell| cell.borrow_mut().as_mut().and_then(VecDeque::pop_front))
        {
            run_job(next);
        }

        TRAMPOLINE.with(|cell| *cell.borrow_mut() = None);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn nested_jobs_run_after_the_current_one() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let service = Arc::new(ImmediateService);

        let outer_log = Arc::clone(&log);
        let inner_service = Arc::clone(&service);
        service.run(Box::new(move || {
            let inner_log = Arc::clone(&outer_log);
            inner_service.run(Box::new(move || inner_log.lock().unwrap().push("inner")));
            outer_log.lock().unwrap().push("outer");
        }));

        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
    }

    #[test]
    fn survives_a_panicking_job() {
        let service = ImmediateService;
        service.run(Box::new(|| panic!("job failure")));

        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        service.run(Box::new(move || *flag.lock().unwrap() = true));
        assert!(*ran.lock().unwrap());
    }
}
