use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stageflow::exec::{ImmediateService, Job, Performer, Service};

/// A service that counts how many jobs it was handed, then delegates.
pub struct CountingService {
    inner: Performer,
    count: AtomicUsize,
}

impl CountingService {
    /// Count and run immediately on the calling thread.
    pub fn immediate() -> Arc<Self> {
        Self::wrapping(Arc::new(ImmediateService))
    }

    pub fn wrapping(inner: Performer) -> Arc<Self> {
        Arc::new(Self {
            inner,
            count: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Service for CountingService {
    fn run(&self, job: Job) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.inner.run(job);
    }
}

/// A service that only runs jobs when the test tells it to.
///
/// Lets tests freeze a workflow between steps and inspect state.
#[derive(Default)]
pub struct ManualService {
    jobs: Mutex<VecDeque<Job>>,
}

impl ManualService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queued(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    /// Run the oldest queued job. Returns false if there was none.
    pub fn run_next(&self) -> bool {
        let job = self.jobs.lock().unwrap().pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run the job at `index` in the queue (to finish items out of order).
    pub fn run_at(&self, index: usize) -> bool {
        let job = self.jobs.lock().unwrap().remove(index);
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run jobs until the queue stays empty. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Service for ManualService {
    fn run(&self, job: Job) {
        self.jobs.lock().unwrap().push_back(job);
    }
}
