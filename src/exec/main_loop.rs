// src/exec/main_loop.rs

//! Main-thread-like context: jobs are delivered to one designated loop.
//!
//! `MainService` is the sending half; whichever task owns the [`MainLoop`]
//! and calls [`MainLoop::run`] executes the jobs, one at a time and in order.
//! Typical use is delivering final results onto a single consumer context.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::service::{Job, Service, run_job};

/// Create a linked service / loop pair.
pub fn main_loop() -> (MainService, MainLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainService { tx }, MainLoop { rx })
}

#[derive(Debug, Clone)]
pub struct MainService {
    tx: mpsc::UnboundedSender<Job>,
}

impl Service for MainService {
    fn run(&self, job: Job) {
        if self.tx.send(job).is_err() {
            // The job (and any continuation it holds) is dropped here.
            warn!("main loop is gone; dropping job");
        }
    }
}

#[derive(Debug)]
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl MainLoop {
    /// Run jobs until every `MainService` handle has been dropped.
    pub async fn run(mut self) {
        info!("main loop started");
        while let Some(job) = self.rx.recv().await {
            run_job(job);
        }
        info!("main loop finished (all senders dropped)");
    }

    /// Run the jobs that are already queued, without waiting for more.
    ///
    /// Returns how many jobs ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            run_job(job);
            ran += 1;
        }
        if ran > 0 {
            debug!(ran, "main loop ran queued jobs");
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn jobs_wait_for_the_loop() {
        let (service, mut main) = main_loop();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..2 {
            let l = Arc::clone(&log);
            service.run(Box::new(move || l.lock().unwrap().push(i)));
        }
        assert!(log.lock().unwrap().is_empty());

        assert_eq!(main.run_pending(), 2);
        assert_eq!(*log.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn run_exits_when_senders_drop() {
        let (service, main) = main_loop();
        let log = Arc::new(Mutex::new(0));
        let l = Arc::clone(&log);
        service.run(Box::new(move || *l.lock().unwrap() += 1));
        drop(service);

        main.run().await;
        assert_eq!(*log.lock().unwrap(), 1);
    }
}
