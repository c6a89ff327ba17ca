//! The host event loop: a queue of deferred jobs run one at a time.
//!
//! Asynchronous host operations (timers, `setImmediate`) complete by
//! queuing a job that invokes their callback later, from the loop thread,
//! after the current job has returned. Invoking such a callback resumes
//! whatever coroutine was suspended on it.
//!
//! ## Channel Architecture
//!
//! - Jobs: `tokio::sync::mpsc::UnboundedSender`, so any thread (the loop,
//!   a fiber, a timer thread) can queue work without blocking.
//! - The loop drains the receiver with `blocking_recv` until no jobs are
//!   queued and no timers are outstanding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, trace};

use crate::error::Error;
use crate::Result;

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() -> Result<()> + Send>;

/// Owns the job queue. Create one per program run.
pub struct EventLoop {
    handle: LoopHandle,
    jobs: UnboundedReceiver<Job>,
}

/// Queues jobs onto an [`EventLoop`]. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct LoopHandle {
    sender: UnboundedSender<Job>,
    /// Jobs queued or scheduled but not yet run.
    pending: Arc<AtomicUsize>,
}

impl EventLoop {
    pub fn new() -> Self {
        let (sender, jobs) = mpsc::unbounded_channel();
        Self {
            handle: LoopHandle {
                sender,
                pending: Arc::new(AtomicUsize::new(0)),
            },
            jobs,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Run jobs until none remain.
    ///
    /// The first job to fail stops the loop and its error is returned as the
    /// program's uncaught error. Jobs still queued at that point are dropped.
    pub fn run(&mut self) -> Result<()> {
        let mut ran = 0usize;
        while self.handle.pending.load(Ordering::SeqCst) > 0 {
            // Our own handle keeps the channel open, so this only returns None
            // if the sender was somehow dropped.
            let Some(job) = self.jobs.blocking_recv() else {
                return Err(Error::runtime("event loop channel closed"));
            };
            self.handle.pending.fetch_sub(1, Ordering::SeqCst);
            ran += 1;
            trace!(job = ran, "running deferred job");
            if let Err(err) = job() {
                error!(%err, "uncaught error in deferred job");
                return Err(err);
            }
        }
        debug!(jobs = ran, "event loop drained");
        Ok(())
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopHandle {
    /// Queue `job` to run after everything already queued.
    pub fn defer<F>(&self, job: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.enqueue(Box::new(job));
    }

    /// Queue `job` once `delay` has elapsed.
    ///
    /// The loop counts the job as pending from now, so `run` keeps waiting
    /// for it even when the queue is momentarily empty.
    pub fn defer_after<F>(&self, delay: Duration, job: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        if delay.is_zero() {
            return self.defer(job);
        }
        self.pending.fetch_add(1, Ordering::SeqCst);
        let handle = self.clone();
        let spawned = thread::Builder::new()
            .name("strand-timer".to_string())
            .spawn(move || {
                thread::sleep(delay);
                handle.enqueue(Box::new(job));
            });
        if let Err(e) = spawned {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            error!(error = %e, "failed to start timer thread; job dropped");
        }
    }

    /// Jobs queued or waiting on a timer.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    fn enqueue(&self, job: Job) {
        if self.sender.send(job).is_err() {
            // The loop is gone; nobody will ever run this.
            self.pending.fetch_sub(1, Ordering::SeqCst);
            debug!("dropping job queued after the event loop shut down");
        }
    }
}
