//! Stackful coroutines.
//!
//! Each fiber runs on its own OS thread, but control is handed back and
//! forth over channels so that whoever starts or resumes a fiber blocks
//! until the fiber suspends again or finishes. Only one side of a hand-off
//! makes progress at a time, which gives the cooperative scheduling the
//! rest of the runtime assumes.
//!
//! ## Channel Architecture
//!
//! - Wake-ups: `std::sync::mpsc`, owned by the fiber. Each carries the value
//!   or error to resume with, plus a fresh sender for the hand-back.
//! - Hand-backs: one `std::sync::mpsc` channel per run/resume. The fiber
//!   reports `Suspended` or `Finished` on it and the runner unblocks.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, ThreadId};

use tracing::{debug, trace};

use crate::error::Error;
use crate::value::Value;
use crate::{lock, Result};

static NEXT_FIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Why control came back to the runner.
enum Handoff {
    Suspended,
    Finished(Result<()>),
}

/// A resume request delivered to a suspended fiber.
struct Wake {
    outcome: Result<Value>,
    runner: Sender<Handoff>,
}

/// Handle to a coroutine. Cheap to clone.
#[derive(Clone)]
pub struct Fiber {
    inner: Arc<Inner>,
}

struct Inner {
    id: u64,
    thread: OnceLock<ThreadId>,
    wake_tx: Sender<Wake>,
    wake_rx: Mutex<Receiver<Wake>>,
    /// Hand-back channel of whoever is currently blocked running us.
    runner: Mutex<Option<Sender<Handoff>>>,
    finished: AtomicBool,
    suspensions: AtomicUsize,
}

impl Fiber {
    /// Start a fiber running `body` and block until it first suspends or
    /// finishes. Returns the body's error if it finished with one before
    /// suspending.
    pub fn run<F>(name: &str, body: F) -> Result<()>
    where
        F: FnOnce(Fiber) -> Result<()> + Send + 'static,
    {
        let id = NEXT_FIBER_ID.fetch_add(1, Ordering::Relaxed);
        let (wake_tx, wake_rx) = mpsc::channel();
        let (runner_tx, runner_rx) = mpsc::channel();
        let fiber = Fiber {
            inner: Arc::new(Inner {
                id,
                thread: OnceLock::new(),
                wake_tx,
                wake_rx: Mutex::new(wake_rx),
                runner: Mutex::new(Some(runner_tx)),
                finished: AtomicBool::new(false),
                suspensions: AtomicUsize::new(0),
            }),
        };

        debug!(fiber = id, name, "starting coroutine");
        let this = fiber.clone();
        thread::Builder::new()
            .name(format!("fiber-{}", id))
            .spawn(move || {
                let _ = this.inner.thread.set(thread::current().id());
                let result = panic::catch_unwind(AssertUnwindSafe(|| body(this.clone())))
                    .unwrap_or_else(|_| Err(Error::runtime("coroutine panicked")));
                debug!(fiber = id, ok = result.is_ok(), "coroutine finished");
                this.inner.finished.store(true, Ordering::SeqCst);
                this.hand_back(Handoff::Finished(result));
            })
            .map_err(|e| Error::runtime(format!("failed to start coroutine: {}", e)))?;

        wait(runner_rx)
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// How many times this fiber has suspended so far.
    pub fn suspensions(&self) -> usize {
        self.inner.suspensions.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::SeqCst)
    }

    /// Park the calling fiber until `resume` delivers a value or an error.
    ///
    /// Only the fiber itself may call this.
    pub fn suspend(&self) -> Result<Value> {
        if self.inner.thread.get() != Some(&thread::current().id()) {
            return Err(Error::runtime("a coroutine can only suspend itself"));
        }
        self.inner.suspensions.fetch_add(1, Ordering::SeqCst);
        trace!(fiber = self.inner.id, "suspending");
        self.hand_back(Handoff::Suspended);

        let wake = lock(&self.inner.wake_rx)
            .recv()
            .map_err(|_| Error::CoroutineGone)?;
        *lock(&self.inner.runner) = Some(wake.runner);
        trace!(fiber = self.inner.id, "resumed");
        wake.outcome
    }

    /// Resume a suspended fiber with a value (`Ok`) or by raising an error
    /// inside it (`Err`). Blocks until the fiber suspends again or finishes,
    /// and returns the body's error if it finished with one.
    pub fn resume(&self, outcome: Result<Value>) -> Result<()> {
        if self.is_finished() {
            return Err(Error::CoroutineGone);
        }
        let (runner_tx, runner_rx) = mpsc::channel();
        self.inner
            .wake_tx
            .send(Wake {
                outcome,
                runner: runner_tx,
            })
            .map_err(|_| Error::CoroutineGone)?;
        wait(runner_rx)
    }

    fn hand_back(&self, handoff: Handoff) {
        if let Some(runner) = lock(&self.inner.runner).take() {
            // The runner only disappears if its thread died; nobody is left to tell.
            let _ = runner.send(handoff);
        }
    }
}

fn wait(runner_rx: Receiver<Handoff>) -> Result<()> {
    match runner_rx.recv() {
        Ok(Handoff::Suspended) => Ok(()),
        Ok(Handoff::Finished(result)) => result,
        Err(_) => Err(Error::runtime("coroutine exited without handing back control")),
    }
}

impl fmt::Debug for Fiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("id", &self.inner.id)
            .field("suspensions", &self.suspensions())
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_run_to_completion_without_suspending() {
        let (tx, rx) = channel();
        Fiber::run("test", move |fiber| {
            tx.send(fiber.suspensions()).unwrap();
            Ok(())
        })
        .unwrap();
        assert_eq!(rx.recv().unwrap(), 0);
    }

    #[test]
    fn test_run_returns_body_error() {
        let result = Fiber::run("test", |_| Err(Error::Exception(Value::from("boom"))));
        match result {
            Err(Error::Exception(Value::String(s))) => assert_eq!(s, "boom"),
            other => panic!("Expected Exception, got {:?}", other),
        }
    }

    #[test]
    fn test_suspend_and_resume_with_value() {
        let (fiber_tx, fiber_rx) = channel();
        let (seen_tx, seen_rx) = channel();

        Fiber::run("test", move |fiber| {
            fiber_tx.send(fiber.clone()).unwrap();
            let value = fiber.suspend()?;
            seen_tx.send(value).unwrap();
            Ok(())
        })
        .unwrap();

        // run() returned, so the fiber is parked
        let fiber = fiber_rx.recv().unwrap();
        assert_eq!(fiber.suspensions(), 1);
        assert!(!fiber.is_finished());

        fiber.resume(Ok(Value::Number(7.0))).unwrap();
        assert_eq!(seen_rx.recv().unwrap(), Value::Number(7.0));
        assert!(fiber.is_finished());
    }

    #[test]
    fn test_resume_with_error_raises_inside_fiber() {
        let (fiber_tx, fiber_rx) = channel();
        Fiber::run("test", move |fiber| {
            fiber_tx.send(fiber.clone()).unwrap();
            match fiber.suspend() {
                Err(Error::Exception(v)) => {
                    assert_eq!(v, Value::from("bad"));
                    Ok(())
                }
                other => panic!("Expected Exception, got {:?}", other),
            }
        })
        .unwrap();

        let fiber = fiber_rx.recv().unwrap();
        fiber.resume(Err(Error::Exception(Value::from("bad")))).unwrap();
    }

    #[test]
    fn test_resume_finished_fiber_fails() {
        let (fiber_tx, fiber_rx) = channel();
        Fiber::run("test", move |fiber| {
            fiber_tx.send(fiber).unwrap();
            Ok(())
        })
        .unwrap();

        let fiber = fiber_rx.recv().unwrap();
        assert!(matches!(fiber.resume(Ok(Value::Null)), Err(Error::CoroutineGone)));
    }

    #[test]
    fn test_suspend_from_another_thread_is_rejected() {
        let (fiber_tx, fiber_rx) = channel();
        Fiber::run("test", move |fiber| {
            fiber_tx.send(fiber.clone()).unwrap();
            fiber.suspend().map(|_| ())
        })
        .unwrap();

        let fiber = fiber_rx.recv().unwrap();
        assert!(matches!(fiber.suspend(), Err(Error::Runtime(_))));
        fiber.resume(Ok(Value::Null)).unwrap();
    }

    #[test]
    fn test_panic_in_body_is_reported() {
        let result = Fiber::run("test", |_| panic!("kaboom"));
        assert!(matches!(result, Err(Error::Runtime(_))));
    }

    #[test]
    fn test_fibers_get_distinct_ids() {
        let (tx, rx) = channel();
        for _ in 0..2 {
            let tx = tx.clone();
            Fiber::run("test", move |fiber| {
                tx.send(fiber.id()).unwrap();
                Ok(())
            })
            .unwrap();
        }
        assert_ne!(rx.recv().unwrap(), rx.recv().unwrap());
    }
}
