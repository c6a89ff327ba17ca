//! Single-subscriber futures for spawned calls made without a callback.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::error::Error;
use crate::function::{Cx, Function};
use crate::value::Value;
use crate::{lock, Result};

/// The eventual `(error, value)` of a coroutine.
///
/// One subscriber at a time: subscribing again before the result arrives
/// replaces the earlier subscriber, which is then never called. Subscribing
/// after the result arrived calls the consumer right away, inside
/// `subscribe`.
#[derive(Clone)]
pub struct Future {
    state: Arc<Mutex<State>>,
}

enum State {
    Pending { subscriber: Option<Function> },
    Resolved { outcome: Result<Value>, observed: bool },
}

impl Future {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::Pending { subscriber: None })),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*lock(&self.state), State::Resolved { .. })
    }

    /// Register `consumer` to receive `(error, value)`.
    pub fn subscribe(&self, cx: &Cx, consumer: Function) -> Result<()> {
        let mut state = lock(&self.state);
        match &mut *state {
            State::Resolved { outcome, observed } => {
                *observed = true;
                let outcome = outcome.clone();
                drop(state);
                complete(cx, &consumer, outcome)
            }
            State::Pending { subscriber } => {
                if let Some(previous) = subscriber.replace(consumer) {
                    debug!(previous = previous.name(), "replacing earlier future subscriber");
                }
                Ok(())
            }
        }
    }

    /// Store the coroutine's result and hand it to the subscriber, if any.
    pub(crate) fn resolve(&self, cx: &Cx, outcome: Result<Value>) -> Result<()> {
        let mut state = lock(&self.state);
        let subscriber = match &mut *state {
            State::Pending { subscriber } => subscriber.take(),
            State::Resolved { .. } => {
                warn!("future resolved twice; keeping the first result");
                return Ok(());
            }
        };
        *state = State::Resolved {
            outcome: outcome.clone(),
            observed: subscriber.is_some(),
        };
        drop(state);

        match subscriber {
            Some(consumer) => complete(cx, &consumer, outcome),
            None => Ok(()),
        }
    }

    /// The subscription function handed to programs: `future(consumer)`.
    pub fn into_function(self) -> Function {
        Function::new("subscribe", move |cx, _this, args| {
            match args.into_iter().next() {
                Some(Value::Function(consumer)) => {
                    self.subscribe(cx, consumer)?;
                    Ok(Value::Null)
                }
                Some(other) => Err(Error::NotCallable(other.type_name().to_string())),
                None => Err(Error::runtime("a future needs a consumer function")),
            }
        })
    }
}

impl Drop for State {
    fn drop(&mut self) {
        if let State::Resolved {
            outcome: Err(err),
            observed: false,
        } = self
        {
            warn!(%err, "coroutine failed and nobody subscribed to its result");
        }
    }
}

/// Invoke a node-style callback with `(error, value)`.
pub(crate) fn complete(cx: &Cx, callback: &Function, outcome: Result<Value>) -> Result<()> {
    let args = match outcome {
        Ok(value) => vec![Value::Null, value],
        Err(err) => vec![err.into_value(), Value::Null],
    };
    callback.call(cx, Value::Null, args).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{channel, Sender};

    fn recorder(name: &str, tx: Sender<(String, Vec<Value>)>) -> Function {
        let name = name.to_string();
        Function::new(name.clone(), move |_cx, _this, args| {
            tx.send((name.clone(), args)).unwrap();
            Ok(Value::Null)
        })
    }

    #[test]
    fn test_subscriber_registered_before_resolution() {
        let (tx, rx) = channel();
        let future = Future::new();
        future.subscribe(&Cx::Host, recorder("a", tx)).unwrap();
        assert!(rx.try_recv().is_err());

        future.resolve(&Cx::Host, Ok(Value::Number(1.0))).unwrap();
        assert_eq!(rx.recv().unwrap(), ("a".to_string(), vec![Value::Null, Value::Number(1.0)]));
        assert!(future.is_resolved());
    }

    #[test]
    fn test_late_subscriber_is_called_synchronously() {
        let (tx, rx) = channel();
        let future = Future::new();
        future.resolve(&Cx::Host, Ok(Value::from("done"))).unwrap();

        future.subscribe(&Cx::Host, recorder("late", tx)).unwrap();
        // Already delivered by the time subscribe returned
        assert_eq!(
            rx.try_recv().unwrap(),
            ("late".to_string(), vec![Value::Null, Value::from("done")])
        );
    }

    #[test]
    fn test_last_subscriber_wins() {
        let (tx, rx) = channel();
        let future = Future::new();
        future.subscribe(&Cx::Host, recorder("first", tx.clone())).unwrap();
        future.subscribe(&Cx::Host, recorder("second", tx)).unwrap();
        future.resolve(&Cx::Host, Ok(Value::Null)).unwrap();

        let calls: Vec<_> = rx.try_iter().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "second");
    }

    #[test]
    fn test_error_is_delivered_as_first_argument() {
        let (tx, rx) = channel();
        let future = Future::new();
        future
            .resolve(&Cx::Host, Err(Error::Exception(Value::from("nope"))))
            .unwrap();
        future.into_function()
            .call(&Cx::Host, Value::Null, vec![Value::Function(recorder("c", tx))])
            .unwrap();

        assert_eq!(rx.recv().unwrap().1, vec![Value::from("nope"), Value::Null]);
    }

    #[test]
    fn test_subscribe_requires_a_function() {
        let result = Future::new()
            .into_function()
            .call(&Cx::Host, Value::Null, vec![Value::Number(3.0)]);
        assert!(matches!(result, Err(Error::NotCallable(_))));
    }
}
