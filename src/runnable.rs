use std::any::Any;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{after, bounded, never, Receiver, Sender};
use crossbeam::select;

use crate::error::{Result, StreamError};
use crate::pipe::{Inlet, Item};
use crate::sink::Emit;

/// Cancellation signal for a run.
///
/// A token observes exactly one run; it is consumed by the `_with_token`
/// entry points. The variants are a token that never fires, a deadline, and
/// a manually triggered token paired with a [`CancelHandle`].
pub struct CancelToken {
    fired: Receiver<Instant>,
    // keeps the manual trigger channel connected while no handle has fired it
    _guard: Option<Sender<Instant>>,
}

impl CancelToken {
    /// A token that never fires
    pub fn never() -> Self {
        Self {
            fired: never(),
            _guard: None,
        }
    }

    /// A token that fires once `timeout` has elapsed
    pub fn deadline(timeout: Duration) -> Self {
        Self {
            fired: after(timeout),
            _guard: None,
        }
    }

    /// A token fired by hand through the returned handle
    pub fn manual() -> (Self, CancelHandle) {
        let (tx, rx) = bounded(1);
        let token = Self {
            fired: rx,
            _guard: Some(tx.clone()),
        };
        (token, CancelHandle { trigger: tx })
    }
}

/// Fires the manual [`CancelToken`] it was created with
#[derive(Clone)]
pub struct CancelHandle {
    trigger: Sender<Instant>,
}

impl CancelHandle {
    /// Fire the token. Later calls are no-ops.
    pub fn cancel(&self) {
        let _ = self.trigger.try_send(Instant::now());
    }
}

/// What `execute` hands back: nothing, one value, or a sequence.
///
/// The tri-modal shape is a convenience for the common cases (a drained
/// pipeline, a folded/collected result, a replicated stream), not a general
/// container type.
#[derive(Debug)]
pub enum Execution {
    /// The pipeline completed without emitting
    Empty,
    /// Exactly one value was emitted
    Single(Item),
    /// Two or more values were emitted, in emission order
    Many(Vec<Item>),
}

// `Item` wraps a `Box<dyn Any + Send>`, whose payload cannot be compared, so
// `Execution` cannot derive `PartialEq`. Equality is not part of the public
// contract; this impl exists only so callers can assert on the error side of a
// `Result<Execution, _>`. It reports equality only for the payload-free `Empty`
// variant and never claims two opaque payloads are equal.
impl PartialEq for Execution {
    fn eq(&self, other: &Self) -> bool {
        matches!((self, other), (Execution::Empty, Execution::Empty))
    }
}

impl Execution {
    /// Whether nothing was emitted
    pub fn is_empty(&self) -> bool {
        matches!(self, Execution::Empty)
    }

    /// The single emitted value, downcast to `T`
    pub fn single<T: Any>(self) -> Option<T> {
        match self {
            Execution::Single(item) => item.downcast::<T>().ok(),
            _ => None,
        }
    }

    /// All emitted values, in emission order
    pub fn items(self) -> Vec<Item> {
        match self {
            Execution::Empty => Vec::new(),
            Execution::Single(item) => vec![item],
            Execution::Many(items) => items,
        }
    }
}

/// Handle over a wired pipeline's outward emit channel.
///
/// Nothing moves until one of the run entry points issues the initial pull;
/// from there the sink's handler keeps demand flowing.
pub struct Runnable {
    emits: Receiver<Emit>,
    inlet: Inlet,
}

impl Runnable {
    pub(crate) fn new(emits: Receiver<Emit>, inlet: Inlet) -> Self {
        Self { emits, inlet }
    }

    /// Start the pipeline and stream its emissions
    pub fn run(self) -> Receiver<Emit> {
        self.run_with_token(CancelToken::never())
    }

    /// Start the pipeline and stream its emissions, racing `token`.
    ///
    /// When the token fires, the stream yields `Err(Cancelled)` and the
    /// pipeline is cancelled; the stage drivers drain and stop on their own,
    /// but the caller is not kept waiting for that.
    pub fn run_with_token(self, token: CancelToken) -> Receiver<Emit> {
        let Runnable { emits, inlet } = self;
        inlet.pull();

        let (out_tx, out_rx) = bounded(1);
        thread::spawn(move || loop {
            select! {
                recv(token.fired) -> _ => {
                    tracing::debug!("run cancelled by token");
                    let _ = out_tx.send(Err(StreamError::Cancelled));
                    inlet.cancel();
                    return;
                }
                recv(emits) -> emit => match emit {
                    Ok(emit) => {
                        if out_tx.send(emit).is_err() {
                            return;
                        }
                    }
                    Err(_) => return,
                },
            }
        });

        out_rx
    }

    /// Run to completion, keeping only the error outcome
    pub fn wait(self) -> Result<()> {
        self.wait_with_token(CancelToken::never())
    }

    /// Run to completion under `token`, keeping only the error outcome
    pub fn wait_with_token(self, token: CancelToken) -> Result<()> {
        self.execute_with_token(token).map(|_| ())
    }

    /// Run to completion and collect the emissions
    pub fn execute(self) -> Result<Execution> {
        self.execute_with_token(CancelToken::never())
    }

    /// Run to completion under `token` and collect the emissions.
    ///
    /// The first emitted error stops the drain and is returned as the run's
    /// outcome.
    pub fn execute_with_token(self, token: CancelToken) -> Result<Execution> {
        let out = self.run_with_token(token);
        let mut items = Vec::new();
        for emit in out {
            match emit {
                Ok(item) => items.push(item),
                Err(err) => return Err(err),
            }
        }
        Ok(match items.len() {
            0 => Execution::Empty,
            1 => Execution::Single(items.remove(0)),
            _ => Execution::Many(items),
        })
    }
}
