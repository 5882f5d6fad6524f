use std::any::Any;
use std::marker::PhantomData;
use std::thread;

use crossbeam::channel::{bounded, Sender};

use crate::error::{Result, StreamError};
use crate::pipe::{Event, Inlet, Item, Pipe};
use crate::runnable::Runnable;

/// What leaves a pipeline: a final value, or the error that stopped it
pub type Emit = std::result::Result<Item, StreamError>;

/// The sink handler's working surface: demand on the upstream pipe plus the
/// outward emit channel that the run handle drains.
///
/// The emit channel has a single slot; `emit` blocks while the slot is full,
/// extending backpressure out to the caller. If the caller abandoned the
/// stream (after cancellation), emits are discarded instead of blocking.
pub struct EmittableInlet {
    inlet: Inlet,
    emits: Option<Sender<Emit>>,
}

impl EmittableInlet {
    /// Request one more item from upstream
    pub fn pull(&self) {
        self.inlet.pull();
    }

    /// Cancel upstream
    pub fn cancel(&self) {
        self.inlet.cancel();
    }

    /// Emit one final value to the caller
    pub fn emit(&mut self, item: Item) {
        match &self.emits {
            Some(tx) => {
                if tx.send(Ok(item)).is_err() {
                    tracing::trace!("emit discarded, caller abandoned the stream");
                }
            }
            None => panic!("protocol violation: emit after close"),
        }
    }

    /// Box a value and emit it
    pub fn emit_value<T: Any + Send>(&mut self, value: T) {
        self.emit(Item::new(value));
    }

    /// Propagate an error to the caller
    pub fn emit_error(&mut self, err: StreamError) {
        match &self.emits {
            Some(tx) => {
                let _ = tx.send(Err(err));
            }
            None => panic!("protocol violation: emit after close"),
        }
    }

    /// Close the emit channel; the caller's stream ends here
    pub fn close(&mut self) {
        self.emits.take();
    }
}

/// Consumer-side protocol callbacks.
///
/// Defaults: a push is discarded and answered with the next pull, an error
/// is emitted to the caller and cancels the pipeline, and completion closes
/// the emit channel.
pub trait SinkHandler: Send {
    /// Upstream delivered one payload
    fn on_push(&mut self, item: Item, inlet: &mut EmittableInlet) {
        drop(item);
        inlet.pull();
    }

    /// Upstream terminated with a failure
    fn on_error(&mut self, err: StreamError, inlet: &mut EmittableInlet) {
        inlet.emit_error(err);
        inlet.cancel();
    }

    /// Upstream terminated normally
    fn on_complete(&mut self, inlet: &mut EmittableInlet) {
        inlet.close();
    }
}

/// Per-item consume decision
pub enum Ack {
    /// Pull the next item
    Continue,
    /// Stop consuming; cancel upstream as a normal early termination
    Stop,
}

/// Adapter lifting a consumer function into [`SinkHandler`].
///
/// Per item, `Ok(Ack::Continue)` pulls the next one, `Ok(Ack::Stop)` cancels
/// upstream, and `Err(e)` is handled like an upstream error: emitted to the
/// caller, then the pipeline is cancelled. A payload that is not a `T` takes
/// the same error path.
pub struct SinkFn<T, F> {
    f: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, F> SinkFn<T, F>
where
    T: Any + Send,
    F: FnMut(T) -> Result<Ack> + Send,
{
    /// Wrap a consumer function
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<T, F> SinkHandler for SinkFn<T, F>
where
    T: Any + Send,
    F: FnMut(T) -> Result<Ack> + Send,
{
    fn on_push(&mut self, item: Item, inlet: &mut EmittableInlet) {
        let value = match item.downcast::<T>() {
            Ok(value) => value,
            Err(item) => {
                let err = StreamError::type_mismatch::<T>("sink", &item);
                self.on_error(err, inlet);
                return;
            }
        };
        match (self.f)(value) {
            Ok(Ack::Continue) => inlet.pull(),
            Ok(Ack::Stop) => inlet.cancel(),
            Err(err) => self.on_error(err, inlet),
        }
    }
}

/// Spawn the driver thread for a sink stage and hand back the run handle.
///
/// The driver consumes upstream events in a plain loop; there is no command
/// side to arbitrate, because a sink issues its pulls through its own
/// handler logic. When the upstream event channel disconnects it closes the
/// upstream pipe, which lets the producing driver wind down.
pub(crate) fn spawn_sink(mut handler: Box<dyn SinkHandler>, upstream: Pipe) -> Runnable {
    let (emit_tx, emit_rx) = bounded(1);
    let (inlet, events) = upstream.split();
    let run_inlet = inlet.clone();

    thread::spawn(move || {
        let mut einlet = EmittableInlet {
            inlet,
            emits: Some(emit_tx),
        };

        tracing::trace!("sink stage started");
        for evt in events {
            match evt {
                Event::Push(item) => handler.on_push(item, &mut einlet),
                Event::Error(err) => handler.on_error(err, &mut einlet),
                Event::Complete => handler.on_complete(&mut einlet),
            }
        }
        einlet.inlet.close();
        tracing::trace!("sink stage stopped");
    });

    Runnable::new(emit_rx, run_inlet)
}

/// A reusable sink stage: every [`Sink::create`] attaches a fresh handler
/// and driver to the given upstream pipe and yields the run handle.
pub struct Sink {
    make: Box<dyn Fn(Pipe) -> Runnable + Send>,
}

impl Sink {
    /// Build a sink from a handler factory
    pub fn new<H, F>(make: F) -> Self
    where
        H: SinkHandler + 'static,
        F: Fn() -> H + Send + 'static,
    {
        Sink {
            make: Box::new(move |pipe| spawn_sink(Box::new(make()), pipe)),
        }
    }

    pub(crate) fn from_create<F>(make: F) -> Self
    where
        F: Fn(Pipe) -> Runnable + Send + 'static,
    {
        Sink {
            make: Box::new(make),
        }
    }

    /// Attach this stage to `upstream` and get the run handle
    pub fn create(&self, upstream: Pipe) -> Runnable {
        (self.make)(upstream)
    }
}
