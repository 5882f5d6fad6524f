use std::any::Any;
use std::marker::PhantomData;
use std::thread;

use crossbeam::channel::never;
use crossbeam::select;

use crate::error::{Result, StreamError};
use crate::pipe::{channel_pair, Command, Event, IOlet, Item, Pipe};
use crate::sink::Sink;

/// Transform-side protocol callbacks.
///
/// Every method defaults to forwarding: pulls and cancels travel upstream
/// untouched, pushes, errors, and completion travel downstream untouched. A
/// handler overrides only the callbacks it cares about; leaving all of them
/// at their defaults yields the identity flow.
pub trait FlowHandler: Send {
    /// Downstream requested one unit of output
    fn on_pull(&mut self, io: &mut IOlet) {
        io.pull();
    }

    /// Downstream asked for early termination
    fn on_cancel(&mut self, io: &mut IOlet) {
        io.cancel();
    }

    /// Upstream delivered one payload
    fn on_push(&mut self, item: Item, io: &mut IOlet) {
        io.push(item);
    }

    /// Upstream terminated with a failure
    fn on_error(&mut self, err: StreamError, io: &mut IOlet) {
        io.error(err);
    }

    /// Upstream terminated normally
    fn on_complete(&mut self, io: &mut IOlet) {
        io.complete();
    }
}

/// Outcome of one transform invocation
pub enum Step<K> {
    /// Emit this value downstream
    Emit(K),
    /// Emit nothing; pull the next upstream item in its place
    Skip,
    /// End the stream early, as a normal completion
    End,
}

/// Adapter lifting a transform function into [`FlowHandler`].
///
/// On each upstream item the function decides the protocol action:
/// [`Step::Emit`] pushes downstream, [`Step::Skip`] pulls upstream again
/// without emitting (this is how filtering works without buffering), and
/// [`Step::End`] cancels upstream so the stream finishes as a normal
/// completion. An `Err` terminates the downstream pipe with that error, as
/// does a payload that is not a `T`.
pub struct FlowFn<T, K, F> {
    f: F,
    _marker: PhantomData<fn(T) -> K>,
}

impl<T, K, F> FlowFn<T, K, F>
where
    T: Any + Send,
    K: Any + Send,
    F: FnMut(T) -> Result<Step<K>> + Send,
{
    /// Wrap a transform function
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<T, K, F> FlowHandler for FlowFn<T, K, F>
where
    T: Any + Send,
    K: Any + Send,
    F: FnMut(T) -> Result<Step<K>> + Send,
{
    fn on_push(&mut self, item: Item, io: &mut IOlet) {
        let value = match item.downcast::<T>() {
            Ok(value) => value,
            Err(item) => {
                io.error(StreamError::type_mismatch::<T>("flow", &item));
                return;
            }
        };
        match (self.f)(value) {
            Ok(Step::Emit(out)) => io.push_value(out),
            Ok(Step::Skip) => io.pull(),
            Ok(Step::End) => io.cancel(),
            Err(err) => io.error(err),
        }
    }
}

/// Spawn the driver thread bridging an upstream pipe to a fresh downstream
/// pipe through a handler.
///
/// The driver selects over downstream commands and upstream events and
/// tracks the two directions independently: it keeps running until BOTH
/// channels have disconnected, so a final in-flight command or event from
/// either side is never dropped. A disconnected side is swapped for a
/// never-ready channel to keep the select loop honest. On exit the driver
/// closes the upstream pipe; dropping its outlet closes the downstream
/// event channel if no terminal event already did.
pub(crate) fn spawn_flow(mut handler: Box<dyn FlowHandler>, upstream: Pipe) -> Pipe {
    let (commands, outlet, pipe) = channel_pair();
    let (up_inlet, up_events) = upstream.split();

    thread::spawn(move || {
        let mut io = IOlet::new(up_inlet, outlet);
        let mut commands = commands;
        let mut events = up_events;
        let mut commands_open = true;
        let mut events_open = true;

        tracing::trace!("flow stage started");
        loop {
            select! {
                recv(commands) -> cmd => match cmd {
                    Ok(Command::Pull) => handler.on_pull(&mut io),
                    Ok(Command::Cancel) => handler.on_cancel(&mut io),
                    Err(_) => {
                        commands_open = false;
                        if !events_open {
                            break;
                        }
                        commands = never();
                    }
                },
                recv(events) -> evt => match evt {
                    Ok(Event::Push(item)) => handler.on_push(item, &mut io),
                    Ok(Event::Error(err)) => handler.on_error(err, &mut io),
                    Ok(Event::Complete) => handler.on_complete(&mut io),
                    Err(_) => {
                        events_open = false;
                        if !commands_open {
                            break;
                        }
                        events = never();
                    }
                },
            }
        }
        io.inlet.close();
        tracing::trace!("flow stage stopped");
    });

    pipe
}

/// A reusable flow stage: every [`Flow::create`] wires the given upstream
/// pipe to a fresh downstream pipe through a fresh handler and driver.
pub struct Flow {
    make: Box<dyn Fn(Pipe) -> Pipe + Send>,
}

impl Flow {
    /// Build a flow from a handler factory
    pub fn new<H, F>(make: F) -> Self
    where
        H: FlowHandler + 'static,
        F: Fn() -> H + Send + 'static,
    {
        Flow {
            make: Box::new(move |upstream| spawn_flow(Box::new(make()), upstream)),
        }
    }

    /// Bridge `upstream` through this stage, yielding the downstream pipe
    pub fn create(&self, upstream: Pipe) -> Pipe {
        (self.make)(upstream)
    }

    /// Append another flow, yielding the composed flow
    pub fn via(self, next: Flow) -> Flow {
        Flow {
            make: Box::new(move |pipe| next.create((self.make)(pipe))),
        }
    }

    /// Append a sink, yielding a sink that runs this flow first
    pub fn to(self, sink: Sink) -> Sink {
        Sink::from_create(move |pipe| sink.create((self.make)(pipe)))
    }
}
