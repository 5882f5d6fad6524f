use std::any::Any;
use std::marker::PhantomData;
use std::thread;

use crate::error::Result;
use crate::flow::Flow;
use crate::flows;
use crate::pipe::{channel_pair, Command, Outlet, Pipe};
use crate::runnable::Runnable;
use crate::sink::Sink;

/// Producer-side protocol callbacks.
///
/// The defaults treat the stage as immediately exhausted: both a pull and a
/// cancel answer with completion. Exhaustion is permanent; a source that has
/// completed its outlet is never asked again.
pub trait SourceHandler: Send {
    /// One unit of output was requested
    fn on_pull(&mut self, out: &mut Outlet) {
        out.complete();
    }

    /// Downstream asked for early termination
    fn on_cancel(&mut self, out: &mut Outlet) {
        out.complete();
    }
}

/// Adapter lifting a producer function into [`SourceHandler`].
///
/// Per pull, `Ok(Some(v))` pushes `v`, `Ok(None)` completes the pipe, and
/// `Err(e)` terminates it with an error. Once the pipe is terminal the
/// function is never called again: a pull racing a cancel may still arrive
/// afterwards, and is ignored.
pub struct SourceFn<T, F> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> SourceFn<T, F>
where
    T: Any + Send,
    F: FnMut() -> Result<Option<T>> + Send,
{
    /// Wrap a producer function
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<T, F> SourceHandler for SourceFn<T, F>
where
    T: Any + Send,
    F: FnMut() -> Result<Option<T>> + Send,
{
    fn on_pull(&mut self, out: &mut Outlet) {
        if out.is_terminated() {
            return;
        }
        match (self.f)() {
            Ok(Some(value)) => out.push_value(value),
            Ok(None) => out.complete(),
            Err(err) => out.error(err),
        }
    }
}

/// Spawn the driver thread for a source stage and hand back the consumer
/// side of its pipe.
///
/// The driver dispatches commands to the handler until the command channel
/// disconnects. It imposes no cardinality check on what the handler emits;
/// one event per pull is the convention, not an enforced rule.
pub(crate) fn spawn_source(mut handler: Box<dyn SourceHandler>) -> Pipe {
    let (commands, mut outlet, pipe) = channel_pair();

    thread::spawn(move || {
        tracing::trace!("source stage started");
        for cmd in commands {
            match cmd {
                Command::Pull => handler.on_pull(&mut outlet),
                Command::Cancel => handler.on_cancel(&mut outlet),
            }
        }
        tracing::trace!("source stage stopped");
    });

    pipe
}

/// A reusable source stage: every [`Source::create`] builds a fresh handler,
/// pipe, and driver thread, so one `Source` can feed any number of runs.
pub struct Source {
    make: Box<dyn Fn() -> Pipe + Send>,
}

impl Source {
    /// Build a source from a handler factory
    pub fn new<H, F>(make: F) -> Self
    where
        H: SourceHandler + 'static,
        F: Fn() -> H + Send + 'static,
    {
        Source {
            make: Box::new(move || spawn_source(Box::new(make()))),
        }
    }

    /// Wire a fresh pipe and start this stage's driver
    pub fn create(&self) -> Pipe {
        (self.make)()
    }

    /// Append a flow, yielding the composed source
    pub fn via(self, flow: Flow) -> Source {
        Source {
            make: Box::new(move || flow.create((self.make)())),
        }
    }

    /// Terminate the pipeline with a sink and get the run handle
    pub fn run_with(&self, sink: &Sink) -> Runnable {
        sink.create(self.create())
    }

    /// Run the pipeline to completion, discarding emissions
    pub fn to(&self, sink: &Sink) -> Result<()> {
        self.run_with(sink).wait()
    }

    /// Transform every item with `f`
    pub fn map<T, K, F>(self, f: F) -> Source
    where
        T: Any + Send,
        K: Any + Send,
        F: FnMut(T) -> K + Clone + Send + 'static,
    {
        self.via(flows::map(f))
    }

    /// Keep only items satisfying `pred`
    pub fn filter<T, F>(self, pred: F) -> Source
    where
        T: Any + Send,
        F: FnMut(&T) -> bool + Clone + Send + 'static,
    {
        self.via(flows::filter(pred))
    }

    /// Pass through the first `n` items, then end the stream
    pub fn take(self, n: u64) -> Source {
        self.via(flows::take(n))
    }

    /// Suppress the first `n` items, pass through the rest
    pub fn skip(self, n: u64) -> Source {
        self.via(flows::skip(n))
    }

    /// Pass through items until `pred` first fails
    pub fn take_while<T, F>(self, pred: F) -> Source
    where
        T: Any + Send,
        F: FnMut(&T) -> bool + Clone + Send + 'static,
    {
        self.via(flows::take_while(pred))
    }

    /// Suppress items until `pred` first fails, pass through from there on
    pub fn skip_while<T, F>(self, pred: F) -> Source
    where
        T: Any + Send,
        F: FnMut(&T) -> bool + Clone + Send + 'static,
    {
        self.via(flows::skip_while(pred))
    }

    /// Fold all items into one accumulated value
    pub fn fold<T, K, F>(self, seed: K, f: F) -> Source
    where
        T: Any + Send,
        K: Any + Send + Clone,
        F: FnMut(K, T) -> K + Clone + Send + 'static,
    {
        self.via(flows::fold(seed, f))
    }

    /// Fold with the element type's zero value as the seed
    pub fn reduce<T, F>(self, f: F) -> Source
    where
        T: Any + Send + Clone + Default,
        F: FnMut(T, T) -> T + Clone + Send + 'static,
    {
        self.via(flows::reduce(f))
    }
}
