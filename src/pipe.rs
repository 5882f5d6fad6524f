use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::StreamError;

/// A demand signal sent from a consumer to the producer feeding it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Request exactly one more unit of output
    Pull,
    /// Request early termination; advisory, handled by the producer's handler
    Cancel,
}

/// One unit of producer output, or a terminal signal
///
/// After `Error` or `Complete` the sender closes the event channel; no
/// further events follow on that pipe.
#[derive(Debug)]
pub enum Event {
    /// One payload, delivered in response to a `Pull`
    Push(Item),
    /// Terminal failure
    Error(StreamError),
    /// Terminal success
    Complete,
}

/// A type-tagged payload travelling through the untyped pipe core.
///
/// The payload itself is `Box<dyn Any>`; the tag records the
/// `std::any::type_name` of the value the item was constructed from, so a
/// failed downcast can report both the expected and the actual type.
pub struct Item {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Item {
    /// Box a value into an item, recording its type name
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// Name of the type this item was constructed from
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the payload is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Take the payload out as a `T`, or get the item back unchanged
    pub fn downcast<T: Any>(self) -> std::result::Result<T, Item> {
        let type_name = self.type_name;
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Item { value, type_name }),
        }
    }

    /// Borrow the payload as a `T`, if it is one
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item").field("type", &self.type_name).finish()
    }
}

/// The consumer-side view of a command channel: issue demand, or close it.
///
/// Clonable; all clones share the one underlying sender, so `close` on any
/// clone disconnects the channel for the producer even while other clones
/// are still alive.
#[derive(Clone)]
pub struct Inlet {
    commands: Arc<Mutex<Option<Sender<Command>>>>,
}

impl Inlet {
    fn new(tx: Sender<Command>) -> Self {
        Self {
            commands: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Request one more unit of output; blocks while demand is already
    /// queued ahead of it
    pub fn pull(&self) {
        if let Some(tx) = self.commands.lock().as_ref() {
            let _ = tx.send(Command::Pull);
        }
    }

    /// Request early termination; blocks while demand is already queued
    /// ahead of it
    pub fn cancel(&self) {
        if let Some(tx) = self.commands.lock().as_ref() {
            let _ = tx.send(Command::Cancel);
        }
    }

    /// Close the command channel, signalling no further demand.
    ///
    /// Idempotent. Pulls and cancels after close are ignored; the pipe is
    /// already winding down.
    pub fn close(&self) {
        self.commands.lock().take();
    }
}

/// The producer-side view of an event channel.
///
/// `complete` and `error` are terminal: they send the final event and close
/// the channel. A push after a terminal event is a protocol violation and
/// panics; a terminal event after a terminal event is a no-op, since the
/// pipe already reached its terminal state.
pub struct Outlet {
    events: Option<Sender<Event>>,
}

impl Outlet {
    fn new(tx: Sender<Event>) -> Self {
        Self { events: Some(tx) }
    }

    /// Deliver one payload downstream; blocks until the consumer accepts
    pub fn push(&mut self, item: Item) {
        match &self.events {
            Some(tx) => {
                if tx.send(Event::Push(item)).is_err() {
                    tracing::trace!("push discarded, consumer side is gone");
                }
            }
            None => panic!("protocol violation: push after terminal event"),
        }
    }

    /// Box a value and push it
    pub fn push_value<T: Any + Send>(&mut self, value: T) {
        self.push(Item::new(value));
    }

    /// Terminate the pipe with a failure
    pub fn error(&mut self, err: StreamError) {
        if let Some(tx) = self.events.take() {
            let _ = tx.send(Event::Error(err));
        }
    }

    /// Terminate the pipe normally
    pub fn complete(&mut self) {
        if let Some(tx) = self.events.take() {
            let _ = tx.send(Event::Complete);
        }
    }

    /// Whether a terminal event was already sent
    pub fn is_terminated(&self) -> bool {
        self.events.is_none()
    }
}

/// The consumer-side handle of one channel pair between two stages
pub struct Pipe {
    inlet: Inlet,
    events: Receiver<Event>,
}

impl Pipe {
    /// Request one more unit of output
    pub fn pull(&self) {
        self.inlet.pull();
    }

    /// Request early termination
    pub fn cancel(&self) {
        self.inlet.cancel();
    }

    /// Close the command channel
    pub fn close(&self) {
        self.inlet.close();
    }

    /// A clonable demand handle onto this pipe
    pub fn inlet(&self) -> Inlet {
        self.inlet.clone()
    }

    /// The event stream of this pipe
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    pub(crate) fn split(self) -> (Inlet, Receiver<Event>) {
        (self.inlet, self.events)
    }
}

/// A stage-local view pairing demand on the upstream pipe with emission on
/// the downstream one; what a flow handler works against
pub struct IOlet {
    pub(crate) inlet: Inlet,
    pub(crate) outlet: Outlet,
}

impl IOlet {
    pub(crate) fn new(inlet: Inlet, outlet: Outlet) -> Self {
        Self { inlet, outlet }
    }

    /// Request one more item from upstream
    pub fn pull(&self) {
        self.inlet.pull();
    }

    /// Cancel upstream
    pub fn cancel(&self) {
        self.inlet.cancel();
    }

    /// Deliver one payload downstream
    pub fn push(&mut self, item: Item) {
        self.outlet.push(item);
    }

    /// Box a value and push it downstream
    pub fn push_value<T: Any + Send>(&mut self, value: T) {
        self.outlet.push_value(value);
    }

    /// Terminate downstream with a failure
    pub fn error(&mut self, err: StreamError) {
        self.outlet.error(err);
    }

    /// Terminate downstream normally
    pub fn complete(&mut self) {
        self.outlet.complete();
    }
}

/// Build one channel pair between two stages.
///
/// The event channel has zero capacity: a push blocks until the consumer is
/// ready to take it, which is what turns demand signalling into
/// backpressure. The command channel carries one slot — a consumer has at
/// most one command of its own in flight, and an advisory cancel racing it
/// queues behind that slot rather than wedging both sides mid-send.
pub(crate) fn channel_pair() -> (Receiver<Command>, Outlet, Pipe) {
    let (cmd_tx, cmd_rx) = bounded(1);
    let (evt_tx, evt_rx) = bounded(0);
    let pipe = Pipe {
        inlet: Inlet::new(cmd_tx),
        events: evt_rx,
    };
    (cmd_rx, Outlet::new(evt_tx), pipe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_item_downcast() {
        let item = Item::new(42i32);
        assert!(item.is::<i32>());
        assert_eq!(item.downcast::<i32>().unwrap(), 42);
    }

    #[test]
    fn test_item_downcast_mismatch_keeps_payload() {
        let item = Item::new("hello".to_string());
        let item = item.downcast::<i32>().unwrap_err();
        assert_eq!(item.type_name(), std::any::type_name::<String>());
        assert_eq!(item.downcast::<String>().unwrap(), "hello");
    }

    #[test]
    fn test_rendezvous_push_pull() {
        let (commands, mut outlet, pipe) = channel_pair();

        let producer = thread::spawn(move || {
            for cmd in commands {
                match cmd {
                    Command::Pull => outlet.push_value(7u8),
                    Command::Cancel => {
                        outlet.complete();
                        break;
                    }
                }
            }
        });

        pipe.pull();
        match pipe.events().recv().unwrap() {
            Event::Push(item) => assert_eq!(item.downcast::<u8>().unwrap(), 7),
            other => panic!("expected push, got {other:?}"),
        }

        pipe.cancel();
        assert!(matches!(pipe.events().recv().unwrap(), Event::Complete));
        assert!(pipe.events().recv().is_err());

        pipe.close();
        producer.join().unwrap();
    }

    #[test]
    fn test_terminal_event_is_idempotent() {
        let (_commands, mut outlet, pipe) = channel_pair();

        let consumer = thread::spawn(move || {
            let mut seen = Vec::new();
            for evt in pipe.events().iter() {
                seen.push(matches!(evt, Event::Complete));
            }
            seen
        });

        outlet.complete();
        outlet.complete();
        assert!(outlet.is_terminated());
        assert_eq!(consumer.join().unwrap(), vec![true]);
    }

    #[test]
    #[should_panic(expected = "protocol violation")]
    fn test_push_after_terminal_panics() {
        let (_commands, mut outlet, pipe) = channel_pair();
        let _drainer = thread::spawn(move || pipe.events().iter().count());
        outlet.complete();
        outlet.push_value(1u8);
    }
}
