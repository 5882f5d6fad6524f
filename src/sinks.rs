//! The built-in sinks.

use std::any::Any;
use std::fmt::Display;
use std::mem;

use crate::error::{Result, StreamError};
use crate::pipe::Item;
use crate::sink::{Ack, EmittableInlet, Sink, SinkFn, SinkHandler};

/// Lift a consumer function into a sink
pub fn from_fn<T, F>(f: F) -> Sink
where
    T: Any + Send,
    F: FnMut(T) -> Result<Ack> + Clone + Send + 'static,
{
    Sink::new(move || SinkFn::new(f.clone()))
}

/// Run `f` on every item; emits nothing
pub fn for_each<T, F>(mut f: F) -> Sink
where
    T: Any + Send,
    F: FnMut(T) + Clone + Send + 'static,
{
    from_fn(move |value| {
        f(value);
        Ok(Ack::Continue)
    })
}

/// Print every item on its own line
pub fn println<T>() -> Sink
where
    T: Any + Send + Display,
{
    for_each(|value: T| std::println!("{value}"))
}

struct Drain;

impl SinkHandler for Drain {}

/// Discard every item; useful to run a pipeline for its side effects
pub fn drain() -> Sink {
    Sink::new(|| Drain)
}

struct EmitEach;

impl SinkHandler for EmitEach {
    fn on_push(&mut self, item: Item, inlet: &mut EmittableInlet) {
        inlet.emit(item);
        inlet.pull();
    }
}

/// Emit every item to the caller as it arrives; this is the streaming sink
pub fn emit_each() -> Sink {
    Sink::new(|| EmitEach)
}

struct Collect<T> {
    items: Vec<T>,
}

impl<T: Any + Send> SinkHandler for Collect<T> {
    fn on_push(&mut self, item: Item, inlet: &mut EmittableInlet) {
        match item.downcast::<T>() {
            Ok(value) => {
                self.items.push(value);
                inlet.pull();
            }
            Err(item) => {
                let err = StreamError::type_mismatch::<T>("sink", &item);
                self.on_error(err, inlet);
            }
        }
    }

    fn on_complete(&mut self, inlet: &mut EmittableInlet) {
        inlet.emit_value(mem::take(&mut self.items));
        inlet.close();
    }
}

/// Gather every item into a `Vec<T>`, emitted once on completion
pub fn collect<T>() -> Sink
where
    T: Any + Send,
{
    Sink::new(|| Collect::<T> { items: Vec::new() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_collect_gathers_in_order() {
        let out = sources::slice(vec![3u8, 1, 2])
            .run_with(&collect::<u8>())
            .execute()
            .unwrap()
            .single::<Vec<u8>>()
            .unwrap();
        assert_eq!(out, vec![3, 1, 2]);
    }

    #[test]
    fn test_collect_emits_an_empty_vec_for_an_empty_stream() {
        let out = sources::slice(Vec::<u8>::new())
            .run_with(&collect::<u8>())
            .execute()
            .unwrap()
            .single::<Vec<u8>>()
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_for_each_sees_every_item() {
        let total = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&total);
        let sink = for_each(move |v: u64| {
            seen.fetch_add(v, Ordering::Relaxed);
        });

        sources::slice(vec![1u64, 2, 3]).to(&sink).unwrap();
        assert_eq!(total.load(Ordering::Relaxed), 6);
    }
}
