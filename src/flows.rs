//! The built-in flow operators.
//!
//! Per-item operators are expressed through [`FlowFn`] where they are
//! stateless; the rest (`take`, `skip`, `take_while`, `skip_while`, `fold`)
//! are handler structs with plain fields. Each stage's driver thread is the
//! only caller of its handler, so none of that state needs a lock.

use std::any::Any;
use std::marker::PhantomData;
use std::ops::Add;

use crate::error::{Result, StreamError};
use crate::flow::{Flow, FlowFn, FlowHandler, Step};
use crate::pipe::{IOlet, Item};

/// Lift a transform function into a flow
pub fn from_fn<T, K, F>(f: F) -> Flow
where
    T: Any + Send,
    K: Any + Send,
    F: FnMut(T) -> Result<Step<K>> + Clone + Send + 'static,
{
    Flow::new(move || FlowFn::new(f.clone()))
}

struct Identity;

impl FlowHandler for Identity {}

/// The pass-through flow: every callback keeps its forwarding default
pub fn identity() -> Flow {
    Flow::new(|| Identity)
}

/// Transform every item with `f`
pub fn map<T, K, F>(mut f: F) -> Flow
where
    T: Any + Send,
    K: Any + Send,
    F: FnMut(T) -> K + Clone + Send + 'static,
{
    from_fn(move |value| Ok(Step::Emit(f(value))))
}

/// Transform every item with a fallible `f`; an error ends the pipeline
pub fn try_map<T, K, F>(mut f: F) -> Flow
where
    T: Any + Send,
    K: Any + Send,
    F: FnMut(T) -> Result<K> + Clone + Send + 'static,
{
    from_fn(move |value| f(value).map(Step::Emit))
}

/// Keep only items satisfying `pred`.
///
/// A rejected item costs no buffering: the stage pulls the next upstream
/// item in its place, on behalf of the unanswered downstream pull.
pub fn filter<T, F>(mut pred: F) -> Flow
where
    T: Any + Send,
    F: FnMut(&T) -> bool + Clone + Send + 'static,
{
    from_fn(move |value: T| {
        Ok(if pred(&value) {
            Step::Emit(value)
        } else {
            Step::Skip
        })
    })
}

struct Take {
    remaining: u64,
}

impl FlowHandler for Take {
    fn on_push(&mut self, item: Item, io: &mut IOlet) {
        if self.remaining > 0 {
            self.remaining -= 1;
            io.push(item);
        } else {
            io.cancel();
        }
    }
}

/// Pass through the first `n` items, then end the stream.
///
/// The item after the nth is consumed to detect the boundary and discarded;
/// ending early is a cancellation upstream, so the pipeline finishes as a
/// normal completion, never an error.
pub fn take(n: u64) -> Flow {
    Flow::new(move || Take { remaining: n })
}

struct Skip {
    remaining: u64,
}

impl FlowHandler for Skip {
    fn on_push(&mut self, item: Item, io: &mut IOlet) {
        if self.remaining > 0 {
            self.remaining -= 1;
            drop(item);
            io.pull();
        } else {
            io.push(item);
        }
    }
}

/// Suppress the first `n` items, pass through the rest
pub fn skip(n: u64) -> Flow {
    Flow::new(move || Skip { remaining: n })
}

struct TakeWhile<T, F> {
    pred: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> FlowHandler for TakeWhile<T, F>
where
    T: Any + Send,
    F: FnMut(&T) -> bool + Send,
{
    fn on_push(&mut self, item: Item, io: &mut IOlet) {
        let keep = match item.downcast_ref::<T>() {
            Some(value) => (self.pred)(value),
            None => {
                io.error(StreamError::type_mismatch::<T>("flow", &item));
                return;
            }
        };
        if keep {
            io.push(item);
        } else {
            io.cancel();
        }
    }
}

/// Pass through items until `pred` first fails, then end the stream
pub fn take_while<T, F>(pred: F) -> Flow
where
    T: Any + Send,
    F: FnMut(&T) -> bool + Clone + Send + 'static,
{
    Flow::new(move || TakeWhile::<T, F> {
        pred: pred.clone(),
        _marker: PhantomData,
    })
}

struct SkipWhile<T, F> {
    pred: F,
    dropping: bool,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> FlowHandler for SkipWhile<T, F>
where
    T: Any + Send,
    F: FnMut(&T) -> bool + Send,
{
    fn on_push(&mut self, item: Item, io: &mut IOlet) {
        // once one item fails the predicate, everything after it passes
        let suppress = if self.dropping {
            match item.downcast_ref::<T>() {
                Some(value) => (self.pred)(value),
                None => {
                    io.error(StreamError::type_mismatch::<T>("flow", &item));
                    return;
                }
            }
        } else {
            false
        };
        if suppress {
            drop(item);
            io.pull();
        } else {
            self.dropping = false;
            io.push(item);
        }
    }
}

/// Suppress items while `pred` holds; from the first failing item on,
/// everything passes through regardless
pub fn skip_while<T, F>(pred: F) -> Flow
where
    T: Any + Send,
    F: FnMut(&T) -> bool + Clone + Send + 'static,
{
    Flow::new(move || SkipWhile::<T, F> {
        pred: pred.clone(),
        dropping: true,
        _marker: PhantomData,
    })
}

struct Fold<T, K, F> {
    acc: Option<K>,
    f: F,
    done: bool,
    _marker: PhantomData<fn(T)>,
}

impl<T, K, F> FlowHandler for Fold<T, K, F>
where
    T: Any + Send,
    K: Any + Send,
    F: FnMut(K, T) -> K + Send,
{
    fn on_pull(&mut self, io: &mut IOlet) {
        // after the accumulator went out, this stage answers pulls itself
        if self.done {
            io.complete();
        } else {
            io.pull();
        }
    }

    fn on_push(&mut self, item: Item, io: &mut IOlet) {
        let value = match item.downcast::<T>() {
            Ok(value) => value,
            Err(item) => {
                io.error(StreamError::type_mismatch::<T>("flow", &item));
                return;
            }
        };
        if let Some(acc) = self.acc.take() {
            self.acc = Some((self.f)(acc, value));
        }
        io.pull();
    }

    fn on_complete(&mut self, io: &mut IOlet) {
        if let Some(acc) = self.acc.take() {
            io.push_value(acc);
        }
        self.done = true;
    }
}

/// Fold all items into one accumulated value.
///
/// No item is forwarded while the stream is live; on upstream completion the
/// accumulator is pushed once, and the terminal state is idempotent: any
/// later pull is answered with completion rather than forwarded upstream.
pub fn fold<T, K, F>(seed: K, f: F) -> Flow
where
    T: Any + Send,
    K: Any + Send + Clone,
    F: FnMut(K, T) -> K + Clone + Send + 'static,
{
    Flow::new(move || Fold::<T, K, F> {
        acc: Some(seed.clone()),
        f: f.clone(),
        done: false,
        _marker: PhantomData,
    })
}

/// [`fold`] seeded with the element type's zero value
pub fn reduce<T, F>(f: F) -> Flow
where
    T: Any + Send + Clone + Default,
    F: FnMut(T, T) -> T + Clone + Send + 'static,
{
    fold(T::default(), f)
}

/// Sum all items of a numeric stream
pub fn sum<T>() -> Flow
where
    T: Any + Send + Copy + Default + Add<Output = T>,
{
    reduce::<T, _>(|a, b| a + b)
}
