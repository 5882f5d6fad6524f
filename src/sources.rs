//! The built-in sources.
//!
//! All of them treat exhaustion as permanent: once a producer function
//! returns `Ok(None)` its pipe completes and is never asked again.

use std::any::Any;
use std::ops::Add;

use crossbeam::channel::Receiver;
use num_traits::One;

use crate::error::Result;
use crate::source::{Source, SourceFn};

/// Lift a producer function into a source.
///
/// `Ok(Some(v))` answers a pull with `v`, `Ok(None)` completes the stream
/// (permanently), and `Err(e)` fails it.
pub fn from_fn<T, F>(f: F) -> Source
where
    T: Any + Send,
    F: FnMut() -> Result<Option<T>> + Clone + Send + 'static,
{
    Source::new(move || SourceFn::new(f.clone()))
}

/// Emit every element of an iterable, in order
pub fn from_iter<I>(iter: I) -> Source
where
    I: IntoIterator + Clone + Send + 'static,
    I::IntoIter: Send + 'static,
    I::Item: Any + Send,
{
    Source::new(move || {
        let mut items = iter.clone().into_iter();
        SourceFn::new(move || Ok(items.next()))
    })
}

/// Emit every element of a vector, in order
pub fn slice<T>(items: Vec<T>) -> Source
where
    T: Any + Send + Clone,
{
    from_iter(items)
}

/// Emit `start`, `start + 1`, `start + 2`, ... without end
pub fn sequence<T>(start: T) -> Source
where
    T: Any + Send + Copy + Add<Output = T> + One,
{
    Source::new(move || {
        let mut next = start;
        SourceFn::new(move || {
            let current = next;
            next = next + T::one();
            Ok(Some(current))
        })
    })
}

/// Emit everything received on a channel; completes when the channel
/// disconnects
pub fn from_channel<T>(rx: Receiver<T>) -> Source
where
    T: Any + Send,
{
    Source::new(move || {
        let rx = rx.clone();
        SourceFn::new(move || Ok(rx.recv().ok()))
    })
}
