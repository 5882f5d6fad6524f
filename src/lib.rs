//! A pull-driven stream processing runtime with built-in backpressure.
//!
//! Pipelines are wired from three stage kinds: a [`Source`] produces items,
//! any number of [`Flow`]s transform them, and a [`Sink`] consumes them.
//! Downstream explicitly requests items one at a time and upstream may only
//! emit after being asked; every stage boundary is a pair of zero-capacity
//! rendezvous channels, so a fast producer genuinely stalls until its
//! consumer is ready. There are no buffers and no separate flow-control
//! signal.
//!
//! # Features
//!
//! - One dedicated thread per stage, communicating only through channels
//! - Pull/cancel demand signalling, push/error/complete delivery
//! - Typed adapters lifting plain closures into the protocol
//! - Operators: map, filter, take, skip, take_while, skip_while, fold,
//!   reduce, sum
//! - Streaming, awaiting, and collecting run shapes, with deadline or
//!   manual cancellation
//!
//! # Example
//!
//! ```
//! use rivulet::{flows, sinks, sources};
//!
//! let out = sources::sequence(0u32)
//!     .filter(|x: &u32| x % 2 == 0)
//!     .take(3)
//!     .run_with(&sinks::collect::<u32>())
//!     .execute()
//!     .unwrap()
//!     .single::<Vec<u32>>()
//!     .unwrap();
//! assert_eq!(out, vec![0, 2, 4]);
//! ```

pub mod error;
pub mod flow;
pub mod flows;
pub mod pipe;
pub mod runnable;
pub mod sink;
pub mod sinks;
pub mod source;
pub mod sources;

// Re-exports for convenience
pub use error::{Result, StreamError};
pub use flow::{Flow, FlowFn, FlowHandler, Step};
pub use pipe::{Command, Event, IOlet, Inlet, Item, Outlet, Pipe};
pub use runnable::{CancelHandle, CancelToken, Execution, Runnable};
pub use sink::{Ack, Emit, EmittableInlet, Sink, SinkFn, SinkHandler};
pub use source::{Source, SourceFn, SourceHandler};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
