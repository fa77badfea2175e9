#![warn(clippy::pedantic)]
#![warn(missing_docs)]
//! A named-event dispatcher supporting reentrant, breadth-first event
//! triggering with safe mutation of the binding set from within callbacks.
//!
//! A caller owns a *source* (an opaque identity), creates a [`Dispatcher`]
//! bound to that source, declares named [`Event`]s under it, attaches
//! callbacks to events, and triggers events with per-invocation payload
//! data. Callbacks may, while executing, freely bind new callbacks, unbind
//! callbacks (including themselves and peers), trigger further events, and
//! even destroy the dispatcher — without corrupting iteration or producing
//! use-after-free.
//!
//! This is a single-threaded, reentrant system. Correctness rests on staged
//! side-effect application: mutations that occur *during* a dispatch are
//! deferred until the walk of the binding list it snapshotted finishes, new
//! triggers are queued for breadth-first processing rather than recursed
//! into, and destruction is held back until the dispatch loop completes.
//!
//! # Example
//!
//! ```
//! use evented::{Dispatcher, EventData, OpaqueData};
//!
//! fn on_greet(evt: &mut EventData<()>, _arg: OpaqueData) {
//!     evt.handled = true;
//!     println!("hello from {}", evt.name);
//! }
//!
//! let dispatcher = Dispatcher::new(());
//! let greet = dispatcher.create_event("Greet").unwrap();
//! greet.bind(on_greet, OpaqueData::NULL).unwrap();
//! greet.trigger(OpaqueData::NULL, None, OpaqueData::NULL).unwrap();
//! ```

pub mod alloc_probe;
mod binding;
mod dispatcher;
mod event;
pub mod error;
mod moment;
mod name_index;
mod pool;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use event::Event;
pub use moment::{EventCallback, EventData, OpaqueData, PreparedTrigger, ResultCallback};
pub use pool::Pool;
