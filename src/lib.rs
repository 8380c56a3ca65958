//! projection-bus - projection-keyed event dispatch
//!
//! Producers publish [`Event`]s tagged with a projection key. A [`Dispatcher`]
//! maps each projection to its handler. Events are held either in an
//! in-process FIFO ([`LocalEventStore`]) or in a durable AMQP queue
//! (`AmqpEventStore`, behind the `amqp` feature) until they are committed.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod store;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use dispatcher::{Dispatcher, EventHandler};
pub use error::{HandlerError, Result, StoreError};
pub use event::{Event, EventArgs, HandlerResult};
pub use store::{EventStore, LocalEventStore, MissingHandlerPolicy};

#[cfg(feature = "amqp")]
pub use store::amqp::{AmqpConfig, AmqpEventStore, Topology};
