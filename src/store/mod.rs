//! Event stores.
//!
//! This module contains:
//! - `EventStore` trait: the publish contract shared by both backends
//! - `MissingHandlerPolicy`: what happens to events nobody handles
//! - Implementations: in-process FIFO (`local`), RabbitMQ (`amqp`)
//! - `init_event_store`: factory driven by [`StoreConfig`]

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{BackendType, StoreConfig};
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::event::Event;

// Implementation modules
#[cfg(feature = "amqp")]
pub mod amqp;
pub mod codec;
pub mod local;

// Re-exports
pub use local::LocalEventStore;

// ============================================================================
// Traits
// ============================================================================

/// Publish side of an event store.
///
/// Both backends own an `Arc<Dispatcher>` fixed at construction. Consuming
/// differs per backend: the local store drains its own queue, the broker
/// store consumes from a broker queue, so `commit`/`broadcast` live on the
/// concrete types.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Hand an event to the store for later dispatch.
    async fn publish(&self, event: Event) -> Result<()>;

    /// Publish if there is an event; a missing one is logged and ignored.
    async fn publish_optional(&self, event: Option<Event>) -> Result<()> {
        match event {
            Some(event) => self.publish(event).await,
            None => {
                warn!("Attempted to publish a nil event");
                Ok(())
            }
        }
    }

    /// Dispatcher this store routes events through.
    fn dispatcher(&self) -> &Arc<Dispatcher>;

    /// Release any resources held by the store.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// What to do with an event whose projection has no registered handler.
///
/// Either way the event is not redelivered and commit reports `NoHandler`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingHandlerPolicy {
    /// Discard the event.
    #[default]
    Drop,
    /// Keep the event aside: an in-memory list for the local store, a
    /// `<queue>.dead-letter` queue for the broker store.
    DeadLetter,
}

// ============================================================================
// Factory
// ============================================================================

/// Initialize an event store based on configuration.
///
/// Requires the `amqp` feature for [`BackendType::Amqp`].
pub async fn init_event_store(
    config: &StoreConfig,
    dispatcher: Arc<Dispatcher>,
) -> Result<Arc<dyn EventStore>> {
    match config.backend {
        BackendType::Local => {
            let store = LocalEventStore::new(dispatcher).with_policy(config.missing_handler);
            info!(backend = "local", "Event store initialized");
            Ok(Arc::new(store))
        }
        BackendType::Amqp => {
            #[cfg(feature = "amqp")]
            {
                let amqp_config = amqp::AmqpConfig::from_settings(&config.amqp)
                    .with_missing_handler(config.missing_handler);
                let store = amqp::AmqpEventStore::connect(amqp_config, dispatcher).await?;
                info!(backend = "amqp", "Event store initialized");
                Ok(Arc::new(store))
            }

            #[cfg(not(feature = "amqp"))]
            {
                let _ = dispatcher;
                Err(crate::error::StoreError::Config(
                    "AMQP support requires the 'amqp' feature. Rebuild with --features amqp"
                        .to_string(),
                ))
            }
        }
    }
}
