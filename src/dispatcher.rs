//! Projection-to-handler dispatch.
//!
//! A [`Dispatcher`] is built once, wrapped in an `Arc`, and shared read-only by
//! every store that dispatches through it.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::info;

use crate::error::{HandlerError, Result, StoreError};
use crate::event::{Event, EventArgs, HandlerResult};

/// Handler for processing the arguments of one projection's events.
pub trait EventHandler: Send + Sync {
    /// Process an event's argument bag.
    fn handle(
        &self,
        args: Arc<EventArgs>,
    ) -> BoxFuture<'static, std::result::Result<HandlerResult, HandlerError>>;
}

/// Adapter turning an async closure into an [`EventHandler`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap a closure `Fn(Arc<EventArgs>) -> impl Future<Output = Result<HandlerResult, HandlerError>>`.
///
/// ```ignore
/// let dispatcher = Dispatcher::new().with_handler(
///     "order.created",
///     handler_fn(|args| async move {
///         Ok(HandlerResult::new(format!("created {}", args.len())))
///     }),
/// );
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Arc<EventArgs>) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<HandlerResult, HandlerError>> + Send + 'static,
{
    FnHandler { f }
}

impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<EventArgs>) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<HandlerResult, HandlerError>> + Send + 'static,
{
    fn handle(
        &self,
        args: Arc<EventArgs>,
    ) -> BoxFuture<'static, std::result::Result<HandlerResult, HandlerError>> {
        Box::pin((self.f)(args))
    }
}

/// Mapping from projection key to handler.
#[derive(Default, Clone)]
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same projection.
    pub fn register(&mut self, projection: impl Into<String>, handler: impl EventHandler + 'static) {
        self.handlers.insert(projection.into(), Arc::new(handler));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_handler(
        mut self,
        projection: impl Into<String>,
        handler: impl EventHandler + 'static,
    ) -> Self {
        self.register(projection, handler);
        self
    }

    /// Look up the handler for a projection.
    pub fn handler(&self, projection: &str) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(projection)
    }

    pub fn contains(&self, projection: &str) -> bool {
        self.handlers.contains_key(projection)
    }

    /// Registered projection keys, in no particular order.
    pub fn projections(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Resolve the event's handler and invoke it with the event's args.
    ///
    /// A missing handler is reported as [`StoreError::NoHandler`]; a handler
    /// error is wrapped with the event's id and projection.
    pub async fn dispatch(&self, event: &Event) -> Result<HandlerResult> {
        let handler = self
            .handler(event.projection())
            .ok_or_else(|| StoreError::NoHandler {
                projection: event.projection().to_string(),
            })?;

        let result = handler
            .handle(Arc::new(event.args().clone()))
            .await
            .map_err(|source| StoreError::Handler {
                id: event.id().to_string(),
                projection: event.projection().to_string(),
                source,
            })?;

        info!(
            event_id = %event.id(),
            projection = %event.projection(),
            "Event was successfully processed"
        );
        Ok(result)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut projections: Vec<&str> = self.projections().collect();
        projections.sort_unstable();
        f.debug_struct("Dispatcher")
            .field("projections", &projections)
            .finish()
    }
}
