//! Test utilities and handler doubles.
//!
//! Shared by unit tests and, through the `test-utils` feature, by the
//! integration tests under `tests/`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::dispatcher::EventHandler;
use crate::error::HandlerError;
use crate::event::{EventArgs, HandlerResult};

/// Handler that counts invocations and optionally forwards the args it saw.
#[derive(Clone, Default)]
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
    tx: Option<mpsc::UnboundedSender<Arc<EventArgs>>>,
}

impl CountingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counting handler that also sends every args bag to the returned receiver.
    pub fn with_channel() -> (Self, mpsc::UnboundedReceiver<Arc<EventArgs>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = Self {
            count: Arc::new(AtomicUsize::new(0)),
            tx: Some(tx),
        };
        (handler, rx)
    }

    /// Shared invocation counter.
    pub fn count(&self) -> Arc<AtomicUsize> {
        self.count.clone()
    }
}

impl EventHandler for CountingHandler {
    fn handle(
        &self,
        args: Arc<EventArgs>,
    ) -> BoxFuture<'static, Result<HandlerResult, HandlerError>> {
        let count = self.count.clone();
        let tx = self.tx.clone();
        Box::pin(async move {
            count.fetch_add(1, Ordering::SeqCst);
            if let Some(tx) = tx {
                let _ = tx.send(args);
            }
            Ok(HandlerResult::new("handled"))
        })
    }
}

/// Handler that always fails with a fixed message.
#[derive(Clone)]
pub struct FailingHandler {
    message: String,
    count: Arc<AtomicUsize>,
}

impl FailingHandler {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn count(&self) -> Arc<AtomicUsize> {
        self.count.clone()
    }
}

impl EventHandler for FailingHandler {
    fn handle(
        &self,
        _args: Arc<EventArgs>,
    ) -> BoxFuture<'static, Result<HandlerResult, HandlerError>> {
        let message = self.message.clone();
        let count = self.count.clone();
        Box::pin(async move {
            count.fetch_add(1, Ordering::SeqCst);
            Err(message.into())
        })
    }
}
