//! In-process event store.
//!
//! Pending events wait in a mutex-guarded FIFO. Publish, commit and broadcast
//! all go through that mutex, and broadcast additionally holds a drain lock
//! so two drains on the same store never interleave.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::{EventStore, MissingHandlerPolicy};
use crate::dispatcher::Dispatcher;
use crate::error::{Result, StoreError};
use crate::event::{Event, HandlerResult};

/// Event store backed by an in-memory queue.
pub struct LocalEventStore {
    dispatcher: Arc<Dispatcher>,
    /// Pending events, oldest first.
    queue: Mutex<VecDeque<Arc<Event>>>,
    /// Held for the whole of a broadcast.
    drain: Mutex<()>,
    policy: MissingHandlerPolicy,
    /// Grows until drained by `dead_letters()`.
    dead_letters: Mutex<Vec<Arc<Event>>>,
}

impl LocalEventStore {
    /// Create a store that drops events with no handler.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            queue: Mutex::new(VecDeque::new()),
            drain: Mutex::new(()),
            policy: MissingHandlerPolicy::default(),
            dead_letters: Mutex::new(Vec::new()),
        }
    }

    /// Set the missing-handler policy.
    ///
    /// Under [`MissingHandlerPolicy::DeadLetter`] unhandled events are kept in
    /// memory, unbounded, until [`dead_letters`](Self::dead_letters) takes them.
    pub fn with_policy(mut self, policy: MissingHandlerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MissingHandlerPolicy {
        self.policy
    }

    /// Number of pending events.
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    /// Take every event set aside under [`MissingHandlerPolicy::DeadLetter`].
    pub async fn dead_letters(&self) -> Vec<Arc<Event>> {
        std::mem::take(&mut *self.dead_letters.lock().await)
    }

    /// Dequeue the oldest pending event and dispatch it.
    ///
    /// Returns [`StoreError::EmptyQueue`] when nothing is pending. An event
    /// without a handler is not requeued.
    pub async fn commit(&self) -> Result<HandlerResult> {
        let event = self
            .queue
            .lock()
            .await
            .pop_front()
            .ok_or(StoreError::EmptyQueue)?;

        match self.dispatcher.dispatch(&event).await {
            Err(StoreError::NoHandler { projection }) => {
                if self.policy == MissingHandlerPolicy::DeadLetter {
                    warn!(
                        event_id = %event.id(),
                        projection = %projection,
                        "No handler for event, moved to dead letters"
                    );
                    self.dead_letters.lock().await.push(event);
                }
                Err(StoreError::NoHandler { projection })
            }
            other => other,
        }
    }

    /// Drain the queue, dispatching every pending event.
    ///
    /// Every failure is logged; only the last one is returned. Events
    /// published while the drain runs are picked up by the same drain.
    pub async fn broadcast(&self) -> Result<()> {
        let _guard = self.drain.lock().await;

        let mut processed = 0usize;
        let mut last_err = None;
        loop {
            match self.commit().await {
                Ok(_) => processed += 1,
                Err(e) if e.is_empty_queue() => break,
                Err(e) => {
                    error!(error = %e, "Error processing event");
                    last_err = Some(e);
                }
            }
        }

        debug!(
            processed = processed,
            failed = last_err.is_some(),
            "Broadcast drained queue"
        );

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Move every pending event into `target` instead of dispatching it here.
    ///
    /// Used to push locally buffered events out to a broker. Holds the drain
    /// lock like [`broadcast`](Self::broadcast). On a publish failure the
    /// event goes back to the front of the queue and the error is returned;
    /// events forwarded before it stay forwarded. Returns how many were moved.
    pub async fn forward_to(&self, target: &dyn EventStore) -> Result<usize> {
        let _guard = self.drain.lock().await;

        let mut forwarded = 0usize;
        loop {
            let Some(event) = self.queue.lock().await.pop_front() else {
                break;
            };

            if let Err(e) = target.publish(Event::clone(&event)).await {
                error!(event_id = %event.id(), error = %e, "Failed to forward event");
                self.queue.lock().await.push_front(event);
                return Err(e);
            }
            forwarded += 1;
        }

        debug!(forwarded = forwarded, "Forwarded pending events");
        Ok(forwarded)
    }
}

#[async_trait]
impl EventStore for LocalEventStore {
    async fn publish(&self, event: Event) -> Result<()> {
        let pending = {
            let mut queue = self.queue.lock().await;
            queue.push_back(Arc::new(event));
            queue.len()
        };

        debug!(pending = pending, "Published event to local queue");
        Ok(())
    }

    fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests;
