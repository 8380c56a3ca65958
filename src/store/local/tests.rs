use super::*;
use crate::dispatcher::handler_fn;
use crate::error::HandlerError;
use crate::event::EventArgs;
use crate::test_utils::{CountingHandler, FailingHandler};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::Ordering;

/// Store that records what it is given and fails once `fail_after` publishes succeeded.
struct RecordingStore {
    dispatcher: Arc<Dispatcher>,
    published: Mutex<Vec<Event>>,
    fail_after: Option<usize>,
}

impl RecordingStore {
    fn new(fail_after: Option<usize>) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new()),
            published: Mutex::new(Vec::new()),
            fail_after,
        }
    }
}

#[async_trait]
impl EventStore for RecordingStore {
    async fn publish(&self, event: Event) -> Result<()> {
        let mut published = self.published.lock().await;
        if self.fail_after == Some(published.len()) {
            return Err(StoreError::Publish("broker unavailable".to_string()));
        }
        published.push(event);
        Ok(())
    }

    fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

fn event(projection: &str, n: i64) -> Event {
    let mut args = EventArgs::new();
    args.insert("n".to_string(), json!(n));
    Event::new(projection, args)
}

#[tokio::test]
async fn test_publish_then_commit_invokes_handler_once() {
    let (handler, mut rx) = CountingHandler::with_channel();
    let count = handler.count();
    let store = LocalEventStore::new(Arc::new(Dispatcher::new().with_handler("p", handler)));

    store.publish(event("p", 7)).await.unwrap();
    let result = store.commit().await.unwrap();

    assert_eq!(result.message, "handled");
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(rx.recv().await.unwrap().get("n"), Some(&json!(7)));
}

#[tokio::test]
async fn test_commit_empty_queue() {
    let handler = CountingHandler::new();
    let count = handler.count();
    let store = LocalEventStore::new(Arc::new(Dispatcher::new().with_handler("p", handler)));

    let err = store.commit().await.unwrap_err();

    assert!(err.is_empty_queue());
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_commit_is_fifo() {
    let seen = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let sink = seen.clone();
    let dispatcher = Dispatcher::new().with_handler(
        "p",
        handler_fn(move |args: Arc<EventArgs>| {
            let sink = sink.clone();
            async move {
                sink.lock().await.push(args.get("n").cloned());
                Ok::<_, HandlerError>(HandlerResult::default())
            }
        }),
    );
    let store = LocalEventStore::new(Arc::new(dispatcher));

    for n in 0..5 {
        store.publish(event("p", n)).await.unwrap();
    }
    store.broadcast().await.unwrap();

    let seen = seen.lock().await.clone();
    assert_eq!(seen, (0..5).map(|n| Some(json!(n))).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_missing_handler_drops_event() {
    let store = LocalEventStore::new(Arc::new(Dispatcher::new()));

    store.publish(event("unknown", 1)).await.unwrap();
    let err = store.commit().await.unwrap_err();

    assert!(matches!(err, StoreError::NoHandler { ref projection } if projection == "unknown"));
    assert!(store.is_empty().await);
    assert!(store.commit().await.unwrap_err().is_empty_queue());
    assert!(store.dead_letters().await.is_empty());
}

#[tokio::test]
async fn test_missing_handler_dead_letter_policy() {
    let store = LocalEventStore::new(Arc::new(Dispatcher::new()))
        .with_policy(MissingHandlerPolicy::DeadLetter);
    let published = event("unknown", 1);

    store.publish(published.clone()).await.unwrap();
    let err = store.commit().await.unwrap_err();

    assert!(matches!(err, StoreError::NoHandler { .. }));
    assert!(store.is_empty().await);
    let dead = store.dead_letters().await;
    assert_eq!(dead.len(), 1);
    assert_eq!(*dead[0], published);
    assert!(store.dead_letters().await.is_empty());
}

#[tokio::test]
async fn test_commit_handler_failure_is_wrapped() {
    let store = LocalEventStore::new(Arc::new(
        Dispatcher::new().with_handler("p", FailingHandler::new("boom")),
    ));

    store.publish(event("p", 1)).await.unwrap();
    let err = store.commit().await.unwrap_err();

    assert!(matches!(err, StoreError::Handler { ref projection, .. } if projection == "p"));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_broadcast_empty_queue_is_ok() {
    let store = LocalEventStore::new(Arc::new(Dispatcher::new()));

    assert!(store.broadcast().await.is_ok());
}

#[tokio::test]
async fn test_broadcast_returns_last_error() {
    let ok = CountingHandler::new();
    let ok_count = ok.count();
    let dispatcher = Dispatcher::new()
        .with_handler("ok", ok)
        .with_handler("first", FailingHandler::new("first failure"))
        .with_handler("second", FailingHandler::new("second failure"));
    let store = LocalEventStore::new(Arc::new(dispatcher));

    store.publish(event("first", 1)).await.unwrap();
    store.publish(event("ok", 2)).await.unwrap();
    store.publish(event("second", 3)).await.unwrap();
    store.publish(event("ok", 4)).await.unwrap();

    let err = store.broadcast().await.unwrap_err();

    match err {
        StoreError::Handler { projection, source, .. } => {
            assert_eq!(projection, "second");
            assert_eq!(source.to_string(), "second failure");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ok_count.load(Ordering::SeqCst), 2);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_concurrent_publish_then_broadcast() {
    let handler = CountingHandler::new();
    let count = handler.count();
    let store = Arc::new(LocalEventStore::new(Arc::new(
        Dispatcher::new().with_handler("p", handler),
    )));

    let a = {
        let store = store.clone();
        tokio::spawn(async move { store.publish(event("p", 1)).await })
    };
    let b = {
        let store = store.clone();
        tokio::spawn(async move { store.publish(event("p", 2)).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    store.broadcast().await.unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert!(store.commit().await.unwrap_err().is_empty_queue());
}

#[tokio::test]
async fn test_concurrent_broadcasts_do_not_duplicate() {
    let handler = CountingHandler::new();
    let count = handler.count();
    let store = Arc::new(LocalEventStore::new(Arc::new(
        Dispatcher::new().with_handler("p", handler),
    )));
    for n in 0..100 {
        store.publish(event("p", n)).await.unwrap();
    }

    let drains: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.broadcast().await })
        })
        .collect();
    for drain in drains {
        drain.await.unwrap().unwrap();
    }

    assert_eq!(count.load(Ordering::SeqCst), 100);
}

#[tokio::test]
async fn test_dead_letters_accumulate_until_taken() {
    let store = LocalEventStore::new(Arc::new(Dispatcher::new()))
        .with_policy(MissingHandlerPolicy::DeadLetter);
    for n in 0..3 {
        store.publish(event("unknown", n)).await.unwrap();
    }

    assert!(store.broadcast().await.is_err());

    let dead = store.dead_letters().await;
    assert_eq!(dead.len(), 3);
    assert_eq!(dead[2].args().get("n"), Some(&json!(2)));
    assert!(store.dead_letters().await.is_empty());
}

#[tokio::test]
async fn test_forward_to_moves_pending_events_in_order() {
    let handler = CountingHandler::new();
    let count = handler.count();
    let store = LocalEventStore::new(Arc::new(Dispatcher::new().with_handler("p", handler)));
    let target = RecordingStore::new(None);
    for n in 0..3 {
        store.publish(event("p", n)).await.unwrap();
    }

    let forwarded = store.forward_to(&target).await.unwrap();

    assert_eq!(forwarded, 3);
    assert!(store.is_empty().await);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    let published = target.published.lock().await;
    let ns: Vec<_> = published.iter().map(|e| e.args().get("n").cloned()).collect();
    assert_eq!(ns, (0..3).map(|n| Some(json!(n))).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_forward_to_keeps_event_on_publish_failure() {
    let store = LocalEventStore::new(Arc::new(Dispatcher::new()));
    let target = RecordingStore::new(Some(1));
    let events: Vec<_> = (0..3).map(|n| event("p", n)).collect();
    for e in &events {
        store.publish(e.clone()).await.unwrap();
    }

    let err = store.forward_to(&target).await.unwrap_err();

    assert!(matches!(err, StoreError::Publish(_)));
    assert_eq!(*target.published.lock().await, vec![events[0].clone()]);
    assert_eq!(store.len().await, 2);
    assert_eq!(store.forward_to(&RecordingStore::new(None)).await.unwrap(), 2);
}

#[tokio::test]
async fn test_forward_to_empty_queue() {
    let store = LocalEventStore::new(Arc::new(Dispatcher::new()));

    assert_eq!(store.forward_to(&RecordingStore::new(None)).await.unwrap(), 0);
}
