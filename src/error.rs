//! Store error taxonomy.

/// Error type returned by event handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while publishing or dispatching events.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing pending. The expected terminal condition of a drain.
    #[error("no events to process")]
    EmptyQueue,

    /// A dequeued entry could not be turned into an event.
    #[error("invalid queue entry: {0}")]
    InvalidEntry(String),

    #[error("no handler for event projection: {projection}")]
    NoHandler { projection: String },

    #[error("error handling event {id} ({projection}): {source}")]
    Handler {
        id: String,
        projection: String,
        #[source]
        source: HandlerError,
    },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Topology declaration failed: {0}")]
    Topology(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Consume failed: {0}")]
    Consume(String),

    #[error("Failed to encode event: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Store is closed")]
    Closed,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// True for the empty-queue condition, which a drain loop treats as done.
    pub fn is_empty_queue(&self) -> bool {
        matches!(self, Self::EmptyQueue)
    }

    /// True for broker I/O failures after construction.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Publish(_) | Self::Consume(_) | Self::Closed
        )
    }

    /// True for failures raised while building a store.
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Topology(_) | Self::Config(_))
    }
}
