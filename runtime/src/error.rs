use thiserror::Error;

/// Ways a store call can fail
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Shutdown has started; no new commands are accepted
    #[error("Store is shutting down")]
    ShutdownInProgress,

    /// Effects were still running when the shutdown deadline passed
    #[error("Shutdown timed out with {0} effects still running")]
    ShutdownTimeout(usize),

    /// No matching outcome arrived in time
    #[error("Timeout waiting for action")]
    Timeout,

    /// The outcome broadcast has no sender left
    #[error("Action broadcast channel closed")]
    ChannelClosed,
}
