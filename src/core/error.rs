use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FfxError>;

#[derive(Debug, Error)]
pub enum FfxError {
    #[error("invalid argument for {filter}: {value:?} (expected one of {allowed:?})")]
    InvalidArgument {
        filter: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },
    #[error("{binary} binary not found in PATH")]
    BinaryNotFound { binary: String },
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("process io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("process has already been started")]
    AlreadyStarted,
    #[error("process has not been started")]
    NotStarted,
    #[error("output queue stalled: no consumer drained a line within {timeout:?}")]
    QueueStalled { timeout: Duration },
    #[error("invalid command: {message}")]
    InvalidCommand { message: String },
}
