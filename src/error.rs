use crate::clock::TfTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("frame '{0}' does not exist")]
    FrameNotFound(String),

    #[error("frame '{0}' has no transform data")]
    BufferEmpty(String),

    #[error("frames '{from}' and '{to}' are not connected")]
    NotConnected { from: String, to: String },

    #[error("cycle detected while walking the ancestors of frame '{0}'")]
    CyclicTree(String),

    #[error("requested time {requested} is before the earliest retained sample at {earliest}")]
    ExtrapolationPast { requested: TfTime, earliest: TfTime },

    #[error("requested time {requested} is after the latest sample at {latest}")]
    ExtrapolationFuture { requested: TfTime, latest: TfTime },

    #[error("invalid transform argument: {0}")]
    InvalidArgument(String),
}

pub type TransformResult<T> = Result<T, TransformError>;
