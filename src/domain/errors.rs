use crate::domain::TaskAction;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("chain {0} is not supported")]
    UnsupportedChain(String),
}

#[derive(Debug, Clone, Error)]
pub enum EventError {
    #[error("malformed result for {0}: missing or invalid field `{1}`")]
    MalformedResult(TaskAction, String),
}
