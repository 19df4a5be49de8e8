use crate::domain::ChainId;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainApiError {
    #[error("no live connection for chain {0}")]
    NotConnected(ChainId),

    #[error("failed to connect to chain {0}")]
    ConnectFailed(ChainId),

    #[error("remote query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ConnectivityError {
    #[error("a connect attempt is already in flight")]
    AlreadySwitching,

    #[error("cannot disconnect while {0}")]
    NotOnline(crate::domain::ConnectivityState),
}
