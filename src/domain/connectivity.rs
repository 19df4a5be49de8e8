use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Process-wide operating mode. Initialized offline; `Connecting` and
/// `Disconnecting` are the in-flight transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectivityState {
    Offline,
    Connecting,
    Online,
    Disconnecting,
}

impl Display for ConnectivityState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectivityState::Offline => "offline",
            ConnectivityState::Connecting => "connecting",
            ConnectivityState::Online => "online",
            ConnectivityState::Disconnecting => "disconnecting",
        };
        write!(f, "{s}")
    }
}
