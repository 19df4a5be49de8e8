use crate::domain::errors::ChainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainId {
    Polkadot,
    Kusama,
    Westend,
}

impl ChainId {
    pub fn as_str(self) -> &'static str {
        match self {
            ChainId::Polkadot => "Polkadot",
            ChainId::Kusama => "Kusama",
            ChainId::Westend => "Westend",
        }
    }

    /// Chain token ticker, used in event subtitles.
    pub fn ticker(self) -> &'static str {
        match self {
            ChainId::Polkadot => "DOT",
            ChainId::Kusama => "KSM",
            ChainId::Westend => "WND",
        }
    }
}

impl FromStr for ChainId {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, ChainError> {
        match s {
            "Polkadot" => Ok(ChainId::Polkadot),
            "Kusama" => Ok(ChainId::Kusama),
            "Westend" => Ok(ChainId::Westend),
            other => Err(ChainError::UnsupportedChain(other.to_string())),
        }
    }
}

impl Display for ChainId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ChainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ChainId::from_str(&s).map_err(serde::de::Error::custom)
    }
}
