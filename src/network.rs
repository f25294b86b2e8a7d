use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Ledger network a request is made against
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Previewnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Previewnet => "previewnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "previewnet" => Ok(Network::Previewnet),
            _ => Err(AuthError::InvalidNetwork),
        }
    }
}

/// One value per network; previewnet is optional
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkMap<T> {
    pub mainnet: T,
    pub testnet: T,
    pub previewnet: Option<T>,
}

impl<T> NetworkMap<T> {
    pub fn get(&self, network: Network) -> Option<&T> {
        match network {
            Network::Mainnet => Some(&self.mainnet),
            Network::Testnet => Some(&self.testnet),
            Network::Previewnet => self.previewnet.as_ref(),
        }
    }
}
