//! Account public key lookup against a ledger mirror node.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    account::AccountId,
    config::MirrorNodeConfig,
    error::{AuthError, Result},
    network::{Network, NetworkMap},
    verifier::UserPublicKeyResolver,
};

/// The slice of the mirror node account response we read
#[derive(Debug, Deserialize)]
struct AccountInfo {
    key: Option<AccountKey>,
}

#[derive(Debug, Deserialize)]
struct AccountKey {
    key: Option<String>,
}

/// Default [`UserPublicKeyResolver`]: `GET <base>/<accountId>` on the mirror
/// node for the request's network
#[derive(Clone, Debug)]
pub struct MirrorNodeClient {
    urls: NetworkMap<String>,
    client: reqwest::Client,
}

impl MirrorNodeClient {
    pub fn new(config: MirrorNodeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(config.urls, client))
    }

    /// Use a preconfigured HTTP client, e.g. one shared with the application
    pub fn with_client(urls: NetworkMap<String>, client: reqwest::Client) -> Self {
        Self { urls, client }
    }

    pub fn account_url(&self, account_id: &AccountId, network: Network) -> Option<String> {
        let base = self.urls.get(network).filter(|base| !base.is_empty())?;
        Some(format!("{}/{}", base.trim_end_matches('/'), account_id))
    }

    /// Fetch the account's public key; any failure to obtain one is `None`
    pub async fn fetch_public_key(&self, account_id: &AccountId, network: Network) -> Option<String> {
        let Some(url) = self.account_url(account_id, network) else {
            tracing::error!(%network, "no mirror node configured for network");
            return None;
        };

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%url, error = %e, "mirror node request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(%url, status = %response.status(), "mirror node returned an error");
            return None;
        }

        match response.json::<AccountInfo>().await {
            Ok(info) => info.key.and_then(|k| k.key).filter(|k| !k.is_empty()),
            Err(e) => {
                tracing::warn!(%url, error = %e, "mirror node response was not understood");
                None
            }
        }
    }
}

#[async_trait]
impl UserPublicKeyResolver for MirrorNodeClient {
    async fn user_public_key(&self, account_id: &AccountId, network: Network) -> Result<Option<String>> {
        Ok(self.fetch_public_key(account_id, network).await)
    }
}
