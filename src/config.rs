//! # Configuration
//!
//! Config structs deserialize with serde, so they can come from any file
//! format the application uses. [`AuthSettings::from_env`] covers the common
//! case of reading everything from the environment.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SERVER_ACCOUNT_ID` | Server's ledger account | Required |
//! | `SERVER_PRIVATE_KEY` | Server key used on every network | |
//! | `SERVER_PRIVATE_KEY_MAINNET` / `_TESTNET` / `_PREVIEWNET` | Per-network keys, used when `SERVER_PRIVATE_KEY` is unset | |
//! | `MIRROR_NODE_URL_MAINNET` / `_TESTNET` / `_PREVIEWNET` | Mirror node account endpoints | public mirror nodes |
//! | `MIRROR_NODE_TIMEOUT_SECS` | Timeout for account lookups | `10` |
//! | `DEFAULT_NETWORK` | Network used when a request names none | `testnet` |
//! | `JWT_SECRET` | Base64 secret for session tokens | sessions disabled |
//! | `JWT_TTL` | Session lifetime in seconds | `3600` |
//! | `AUTH_DEBUG` | Verbose tracing of every gate (`true`/`1`) | `false` |

use std::env;

use secrecy::Secret;
use serde::Deserialize;

use crate::{
    csrf::CsrfConfig,
    error::{AuthError, Result},
    keys::{KeySource, ServerKeyMaterial},
    network::{Network, NetworkMap},
};

pub const SERVER_ACCOUNT_ID_ENV: &str = "SERVER_ACCOUNT_ID";
pub const SERVER_PRIVATE_KEY_ENV: &str = "SERVER_PRIVATE_KEY";
pub const MIRROR_NODE_URL_ENV_PREFIX: &str = "MIRROR_NODE_URL_";
pub const MIRROR_NODE_TIMEOUT_ENV: &str = "MIRROR_NODE_TIMEOUT_SECS";
pub const DEFAULT_NETWORK_ENV: &str = "DEFAULT_NETWORK";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_TTL_ENV: &str = "JWT_TTL";
pub const AUTH_DEBUG_ENV: &str = "AUTH_DEBUG";

pub const DEFAULT_JWT_TTL: i64 = 3600;
pub const DEFAULT_MIRROR_NODE_TIMEOUT_SECS: u64 = 10;

/// Configuration for session token creation and validation
///
/// # Security Note
/// The secret should be a strong, randomly generated key. For production use,
/// generate at least 256 bits of random data and encode it as base64.
///
/// # Example
/// ```rust
/// use hedera_wallet_auth::JwtConfig;
/// use secrecy::Secret;
/// use base64::prelude::*;
///
/// let config = JwtConfig {
///     secret: Secret::new(BASE64_STANDARD.encode("your-256-bit-secret-key")),
///     ttl: 3600, // 1 hour
/// };
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct JwtConfig {
    /// JWT secret key, base64 encoded string
    pub secret: Secret<String>,
    /// JWT Time To Live (TTL) in seconds
    pub ttl: i64,
}

/// Mirror node endpoints used to look up account public keys
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MirrorNodeConfig {
    /// Account info endpoint per network; the account id is appended as a
    /// path segment
    pub urls: NetworkMap<String>,
    pub timeout_secs: u64,
}

impl Default for MirrorNodeConfig {
    fn default() -> Self {
        Self {
            urls: NetworkMap {
                mainnet: "https://mainnet-public.mirrornode.hedera.com/api/v1/accounts".to_string(),
                testnet: "https://testnet.mirrornode.hedera.com/api/v1/accounts".to_string(),
                previewnet: Some(
                    "https://previewnet.mirrornode.hedera.com/api/v1/accounts".to_string(),
                ),
            },
            timeout_secs: DEFAULT_MIRROR_NODE_TIMEOUT_SECS,
        }
    }
}

/// Everything a deployment needs to run both phases
#[derive(Clone, Debug, Deserialize)]
pub struct AuthSettings {
    pub server_keys: KeySource,
    #[serde(default)]
    pub default_network: Network,
    #[serde(default)]
    pub mirror_node: MirrorNodeConfig,
    #[serde(default)]
    pub csrf: CsrfConfig,
    #[serde(default)]
    pub jwt: Option<JwtConfig>,
    #[serde(default)]
    pub debug: bool,
}

impl AuthSettings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let account_id = var(SERVER_ACCOUNT_ID_ENV).ok_or_else(|| {
            AuthError::Configuration(format!("{SERVER_ACCOUNT_ID_ENV} is not set"))
        })?;

        let server_keys = match var(SERVER_PRIVATE_KEY_ENV) {
            Some(key) => KeySource::Constant(ServerKeyMaterial::private(&account_id, key)),
            None => {
                let per_network = |network: Network| {
                    let name = format!(
                        "{SERVER_PRIVATE_KEY_ENV}_{}",
                        network.as_str().to_ascii_uppercase()
                    );
                    var(&name).map(|key| ServerKeyMaterial::private(&account_id, key))
                };
                let mainnet = per_network(Network::Mainnet);
                let testnet = per_network(Network::Testnet);
                match (mainnet, testnet) {
                    (Some(mainnet), Some(testnet)) => KeySource::PerNetwork(NetworkMap {
                        mainnet,
                        testnet,
                        previewnet: per_network(Network::Previewnet),
                    }),
                    _ => {
                        return Err(AuthError::Configuration(format!(
                            "{SERVER_PRIVATE_KEY_ENV} or both {SERVER_PRIVATE_KEY_ENV}_MAINNET and {SERVER_PRIVATE_KEY_ENV}_TESTNET must be set"
                        )))
                    }
                }
            }
        };

        let default_network = match var(DEFAULT_NETWORK_ENV) {
            Some(value) => value.parse().map_err(|_| {
                AuthError::Configuration(format!("{DEFAULT_NETWORK_ENV} has unknown network {value}"))
            })?,
            None => Network::default(),
        };

        let mut mirror_node = MirrorNodeConfig::default();
        if let Some(url) = var(&format!("{MIRROR_NODE_URL_ENV_PREFIX}MAINNET")) {
            mirror_node.urls.mainnet = url;
        }
        if let Some(url) = var(&format!("{MIRROR_NODE_URL_ENV_PREFIX}TESTNET")) {
            mirror_node.urls.testnet = url;
        }
        if let Some(url) = var(&format!("{MIRROR_NODE_URL_ENV_PREFIX}PREVIEWNET")) {
            mirror_node.urls.previewnet = Some(url);
        }
        if let Some(timeout) = var(MIRROR_NODE_TIMEOUT_ENV) {
            mirror_node.timeout_secs = timeout.parse().map_err(|_| {
                AuthError::Configuration(format!("{MIRROR_NODE_TIMEOUT_ENV} must be a number"))
            })?;
        }

        let jwt = match var(JWT_SECRET_ENV) {
            Some(secret) => {
                let ttl = match var(JWT_TTL_ENV) {
                    Some(ttl) => ttl.parse().map_err(|_| {
                        AuthError::Configuration(format!("{JWT_TTL_ENV} must be a number"))
                    })?,
                    None => DEFAULT_JWT_TTL,
                };
                Some(JwtConfig {
                    secret: Secret::new(secret),
                    ttl,
                })
            }
            None => None,
        };

        let debug = var(AUTH_DEBUG_ENV)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            server_keys,
            default_network,
            mirror_node,
            csrf: CsrfConfig::default(),
            jwt,
            debug,
        })
    }
}
