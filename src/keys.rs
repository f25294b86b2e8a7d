//! Server key material and how it is resolved per network.

use std::{fmt, sync::Arc};

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use crate::{
    crypto::keypair::{PrivateKey, PublicKey},
    error::{AuthError, Result},
    network::{Network, NetworkMap},
};

/// Server key, either the private key used for signing or only the public
/// half when a deployment verifies but never issues challenges
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerKey {
    Private(Secret<String>),
    Public(String),
}

/// The server's ledger account and its key for one network
#[derive(Clone, Debug, Deserialize)]
pub struct ServerKeyMaterial {
    pub account_id: String,
    #[serde(flatten)]
    pub key: ServerKey,
}

impl ServerKeyMaterial {
    pub fn private(account_id: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            key: ServerKey::Private(Secret::new(private_key.into())),
        }
    }

    pub fn public(account_id: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            key: ServerKey::Public(public_key.into()),
        }
    }

    fn key_str(&self) -> &str {
        match &self.key {
            ServerKey::Private(secret) => secret.expose_secret(),
            ServerKey::Public(public) => public,
        }
    }

    /// Parse the private key for signing
    pub fn signing_key(&self) -> Result<PrivateKey> {
        match &self.key {
            ServerKey::Private(secret) => secret.expose_secret().parse().map_err(|e: AuthError| {
                AuthError::Configuration(format!("server private key is unusable: {}", e.log_detail()))
            }),
            ServerKey::Public(_) => Err(AuthError::Configuration(
                "signing requires a server private key".to_string(),
            )),
        }
    }

    /// Public key to check server signatures with
    pub fn verifying_key(&self) -> Result<PublicKey> {
        match &self.key {
            ServerKey::Private(_) => Ok(self.signing_key()?.public_key()),
            ServerKey::Public(public) => public.parse().map_err(|e: AuthError| {
                AuthError::Configuration(format!("server public key is unusable: {}", e.log_detail()))
            }),
        }
    }
}

pub type KeyResolverFn = dyn Fn(Network) -> Option<ServerKeyMaterial> + Send + Sync;

/// Where server key material comes from
///
/// The three shapes collapse into one capability, [`KeySource::resolve`].
#[derive(Clone, Deserialize)]
#[serde(untagged)]
pub enum KeySource {
    /// Same material for every network
    Constant(ServerKeyMaterial),
    /// One entry per network
    PerNetwork(NetworkMap<ServerKeyMaterial>),
    /// Computed on demand
    #[serde(skip)]
    Resolver(Arc<KeyResolverFn>),
}

impl KeySource {
    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(Network) -> Option<ServerKeyMaterial> + Send + Sync + 'static,
    {
        KeySource::Resolver(Arc::new(f))
    }

    /// Resolve material for `network`
    ///
    /// Missing entries and empty key strings are configuration faults, never
    /// client errors.
    pub fn resolve(&self, network: Network) -> Result<ServerKeyMaterial> {
        let material = match self {
            KeySource::Constant(material) => Some(material.clone()),
            KeySource::PerNetwork(map) => map.get(network).cloned(),
            KeySource::Resolver(f) => f(network),
        };
        let material = material.ok_or_else(|| {
            AuthError::Configuration(format!("no server key configured for {network}"))
        })?;
        if material.key_str().trim().is_empty() {
            return Err(AuthError::Configuration(format!(
                "server key for {network} is empty"
            )));
        }
        Ok(material)
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Constant(m) => f.debug_tuple("Constant").field(m).finish(),
            KeySource::PerNetwork(m) => f.debug_tuple("PerNetwork").field(m).finish(),
            KeySource::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl From<ServerKeyMaterial> for KeySource {
    fn from(material: ServerKeyMaterial) -> Self {
        KeySource::Constant(material)
    }
}

impl From<NetworkMap<ServerKeyMaterial>> for KeySource {
    fn from(map: NetworkMap<ServerKeyMaterial>) -> Self {
        KeySource::PerNetwork(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(account: &str) -> ServerKeyMaterial {
        ServerKeyMaterial::private(account, PrivateKey::generate_ed25519().to_der_hex())
    }

    #[test]
    fn constant_source_serves_every_network() {
        let source = KeySource::from(material("0.0.2"));
        for network in [Network::Mainnet, Network::Testnet, Network::Previewnet] {
            assert_eq!(source.resolve(network).unwrap().account_id, "0.0.2");
        }
    }

    #[test]
    fn per_network_source_picks_entry() {
        let source = KeySource::from(NetworkMap {
            mainnet: material("0.0.10"),
            testnet: material("0.0.20"),
            previewnet: None,
        });
        assert_eq!(source.resolve(Network::Mainnet).unwrap().account_id, "0.0.10");
        assert_eq!(source.resolve(Network::Testnet).unwrap().account_id, "0.0.20");
        assert!(matches!(
            source.resolve(Network::Previewnet),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn resolver_source_is_called_with_network() {
        let source = KeySource::resolver(|network| {
            (network == Network::Mainnet).then(|| material("0.0.99"))
        });
        assert_eq!(source.resolve(Network::Mainnet).unwrap().account_id, "0.0.99");
        assert!(source.resolve(Network::Testnet).is_err());
    }

    #[test]
    fn empty_key_is_a_configuration_error() {
        let source = KeySource::from(ServerKeyMaterial::private("0.0.2", "  "));
        let err = source.resolve(Network::Testnet).unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
        assert_eq!(err.to_string(), "Server Internal Error.");
    }

    #[test]
    fn public_only_material_cannot_sign() {
        let key = PrivateKey::generate_ecdsa();
        let material = ServerKeyMaterial::public("0.0.2", key.public_key().to_der_hex());
        assert!(matches!(material.signing_key(), Err(AuthError::Configuration(_))));
        assert_eq!(material.verifying_key().unwrap(), key.public_key());
    }

    #[test]
    fn private_material_derives_verifying_key() {
        let key = PrivateKey::generate_ed25519();
        let material = ServerKeyMaterial::private("0.0.2", key.to_der_hex());
        assert_eq!(material.verifying_key().unwrap(), key.public_key());
    }

    #[test]
    fn deserializes_constant_and_per_network_shapes() {
        let constant: KeySource =
            serde_json::from_str(r#"{"account_id":"0.0.2","private":"abc"}"#).unwrap();
        assert!(matches!(constant, KeySource::Constant(_)));

        let per_network: KeySource = serde_json::from_str(
            r#"{
                "mainnet": {"account_id":"0.0.3","private":"abc"},
                "testnet": {"account_id":"0.0.4","public":"def"}
            }"#,
        )
        .unwrap();
        let KeySource::PerNetwork(map) = per_network else {
            panic!("expected per-network source");
        };
        assert!(matches!(map.testnet.key, ServerKey::Public(_)));
    }
}
