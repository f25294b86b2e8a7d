//! Mutual signature verification of submitted wallet credentials.
//!
//! The wallet countersigns `signedPayload = {originalPayload, serverSignature}`.
//! A submission is accepted only when
//! 1. the server signature verifies over `originalPayload` with the server key,
//!    proving this server issued the payload, and
//! 2. the user signature verifies over the whole `signedPayload` with the
//!    account's public key, binding the attestation to that exact server
//!    signature instance.
//!
//! Gates run in order and the first failure ends the attempt:
//! `Received → StructurallyValid → PayloadApproved → KeyResolved →
//! ServerSigValid → ClientSigValid → Authorized`.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    account::{AccountId, AccountIdentity},
    config::MirrorNodeConfig,
    crypto::{keypair::truncate_key, payload::canonical_bytes, signature::SignatureBytes, PublicKey},
    error::{AuthError, Result},
    keys::{KeySource, ServerKey},
    mirror_node::MirrorNodeClient,
    network::Network,
};

/// Credential fields as the session framework delivers them
///
/// `signed_payload` and `user_signature` are JSON documents encoded as
/// strings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub signed_payload: Option<String>,
    pub user_signature: Option<String>,
    pub account_id: Option<String>,
    pub network: Option<String>,
}

/// What the payload veto hook gets to look at
#[derive(Clone, Copy, Debug)]
pub struct OriginalDataContext<'a> {
    pub account_id: &'a AccountId,
    pub network: Network,
    pub original_data: &'a Value,
}

/// Application veto over the payload the user signed
///
/// Returning `false` rejects the attempt as an invalid signature.
#[async_trait]
pub trait OriginalDataCheck: Send + Sync {
    async fn check(&self, ctx: &OriginalDataContext<'_>) -> bool;
}

#[async_trait]
impl<F> OriginalDataCheck for F
where
    F: Fn(&OriginalDataContext<'_>) -> bool + Send + Sync,
{
    async fn check(&self, ctx: &OriginalDataContext<'_>) -> bool {
        self(ctx)
    }
}

/// Looks up the public key currently registered for an account
///
/// `Ok(None)` means the account has no usable key.
#[async_trait]
pub trait UserPublicKeyResolver: Send + Sync {
    async fn user_public_key(&self, account_id: &AccountId, network: Network) -> Result<Option<String>>;
}

/// Successful verification result handed to the [`UserReturnCallback`]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCredentials {
    pub identity: AccountIdentity,
    /// The raw submission, for applications that want to keep the proof
    pub credentials: Credentials,
}

/// Turns a verified account into the principal of the session framework
///
/// Returning `Ok(None)` means "no such user" and is passed through to the
/// framework unchanged.
#[async_trait]
pub trait UserReturnCallback: Send + Sync {
    type User: Send;

    async fn user(&self, verified: &VerifiedCredentials) -> Result<Option<Self::User>>;
}

/// Verifier configuration; hooks left as `None` use the built-in behavior
#[derive(Clone)]
pub struct VerifierConfig {
    pub server_key: KeySource,
    /// Defaults to a [`MirrorNodeClient`] built from `mirror_node`
    pub public_key_resolver: Option<Arc<dyn UserPublicKeyResolver>>,
    pub mirror_node: MirrorNodeConfig,
    pub check_original_data: Option<Arc<dyn OriginalDataCheck>>,
    pub debug: bool,
}

impl VerifierConfig {
    pub fn new(server_key: impl Into<KeySource>) -> Self {
        Self {
            server_key: server_key.into(),
            public_key_resolver: None,
            mirror_node: MirrorNodeConfig::default(),
            check_original_data: None,
            debug: false,
        }
    }
}

/// Server-side verifier for the credential exchange phase
pub struct CredentialVerifier<U> {
    server_key: KeySource,
    resolver: Arc<dyn UserPublicKeyResolver>,
    check_original_data: Option<Arc<dyn OriginalDataCheck>>,
    user_return: Arc<dyn UserReturnCallback<User = U>>,
    debug: bool,
}

/// Structurally valid submission, after the first gate
struct ParsedSubmission {
    account_id: AccountId,
    network: Network,
    signed_payload: Value,
    original_payload: Value,
    server_signature: SignatureBytes,
    user_signature: SignatureBytes,
}

impl<U: Send> CredentialVerifier<U> {
    pub fn new(config: VerifierConfig, user_return: Arc<dyn UserReturnCallback<User = U>>) -> Result<Self> {
        let resolver = match config.public_key_resolver {
            Some(resolver) => resolver,
            None => Arc::new(MirrorNodeClient::new(config.mirror_node)?),
        };
        Ok(Self {
            server_key: config.server_key,
            resolver,
            check_original_data: config.check_original_data,
            user_return,
            debug: config.debug,
        })
    }

    /// Verify credentials and hand the result to the user callback
    pub async fn authorize(&self, credentials: Credentials) -> Result<Option<U>> {
        let verified = self.verify(credentials).await?;
        self.trace("successful authorization");
        self.user_return.user(&verified).await
    }

    /// Run every gate and return the verified identity
    pub async fn verify(&self, credentials: Credentials) -> Result<VerifiedCredentials> {
        let submission = self.parse(&credentials)?;
        let account_id = &submission.account_id;
        let network = submission.network;

        if let Some(check) = &self.check_original_data {
            self.trace("checking original data");
            let ctx = OriginalDataContext {
                account_id,
                network,
                original_data: &submission.original_payload,
            };
            if !check.check(&ctx).await {
                tracing::warn!(account_id = %account_id, %network, "original payload vetoed");
                return Err(AuthError::InvalidSignature);
            }
        }

        let user_key_string = self.resolve_user_key(account_id, network).await?;
        let server_key = self.resolve_server_key(network)?;

        // An unparsable user key cannot verify anything; it fails like a bad signature.
        let user_key = user_key_string.parse::<PublicKey>().ok();

        let server_verified = server_key.verify(
            &canonical_bytes(&submission.original_payload)?,
            submission.server_signature.as_bytes(),
        );
        self.trace_with("server signature verified", server_verified);

        let client_verified = user_key.is_some_and(|key| {
            canonical_bytes(&submission.signed_payload)
                .map(|bytes| key.verify(&bytes, submission.user_signature.as_bytes()))
                .unwrap_or(false)
        });
        self.trace_with("user signature verified", client_verified);

        if !(server_verified && client_verified) {
            tracing::warn!(account_id = %account_id, %network, "mutual signature check failed");
            return Err(AuthError::AuthenticationFailed);
        }

        tracing::info!(account_id = %account_id, %network, "wallet signature verified");
        Ok(VerifiedCredentials {
            identity: AccountIdentity {
                account_id: submission.account_id,
                network,
                public_key: user_key_string,
            },
            credentials,
        })
    }

    fn parse(&self, credentials: &Credentials) -> Result<ParsedSubmission> {
        let (Some(signed_payload), Some(user_signature), Some(account_id), Some(network)) = (
            non_empty(&credentials.signed_payload),
            non_empty(&credentials.user_signature),
            non_empty(&credentials.account_id),
            non_empty(&credentials.network),
        ) else {
            self.trace("missing credentials");
            return Err(AuthError::MissingCredentials);
        };

        let account_id = AccountId::parse(account_id).inspect_err(|_| {
            self.trace("account id is malformed");
        })?;
        let network: Network = network.parse().inspect_err(|_| {
            self.trace("network is unknown");
        })?;

        let (Ok(signed_payload), Ok(user_signature)) = (
            serde_json::from_str::<Value>(signed_payload),
            serde_json::from_str::<Value>(user_signature),
        ) else {
            self.trace("signed payload or user signature is not JSON");
            return Err(AuthError::InvalidSignature);
        };

        let (Some(original_payload), Some(server_signature)) = (
            present(signed_payload.get("originalPayload")),
            present(signed_payload.get("serverSignature")),
        ) else {
            self.trace("signed payload lacks originalPayload or serverSignature");
            return Err(AuthError::InvalidEntries);
        };

        let (Some(server_signature), Some(user_signature)) = (
            SignatureBytes::from_json(server_signature),
            SignatureBytes::from_json(&user_signature),
        ) else {
            self.trace("signature is not a byte array");
            return Err(AuthError::InvalidSignature);
        };

        Ok(ParsedSubmission {
            account_id,
            network,
            original_payload: original_payload.clone(),
            signed_payload,
            server_signature,
            user_signature,
        })
    }

    async fn resolve_user_key(&self, account_id: &AccountId, network: Network) -> Result<String> {
        self.trace("resolving user public key");
        let key = self
            .resolver
            .user_public_key(account_id, network)
            .await?
            .filter(|key| !key.trim().is_empty());
        match key {
            Some(key) => {
                if self.debug {
                    tracing::debug!(account_id = %account_id, public_key = %key, "user public key resolved");
                }
                Ok(key)
            }
            None => {
                tracing::warn!(account_id = %account_id, %network, "user public key is missing");
                Err(AuthError::MissingUserPublicKey)
            }
        }
    }

    fn resolve_server_key(&self, network: Network) -> Result<PublicKey> {
        self.server_key
            .resolve(network)
            .and_then(|material| {
                if self.debug {
                    let key = match &material.key {
                        ServerKey::Private(secret) => truncate_key(secret.expose_secret()),
                        ServerKey::Public(public) => truncate_key(public),
                    };
                    tracing::debug!(account = %material.account_id, key = ?key, %network, "server key resolved");
                }
                material.verifying_key()
            })
            .inspect_err(|e| tracing::error!(%network, error = %e.log_detail(), "server key unavailable"))
    }

    fn trace(&self, step: &str) {
        if self.debug {
            tracing::debug!(step, "credential verification");
        }
    }

    fn trace_with(&self, step: &str, result: bool) {
        if self.debug {
            tracing::debug!(step, result, "credential verification");
        }
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

/// Entries that are `null`, `false`, `0` or `""` count as absent
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}
