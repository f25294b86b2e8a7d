//! Challenge issuance: the server signs a payload for the wallet to countersign.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    account::AccountId,
    crypto::{challenge::challenge_payload, keypair::truncate_key, payload::canonical_bytes, SignatureBytes},
    csrf::{verify_csrf, CsrfConfig},
    error::{AuthError, Result},
    keys::{KeySource, ServerKey},
    network::Network,
};

/// Signed challenge returned to the client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedEnvelope {
    pub signature: SignatureBytes,
    pub signing_account: String,
    pub payload: Value,
}

/// Request-scoped data visible to the payload source and the pre-initializing
/// hook
#[derive(Clone, Debug)]
pub struct InitiationContext {
    pub network: Network,
    pub account_id: AccountId,
    /// Payload that will be signed
    pub data: Value,
}

/// Produces the payload the server signs for a request
pub trait PayloadSource: Send + Sync {
    fn payload(&self, account_id: &AccountId, network: Network) -> Result<Value>;
}

/// Fresh `{accountId, nonce, issuedAt}` per request
#[derive(Clone, Copy, Debug, Default)]
pub struct NoncePayload;

impl PayloadSource for NoncePayload {
    fn payload(&self, account_id: &AccountId, _network: Network) -> Result<Value> {
        Ok(challenge_payload(account_id))
    }
}

/// Fixed application data, with the requesting `accountId` put in front
///
/// Non-object data is wrapped as `{accountId, data}`.
#[derive(Clone, Debug)]
pub struct StaticPayload(pub Value);

impl PayloadSource for StaticPayload {
    fn payload(&self, account_id: &AccountId, _network: Network) -> Result<Value> {
        Ok(with_account_id(account_id, &self.0))
    }
}

fn with_account_id(account_id: &AccountId, data: &Value) -> Value {
    match data {
        Value::Object(fields) => {
            let mut merged = serde_json::Map::with_capacity(fields.len() + 1);
            merged.insert("accountId".to_string(), json!(account_id.as_str()));
            for (key, value) in fields {
                if key != "accountId" {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Value::Object(merged)
        }
        other => json!({"accountId": account_id.as_str(), "data": other}),
    }
}

/// Runs after the request has been validated and before anything is signed
///
/// May enrich `ctx.data`. An error aborts the request with 403 and the
/// error's message.
#[async_trait]
pub trait PreInitializingCallback: Send + Sync {
    async fn call(&self, ctx: &mut InitiationContext) -> Result<()>;
}

#[async_trait]
impl<F> PreInitializingCallback for F
where
    F: Fn(&mut InitiationContext) -> Result<()> + Send + Sync,
{
    async fn call(&self, ctx: &mut InitiationContext) -> Result<()> {
        self(ctx)
    }
}

#[derive(Clone)]
pub struct InitiationConfig {
    pub keys: KeySource,
    pub default_network: Network,
    pub csrf: CsrfConfig,
    pub payload: Arc<dyn PayloadSource>,
    pub pre_initializing: Option<Arc<dyn PreInitializingCallback>>,
    pub debug: bool,
}

impl InitiationConfig {
    pub fn new(keys: impl Into<KeySource>) -> Self {
        Self {
            keys: keys.into(),
            default_network: Network::default(),
            csrf: CsrfConfig::default(),
            payload: Arc::new(NoncePayload),
            pre_initializing: None,
            debug: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiationBody {
    account_id: Option<String>,
    network: Option<String>,
}

/// HTTP handler for the challenge issuance phase
#[derive(Clone)]
pub struct InitiationHandler {
    config: Arc<InitiationConfig>,
}

impl InitiationHandler {
    pub fn new(config: InitiationConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Router serving the handler on `path` for every method, so that wrong
    /// verbs are answered with 405 by the handler itself
    pub fn router(self, path: &str) -> Router {
        Router::new()
            .route(path, any(initiate))
            .with_state(self)
    }

    /// Handle one initiation request
    ///
    /// Responds 200 with a [`SignedEnvelope`], 405 for non-POST requests and
    /// 403 with a plain-text message for every other failure.
    pub async fn handle(&self, method: Method, headers: HeaderMap, body: Bytes) -> Response {
        match self.issue(&method, &headers, &body).await {
            Ok(envelope) => {
                self.trace("challenge issued");
                (StatusCode::OK, Json(envelope)).into_response()
            }
            Err(err) => {
                match &err {
                    AuthError::Configuration(_) => {
                        tracing::error!(error = %err.log_detail(), "challenge issuance failed")
                    }
                    _ => tracing::warn!(error = %err, "challenge request rejected"),
                }
                err.into_response()
            }
        }
    }

    /// Validate the request and sign its payload
    pub async fn issue(&self, method: &Method, headers: &HeaderMap, body: &[u8]) -> Result<SignedEnvelope> {
        if *method != Method::POST {
            self.trace("method not allowed");
            return Err(AuthError::MethodNotAllowed);
        }

        let raw: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
        let fields: InitiationBody = serde_json::from_value(raw.clone()).unwrap_or_default();

        let account_id = fields
            .account_id
            .as_deref()
            .ok_or(AuthError::InvalidAccountId)
            .and_then(AccountId::parse)?;

        verify_csrf(headers, &raw, &self.config.csrf)?;
        self.trace("csrf token matched");

        let network = match fields.network.as_deref() {
            Some(network) => network.parse()?,
            None => self.config.default_network,
        };

        let mut ctx = InitiationContext {
            data: self.config.payload.payload(&account_id, network)?,
            network,
            account_id,
        };

        if let Some(callback) = &self.config.pre_initializing {
            self.trace("running pre-initializing callback");
            callback.call(&mut ctx).await?;
        }

        let material = self.config.keys.resolve(network)?;
        if self.config.debug {
            if let ServerKey::Private(secret) = &material.key {
                tracing::debug!(
                    account = %material.account_id,
                    key = ?truncate_key(secret.expose_secret()),
                    %network,
                    "signing with server key"
                );
            }
        }
        let signing_key = material.signing_key()?;
        let signature = signing_key.sign(&canonical_bytes(&ctx.data)?)?;

        tracing::info!(account_id = %ctx.account_id, %network, "challenge signed");
        Ok(SignedEnvelope {
            signature,
            signing_account: material.account_id,
            payload: ctx.data,
        })
    }

    fn trace(&self, step: &str) {
        if self.config.debug {
            tracing::debug!(step, "challenge initiation");
        }
    }
}

async fn initiate(
    State(handler): State<InitiationHandler>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handler.handle(method, headers, body).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{body::to_bytes, http::HeaderValue};

    use super::*;
    use crate::{crypto::PrivateKey, keys::ServerKeyMaterial};

    fn csrf_headers(token: &str, cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-csrf-token", HeaderValue::from_str(token).unwrap());
        headers.insert(
            "cookie",
            HeaderValue::from_str(&format!("next-auth.csrf-token={cookie}")).unwrap(),
        );
        headers
    }

    fn handler_with(key: &PrivateKey, mutate: impl FnOnce(&mut InitiationConfig)) -> InitiationHandler {
        let mut config = InitiationConfig::new(ServerKeyMaterial::private("0.0.2", key.to_der_hex()));
        mutate(&mut config);
        InitiationHandler::new(config)
    }

    #[tokio::test]
    async fn signs_payload_for_valid_request() {
        let key = PrivateKey::generate_ed25519();
        let handler = handler_with(&key, |_| {});
        let envelope = handler
            .issue(
                &Method::POST,
                &csrf_headers("tok", "tok|hash"),
                br#"{"accountId":"0.0.100"}"#,
            )
            .await
            .unwrap();

        assert_eq!(envelope.signing_account, "0.0.2");
        assert_eq!(envelope.payload["accountId"], "0.0.100");
        let bytes = canonical_bytes(&envelope.payload).unwrap();
        assert!(key.public_key().verify(&bytes, envelope.signature.as_bytes()));
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let handler = handler_with(&PrivateKey::generate_ed25519(), |_| {});
        let response = handler
            .handle(Method::GET, HeaderMap::new(), Bytes::new())
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn invalid_account_is_403_with_message() {
        let handler = handler_with(&PrivateKey::generate_ed25519(), |_| {});
        let bodies: [&'static [u8]; 3] = [br#"{"accountId":"0.1234"}"#, br#"{}"#, b"not json"];
        for body in bodies {
            let response = handler
                .handle(Method::POST, csrf_headers("tok", "tok|x"), Bytes::from_static(body))
                .await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&text[..], b"Invalid account ID.");
        }
    }

    #[tokio::test]
    async fn csrf_mismatch_stops_before_signing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = handler_with(&PrivateKey::generate_ed25519(), |config| {
            config.keys = KeySource::resolver(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                None
            });
        });
        let err = handler
            .issue(
                &Method::POST,
                &csrf_headers("tok", "other|hash"),
                br#"{"accountId":"0.0.100"}"#,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCsrfToken));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn network_defaults_and_can_be_chosen() {
        let testnet = PrivateKey::generate_ed25519();
        let mainnet = PrivateKey::generate_ecdsa();
        let (t, m) = (testnet.to_der_hex(), mainnet.to_der_hex());
        let handler = handler_with(&testnet, move |config| {
            config.keys = KeySource::from(crate::network::NetworkMap {
                mainnet: ServerKeyMaterial::private("0.0.3", m),
                testnet: ServerKeyMaterial::private("0.0.4", t),
                previewnet: None,
            });
        });
        let headers = csrf_headers("tok", "tok|hash");

        let envelope = handler
            .issue(&Method::POST, &headers, br#"{"accountId":"0.0.100"}"#)
            .await
            .unwrap();
        assert_eq!(envelope.signing_account, "0.0.4");

        let envelope = handler
            .issue(&Method::POST, &headers, br#"{"accountId":"0.0.100","network":"mainnet"}"#)
            .await
            .unwrap();
        assert_eq!(envelope.signing_account, "0.0.3");
        let bytes = canonical_bytes(&envelope.payload).unwrap();
        assert!(mainnet.public_key().verify(&bytes, envelope.signature.as_bytes()));

        let response = handler
            .handle(
                Method::POST,
                headers.clone(),
                Bytes::from_static(br#"{"accountId":"0.0.100","network":"previewnet"}"#),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&text[..], b"Server Internal Error.");
    }

    #[tokio::test]
    async fn pre_initializing_callback_can_enrich_or_reject() {
        let key = PrivateKey::generate_ed25519();
        let enrich = |ctx: &mut InitiationContext| -> Result<()> {
            ctx.data["intent"] = json!("login");
            Ok(())
        };
        let handler = handler_with(&key, |config| {
            config.payload = Arc::new(StaticPayload(json!({"app": "demo"})));
            config.pre_initializing = Some(Arc::new(enrich));
        });
        let envelope = handler
            .issue(
                &Method::POST,
                &csrf_headers("tok", "tok|hash"),
                br#"{"accountId":"0.0.100"}"#,
            )
            .await
            .unwrap();
        assert_eq!(
            envelope.payload,
            json!({"accountId": "0.0.100", "app": "demo", "intent": "login"})
        );

        let reject =
            |_: &mut InitiationContext| -> Result<()> { Err(AuthError::Rejected("slow down".into())) };
        let handler = handler_with(&key, |config| {
            config.pre_initializing = Some(Arc::new(reject));
        });
        let response = handler
            .handle(
                Method::POST,
                csrf_headers("tok", "tok|hash"),
                Bytes::from_static(br#"{"accountId":"0.0.100"}"#),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let text = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&text[..], b"slow down");
    }

    #[test]
    fn static_payload_wraps_non_objects() {
        let account = AccountId::parse("0.0.9").unwrap();
        let payload = StaticPayload(json!("hello")).payload(&account, Network::Testnet).unwrap();
        assert_eq!(payload, json!({"accountId": "0.0.9", "data": "hello"}));
    }
}
