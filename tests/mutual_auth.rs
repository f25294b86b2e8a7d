use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::prelude::*;
use hedera_wallet_auth::{
    crypto::canonical_bytes, AuthResponse, Credentials, CredentialVerifier, FreshnessCheck,
    InitiationConfig, InitiationHandler, JwtConfig, MirrorNodeConfig, Network, PrivateKey,
    ServerKeyMaterial, SessionService, SignedEnvelope, VerifierConfig,
};
use secrecy::Secret;
use serde_json::json;
use tower::ServiceExt;

const CSRF_TOKEN: &str = "4f3c2a";
const ACCOUNT: &str = "0.0.100";

/// Mirror node stub that knows a single account
async fn mirror_node(account: &'static str, public_key: String) -> String {
    let router = Router::new().route(
        "/api/v1/accounts/{id}",
        get(move |Path(id): Path<String>| {
            let public_key = public_key.clone();
            async move {
                if id == account {
                    Json(json!({"account": id, "key": {"_type": "ED25519", "key": public_key}}))
                        .into_response()
                } else {
                    StatusCode::NOT_FOUND.into_response()
                }
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/v1/accounts")
}

async fn verify(
    State(verifier): State<Arc<CredentialVerifier<AuthResponse>>>,
    Json(credentials): Json<Credentials>,
) -> Response {
    match verifier.authorize(credentials).await {
        Ok(Some(session)) => Json(session).into_response(),
        Ok(None) => StatusCode::UNAUTHORIZED.into_response(),
        Err(e) => e.into_response(),
    }
}

fn app(server: &ServerKeyMaterial, mirror_base: String) -> Router {
    let mut mirror = MirrorNodeConfig::default();
    mirror.urls.testnet = mirror_base;

    let mut config = VerifierConfig::new(server.clone());
    config.mirror_node = mirror;
    config.check_original_data = Some(Arc::new(FreshnessCheck::new(Duration::from_secs(60))));

    let sessions = SessionService::new(JwtConfig {
        secret: Secret::new(BASE64_STANDARD.encode("integration-secret")),
        ttl: 600,
    });
    let verifier = CredentialVerifier::new(config, Arc::new(sessions)).unwrap();

    Router::new()
        .route("/api/auth/verify", post(verify))
        .with_state(Arc::new(verifier))
        .merge(InitiationHandler::new(InitiationConfig::new(server.clone())).router("/api/auth/initiate"))
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn initiate(app: &Router, account: &str) -> SignedEnvelope {
    let request = Request::post("/api/auth/initiate")
        .header("content-type", "application/json")
        .header("cookie", format!("next-auth.csrf-token={CSRF_TOKEN}%7Cdeadbeef"))
        .body(Body::from(
            json!({"accountId": account, "network": "testnet", "csrfToken": CSRF_TOKEN}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// What the wallet extension does with the envelope
fn countersign(wallet: &PrivateKey, envelope: &SignedEnvelope, account: &str) -> Credentials {
    let signed_payload = json!({
        "originalPayload": envelope.payload,
        "serverSignature": envelope.signature,
    });
    let user_signature = wallet.sign(&canonical_bytes(&signed_payload).unwrap()).unwrap();
    Credentials {
        signed_payload: Some(signed_payload.to_string()),
        user_signature: Some(serde_json::to_string(&user_signature).unwrap()),
        account_id: Some(account.to_string()),
        network: Some(Network::Testnet.to_string()),
    }
}

async fn submit(app: &Router, credentials: &Credentials) -> Response {
    let request = Request::post("/api/auth/verify")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(credentials).unwrap()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn wallet_logs_in_with_countersigned_challenge() {
    let server_key = PrivateKey::generate_ed25519();
    let server = ServerKeyMaterial::private("0.0.2", server_key.to_der_hex());
    let wallet = PrivateKey::generate_ed25519();
    let app = app(&server, mirror_node(ACCOUNT, wallet.public_key().to_raw_hex()).await);

    let envelope = initiate(&app, ACCOUNT).await;
    assert_eq!(envelope.signing_account, "0.0.2");
    assert_eq!(envelope.payload["accountId"], ACCOUNT);

    let response = submit(&app, &countersign(&wallet, &envelope, ACCOUNT)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let session: AuthResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(session.account_id, ACCOUNT);
    assert!(!session.session_token.is_empty());
}

#[tokio::test]
async fn unknown_account_has_no_public_key() {
    let server_key = PrivateKey::generate_ed25519();
    let server = ServerKeyMaterial::private("0.0.2", server_key.to_der_hex());
    let wallet = PrivateKey::generate_ed25519();
    let app = app(&server, mirror_node(ACCOUNT, wallet.public_key().to_raw_hex()).await);

    let envelope = initiate(&app, "0.0.200").await;
    let response = submit(&app, &countersign(&wallet, &envelope, "0.0.200")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_bytes(response).await, b"User public key is missing");
}

#[tokio::test]
async fn challenge_for_another_account_is_rejected() {
    let server_key = PrivateKey::generate_ed25519();
    let server = ServerKeyMaterial::private("0.0.2", server_key.to_der_hex());
    let wallet = PrivateKey::generate_ed25519();
    let app = app(&server, mirror_node(ACCOUNT, wallet.public_key().to_raw_hex()).await);

    // A challenge issued to 0.0.300 replayed as 0.0.100
    let envelope = initiate(&app, "0.0.300").await;
    let response = submit(&app, &countersign(&wallet, &envelope, ACCOUNT)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_bytes(response).await, b"Invalid Signature");
}

#[tokio::test]
async fn forged_server_signature_fails_authentication() {
    let server_key = PrivateKey::generate_ed25519();
    let server = ServerKeyMaterial::private("0.0.2", server_key.to_der_hex());
    let wallet = PrivateKey::generate_ed25519();
    let app = app(&server, mirror_node(ACCOUNT, wallet.public_key().to_raw_hex()).await);

    let mut envelope = initiate(&app, ACCOUNT).await;
    let forger = PrivateKey::generate_ed25519();
    envelope.signature = forger.sign(&canonical_bytes(&envelope.payload).unwrap()).unwrap();

    let response = submit(&app, &countersign(&wallet, &envelope, ACCOUNT)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_bytes(response).await, b"Authentication Failed");
}

#[tokio::test]
async fn initiation_without_csrf_cookie_is_forbidden() {
    let server = ServerKeyMaterial::private("0.0.2", PrivateKey::generate_ecdsa().to_der_hex());
    let app = app(&server, "http://127.0.0.1:9/api/v1/accounts".to_string());

    let request = Request::post("/api/auth/initiate")
        .body(Body::from(
            json!({"accountId": ACCOUNT, "csrfToken": CSRF_TOKEN}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_bytes(response).await, b"Invalid token");
}
