// demos/server.rs
//
// Both authentication phases in one axum application.
//
//   SERVER_ACCOUNT_ID=0.0.1234 SERVER_PRIVATE_KEY=302e... JWT_SECRET=c2VjcmV0 \
//   cargo run --example server

use std::{sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hedera_wallet_auth::{
    AuthError, AuthResponse, AuthSettings, CredentialVerifier, Credentials, FreshnessCheck,
    InitiationConfig, InitiationHandler, SessionService, VerifierConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    verifier: Arc<CredentialVerifier<AuthResponse>>,
    sessions: Arc<SessionService>,
}

fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        Ok("pretty") => builder.pretty().init(),
        _ => builder.init(),
    }
}

async fn verify(State(state): State<AppState>, Json(credentials): Json<Credentials>) -> Response {
    match state.verifier.authorize(credentials).await {
        Ok(Some(session)) => (StatusCode::OK, Json(session)).into_response(),
        Ok(None) => AuthError::AuthenticationFailed.into_response(),
        Err(e) => {
            if let AuthError::Configuration(_) = e {
                tracing::error!(error = %e.log_detail(), "verification failed");
            }
            e.into_response()
        }
    }
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    match state.sessions.validate_session(token) {
        Ok(claims) => Json(claims).into_response(),
        Err(e) => (StatusCode::UNAUTHORIZED, e.to_string()).into_response(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let settings = AuthSettings::from_env()?;
    let jwt = settings
        .jwt
        .clone()
        .ok_or("JWT_SECRET must be set to open sessions")?;
    let sessions = Arc::new(SessionService::new(jwt));

    let mut initiation = InitiationConfig::new(settings.server_keys.clone());
    initiation.default_network = settings.default_network;
    initiation.csrf = settings.csrf.clone();
    initiation.debug = settings.debug;

    let mut verifier = VerifierConfig::new(settings.server_keys.clone());
    verifier.mirror_node = settings.mirror_node.clone();
    verifier.check_original_data = Some(Arc::new(FreshnessCheck::new(Duration::from_secs(300))));
    verifier.debug = settings.debug;
    let verifier = Arc::new(CredentialVerifier::new(verifier, sessions.clone())?);

    let app = Router::new()
        .route("/api/auth/verify", post(verify))
        .route("/api/auth/me", get(me))
        .with_state(AppState { verifier, sessions })
        .merge(InitiationHandler::new(initiation).router("/api/auth/initiate"));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, network = %settings.default_network, "wallet auth demo listening");
    axum::serve(listener, app).await?;
    Ok(())
}
