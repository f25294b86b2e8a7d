//! # hedera-wallet-auth
//!
//! Server-side **mutual signature authentication** for Hedera wallet
//! extensions. The server signs a challenge, the wallet countersigns it
//! together with the server's signature, and the server accepts the login only
//! when both signatures verify.
//!
//! ## Features
//!
//! - **Challenge Issuance** - An axum handler that validates the account, checks
//!   the CSRF token and returns a server-signed payload
//! - **Mutual Verification** - Server signature over the original payload, user
//!   signature over the whole signed envelope
//! - **Ed25519 and ECDSA secp256k1** - DER, PEM and raw hex key encodings
//! - **Mirror Node Lookup** - Account public keys fetched from the network the
//!   request names, or from your own resolver
//! - **JWT Sessions** - Optional stateless sessions for verified accounts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hedera_wallet_auth::{
//!     AuthSettings, CredentialVerifier, InitiationConfig, InitiationHandler, SessionService,
//!     VerifierConfig,
//! };
//!
//! # async fn run() -> hedera_wallet_auth::Result<()> {
//! let settings = AuthSettings::from_env()?;
//!
//! // Phase 1: the wallet asks for a challenge
//! let initiate = InitiationHandler::new(InitiationConfig::new(settings.server_keys.clone()))
//!     .router("/api/auth/initiate");
//!
//! // Phase 2: the wallet returns its countersignature
//! let mut config = VerifierConfig::new(settings.server_keys.clone());
//! config.mirror_node = settings.mirror_node.clone();
//! let sessions = SessionService::new(settings.jwt.clone().expect("JWT_SECRET is set"));
//! let verifier = CredentialVerifier::new(config, Arc::new(sessions))?;
//! # let _ = (initiate, verifier);
//! # Ok(())
//! # }
//! ```
//!
//! ## Examples
//!
//! See the [server demo](demos/server.rs) for both phases wired into one
//! axum application:
//!
//! ```bash
//! cargo run --example server
//! ```

pub mod account;
pub mod config;
pub mod crypto;
pub mod csrf;
pub mod error;
pub mod initiation;
pub mod keys;
pub mod mirror_node;
pub mod network;
pub mod session;
pub mod verifier;

// Re-export main types for easier access
pub use account::{AccountId, AccountIdentity};
pub use config::{AuthSettings, JwtConfig, MirrorNodeConfig};
pub use crypto::challenge::{generate_nonce, FreshnessCheck};
pub use crypto::jwt::{create_jwt, validate_token, Claims};
pub use crypto::{PrivateKey, PublicKey, SignatureBytes};
pub use csrf::CsrfConfig;
pub use error::{AuthError, Result};
pub use initiation::{
    InitiationConfig, InitiationContext, InitiationHandler, NoncePayload, PayloadSource,
    PreInitializingCallback, SignedEnvelope, StaticPayload,
};
pub use keys::{KeySource, ServerKey, ServerKeyMaterial};
pub use mirror_node::MirrorNodeClient;
pub use network::{Network, NetworkMap};
pub use session::{AuthResponse, SessionService};
pub use verifier::{
    CredentialVerifier, Credentials, OriginalDataCheck, OriginalDataContext, UserPublicKeyResolver,
    UserReturnCallback, VerifiedCredentials, VerifierConfig,
};
