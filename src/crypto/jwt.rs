use crate::{
    account::AccountIdentity,
    config::JwtConfig,
    error::{AuthError, Result},
    network::Network,
};
use base64::prelude::*;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// JWT claims for a session opened by a verified wallet signature
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Account identifier the session belongs to
    pub sub: String,
    /// Network the account was verified on
    pub network: Network,
    /// Session identifier
    pub sid: Uuid,
    /// Expiration timestamp (Unix timestamp)
    pub exp: i64,
    /// Issued at timestamp (Unix timestamp)
    pub iat: i64,
    /// SHA256 of the public key that signed the challenge, hex encoded
    pub key_hash: String,
}

/// Creates a signed JWT for a verified account
///
/// # Arguments
/// * `session_id` - Unique session identifier
/// * `identity` - Account whose signature was verified
/// * `config` - JWT configuration with secret and TTL
///
/// # Returns
/// * `Ok(String)` - Signed JWT token
/// * `Err(AuthError)` - Base64 or JWT encoding error
///
/// # Example
/// ```rust
/// use uuid::Uuid;
/// use secrecy::Secret;
/// use base64::prelude::*;
/// use hedera_wallet_auth::{AccountIdentity, JwtConfig, Network};
/// use hedera_wallet_auth::crypto::jwt::create_jwt;
///
/// let config = JwtConfig {
///     secret: Secret::new(BASE64_STANDARD.encode("secret-key")),
///     ttl: 3600,
/// };
/// let identity = AccountIdentity {
///     account_id: "0.0.100".parse().unwrap(),
///     network: Network::Testnet,
///     public_key: "e0c8ec2758a5879ffac226a13c0c516b799e72e35141a0dd828f94d37988a4b7".to_string(),
/// };
/// let token = create_jwt(Uuid::new_v4(), &identity, &config).unwrap();
/// ```
pub fn create_jwt(session_id: Uuid, identity: &AccountIdentity, config: &JwtConfig) -> Result<String> {
    let jwt_secret = decode_secret(config.secret.expose_secret())?;
    let now = Utc::now().timestamp();

    let claims = Claims {
        sub: identity.account_id.to_string(),
        network: identity.network,
        sid: session_id,
        exp: now + config.ttl,
        iat: now,
        key_hash: public_key_hash(&identity.public_key),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(&jwt_secret),
    )
    .map_err(|e| AuthError::Jwt(format!("Failed to create JWT: {}", e)))
}

/// Validates a JWT token and extracts the claims
///
/// # Returns
/// * `Ok(Claims)` - Validated claims containing session info
/// * `Err(AuthError)` - Token expired, invalid signature, malformed, or decode error
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims> {
    let jwt_secret = decode_secret(config.secret.expose_secret())?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(&jwt_secret), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            jsonwebtoken::errors::ErrorKind::InvalidSignature
            | jsonwebtoken::errors::ErrorKind::InvalidToken => AuthError::InvalidToken,
            _ => AuthError::Jwt(format!("JWT validation failed: {}", e)),
        })?;
    let claims = token_data.claims;
    if claims.exp <= Utc::now().timestamp() {
        return Err(AuthError::ExpiredToken);
    }
    Ok(claims)
}

fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(secret)
        .map_err(|e| AuthError::Base64(format!("Failed to decode JWT secret: {}", e)))
}

/// Hash of a public key string for embedding in claims
pub fn public_key_hash(public_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public_key.trim().to_ascii_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}
