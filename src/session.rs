use crate::{
    config::JwtConfig,
    crypto::jwt::{create_jwt, validate_token, Claims},
    error::{AuthError, Result},
    verifier::{UserReturnCallback, VerifiedCredentials},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session service that opens JWT sessions for verified wallet accounts
///
/// Plug it into a [`CredentialVerifier`](crate::CredentialVerifier) as the
/// user callback: every successful mutual verification yields an
/// [`AuthResponse`] carrying a signed session token.
///
/// The service keeps no state. Revocation and persistence belong to the
/// application.
pub struct SessionService {
    pub jwt_config: JwtConfig,
}

/// Session opened after a successful verification
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub session_id: Uuid,
    pub session_token: String,
    pub account_id: String,
    pub expires_at: i64,
}

impl SessionService {
    /// Create a new session service with the given JWT configuration
    ///
    /// # Example
    /// ```rust
    /// use hedera_wallet_auth::{JwtConfig, SessionService};
    /// use secrecy::Secret;
    /// use base64::prelude::*;
    ///
    /// let config = JwtConfig {
    ///     secret: Secret::new(BASE64_STANDARD.encode("your-secret")),
    ///     ttl: 3600, // 1 hour
    /// };
    /// let sessions = SessionService::new(config);
    /// ```
    pub fn new(jwt_config: JwtConfig) -> Self {
        Self { jwt_config }
    }

    /// Open a session for a verified account
    ///
    /// # Errors
    /// - `Base64` - The configured secret is not base64
    /// - `Jwt` - Token encoding failed
    pub fn open_session(&self, verified: &VerifiedCredentials) -> Result<AuthResponse> {
        let session_id = Uuid::new_v4();
        let session_token = create_jwt(session_id, &verified.identity, &self.jwt_config)?;
        let expires_at = chrono::Utc::now().timestamp() + self.jwt_config.ttl;

        tracing::debug!(%session_id, account_id = %verified.identity.account_id, "session opened");
        Ok(AuthResponse {
            session_id,
            session_token,
            account_id: verified.identity.account_id.to_string(),
            expires_at,
        })
    }

    /// Validate a session token
    ///
    /// Verifies that the token is properly formatted, signed with the
    /// configured secret and not expired.
    ///
    /// # Example
    /// ```rust
    /// use hedera_wallet_auth::{JwtConfig, SessionService};
    /// use secrecy::Secret;
    /// use base64::prelude::*;
    ///
    /// let sessions = SessionService::new(JwtConfig {
    ///     secret: Secret::new(BASE64_STANDARD.encode("your-secret")),
    ///     ttl: 3600,
    /// });
    /// match sessions.validate_session("token") {
    ///     Ok(claims) => println!("Valid session for account: {}", claims.sub),
    ///     Err(_) => println!("Invalid token - access denied"),
    /// }
    /// ```
    pub fn validate_session(&self, token: &str) -> Result<Claims> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }
        validate_token(token, &self.jwt_config)
    }
}

#[async_trait]
impl UserReturnCallback for SessionService {
    type User = AuthResponse;

    async fn user(&self, verified: &VerifiedCredentials) -> Result<Option<AuthResponse>> {
        self.open_session(verified).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{account::AccountIdentity, network::Network, verifier::Credentials};
    use base64::prelude::*;
    use secrecy::Secret;

    fn create_test_session_service() -> SessionService {
        SessionService::new(JwtConfig {
            secret: Secret::new(BASE64_STANDARD.encode("test-secret-key")),
            ttl: 3600,
        })
    }

    fn verified() -> VerifiedCredentials {
        VerifiedCredentials {
            identity: AccountIdentity {
                account_id: "0.0.100".parse().unwrap(),
                network: Network::Testnet,
                public_key: "abcd".to_string(),
            },
            credentials: Credentials::default(),
        }
    }

    #[tokio::test]
    async fn callback_opens_a_valid_session() {
        let sessions = create_test_session_service();
        let response = sessions.user(&verified()).await.unwrap().unwrap();
        assert_eq!(response.account_id, "0.0.100");

        let claims = sessions.validate_session(&response.session_token).unwrap();
        assert_eq!(claims.sid, response.session_id);
        assert_eq!(claims.sub, "0.0.100");
        assert_eq!(claims.exp, response.expires_at);
    }

    #[test]
    fn empty_token_is_invalid() {
        let sessions = create_test_session_service();
        assert!(matches!(
            sessions.validate_session("  "),
            Err(AuthError::InvalidToken)
        ));
    }
}
