use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Authentication errors raised by either phase of the mutual signature flow
///
/// The `Display` text of each variant is what a client gets to see. Variants
/// are grouped the way callers are expected to treat them:
/// - transport errors ([`AuthError::MethodNotAllowed`]) carry their own status
/// - input-shape errors report a generic message
/// - security-gate failures collapse into [`AuthError::AuthenticationFailed`]
///   or [`AuthError::InvalidSignature`] so a client cannot tell which half of
///   the mutual check failed
/// - configuration faults render as "Server Internal Error." and keep their
///   detail for the server log only
///
/// # Example
/// ```rust
/// use hedera_wallet_auth::{AuthError, Result};
///
/// fn handle(result: Result<()>) {
///     match result {
///         Ok(()) => println!("verified"),
///         Err(AuthError::AuthenticationFailed) => println!("rejected"),
///         Err(e) => println!("other failure: {e}"),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum AuthError {
    /// The initiation endpoint was called with a verb other than POST
    #[error("Method not allowed.")]
    MethodNotAllowed,

    /// The account identifier is missing or is not `shard.realm.num`
    #[error("Invalid account ID.")]
    InvalidAccountId,

    /// The network is not one of mainnet, testnet or previewnet
    #[error("Invalid network.")]
    InvalidNetwork,

    /// The anti-forgery token is absent or does not match the session cookie
    #[error("Invalid token")]
    InvalidCsrfToken,

    /// One of the required credential fields was not submitted
    #[error("unable to process your request")]
    MissingCredentials,

    /// A signature could not be parsed, had the wrong shape, or the payload
    /// was vetoed by the application
    #[error("Invalid Signature")]
    InvalidSignature,

    /// The signed payload does not carry both the original payload and the
    /// server signature
    #[error("Invalid entries")]
    InvalidEntries,

    /// No public key could be resolved for the claimed account
    #[error("User public key is missing")]
    MissingUserPublicKey,

    /// The server or the user signature did not verify
    #[error("Authentication Failed")]
    AuthenticationFailed,

    /// An application hook refused the request; the message is its own
    #[error("{0}")]
    Rejected(String),

    /// Server key material or other configuration is missing or malformed
    ///
    /// The detail is never shown to clients.
    #[error("Server Internal Error.")]
    Configuration(String),

    /// Signing or key decoding failed
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Payload could not be encoded to its canonical byte form
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Base64 decoding failed
    #[error("Base64 decode error: {0}")]
    Base64(String),

    /// JWT creation or parsing failed
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Session token is invalid or malformed
    #[error("Invalid or malformed session token")]
    InvalidToken,

    /// Session token has expired
    #[error("Token has expired")]
    ExpiredToken,
}

impl AuthError {
    /// HTTP status used when the error surfaces from the initiation endpoint
    ///
    /// Everything except a wrong verb is reported as 403 so that the status
    /// code alone does not reveal which check failed.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::FORBIDDEN,
        }
    }

    /// Detail suitable for server logs; identical to `Display` except for
    /// configuration faults.
    pub fn log_detail(&self) -> String {
        match self {
            AuthError::Configuration(detail) => format!("configuration error: {detail}"),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let message = if message.is_empty() {
            "something went wrong. try again".to_string()
        } else {
            message
        };
        (self.status_code(), message).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
