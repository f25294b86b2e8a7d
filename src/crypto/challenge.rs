use std::time::Duration;

use base64::prelude::*;
use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};

use crate::{
    account::AccountId,
    error::{AuthError, Result},
    verifier::{OriginalDataCheck, OriginalDataContext},
};

/// Generate a cryptographically secure random nonce
///
/// Returns 32 random bytes as base64 encoded string
///
/// # Example
/// ```rust
/// use hedera_wallet_auth::crypto::challenge::generate_nonce;
///
/// let nonce = generate_nonce();
/// println!("Nonce: {}", nonce);
/// ```
pub fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    let nonce_bytes: [u8; 32] = rng.r#gen();
    BASE64_STANDARD.encode(nonce_bytes)
}

/// Decode a base64 nonce back to its raw bytes
pub fn decode_nonce(nonce_b64: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(nonce_b64)
        .map_err(|e| AuthError::Base64(format!("Failed to decode nonce: {}", e)))
}

/// Build the default challenge payload for an account
///
/// The payload is `{accountId, nonce, issuedAt}` with `issuedAt` in unix
/// seconds. Keys are emitted in that order.
pub fn challenge_payload(account_id: &AccountId) -> Value {
    json!({
        "accountId": account_id.as_str(),
        "nonce": generate_nonce(),
        "issuedAt": Utc::now().timestamp(),
    })
}

/// Payload veto that only admits fresh challenges issued to the claimed account
///
/// Pairs with [`challenge_payload`]: the payload must name the same
/// `accountId` the credentials claim, carry a decodable `nonce`, and have an
/// `issuedAt` no older than `max_age` and not in the future.
#[derive(Clone, Debug)]
pub struct FreshnessCheck {
    pub max_age: Duration,
}

impl FreshnessCheck {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    fn is_fresh(&self, ctx: &OriginalDataContext<'_>) -> bool {
        let data = ctx.original_data;
        if data.get("accountId").and_then(Value::as_str) != Some(ctx.account_id.as_str()) {
            return false;
        }
        let nonce_ok = data
            .get("nonce")
            .and_then(Value::as_str)
            .is_some_and(|nonce| decode_nonce(nonce).is_ok());
        if !nonce_ok {
            return false;
        }
        let Some(issued_at) = data.get("issuedAt").and_then(Value::as_i64) else {
            return false;
        };
        let age = Utc::now().timestamp() - issued_at;
        age >= 0 && (age as u64) <= self.max_age.as_secs()
    }
}

#[async_trait::async_trait]
impl OriginalDataCheck for FreshnessCheck {
    async fn check(&self, ctx: &OriginalDataContext<'_>) -> bool {
        self.is_fresh(ctx)
    }
}
