use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{error::AuthError, network::Network};

static ACCOUNT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,10}\.){2}\d{1,10}$").expect("account id pattern is valid")
});

/// Check an account identifier has the `shard.realm.num` form
///
/// Each of the three segments must be 1 to 10 decimal digits.
///
/// # Example
/// ```rust
/// use hedera_wallet_auth::account::is_valid_account_id;
///
/// assert!(is_valid_account_id("0.0.1234"));
/// assert!(!is_valid_account_id("0.1234"));
/// ```
pub fn is_valid_account_id(value: &str) -> bool {
    ACCOUNT_ID_RE.is_match(value)
}

/// A format-validated ledger account identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        if is_valid_account_id(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(AuthError::InvalidAccountId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account whose ownership was proven by a verified user signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdentity {
    pub account_id: AccountId,
    pub network: Network,
    /// Public key string as resolved for the account
    pub public_key: String,
}
