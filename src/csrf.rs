//! Anti-forgery token check for the initiation endpoint.
//!
//! The session framework sets a cookie whose value starts with the token,
//! followed by `|` (or its url-encoded `%7C`) and a hash. The client echoes the
//! bare token in a header or in the request body.

use axum::http::{header::COOKIE, HeaderMap};
use serde::Deserialize;
use serde_json::Value;
use subtle::ConstantTimeEq;

use crate::error::{AuthError, Result};

/// Where the anti-forgery token and its cookie are looked up
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    pub header: String,
    pub body_field: String,
    /// Checked in order; the first cookie present wins
    pub cookie_names: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            header: "x-csrf-token".to_string(),
            body_field: "csrfToken".to_string(),
            cookie_names: vec![
                "__Host-next-auth.csrf-token".to_string(),
                "next-auth.csrf-token".to_string(),
            ],
        }
    }
}

/// Token part of a csrf cookie value: everything before the first `|` or `%`
pub fn cookie_token(cookie_value: &str) -> &str {
    cookie_value
        .split(['|', '%'])
        .next()
        .unwrap_or_default()
}

/// Find a cookie by name across all `Cookie` headers
pub fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Check the echoed token against the one embedded in the session cookie
///
/// The header takes precedence over the body field. Absence of either side
/// is the same failure as a mismatch.
pub fn verify_csrf(headers: &HeaderMap, body: &Value, config: &CsrfConfig) -> Result<()> {
    let submitted = headers
        .get(config.header.as_str())
        .and_then(|value| value.to_str().ok())
        .filter(|token| !token.is_empty())
        .or_else(|| body.get(&config.body_field).and_then(Value::as_str))
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidCsrfToken)?;

    let cookie = config
        .cookie_names
        .iter()
        .find_map(|name| find_cookie(headers, name))
        .ok_or(AuthError::InvalidCsrfToken)?;

    let expected = cookie_token(cookie);
    if bool::from(expected.as_bytes().ct_eq(submitted.as_bytes())) {
        Ok(())
    } else {
        Err(AuthError::InvalidCsrfToken)
    }
}
