//! Ledger key handling for Ed25519 and ECDSA secp256k1 accounts.
//!
//! Key strings are accepted in the encodings wallets and the mirror node
//! hand out:
//! - DER hex (`302e0201...` private / `302a3005...` public for Ed25519,
//!   `30300201...` private / `302d3007...` public for ECDSA)
//! - raw hex: 32-byte Ed25519 keys, `0x`-prefixed 32-byte ECDSA private keys,
//!   33 or 65 byte SEC1 ECDSA public keys
//! - PKCS#8 / SPKI PEM for either curve
//!
//! ECDSA messages are hashed with Keccak-256 before signing, as the ledger does.

use std::{fmt, str::FromStr};

use ed25519_dalek::{Signer as _, Verifier as _};
use k256::{
    ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier},
    pkcs8::{DecodePrivateKey, DecodePublicKey},
};
use rand::rngs::OsRng;
use sha3::{Digest, Keccak256};

use crate::{
    crypto::signature::SignatureBytes,
    error::{AuthError, Result},
};

const ED25519_PRIVATE_DER_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];
const ECDSA_PRIVATE_DER_PREFIX: [u8; 18] = [
    0x30, 0x30, 0x02, 0x01, 0x00, 0x30, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a, 0x04, 0x22,
    0x04, 0x20,
];
const ED25519_PUBLIC_DER_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];
const ECDSA_PUBLIC_DER_PREFIX: [u8; 14] = [
    0x30, 0x2d, 0x30, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a, 0x03, 0x22, 0x00,
];

/// Private key used by the server to sign challenge payloads
#[derive(Clone)]
pub enum PrivateKey {
    Ed25519(ed25519_dalek::SigningKey),
    EcdsaSecp256k1(k256::ecdsa::SigningKey),
}

/// Public key used to verify server or user signatures
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Ed25519(ed25519_dalek::VerifyingKey),
    EcdsaSecp256k1(k256::ecdsa::VerifyingKey),
}

impl PrivateKey {
    pub fn generate_ed25519() -> Self {
        PrivateKey::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng))
    }

    pub fn generate_ecdsa() -> Self {
        PrivateKey::EcdsaSecp256k1(k256::ecdsa::SigningKey::random(&mut OsRng))
    }

    /// Sign `message`, returning the raw 64-byte signature
    pub fn sign(&self, message: &[u8]) -> Result<SignatureBytes> {
        match self {
            PrivateKey::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec().into()),
            PrivateKey::EcdsaSecp256k1(key) => {
                let digest = Keccak256::digest(message);
                let signature: k256::ecdsa::Signature = key
                    .sign_prehash(&digest)
                    .map_err(|e| AuthError::Crypto(format!("Failed to sign payload: {e}")))?;
                Ok(signature.to_bytes().to_vec().into())
            }
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Ed25519(key) => PublicKey::Ed25519(key.verifying_key()),
            PrivateKey::EcdsaSecp256k1(key) => PublicKey::EcdsaSecp256k1(*key.verifying_key()),
        }
    }

    /// DER encoding as hex, the format ledger tooling exports
    pub fn to_der_hex(&self) -> String {
        let mut der = Vec::with_capacity(50);
        match self {
            PrivateKey::Ed25519(key) => {
                der.extend_from_slice(&ED25519_PRIVATE_DER_PREFIX);
                der.extend_from_slice(&key.to_bytes());
            }
            PrivateKey::EcdsaSecp256k1(key) => {
                der.extend_from_slice(&ECDSA_PRIVATE_DER_PREFIX);
                der.extend_from_slice(&key.to_bytes());
            }
        }
        hex::encode(der)
    }

    fn from_pem(pem: &str) -> Result<Self> {
        if let Ok(key) = k256::ecdsa::SigningKey::from_pkcs8_pem(pem) {
            return Ok(PrivateKey::EcdsaSecp256k1(key));
        }
        <ed25519_dalek::SigningKey as ed25519_dalek::pkcs8::DecodePrivateKey>::from_pkcs8_pem(pem)
            .map(PrivateKey::Ed25519)
            .map_err(|e| AuthError::Crypto(format!("Unsupported private key PEM: {e}")))
    }

    fn from_der(bytes: &[u8]) -> Result<Self> {
        if let Some(seed) = bytes.strip_prefix(&ED25519_PRIVATE_DER_PREFIX[..]) {
            return ed25519_from_slice(seed);
        }
        if let Some(scalar) = bytes.strip_prefix(&ECDSA_PRIVATE_DER_PREFIX[..]) {
            return ecdsa_private_from_slice(scalar);
        }
        match bytes.len() {
            32 => ed25519_from_slice(bytes),
            // seed followed by the public key
            64 => ed25519_from_slice(&bytes[..32]),
            n => Err(AuthError::Crypto(format!("Unrecognized private key length: {n} bytes"))),
        }
    }
}

impl FromStr for PrivateKey {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with("-----BEGIN") {
            return Self::from_pem(s);
        }
        if let Some(raw) = s.strip_prefix("0x") {
            let bytes = decode_hex(raw)?;
            return ecdsa_private_from_slice(&bytes);
        }
        Self::from_der(&decode_hex(s)?)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            PrivateKey::Ed25519(_) => "Ed25519",
            PrivateKey::EcdsaSecp256k1(_) => "EcdsaSecp256k1",
        };
        write!(f, "PrivateKey::{kind}(..)")
    }
}

impl PublicKey {
    /// Check `signature` over `message`
    ///
    /// Malformed signatures verify as `false` rather than erroring, so callers
    /// cannot distinguish a bad encoding from a bad signature.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            PublicKey::Ed25519(key) => ed25519_dalek::Signature::from_slice(signature)
                .map(|sig| key.verify(message, &sig).is_ok())
                .unwrap_or(false),
            PublicKey::EcdsaSecp256k1(key) => {
                let Ok(sig) = k256::ecdsa::Signature::from_slice(signature) else {
                    return false;
                };
                let digest = Keccak256::digest(message);
                key.verify_prehash(&digest, &sig).is_ok()
            }
        }
    }

    /// Raw key bytes as hex: 32 bytes for Ed25519, compressed SEC1 for ECDSA
    ///
    /// This is the shape the mirror node reports under `key.key`.
    pub fn to_raw_hex(&self) -> String {
        hex::encode(self.raw_bytes())
    }

    pub fn to_der_hex(&self) -> String {
        let mut der = match self {
            PublicKey::Ed25519(_) => ED25519_PUBLIC_DER_PREFIX.to_vec(),
            PublicKey::EcdsaSecp256k1(_) => ECDSA_PUBLIC_DER_PREFIX.to_vec(),
        };
        der.extend_from_slice(&self.raw_bytes());
        hex::encode(der)
    }

    fn raw_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Ed25519(key) => key.to_bytes().to_vec(),
            PublicKey::EcdsaSecp256k1(key) => key.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    fn from_pem(pem: &str) -> Result<Self> {
        if let Ok(key) = k256::ecdsa::VerifyingKey::from_public_key_pem(pem) {
            return Ok(PublicKey::EcdsaSecp256k1(key));
        }
        <ed25519_dalek::VerifyingKey as ed25519_dalek::pkcs8::DecodePublicKey>::from_public_key_pem(
            pem,
        )
        .map(PublicKey::Ed25519)
        .map_err(|e| AuthError::Crypto(format!("Unsupported public key PEM: {e}")))
    }

    fn from_der(bytes: &[u8]) -> Result<Self> {
        if let Some(raw) = bytes.strip_prefix(&ED25519_PUBLIC_DER_PREFIX[..]) {
            return ed25519_public_from_slice(raw);
        }
        if let Some(raw) = bytes.strip_prefix(&ECDSA_PUBLIC_DER_PREFIX[..]) {
            return ecdsa_public_from_slice(raw);
        }
        match bytes.len() {
            32 => ed25519_public_from_slice(bytes),
            33 | 65 => ecdsa_public_from_slice(bytes),
            n => Err(AuthError::Crypto(format!("Unrecognized public key length: {n} bytes"))),
        }
    }
}

impl FromStr for PublicKey {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with("-----BEGIN") {
            return Self::from_pem(s);
        }
        let s = s.strip_prefix("0x").unwrap_or(s);
        Self::from_der(&decode_hex(s)?)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw_hex())
    }
}

/// Shorten key material for debug traces: `302...420`
///
/// Returns `None` when the key is too short to truncate safely.
pub fn truncate_key(key: &str) -> Option<String> {
    if key.len() < 6 || !key.is_ascii() {
        return None;
    }
    Some(format!("{}...{}", &key[..3], &key[key.len() - 3..]))
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| AuthError::Crypto(format!("Invalid key encoding: {e}")))
}

fn ed25519_from_slice(bytes: &[u8]) -> Result<PrivateKey> {
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|_| AuthError::Crypto("Ed25519 private key must be 32 bytes".to_string()))?;
    Ok(PrivateKey::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed)))
}

fn ecdsa_private_from_slice(bytes: &[u8]) -> Result<PrivateKey> {
    k256::ecdsa::SigningKey::from_slice(bytes)
        .map(PrivateKey::EcdsaSecp256k1)
        .map_err(|e| AuthError::Crypto(format!("Invalid ECDSA private key: {e}")))
}

fn ed25519_public_from_slice(bytes: &[u8]) -> Result<PublicKey> {
    let raw: [u8; 32] = bytes
        .try_into()
        .map_err(|_| AuthError::Crypto("Ed25519 public key must be 32 bytes".to_string()))?;
    ed25519_dalek::VerifyingKey::from_bytes(&raw)
        .map(PublicKey::Ed25519)
        .map_err(|e| AuthError::Crypto(format!("Invalid Ed25519 public key: {e}")))
}

fn ecdsa_public_from_slice(bytes: &[u8]) -> Result<PublicKey> {
    k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
        .map(PublicKey::EcdsaSecp256k1)
        .map_err(|e| AuthError::Crypto(format!("Invalid ECDSA public key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both_kinds() -> [PrivateKey; 2] {
        [PrivateKey::generate_ed25519(), PrivateKey::generate_ecdsa()]
    }

    #[test]
    fn sign_then_verify_with_matching_key() {
        for key in both_kinds() {
            let sig = key.sign(b"hello ledger").unwrap();
            assert_eq!(sig.len(), 64);
            assert!(key.public_key().verify(b"hello ledger", sig.as_bytes()));
        }
    }

    #[test]
    fn verify_fails_with_other_key_or_message() {
        for key in both_kinds() {
            let other = match key {
                PrivateKey::Ed25519(_) => PrivateKey::generate_ed25519(),
                PrivateKey::EcdsaSecp256k1(_) => PrivateKey::generate_ecdsa(),
            };
            let sig = key.sign(b"payload").unwrap();
            assert!(!other.public_key().verify(b"payload", sig.as_bytes()));
            assert!(!key.public_key().verify(b"payloaD", sig.as_bytes()));
        }
    }

    #[test]
    fn malformed_signature_is_just_invalid() {
        let key = PrivateKey::generate_ed25519();
        assert!(!key.public_key().verify(b"payload", &[1, 2, 3]));
        let key = PrivateKey::generate_ecdsa();
        assert!(!key.public_key().verify(b"payload", &[]));
    }

    #[test]
    fn der_hex_round_trips_through_from_str() {
        for key in both_kinds() {
            let parsed: PrivateKey = key.to_der_hex().parse().unwrap();
            assert_eq!(parsed.public_key(), key.public_key());

            let public: PublicKey = key.public_key().to_der_hex().parse().unwrap();
            assert_eq!(public, key.public_key());
        }
    }

    #[test]
    fn raw_public_hex_is_understood() {
        for key in both_kinds() {
            let public: PublicKey = key.public_key().to_raw_hex().parse().unwrap();
            assert_eq!(public, key.public_key());
        }
    }

    #[test]
    fn prefixed_raw_hex_is_an_ecdsa_private_key() {
        let key = PrivateKey::generate_ecdsa();
        let PrivateKey::EcdsaSecp256k1(inner) = &key else {
            unreachable!()
        };
        let raw = format!("0x{}", hex::encode(inner.to_bytes()));
        let parsed: PrivateKey = raw.parse().unwrap();
        assert_eq!(parsed.public_key(), key.public_key());
    }

    #[test]
    fn bare_32_byte_hex_is_an_ed25519_private_key() {
        let key = PrivateKey::generate_ed25519();
        let PrivateKey::Ed25519(inner) = &key else {
            unreachable!()
        };
        let parsed: PrivateKey = hex::encode(inner.to_bytes()).parse().unwrap();
        assert_eq!(parsed.public_key(), key.public_key());
    }

    #[test]
    fn garbage_keys_are_rejected() {
        assert!(matches!("not hex".parse::<PrivateKey>(), Err(AuthError::Crypto(_))));
        assert!(matches!("abcd".parse::<PrivateKey>(), Err(AuthError::Crypto(_))));
        assert!(matches!("abcd".parse::<PublicKey>(), Err(AuthError::Crypto(_))));
        assert!(
            "-----BEGIN PUBLIC KEY-----\ntest\n-----END PUBLIC KEY-----"
                .parse::<PublicKey>()
                .is_err()
        );
    }

    #[test]
    fn truncates_long_keys_only() {
        assert_eq!(truncate_key("302e020100abc").as_deref(), Some("302...abc"));
        assert_eq!(truncate_key("short"), None);
    }
}
