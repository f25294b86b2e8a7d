pub mod challenge;
pub mod jwt;
pub mod keypair;
pub mod payload;
pub mod signature;

// Re-export main items for easier access
pub use keypair::{truncate_key, PrivateKey, PublicKey};
pub use payload::canonical_bytes;
pub use signature::SignatureBytes;
