//! Cloak Cryptographic Primitives
//!
//! Hybrid public-key encryption for one-to-one messages. Every message is
//! sealed under a fresh symmetric key, and that key is wrapped to the
//! recipient's RSA public key. Only the holder of the matching private key can
//! read the message.
//!
//! # Key Lifecycle
//!
//! Each user owns one long-lived RSA key pair. The public half is published so
//! others can address messages to them; the private half never leaves the
//! owning client. Per-message keys live only for the duration of one
//! `encrypt` or `decrypt` call.
//!
//! ```text
//! RSA Key Pair (per user, long-lived)
//!        │
//!        ├── public  → published (PEM, SPKI)
//!        └── private → client custody only (PEM, PKCS#8)
//!
//! Per message:
//!   random AES-256 key + random IV
//!        │
//!        ├── AES-256-GCM(plaintext) → cipherText
//!        └── RSA-OAEP(key)          → wrappedKey
//! ```
//!
//! # Security
//!
//! Confidentiality:
//! - RSA-OAEP with SHA-256, moduli of at least 2048 bits
//! - AES-256-GCM body encryption with a fresh key and IV per message
//!
//! Integrity:
//! - The GCM tag rejects any modification of ciphertext, IV or wrapped key
//! - Decryption failures are opaque: one error, no stage information
//!
//! Not provided:
//! - Sender authentication (envelopes are unsigned)
//! - Forward secrecy (a leaked private key exposes all past messages)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backend;
pub mod cipher;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod keys;

#[cfg(test)]
mod test_keys;

pub use backend::{
    BackendRng, CryptoBackend, IV_SIZE, RustCryptoBackend, SYMMETRIC_KEY_SIZE, SymmetricKey,
    TAG_SIZE,
};
pub use cipher::HybridCipher;
pub use codec::{
    PEM_LINE_WIDTH, PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL, PemBlock, decode_base64, decode_pem,
    decode_pem_block, encode_base64, encode_pem,
};
pub use config::{CipherConfig, DEFAULT_MAX_PLAINTEXT_LEN, MIN_RSA_BITS};
pub use envelope::EncryptedMessage;
pub use error::CryptoError;
pub use keys::{KeyHandle, KeyPair, KeyProvider, KeyUsage};
