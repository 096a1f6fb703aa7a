//! Hybrid encryption: per-message AES-256-GCM key wrapped with RSA-OAEP.
//!
//! RSA can only encrypt a few hundred bytes, so it never sees the message.
//! Each message gets a fresh symmetric key and IV; the key is wrapped to the
//! recipient's public key and shipped alongside the ciphertext. Compromise of
//! one message key exposes exactly one message.
//!
//! ```text
//! plaintext ──AES-256-GCM(k, iv)──▶ cipherText
//! k ─────────RSA-OAEP(recipient)──▶ wrappedKey
//! iv ───────────────────────────────▶ iv
//! ```
//!
//! # Security
//!
//! - Fresh key and IV per call: identical plaintexts never produce identical
//!   envelopes
//! - GCM tag covers the body: any modification fails decryption
//! - Unwrap failures and body failures both surface as
//!   [`CryptoError::DecryptionFailed`], and a failed unwrap still runs the body
//!   decryption with a decoy key, so neither the result nor the work done
//!   reveals which stage rejected the envelope

use zeroize::Zeroizing;

use crate::{
    backend::{CryptoBackend, IV_SIZE, SymmetricKey},
    codec::{decode_base64, encode_base64},
    config::CipherConfig,
    envelope::EncryptedMessage,
    error::CryptoError,
    keys::{KeyHandle, KeyPair, KeyProvider},
};

/// Encrypts and decrypts message envelopes.
///
/// Stateless apart from its configuration: any number of calls may run
/// concurrently on clones.
#[derive(Debug, Clone)]
pub struct HybridCipher<B: CryptoBackend> {
    keys: KeyProvider<B>,
}

impl<B: CryptoBackend> HybridCipher<B> {
    /// Create a cipher with the given backend and configuration.
    pub fn new(backend: B, config: CipherConfig) -> Result<Self, CryptoError> {
        Ok(Self { keys: KeyProvider::new(backend, config)? })
    }

    /// Wrap an existing key provider.
    pub fn with_provider(keys: KeyProvider<B>) -> Self {
        Self { keys }
    }

    /// Key provider used for generation and import.
    pub fn keys(&self) -> &KeyProvider<B> {
        &self.keys
    }

    /// Generate a recipient key pair.
    pub fn generate_key_pair(&self) -> Result<KeyPair, CryptoError> {
        self.keys.generate_key_pair()
    }

    /// Encrypt `plaintext` for the holder of `recipient_public_key` (PEM).
    pub fn encrypt(
        &self,
        plaintext: &str,
        recipient_public_key: &str,
    ) -> Result<EncryptedMessage, CryptoError> {
        let recipient = self.keys.import_public_key(recipient_public_key)?;
        self.encrypt_for(plaintext, &recipient)
    }

    /// Encrypt `plaintext` with an already imported encrypt handle.
    pub fn encrypt_for(
        &self,
        plaintext: &str,
        recipient: &KeyHandle<B>,
    ) -> Result<EncryptedMessage, CryptoError> {
        let public = recipient.encrypt_key()?;

        let max = self.keys.config().max_plaintext_len;
        if plaintext.len() > max {
            return Err(CryptoError::MessageTooLarge { len: plaintext.len(), max });
        }

        let backend = self.keys.backend();
        let key = SymmetricKey::generate(backend);
        let mut iv = [0u8; IV_SIZE];
        backend.random_bytes(&mut iv);

        let cipher_text = backend.symmetric_encrypt(&key, &iv, plaintext.as_bytes())?;
        let wrapped_key = backend.wrap_key(public, &key)?;

        Ok(EncryptedMessage::from_parts(
            encode_base64(&cipher_text),
            encode_base64(&wrapped_key),
            encode_base64(&iv),
        ))
    }

    /// Decrypt an envelope with the recipient's private key (PEM).
    pub fn decrypt(
        &self,
        message: &EncryptedMessage,
        recipient_private_key: &str,
    ) -> Result<String, CryptoError> {
        let recipient = self.keys.import_private_key(recipient_private_key)?;
        self.decrypt_with(message, &recipient)
    }

    /// Decrypt an envelope with an already imported decrypt handle.
    pub fn decrypt_with(
        &self,
        message: &EncryptedMessage,
        recipient: &KeyHandle<B>,
    ) -> Result<String, CryptoError> {
        let private = recipient.decrypt_key()?;
        let backend = self.keys.backend();

        let unwrapped = decode_base64(message.wrapped_key())
            .map_err(|_| CryptoError::DecryptionFailed)
            .and_then(|wrapped| backend.unwrap_key(private, &wrapped));
        let key_ok = unwrapped.is_ok();
        let key = unwrapped.unwrap_or_else(|_| SymmetricKey::generate(backend));

        let iv = decode_iv(message.iv());
        let body = decode_base64(message.cipher_text());

        let plaintext = match (iv, body) {
            (Ok(iv), Ok(body)) => backend.symmetric_decrypt(&key, &iv, &body).map(Zeroizing::new),
            _ => Err(CryptoError::DecryptionFailed),
        };

        let plaintext = match plaintext {
            Ok(bytes) if key_ok => bytes,
            _ => return Err(CryptoError::DecryptionFailed),
        };

        String::from_utf8(plaintext.to_vec()).map_err(|_| CryptoError::MalformedPlaintext)
    }
}

fn decode_iv(text: &str) -> Result<[u8; IV_SIZE], CryptoError> {
    let bytes = decode_base64(text).map_err(|_| CryptoError::DecryptionFailed)?;
    bytes.as_slice().try_into().map_err(|_| CryptoError::DecryptionFailed)
}
