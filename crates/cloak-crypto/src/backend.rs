//! Cryptographic capability abstraction.
//!
//! The hybrid protocol only needs a handful of primitives: asymmetric key
//! pairs, key wrap/unwrap, authenticated symmetric encryption and a secure
//! random source. [`CryptoBackend`] names exactly those, so the protocol in
//! [`crate::cipher`] never touches a concrete library and tests can substitute
//! their own randomness.
//!
//! [`RustCryptoBackend`] is the production binding: RSA-OAEP with SHA-256 for
//! key wrap, AES-256-GCM for message bodies, OS entropy via getrandom.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rsa::{
    Oaep, RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
    traits::PublicKeyParts,
};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::{config::MIN_RSA_BITS, error::CryptoError};

/// Size of a per-message symmetric key (AES-256).
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Size of the AES-GCM initialization vector.
pub const IV_SIZE: usize = 12;

/// AES-GCM authentication tag size.
pub const TAG_SIZE: usize = 16;

/// A one-time symmetric key.
///
/// Used for exactly one message and zeroized on drop.
pub struct SymmetricKey {
    bytes: [u8; SYMMETRIC_KEY_SIZE],
}

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Draw a fresh key from the backend's secure random source.
    pub fn generate<B: CryptoBackend>(backend: &B) -> Self {
        let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
        backend.random_bytes(&mut bytes);
        Self { bytes }
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// Primitive operations the hybrid protocol is built on.
///
/// # Invariants
///
/// - `random_bytes()` MUST use a cryptographically secure source in
///   production
/// - `unwrap_key()` and `symmetric_decrypt()` report every failure as
///   [`CryptoError::DecryptionFailed`] and never return partial output
/// - Key generation calls are independent: no two calls yield related keys
pub trait CryptoBackend: Clone + Send + Sync + 'static {
    /// Encrypt-side asymmetric key.
    type PublicKey: Clone + Send + Sync;

    /// Decrypt-side asymmetric key.
    type PrivateKey: Clone + Send + Sync;

    /// Fills the provided buffer with secure random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generate a new asymmetric key pair with the given modulus size.
    fn generate_key_pair(
        &self,
        bits: usize,
    ) -> Result<(Self::PublicKey, Self::PrivateKey), CryptoError>;

    /// Public half of a private key.
    fn derive_public_key(&self, private: &Self::PrivateKey) -> Self::PublicKey;

    /// Export a public key as DER (SPKI).
    fn export_public_key(&self, key: &Self::PublicKey) -> Result<Vec<u8>, CryptoError>;

    /// Export a private key as DER (PKCS#8).
    fn export_private_key(&self, key: &Self::PrivateKey)
    -> Result<Zeroizing<Vec<u8>>, CryptoError>;

    /// Parse a DER (SPKI) public key.
    fn import_public_key(&self, der: &[u8]) -> Result<Self::PublicKey, CryptoError>;

    /// Parse a DER (PKCS#8) private key.
    fn import_private_key(&self, der: &[u8]) -> Result<Self::PrivateKey, CryptoError>;

    /// Encrypt a symmetric key to a public key.
    fn wrap_key(&self, public: &Self::PublicKey, key: &SymmetricKey)
    -> Result<Vec<u8>, CryptoError>;

    /// Recover a symmetric key with the matching private key.
    fn unwrap_key(
        &self,
        private: &Self::PrivateKey,
        wrapped: &[u8],
    ) -> Result<SymmetricKey, CryptoError>;

    /// Authenticated encryption of a message body.
    fn symmetric_encrypt(
        &self,
        key: &SymmetricKey,
        iv: &[u8; IV_SIZE],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Authenticated decryption of a message body.
    fn symmetric_decrypt(
        &self,
        key: &SymmetricKey,
        iv: &[u8; IV_SIZE],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;
}

/// RNG adapter that delegates to a [`CryptoBackend`].
///
/// Lets the `rsa` crate draw padding seeds, blinding factors and primes from
/// the same capability as everything else.
pub struct BackendRng<'a, B: CryptoBackend> {
    backend: &'a B,
}

impl<'a, B: CryptoBackend> BackendRng<'a, B> {
    /// Borrow a backend as an RNG.
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }
}

impl<B: CryptoBackend> rand::RngCore for BackendRng<'_, B> {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.backend.random_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.backend.random_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.backend.random_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.backend.random_bytes(dest);
        Ok(())
    }
}

impl<B: CryptoBackend> rand::CryptoRng for BackendRng<'_, B> {}

/// Production backend: RSA-OAEP-SHA256, AES-256-GCM, OS randomness.
///
/// # Panics
///
/// `random_bytes` panics if the OS RNG fails. Continuing without working
/// entropy would produce predictable keys and nonces.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoBackend;

impl RustCryptoBackend {
    /// Create the production backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CryptoBackend for RustCryptoBackend {
    type PublicKey = RsaPublicKey;
    type PrivateKey = RsaPrivateKey;

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - cannot generate keys securely");
    }

    fn generate_key_pair(&self, bits: usize) -> Result<(RsaPublicKey, RsaPrivateKey), CryptoError> {
        let mut rng = BackendRng::new(self);
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CryptoError::KeyGeneration { reason: e.to_string() })?;
        let public = RsaPublicKey::from(&private);
        Ok((public, private))
    }

    fn derive_public_key(&self, private: &RsaPrivateKey) -> RsaPublicKey {
        private.to_public_key()
    }

    fn export_public_key(&self, key: &RsaPublicKey) -> Result<Vec<u8>, CryptoError> {
        key.to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })
    }

    fn export_private_key(&self, key: &RsaPrivateKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        key.to_pkcs8_der()
            .map(|doc| Zeroizing::new(doc.as_bytes().to_vec()))
            .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })
    }

    fn import_public_key(&self, der: &[u8]) -> Result<RsaPublicKey, CryptoError> {
        let key = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })?;
        check_modulus(key.n().bits())?;
        Ok(key)
    }

    fn import_private_key(&self, der: &[u8]) -> Result<RsaPrivateKey, CryptoError> {
        let key = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })?;
        check_modulus(key.n().bits())?;
        Ok(key)
    }

    fn wrap_key(&self, public: &RsaPublicKey, key: &SymmetricKey) -> Result<Vec<u8>, CryptoError> {
        let mut rng = BackendRng::new(self);
        public
            .encrypt(&mut rng, Oaep::new::<Sha256>(), key.as_bytes())
            .map_err(|e| CryptoError::Encryption { reason: e.to_string() })
    }

    fn unwrap_key(
        &self,
        private: &RsaPrivateKey,
        wrapped: &[u8],
    ) -> Result<SymmetricKey, CryptoError> {
        let mut rng = BackendRng::new(self);
        let raw = private
            .decrypt_blinded(&mut rng, Oaep::new::<Sha256>(), wrapped)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        let bytes: [u8; SYMMETRIC_KEY_SIZE] =
            raw.as_slice().try_into().map_err(|_| CryptoError::DecryptionFailed)?;
        Ok(SymmetricKey::from_bytes(bytes))
    }

    fn symmetric_encrypt(
        &self,
        key: &SymmetricKey,
        iv: &[u8; IV_SIZE],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Encryption { reason: e.to_string() })?;
        cipher
            .encrypt(Nonce::from_slice(iv), plaintext)
            .map_err(|_| CryptoError::Encryption { reason: "AES-GCM encryption failed".to_string() })
    }

    fn symmetric_decrypt(
        &self,
        key: &SymmetricKey,
        iv: &[u8; IV_SIZE],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher =
            Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::DecryptionFailed)?;
        cipher.decrypt(Nonce::from_slice(iv), ciphertext).map_err(|_| CryptoError::DecryptionFailed)
    }
}

fn check_modulus(bits: usize) -> Result<(), CryptoError> {
    if bits < MIN_RSA_BITS {
        return Err(CryptoError::InvalidKeyMaterial {
            reason: format!("{bits}-bit RSA key is below the minimum of {MIN_RSA_BITS}"),
        });
    }
    Ok(())
}
