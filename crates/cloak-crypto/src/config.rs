//! Cipher configuration.

use crate::error::CryptoError;

/// Smallest RSA modulus accepted for generation or import.
pub const MIN_RSA_BITS: usize = 2048;

/// Default limit on plaintext size. Message bodies are short, so whole-buffer
/// encryption is used throughout.
pub const DEFAULT_MAX_PLAINTEXT_LEN: usize = 64 * 1024;

/// Tunables for key generation and message encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherConfig {
    /// RSA modulus size for newly generated key pairs
    pub rsa_bits: usize,
    /// Maximum plaintext length in bytes accepted by `encrypt`
    pub max_plaintext_len: usize,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self { rsa_bits: MIN_RSA_BITS, max_plaintext_len: DEFAULT_MAX_PLAINTEXT_LEN }
    }
}

impl CipherConfig {
    /// Reject settings that would weaken or disable the cipher.
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.rsa_bits < MIN_RSA_BITS {
            return Err(CryptoError::InvalidConfig {
                reason: format!("rsa_bits {} is below the minimum of {MIN_RSA_BITS}", self.rsa_bits),
            });
        }
        if self.max_plaintext_len == 0 {
            return Err(CryptoError::InvalidConfig {
                reason: "max_plaintext_len must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(CipherConfig::default().validate().is_ok());
    }

    #[test]
    fn small_modulus_rejected() {
        let config = CipherConfig { rsa_bits: 1024, ..Default::default() };
        assert!(matches!(config.validate(), Err(CryptoError::InvalidConfig { .. })));
    }

    #[test]
    fn zero_limit_rejected() {
        let config = CipherConfig { max_plaintext_len: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(CryptoError::InvalidConfig { .. })));
    }
}
