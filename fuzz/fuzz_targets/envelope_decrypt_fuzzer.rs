//! Fuzz target for envelope decryption
//!
//! Feeds attacker-controlled envelopes to the decrypt path of a fixed
//! recipient key.
//!
//! # Strategy
//!
//! - Fully arbitrary field text (invalid base64, wrong lengths, empty)
//! - Valid envelopes with one byte flipped in one field
//! - Valid envelopes with fields swapped between two messages
//!
//! # Invariants
//!
//! - Decryption never panics
//! - Arbitrary input only ever fails with `DecryptionFailed` or
//!   `MalformedPlaintext`
//! - Any real modification of a valid envelope fails with `DecryptionFailed`
//! - Unmodified envelopes decrypt to the original text

#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use cloak_crypto::{
    decode_base64, encode_base64, CipherConfig, CryptoError, EncryptedMessage, HybridCipher,
    KeyHandle, RustCryptoBackend,
};
use libfuzzer_sys::fuzz_target;

struct Recipient {
    cipher: HybridCipher<RustCryptoBackend>,
    public: KeyHandle<RustCryptoBackend>,
    private: KeyHandle<RustCryptoBackend>,
}

static RECIPIENT: OnceLock<Recipient> = OnceLock::new();

fn recipient() -> &'static Recipient {
    RECIPIENT.get_or_init(|| {
        let cipher = HybridCipher::new(RustCryptoBackend::new(), CipherConfig::default())
            .expect("default config is valid");
        let pair = cipher.generate_key_pair().expect("key generation");
        let public = cipher.keys().import_public_key(pair.public_key()).expect("public import");
        let private = cipher.keys().import_private_key(pair.private_key()).expect("private import");
        Recipient { cipher, public, private }
    })
}

#[derive(Debug, Arbitrary)]
enum Field {
    CipherText,
    WrappedKey,
    Iv,
}

#[derive(Debug, Arbitrary)]
enum Scenario {
    Arbitrary { cipher_text: String, wrapped_key: String, iv: String },
    BitFlip { plaintext: String, field: Field, index: usize, mask: u8 },
    Swap { first: String, second: String, field: Field },
}

fn field_of<'a>(envelope: &'a EncryptedMessage, field: &Field) -> &'a str {
    match field {
        Field::CipherText => envelope.cipher_text(),
        Field::WrappedKey => envelope.wrapped_key(),
        Field::Iv => envelope.iv(),
    }
}

fn replace(envelope: &EncryptedMessage, field: &Field, value: String) -> EncryptedMessage {
    match field {
        Field::CipherText => {
            EncryptedMessage::from_parts(value, envelope.wrapped_key(), envelope.iv())
        },
        Field::WrappedKey => {
            EncryptedMessage::from_parts(envelope.cipher_text(), value, envelope.iv())
        },
        Field::Iv => EncryptedMessage::from_parts(envelope.cipher_text(), envelope.wrapped_key(), value),
    }
}

fuzz_target!(|scenario: Scenario| {
    let r = recipient();

    match scenario {
        Scenario::Arbitrary { cipher_text, wrapped_key, iv } => {
            let envelope = EncryptedMessage::from_parts(cipher_text, wrapped_key, iv);
            match r.cipher.decrypt_with(&envelope, &r.private) {
                Ok(_) | Err(CryptoError::DecryptionFailed | CryptoError::MalformedPlaintext) => {},
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        },
        Scenario::BitFlip { plaintext, field, index, mask } => {
            let Ok(envelope) = r.cipher.encrypt_for(&plaintext, &r.public) else {
                return;
            };

            let mut bytes = decode_base64(field_of(&envelope, &field)).expect("fresh field decodes");
            if bytes.is_empty() || mask == 0 {
                let decrypted = r.cipher.decrypt_with(&envelope, &r.private);
                assert_eq!(decrypted.as_deref(), Ok(plaintext.as_str()));
                return;
            }

            let index = index % bytes.len();
            bytes[index] ^= mask;
            let tampered = replace(&envelope, &field, encode_base64(&bytes));

            assert_eq!(
                r.cipher.decrypt_with(&tampered, &r.private),
                Err(CryptoError::DecryptionFailed)
            );
        },
        Scenario::Swap { first, second, field } => {
            let (Ok(a), Ok(b)) =
                (r.cipher.encrypt_for(&first, &r.public), r.cipher.encrypt_for(&second, &r.public))
            else {
                return;
            };

            let mixed = replace(&a, &field, field_of(&b, &field).to_string());
            assert_eq!(r.cipher.decrypt_with(&mixed, &r.private), Err(CryptoError::DecryptionFailed));
        },
    }
});
