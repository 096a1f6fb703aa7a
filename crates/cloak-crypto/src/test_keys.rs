//! Shared key fixtures for unit tests.
//!
//! RSA generation dominates test time, so each identity is generated once per
//! test binary.

use std::sync::OnceLock;

use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::{
    backend::{CryptoBackend, RustCryptoBackend},
    codec::{PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL, encode_pem},
    config::MIN_RSA_BITS,
    keys::KeyPair,
};

type RawPair = (RsaPublicKey, RsaPrivateKey);

static ALICE_RAW: OnceLock<RawPair> = OnceLock::new();
static BOB_RAW: OnceLock<RawPair> = OnceLock::new();
static ALICE: OnceLock<KeyPair> = OnceLock::new();
static BOB: OnceLock<KeyPair> = OnceLock::new();

fn generate() -> RawPair {
    RustCryptoBackend::new().generate_key_pair(MIN_RSA_BITS).unwrap()
}

fn to_pem(raw: &RawPair) -> KeyPair {
    let backend = RustCryptoBackend::new();
    let public_der = backend.export_public_key(&raw.0).unwrap();
    let private_der = backend.export_private_key(&raw.1).unwrap();
    KeyPair::from_pem(
        encode_pem(&public_der, PUBLIC_KEY_LABEL),
        Zeroizing::new(encode_pem(&private_der, PRIVATE_KEY_LABEL)),
    )
}

pub(crate) fn alice_raw() -> &'static RawPair {
    ALICE_RAW.get_or_init(generate)
}

pub(crate) fn bob_raw() -> &'static RawPair {
    BOB_RAW.get_or_init(generate)
}

pub(crate) fn alice() -> &'static KeyPair {
    ALICE.get_or_init(|| to_pem(alice_raw()))
}

pub(crate) fn bob() -> &'static KeyPair {
    BOB.get_or_init(|| to_pem(bob_raw()))
}
