//! Textual encoding of key material and envelope fields.
//!
//! Long-lived keys travel as PEM-style blocks: a labeled header and footer
//! around a base64 body wrapped at 64 columns. Per-message envelope fields use
//! bare base64 with no framing.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::error::CryptoError;

/// Width of a PEM body line.
pub const PEM_LINE_WIDTH: usize = 64;

/// Label for SPKI public keys.
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// Label for PKCS#8 private keys.
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

const BEGIN_PREFIX: &str = "-----BEGIN ";
const END_PREFIX: &str = "-----END ";
const DASHES: &str = "-----";

/// A decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    /// Label from the header, e.g. `PUBLIC KEY`
    pub label: String,
    /// Decoded body bytes
    pub bytes: Vec<u8>,
}

/// Encode raw bytes as a labeled PEM block.
///
/// Deterministic. Lines are joined with `\n` and there is no trailing newline.
pub fn encode_pem(bytes: &[u8], label: &str) -> String {
    let body = BASE64.encode(bytes);

    let mut out = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 2 * label.len() + 32);
    out.push_str(BEGIN_PREFIX);
    out.push_str(label);
    out.push_str(DASHES);
    out.push('\n');

    // base64 output is ASCII, so chunking bytes never splits a character
    for line in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push('\n');
    }

    out.push_str(END_PREFIX);
    out.push_str(label);
    out.push_str(DASHES);
    out
}

/// Decode a PEM block, returning only the body bytes.
pub fn decode_pem(text: &str) -> Result<Vec<u8>, CryptoError> {
    decode_pem_block(text).map(|block| block.bytes)
}

/// Decode a PEM block, returning label and body.
///
/// All whitespace inside the body is ignored. Text before the header or after
/// the footer is rejected, as is a footer whose label differs from the
/// header's.
pub fn decode_pem_block(text: &str) -> Result<PemBlock, CryptoError> {
    let text = text.trim();

    let after_begin = text.strip_prefix(BEGIN_PREFIX).ok_or_else(|| malformed("missing BEGIN header"))?;
    let label_end = after_begin.find(DASHES).ok_or_else(|| malformed("unterminated BEGIN header"))?;
    let label = &after_begin[..label_end];
    if label.is_empty() || label.contains('\n') {
        return Err(malformed("invalid header label"));
    }

    let rest = &after_begin[label_end + DASHES.len()..];
    let footer_start = rest.find(END_PREFIX).ok_or_else(|| malformed("missing END footer"))?;
    let body = &rest[..footer_start];

    let footer = &rest[footer_start + END_PREFIX.len()..];
    let footer_label = footer.strip_suffix(DASHES).ok_or_else(|| malformed("unterminated END footer"))?;
    if footer_label != label {
        return Err(malformed(&format!("footer label {footer_label:?} does not match header label {label:?}")));
    }

    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| malformed(&format!("invalid base64 body: {e}")))?;

    Ok(PemBlock { label: label.to_string(), bytes })
}

/// Standard base64 of an envelope field.
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Inverse of [`encode_base64`]. Input is taken verbatim.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64
        .decode(text.as_bytes())
        .map_err(|e| malformed(&format!("invalid base64: {e}")))
}

fn malformed(reason: &str) -> CryptoError {
    CryptoError::MalformedKeyEncoding { reason: reason.to_string() }
}
