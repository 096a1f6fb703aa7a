//! Fuzz target for the key codec
//!
//! # Strategy
//!
//! - Raw text straight into the PEM decoder
//! - Well-formed blocks with arbitrary labels and bodies, then mutated
//!
//! # Invariants
//!
//! - Decoding never panics
//! - encode → decode returns the original bytes and label
//! - Any accepted input re-encodes to a block that decodes identically

#![no_main]

use arbitrary::Arbitrary;
use cloak_crypto::{decode_pem_block, encode_pem};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Input {
    Raw(String),
    Framed { label: Label, body: Vec<u8>, mutation: Option<Mutation> },
}

#[derive(Debug, Arbitrary)]
enum Label {
    Public,
    Private,
    Custom(String),
}

#[derive(Debug, Arbitrary)]
enum Mutation {
    InsertWhitespace(usize),
    Truncate(usize),
    AppendGarbage(String),
    RewriteFooter(String),
}

fuzz_target!(|input: Input| {
    match input {
        Input::Raw(text) => {
            if let Ok(block) = decode_pem_block(&text) {
                let reencoded = encode_pem(&block.bytes, &block.label);
                let again = decode_pem_block(&reencoded).expect("re-encoded block must decode");
                assert_eq!(again, block);
            }
        },
        Input::Framed { label, body, mutation } => {
            let label = match label {
                Label::Public => "PUBLIC KEY".to_string(),
                Label::Private => "PRIVATE KEY".to_string(),
                Label::Custom(l) => l,
            };
            // Labels containing dashes or line breaks cannot frame a block
            let well_formed = !label.is_empty() && !label.contains('-') && !label.contains('\n');

            let mut pem = encode_pem(&body, &label);

            match mutation {
                None => {
                    if well_formed {
                        let block = decode_pem_block(&pem).expect("encoded block must decode");
                        assert_eq!(block.bytes, body);
                        assert_eq!(block.label, label);
                    }
                },
                Some(Mutation::InsertWhitespace(at)) => {
                    let at = at % (pem.len() + 1);
                    if pem.is_char_boundary(at) {
                        pem.insert(at, '\n');
                    }
                    let _ = decode_pem_block(&pem);
                },
                Some(Mutation::Truncate(len)) => {
                    let len = len % (pem.len() + 1);
                    if pem.is_char_boundary(len) {
                        pem.truncate(len);
                    }
                    let _ = decode_pem_block(&pem);
                },
                Some(Mutation::AppendGarbage(garbage)) => {
                    pem.push_str(&garbage);
                    let _ = decode_pem_block(&pem);
                },
                Some(Mutation::RewriteFooter(other)) => {
                    if let Some(start) = pem.rfind("-----END ") {
                        pem.truncate(start);
                        pem.push_str(&format!("-----END {other}-----"));
                    }
                    match decode_pem_block(&pem) {
                        Ok(block) if well_formed => assert_eq!(block.label, other),
                        _ => {},
                    }
                },
            }
        },
    }
});
