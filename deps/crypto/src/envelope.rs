// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Text representations of an envelope body and its wrapped keys, as they
//! are stored on the ledger: standard base64 with padding.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use zeroize::Zeroizing;

use crate::rsa::{PaddingMode, RSAKeyPair, RSAPublicKey};
use crate::symmetric::{self, SymmetricKey};

/// Encrypt `plaintext` under a freshly generated content key.
///
/// Returns the base64 ciphertext together with the key, which the caller
/// wraps once per recipient with [`wrap_key`].
pub fn encrypt_content(plaintext: &[u8]) -> Result<(String, SymmetricKey)> {
    let key = SymmetricKey::generate();
    let ciphertext = encrypt_content_with_key(&key, plaintext)?;
    Ok((ciphertext, key))
}

pub fn encrypt_content_with_key(key: &SymmetricKey, plaintext: &[u8]) -> Result<String> {
    let ciphertext = symmetric::encrypt(key, plaintext)?;
    Ok(STANDARD.encode(ciphertext))
}

pub fn decrypt_content(key: &SymmetricKey, ciphertext: &str) -> Result<Vec<u8>> {
    let ciphertext = STANDARD
        .decode(ciphertext)
        .context("base64 decode envelope body")?;
    symmetric::decrypt(key, &ciphertext)
}

/// Wrap a content key for one recipient.
///
/// Historical writers RSA-encrypted the UTF-8 text of a printable ASCII key,
/// which is the same bytes as the key itself, so both kinds of key unwrap
/// with [`unwrap_key`].
pub fn wrap_key(key: &SymmetricKey, recipient: &RSAPublicKey) -> Result<String> {
    let wrapped = recipient.encrypt(PaddingMode::PKCS1v15, key.as_bytes())?;
    Ok(STANDARD.encode(wrapped))
}

pub fn unwrap_key(wrapped: &str, own_key: &RSAKeyPair) -> Result<SymmetricKey> {
    let wrapped = STANDARD.decode(wrapped).context("base64 decode wrapped key")?;
    let key = Zeroizing::new(own_key.decrypt(PaddingMode::PKCS1v15, &wrapped)?);
    SymmetricKey::from_bytes(key.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_legacy_key;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("hello-ubl-message")]
    #[case("Grüße aus Köln, 東京 ✓")]
    fn envelope_round_trip(#[case] plaintext: &str) {
        let pair = RSAKeyPair::with_bits(1024).unwrap();

        let (ciphertext, key) = encrypt_content(plaintext.as_bytes()).unwrap();
        let wrapped = wrap_key(&key, &pair.public_key()).unwrap();

        let unwrapped = unwrap_key(&wrapped, &pair).unwrap();
        let decrypted = decrypt_content(&unwrapped, &ciphertext).unwrap();
        assert_eq!(String::from_utf8(decrypted).unwrap(), plaintext);
    }

    #[test]
    fn legacy_key_unwraps() {
        let pair = RSAKeyPair::with_bits(1024).unwrap();
        let key = generate_legacy_key();
        let ciphertext = encrypt_content_with_key(&key, b"legacy body").unwrap();
        let wrapped = wrap_key(&key, &pair.public_key()).unwrap();

        let unwrapped = unwrap_key(&wrapped, &pair).unwrap();
        assert_eq!(unwrapped, key);
        assert_eq!(decrypt_content(&unwrapped, &ciphertext).unwrap(), b"legacy body");
    }

    #[test]
    fn other_recipient_cannot_unwrap() {
        let alice = RSAKeyPair::with_bits(1024).unwrap();
        let bob = RSAKeyPair::with_bits(1024).unwrap();
        let (_, key) = encrypt_content(b"for alice").unwrap();
        let wrapped = wrap_key(&key, &alice.public_key()).unwrap();

        match unwrap_key(&wrapped, &bob) {
            Err(_) => {}
            Ok(other) => assert_ne!(other, key),
        }
    }

    #[rstest]
    #[case("%%%not-base64%%%")]
    #[case("AAAA")]
    fn corrupt_body_is_an_error(#[case] ciphertext: &str) {
        let key = SymmetricKey::generate();
        assert!(decrypt_content(&key, ciphertext).is_err());
    }

    #[test]
    fn ciphertext_is_padded_base64() {
        let (ciphertext, _) = encrypt_content(b"x").unwrap();
        assert_eq!(ciphertext.len(), 24);
        assert!(ciphertext.ends_with("=="));
    }
}
