// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! APIs for the content key of a message envelope

use std::fmt;

use anyhow::{bail, Result};
use rand::Rng;
use zeroize::Zeroizing;

#[cfg(feature = "openssl")]
use crate::native::*;

#[cfg(all(feature = "rust-crypto", not(feature = "openssl")))]
use crate::rust::*;

use crate::rand::random_bytes;

pub const AES_128_KEY_BYTES: usize = 16;

/// IV used for every envelope body. Stored messages were written with this
/// value, so it is part of the data format and must not change.
pub const CONTENT_IV: &[u8; 16] = b"RandomInitVector";

/// A 128-bit AES key. The bytes are wiped when the key is dropped.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey(Zeroizing<Vec<u8>>);

impl SymmetricKey {
    /// Fresh key from the CSPRNG. Used for every new envelope.
    pub fn generate() -> Self {
        Self(Zeroizing::new(random_bytes::<AES_128_KEY_BYTES>().to_vec()))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let bytes = Zeroizing::new(bytes);
        if bytes.len() != AES_128_KEY_BYTES {
            bail!(
                "content key must be {AES_128_KEY_BYTES} bytes, got {}",
                bytes.len()
            );
        }

        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(**redacted**)")
    }
}

/// Key generator used by historical writers: sixteen printable ASCII
/// characters in the code point range 33..=124.
///
/// Only kept to reproduce legacy envelopes. New envelopes use
/// [`SymmetricKey::generate`].
pub fn generate_legacy_key() -> SymmetricKey {
    let mut rng = rand::thread_rng();
    let bytes = (0..AES_128_KEY_BYTES)
        .map(|_| rng.gen_range(33u8..125))
        .collect();
    SymmetricKey(Zeroizing::new(bytes))
}

/// Encrypt `plaintext` with AES-128-CBC, PKCS#7 padding and [`CONTENT_IV`].
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    aes128cbc::encrypt(key.as_bytes(), plaintext, CONTENT_IV)
}

/// Decrypt the given `ciphertext`. Fails on a length that is not a multiple
/// of the block size or on bad padding.
pub fn decrypt(key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    aes128cbc::decrypt(key.as_bytes(), ciphertext, CONTENT_IV)
}
