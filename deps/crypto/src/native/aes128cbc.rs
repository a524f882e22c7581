// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! This mod implements aes-128-cbc encryption & decryption with PKCS#7 padding.

use anyhow::*;
use openssl::symm::Cipher;

fn cipher(key: &[u8], iv: &[u8]) -> Result<Cipher> {
    let cipher = Cipher::aes_128_cbc();
    if key.len() != cipher.key_len() || Some(iv.len()) != cipher.iv_len() {
        bail!(
            "aes-128-cbc invalid key or iv length: key {} iv {}",
            key.len(),
            iv.len()
        );
    }

    Ok(cipher)
}

pub fn decrypt(key: &[u8], encrypted_data: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher(key, iv)?;
    openssl::symm::decrypt(cipher, key, Some(iv), encrypted_data)
        .map_err(|e| anyhow!("aes-128-cbc decrypt failed: {:?}", e))
}

pub fn encrypt(key: &[u8], data: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher(key, iv)?;
    openssl::symm::encrypt(cipher, key, Some(iv), data)
        .map_err(|e| anyhow!("aes-128-cbc encrypt failed: {:?}", e))
}

#[cfg(test)]
mod tests {
    use super::{decrypt, encrypt};
    use rstest::rstest;

    #[rstest]
    #[case(b"0123456789abcdef", b"plaintext1", b"16bytes ivlength")]
    #[case(b"hijklmnopqrstuv0", b"", b"RandomInitVector")]
    fn en_decrypt(#[case] key: &[u8], #[case] plaintext: &[u8], #[case] iv: &[u8]) {
        let ciphertext = encrypt(key, plaintext, iv).expect("encryption failed");
        let plaintext_de = decrypt(key, &ciphertext, iv).expect("decryption failed");
        assert_eq!(plaintext, plaintext_de);
    }
}
