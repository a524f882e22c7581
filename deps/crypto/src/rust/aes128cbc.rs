// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! This mod implements aes-128-cbc encryption & decryption with PKCS#7 padding.

use aes::Aes128;
use anyhow::*;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

type Encryptor = cbc::Encryptor<Aes128>;
type Decryptor = cbc::Decryptor<Aes128>;

pub fn decrypt(key: &[u8], encrypted_data: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    let decryptor = Decryptor::new_from_slices(key, iv)
        .map_err(|e| anyhow!("aes-128-cbc invalid key or iv: {:?}", e))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(encrypted_data)
        .map_err(|e| anyhow!("aes-128-cbc decrypt failed: {:?}", e))
}

pub fn encrypt(key: &[u8], data: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    let encryptor = Encryptor::new_from_slices(key, iv)
        .map_err(|e| anyhow!("aes-128-cbc invalid key or iv: {:?}", e))?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(data))
}
