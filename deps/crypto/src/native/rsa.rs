// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use anyhow::*;
use openssl::{
    encrypt::{Decrypter, Encrypter},
    hash::MessageDigest,
    pkey::{PKey, Private, Public},
    rsa::{Padding, Rsa},
};
use zeroize::Zeroizing;

use crate::rsa::{PaddingMode, RSA_PUBKEY_LENGTH};

#[derive(Debug, Clone)]
pub struct RSAKeyPair {
    private_key: PKey<Private>,
    public_key: PKey<Public>,
}

impl RSAKeyPair {
    pub fn new() -> Result<RSAKeyPair> {
        Self::with_bits(RSA_PUBKEY_LENGTH)
    }

    pub fn with_bits(bits: usize) -> Result<RSAKeyPair> {
        let rsa = Rsa::generate(bits as u32)?;
        Self::from_private_key(PKey::from_rsa(rsa)?)
    }

    fn from_private_key(private_key: PKey<Private>) -> Result<Self> {
        let public_key = PKey::public_key_from_der(&private_key.public_key_to_der()?)?;
        Ok(Self {
            private_key,
            public_key,
        })
    }

    pub fn decrypt(&self, mode: PaddingMode, cipher_text: &[u8]) -> Result<Vec<u8>> {
        let mut decrypter = Decrypter::new(&self.private_key)?;
        match mode {
            // Explicit SHA-256 so both backends agree on OAEP parameters.
            PaddingMode::OAEP => {
                decrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
                decrypter.set_rsa_oaep_md(MessageDigest::sha256())?;
                decrypter.set_rsa_mgf1_md(MessageDigest::sha256())?;
            }
            PaddingMode::PKCS1v15 => decrypter.set_rsa_padding(Padding::PKCS1)?,
        }

        let mut plaintext = vec![0; decrypter.decrypt_len(cipher_text)?];
        let decrypted_size = decrypter
            .decrypt(cipher_text, &mut plaintext)
            .map_err(|e| anyhow!("RSA key {} decrypt failed: {:?}", mode.as_ref(), e))?;
        plaintext.truncate(decrypted_size);
        Ok(plaintext)
    }

    pub fn public_key(&self) -> RSAPublicKey {
        RSAPublicKey {
            public_key: self.public_key.clone(),
        }
    }

    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(Zeroizing::new(self.private_key.private_key_to_pkcs8()?))
    }

    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let private_key = PKey::private_key_from_pkcs8(der)
            .map_err(|e| anyhow!("parse PKCS#8 private key failed: {e}"))?;
        if private_key.rsa().is_err() {
            bail!("PKCS#8 private key is not an RSA key");
        }
        Self::from_private_key(private_key)
    }
}

#[derive(Debug, Clone)]
pub struct RSAPublicKey {
    public_key: PKey<Public>,
}

impl RSAPublicKey {
    pub fn encrypt(&self, mode: PaddingMode, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut encrypter = Encrypter::new(&self.public_key)?;
        match mode {
            PaddingMode::OAEP => {
                encrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
                encrypter.set_rsa_oaep_md(MessageDigest::sha256())?;
                encrypter.set_rsa_mgf1_md(MessageDigest::sha256())?;
            }
            PaddingMode::PKCS1v15 => encrypter.set_rsa_padding(Padding::PKCS1)?,
        }

        let mut cipher_text = vec![0; encrypter.encrypt_len(plaintext)?];
        let encrypted_size = encrypter
            .encrypt(plaintext, &mut cipher_text)
            .map_err(|e| anyhow!("RSA key {} encrypt failed: {:?}", mode.as_ref(), e))?;
        cipher_text.truncate(encrypted_size);
        Ok(cipher_text)
    }

    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        Ok(self.public_key.public_key_to_der()?)
    }

    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        let public_key = PKey::public_key_from_der(der)
            .map_err(|e| anyhow!("parse SubjectPublicKeyInfo failed: {e}"))?;
        if public_key.rsa().is_err() {
            bail!("SubjectPublicKeyInfo does not hold an RSA key");
        }
        Ok(Self { public_key })
    }
}
