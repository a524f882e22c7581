// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use anyhow::*;
use rsa::{
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
    Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey,
};
use zeroize::Zeroizing;

use crate::rsa::{PaddingMode, RSA_PUBKEY_LENGTH};

#[derive(Debug, Clone)]
pub struct RSAKeyPair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl RSAKeyPair {
    pub fn new() -> Result<RSAKeyPair> {
        Self::with_bits(RSA_PUBKEY_LENGTH)
    }

    pub fn with_bits(bits: usize) -> Result<RSAKeyPair> {
        let mut rng = rand::thread_rng();

        let private_key = RsaPrivateKey::new(&mut rng, bits)?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(RSAKeyPair {
            private_key,
            public_key,
        })
    }

    pub fn decrypt(&self, mode: PaddingMode, cipher_text: &[u8]) -> Result<Vec<u8>> {
        match mode {
            PaddingMode::OAEP => self
                .private_key
                .decrypt(Oaep::new::<sha2::Sha256>(), cipher_text)
                .map_err(|e| anyhow!("RSA key decrypt OAEP failed: {:?}", e)),
            PaddingMode::PKCS1v15 => self
                .private_key
                .decrypt(Pkcs1v15Encrypt, cipher_text)
                .map_err(|e| anyhow!("RSA key pkcs1v15 decrypt failed: {:?}", e)),
        }
    }

    pub fn public_key(&self) -> RSAPublicKey {
        RSAPublicKey {
            public_key: self.public_key.clone(),
        }
    }

    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let document = self
            .private_key
            .to_pkcs8_der()
            .map_err(|e| anyhow!("encode PKCS#8 private key failed: {e}"))?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| anyhow!("parse PKCS#8 private key failed: {e}"))?;
        let public_key = RsaPublicKey::from(&private_key);

        Ok(Self {
            private_key,
            public_key,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RSAPublicKey {
    public_key: RsaPublicKey,
}

impl RSAPublicKey {
    pub fn encrypt(&self, mode: PaddingMode, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut rng = rand::thread_rng();
        match mode {
            PaddingMode::OAEP => self
                .public_key
                .encrypt(&mut rng, Oaep::new::<sha2::Sha256>(), plaintext)
                .map_err(|e| anyhow!("RSA key encrypt OAEP failed: {:?}", e)),
            PaddingMode::PKCS1v15 => self
                .public_key
                .encrypt(&mut rng, Pkcs1v15Encrypt, plaintext)
                .map_err(|e| anyhow!("RSA key pkcs1v15 encrypt failed: {:?}", e)),
        }
    }

    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        let document = self
            .public_key
            .to_public_key_der()
            .map_err(|e| anyhow!("encode SubjectPublicKeyInfo failed: {e}"))?;
        Ok(document.into_vec())
    }

    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        let public_key = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| anyhow!("parse SubjectPublicKeyInfo failed: {e}"))?;
        Ok(Self { public_key })
    }
}
