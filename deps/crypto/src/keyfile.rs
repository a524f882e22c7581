// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Key files of an organisation: `public.key` holds the DER encoded
//! SubjectPublicKeyInfo and `private.key` the DER encoded PKCS#8 key.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use zeroize::Zeroizing;

use crate::rsa::{RSAKeyPair, RSAPublicKey};

pub const PUBLIC_KEY_FILE: &str = "public.key";
pub const PRIVATE_KEY_FILE: &str = "private.key";

/// The pair of key files stored in one directory.
#[derive(Debug, Clone)]
pub struct KeyFiles {
    dir: PathBuf,
}

impl KeyFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    /// Write both halves of `pair`, creating the directory if needed.
    /// Existing files are overwritten.
    pub fn save(&self, pair: &RSAKeyPair) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create key directory {}", self.dir.display()))?;

        let public_der = pair.public_key().to_spki_der()?;
        fs::write(self.public_key_path(), public_der)
            .with_context(|| format!("write {}", self.public_key_path().display()))?;

        let private_der = pair.to_pkcs8_der()?;
        fs::write(self.private_key_path(), private_der.as_slice())
            .with_context(|| format!("write {}", self.private_key_path().display()))?;
        Ok(())
    }

    pub fn load(&self) -> Result<RSAKeyPair> {
        load_private_key(&self.private_key_path())
    }
}

pub fn load_private_key(path: &Path) -> Result<RSAKeyPair> {
    let der = Zeroizing::new(
        fs::read(path).with_context(|| format!("read private key {}", path.display()))?,
    );
    RSAKeyPair::from_pkcs8_der(&der)
        .with_context(|| format!("load private key {}", path.display()))
}

pub fn load_public_key(path: &Path) -> Result<RSAPublicKey> {
    let der = fs::read(path).with_context(|| format!("read public key {}", path.display()))?;
    RSAPublicKey::from_spki_der(&der).with_context(|| format!("load public key {}", path.display()))
}
