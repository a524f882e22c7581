// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Signing identity of the organisation's peer admin, as laid out by
//! `cryptogen` under `crypto-config/peerOrganizations`.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use log::{info, warn};
use zeroize::Zeroizing;

use crate::{
    config::OrganisationConfig,
    error::{Error, Result},
};

const SECRET_KEY_SUFFIX: &str = "_sk";

#[derive(Clone)]
pub struct Identity {
    pub name: String,
    pub msp_id: String,
    /// PEM encoded enrollment certificate.
    pub certificate: String,
    /// PEM encoded signing key.
    pub private_key: Zeroizing<String>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("msp_id", &self.msp_id)
            .finish_non_exhaustive()
    }
}

impl Identity {
    /// Load the peer admin of the configured organisation.
    ///
    /// Returns `None` when the organisation has no admin material on this
    /// host. Such a connector can query but not submit transactions.
    pub fn peer_admin(config: &OrganisationConfig) -> Result<Option<Self>> {
        let domain = &config.organisation.domain_name;
        let msp_dir = peer_admin_msp_dir(&config.fabric_env_path, domain);
        let keystore = msp_dir.join("keystore");

        if !keystore.is_dir() {
            warn!(
                "No peer admin keystore at {}, connector has no signing identity",
                keystore.display()
            );
            return Ok(None);
        }

        let key_path = find_secret_key(&keystore)?;
        let private_key = Zeroizing::new(
            fs::read_to_string(&key_path)
                .map_err(Error::io(format!("read {}", key_path.display())))?,
        );

        let cert_path = msp_dir
            .join("signcerts")
            .join(format!("Admin@{domain}-cert.pem"));
        let certificate = fs::read_to_string(&cert_path)
            .map_err(Error::io(format!("read {}", cert_path.display())))?;

        info!("Loaded peer admin identity of {}", config.organisation.mspid);
        Ok(Some(Self {
            name: format!("{}Admin", config.organisation.name),
            msp_id: config.organisation.mspid.clone(),
            certificate,
            private_key,
        }))
    }
}

pub fn peer_admin_msp_dir(fabric_env_path: &Path, domain: &str) -> PathBuf {
    fabric_env_path
        .join("crypto-config")
        .join("peerOrganizations")
        .join(domain)
        .join("users")
        .join(format!("Admin@{domain}"))
        .join("msp")
}

/// The keystore must contain exactly one `*_sk` file. Several keys make the
/// signing identity ambiguous.
fn find_secret_key(keystore: &Path) -> Result<PathBuf> {
    let entries =
        fs::read_dir(keystore).map_err(Error::io(format!("list {}", keystore.display())))?;

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(Error::io(format!("list {}", keystore.display())))?;
        if entry
            .file_name()
            .to_string_lossy()
            .ends_with(SECRET_KEY_SUFFIX)
        {
            matches.push(entry.path());
        }
    }

    match matches.len() {
        1 => Ok(matches.remove(0)),
        n => Err(Error::Configuration(format!(
            "expected exactly one {SECRET_KEY_SUFFIX} file in {}, found {n}",
            keystore.display()
        ))),
    }
}
