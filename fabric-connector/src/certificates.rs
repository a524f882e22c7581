// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Key material and configuration files of an organisation joining the
//! network. Fabric certificates come from `cryptogen`, the organisation
//! definition from `configtxgen` and the messaging key pair is generated
//! here.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crypto::{rsa::RSAKeyPair, KeyFiles};
use log::info;

use crate::config::{AdminPaths, CONFIGTX_FILE, CRYPTO_CONFIG_FILE};
use crate::error::{Error, Result};
use crate::message::OrganisationRecord;
use crate::runner::CommandExecuter;

pub const CRYPTOGEN: &str = "cryptogen";
pub const CONFIGTXGEN: &str = "configtxgen";
pub const FABRIC_CFG_PATH: &str = "FABRIC_CFG_PATH";

pub const MESSAGING_KEY_BITS: usize = 2048;

/// Organisation being onboarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrganisation {
    pub name: String,
    pub msp_id: String,
    pub domain_name: String,
    /// Domain of its first peer, `peer<N>.<domain>`.
    pub peer_domain_name: String,
}

/// Number `N` of a peer named `peer<N>.<domain>`.
pub fn peer_number(peer_domain_name: &str) -> Result<String> {
    let label = peer_domain_name.split('.').next().unwrap_or_default();
    match label.strip_prefix("peer") {
        Some(number) if !number.is_empty() => Ok(number.to_string()),
        Some(_) => Err(Error::Configuration(format!(
            "peer number missing in {peer_domain_name}"
        ))),
        None => Err(Error::Configuration(format!(
            "cannot parse peer number from {peer_domain_name}"
        ))),
    }
}

pub struct CertificateGenerator<'a> {
    executer: &'a dyn CommandExecuter,
    paths: AdminPaths,
    domain_name: String,
    msp_id: String,
    key_bits: usize,
}

impl<'a> CertificateGenerator<'a> {
    pub fn new(
        executer: &'a dyn CommandExecuter,
        paths: AdminPaths,
        organisation: &NewOrganisation,
    ) -> Self {
        Self {
            executer,
            paths,
            domain_name: organisation.domain_name.clone(),
            msp_id: organisation.msp_id.clone(),
            key_bits: MESSAGING_KEY_BITS,
        }
    }

    pub fn with_key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = key_bits;
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.paths.certificate_output(&self.domain_name)
    }

    /// Run `cryptogen` on the generated crypto config. Previous output is
    /// removed first, a second keystore in the same MSP breaks the peer SDK.
    pub fn generate_certificates(&self) -> Result<()> {
        let output = self.output_dir();
        match fs::remove_dir_all(&output) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                return Err(Error::io(format!("remove {}", output.display()))(e));
            }
            _ => {}
        }

        let args = vec![
            "generate".to_string(),
            format!(
                "--config={}",
                self.paths.generated_crypto_config(&self.domain_name).display()
            ),
            format!("--output={}", output.display()),
        ];
        self.executer.exec(CRYPTOGEN, &args, &[])?;
        info!("Generated certificates for {}", self.domain_name);
        Ok(())
    }

    /// Create the messaging key pair, store it next to the certificates and
    /// return the record to register in the keystore.
    pub fn generate_messaging_keys(&self) -> Result<OrganisationRecord> {
        let pair = RSAKeyPair::with_bits(self.key_bits)
            .map_err(Error::crypto("generate messaging key pair"))?;
        KeyFiles::new(self.output_dir())
            .save(&pair)
            .map_err(Error::crypto("store messaging key pair"))?;
        info!("Generated messaging keys for {}", self.msp_id);

        OrganisationRecord::new(self.msp_id.clone(), &pair.public_key())
    }
}

/// Fills the `crypto-config.yaml` and `configtx.yaml` templates for one
/// organisation.
pub struct ConfigGenerator<'a> {
    executer: &'a dyn CommandExecuter,
    paths: AdminPaths,
    organisation: NewOrganisation,
    peer_number: String,
}

impl<'a> ConfigGenerator<'a> {
    pub fn new(
        executer: &'a dyn CommandExecuter,
        paths: AdminPaths,
        organisation: &NewOrganisation,
    ) -> Result<Self> {
        let peer_number = peer_number(&organisation.peer_domain_name)?;
        info!("Initializing config generator for {}", organisation.name);
        Ok(Self {
            executer,
            paths,
            organisation: organisation.clone(),
            peer_number,
        })
    }

    fn output_dir(&self) -> PathBuf {
        self.paths.generated_org(&self.organisation.domain_name)
    }

    fn render(&self, template: &str) -> Result<PathBuf> {
        let source = self.paths.templates().join(template);
        let text = fs::read_to_string(&source)
            .map_err(Error::io(format!("read template {}", source.display())))?;
        let text = text
            .replace("{orgName}", &self.organisation.name)
            .replace("{orgDomain}", &self.organisation.domain_name)
            .replace("{orgMSP}", &self.organisation.msp_id)
            .replace("{peerDomainName}", &self.organisation.peer_domain_name)
            .replace("{peerNumber}", &self.peer_number);

        let dir = self.output_dir();
        fs::create_dir_all(&dir).map_err(Error::io(format!("create {}", dir.display())))?;
        let target = dir.join(template);
        fs::write(&target, text).map_err(Error::io(format!("write {}", target.display())))?;
        Ok(target)
    }

    pub fn generate_crypto_config(&self) -> Result<PathBuf> {
        self.render(CRYPTO_CONFIG_FILE)
    }

    /// Render `configtx.yaml` and print the organisation definition with
    /// `configtxgen`. The JSON is also kept as `<orgName>.json`.
    pub fn generate_org_json(&self) -> Result<String> {
        self.render(CONFIGTX_FILE)?;

        let dir = self.output_dir();
        let envs = vec![(FABRIC_CFG_PATH.to_string(), dir.display().to_string())];
        let args = vec!["-printOrg".to_string(), self.organisation.msp_id.clone()];
        let output = self.executer.exec(CONFIGTXGEN, &args, &envs)?;
        let json = String::from_utf8_lossy(&output).into_owned();

        let target = dir.join(format!("{}.json", self.organisation.name));
        fs::write(&target, &json).map_err(Error::io(format!("write {}", target.display())))?;
        info!("Generated organisation definition {}", target.display());
        Ok(json)
    }
}
