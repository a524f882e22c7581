// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Configuration of one organisation's connection to the network.

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, File};
use log::{debug, info};
use serde::Deserialize;
use strum::{Display, EnumString};

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/hyperledger/ext_config/config.toml";

pub const CONFIG_PATH_ENV: &str = "SMARTLOG_CONFIG_PATH";

pub const DEFAULT_CONFIGTXLATOR_URL: &str = "http://localhost:7059";

pub const DEFAULT_COMMIT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Organisation {
    pub name: String,
    pub mspid: String,
    pub domain_name: String,
}

/// Address of a peer, orderer or event hub.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct NodeConfig {
    pub url: String,
    pub domain_name: String,
}

#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PeerType {
    #[default]
    Normal,
    /// Accepted for existing deployments. Behaves like `Normal` here, the
    /// embedding application decides what an endorsement-only peer serves.
    Endorsement,
    /// Multi-tenant installation, the acting organisation comes from the
    /// authenticated API user.
    Cloud,
}

/// How API clients of the embedding application authenticate. Loaded and
/// logged, never interpreted by this crate.
#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum AuthType {
    #[default]
    Cert,
    Basic,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct CouchDbConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct OrganisationConfig {
    pub organisation: Organisation,

    #[serde(default)]
    pub peers: Vec<NodeConfig>,

    pub orderer: NodeConfig,

    pub eventhub: Option<NodeConfig>,

    /// Root of the Fabric material (crypto-config, templates, generated files).
    pub fabric_env_path: PathBuf,

    /// Fabric CA endpoint. Passed through to the embedding application,
    /// enrollment is not done here.
    pub ca_url: Option<String>,

    #[serde(default)]
    pub peer_type: PeerType,

    #[serde(default)]
    pub auth_type: AuthType,

    pub channel: String,

    /// Private messaging key, single-tenant installations only.
    pub private_key_path: Option<PathBuf>,

    /// Public half of the messaging key. Passed through unchanged.
    pub public_key_path: Option<PathBuf>,

    /// Directory holding `{domain}/crypto-config/private.key` per tenant.
    pub cloud_key_path: Option<PathBuf>,

    pub couchdb: Option<CouchDbConfig>,

    pub configtxlator_url: String,

    pub commit_timeout_secs: u64,

    /// Set by the embedding application once onboarding has completed.
    /// Passed through unchanged.
    pub installed: bool,
}

impl OrganisationConfig {
    /// Resolve the configuration file and load it.
    ///
    /// The path is taken from `config_path`, then from the
    /// `SMARTLOG_CONFIG_PATH` environment variable, then
    /// [`DEFAULT_CONFIG_PATH`].
    pub fn new(config_path: Option<String>) -> Result<Self> {
        let path = config_path
            .or_else(|| {
                if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
                    debug!("Read connector config path from env: {env_path}");
                    return Some(env_path);
                }
                None
            })
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        info!("Use configuration file {path}");
        if !Path::new(&path).exists() {
            return Err(Error::Configuration(format!("Config file {path} not found.")));
        }

        let config = Self::from_file(&path)?;
        config.validate()?;
        info!(
            "Loaded configuration of {} on channel {}, peer type {}, auth type {}",
            config.organisation.mspid, config.channel, config.peer_type, config.auth_type
        );
        Ok(config)
    }

    /// Load `OrganisationConfig` from a configuration file. Supported formats
    /// are all formats supported by the `config` crate.
    pub fn from_file(config_path: &str) -> Result<Self> {
        let c = Config::builder()
            .set_default("configtxlator_url", DEFAULT_CONFIGTXLATOR_URL)?
            .set_default("commit_timeout_secs", DEFAULT_COMMIT_TIMEOUT_SECS)?
            .set_default("installed", false)?
            .add_source(File::with_name(config_path))
            .build()?;

        let res = c.try_deserialize()?;
        Ok(res)
    }

    /// Check the fields whose presence depends on the installation mode.
    pub fn validate(&self) -> Result<()> {
        if self.organisation.mspid.is_empty() {
            return Err(Error::Configuration("organisation.mspid is empty".into()));
        }

        if self.channel.is_empty() {
            return Err(Error::Configuration("channel is empty".into()));
        }

        if self.commit_timeout_secs == 0 {
            return Err(Error::Configuration(
                "commit_timeout_secs must be greater than zero".into(),
            ));
        }

        if self.is_cloud_installation() {
            if self.cloud_key_path.is_none() {
                return Err(Error::Configuration(
                    "cloud installation requires cloud_key_path".into(),
                ));
            }
            if self.couchdb.is_none() {
                return Err(Error::Configuration(
                    "cloud installation requires a [couchdb] section".into(),
                ));
            }
        } else if self.private_key_path.is_none() {
            return Err(Error::Configuration(
                "private_key_path is required outside cloud installations".into(),
            ));
        }

        Ok(())
    }

    pub fn is_cloud_installation(&self) -> bool {
        self.peer_type == PeerType::Cloud
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_secs(self.commit_timeout_secs)
    }

    pub fn admin_paths(&self) -> AdminPaths {
        AdminPaths::new(&self.fabric_env_path)
    }
}

pub const CRYPTO_CONFIG_FILE: &str = "crypto-config.yaml";
pub const CONFIGTX_FILE: &str = "configtx.yaml";
pub const ORG_POLICY_FILE: &str = "1_org_policy.js";

/// Directory layout used while onboarding organisations, rooted at
/// `fabric_env_path`.
#[derive(Clone, Debug, PartialEq)]
pub struct AdminPaths {
    root: PathBuf,
}

impl AdminPaths {
    pub fn new(fabric_env_path: &Path) -> Self {
        Self {
            root: fabric_env_path.to_path_buf(),
        }
    }

    pub fn templates(&self) -> PathBuf {
        self.root.join("templates")
    }

    pub fn generated(&self) -> PathBuf {
        self.root.join("generated")
    }

    pub fn generated_org(&self, domain: &str) -> PathBuf {
        self.generated().join(domain)
    }

    /// Output directory of `cryptogen` and of the messaging key files.
    pub fn certificate_output(&self, domain: &str) -> PathBuf {
        self.generated_org(domain).join("crypto-config")
    }

    pub fn generated_crypto_config(&self, domain: &str) -> PathBuf {
        self.generated_org(domain).join(CRYPTO_CONFIG_FILE)
    }

    pub fn org_policy(&self) -> PathBuf {
        self.templates().join(ORG_POLICY_FILE)
    }
}
