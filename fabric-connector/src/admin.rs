// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Channel administration: membership changes through config updates and
//! the onboarding of a new organisation.

use std::fs;

use log::{info, warn};
use serde_json::Value;

use crate::certificates::{CertificateGenerator, ConfigGenerator, NewOrganisation};
use crate::chaincode::keystore::KeystoreContract;
use crate::channel_config;
use crate::config::AdminPaths;
use crate::configtxlator::ConfigTranslator;
use crate::connector::BlockchainConnector;
use crate::error::{Error, Result};
use crate::message::OrganisationRecord;
use crate::network::LedgerClient;
use crate::runner::CommandExecuter;

pub struct ChannelAdmin<'a, C, T> {
    connector: &'a BlockchainConnector<C>,
    translator: T,
}

impl<'a, C: LedgerClient, T: ConfigTranslator> ChannelAdmin<'a, C, T> {
    pub fn new(connector: &'a BlockchainConnector<C>, translator: T) -> Self {
        Self {
            connector,
            translator,
        }
    }

    pub fn connector(&self) -> &'a BlockchainConnector<C> {
        self.connector
    }

    /// Current channel configuration as JSON.
    pub async fn channel_config_json(&self) -> Result<String> {
        let block = self
            .connector
            .client()
            .channel_config(self.connector.channel())
            .await
            .map_err(|source| Error::Network {
                context: "fetch channel config",
                source,
            })?;
        self.translator.decode(&block).await
    }

    /// Apply `edit` to the channel configuration and submit the resulting
    /// update signed by the connector identity. Nothing is submitted when
    /// `edit` reports no change.
    async fn update<F>(&self, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut Value) -> Result<bool>,
    {
        let signer = self.connector.identity().ok_or(Error::NoSigningIdentity)?;

        let original = self.channel_config_json().await?;
        let mut document = channel_config::parse(&original)?;
        if !edit(&mut document)? {
            return Ok(false);
        }
        let updated = serde_json::to_string(&document).map_err(|source| Error::Serialization {
            context: "channel configuration",
            source,
        })?;

        let channel = self.connector.channel();
        let update = self
            .translator
            .wrap_new_and_old_config(&original, &updated, &channel.name)
            .await?;
        self.connector
            .client()
            .update_channel_config(channel, &update, signer)
            .await
            .map_err(|source| Error::Network {
                context: "update channel config",
                source,
            })?;
        info!("Channel {} configuration updated", channel.name);
        Ok(true)
    }

    /// Add the organisation definition printed by `configtxgen -printOrg`.
    pub async fn add_organisation(&self, msp_id: &str, organisation_json: &str) -> Result<()> {
        let organisation = channel_config::parse(organisation_json)?;
        self.update(|config| {
            channel_config::add_organisation(config, msp_id, organisation)?;
            Ok(true)
        })
        .await?;
        Ok(())
    }

    /// Returns `false` when `msp_id` is not a channel member.
    pub async fn remove_organisation(&self, msp_id: &str) -> Result<bool> {
        let removed = self
            .update(|config| channel_config::remove_organisation(config, msp_id))
            .await?;
        if !removed {
            warn!("{msp_id} is not a member of channel {}", self.connector.channel().name);
        }
        Ok(removed)
    }

    /// Make the connector organisation the only application admin.
    pub async fn restrict_admin_policy(&self, policy_template: &str) -> Result<()> {
        let admin_msp = self.connector.msp_id().to_string();
        self.update(|config| {
            channel_config::change_admin_policy(config, policy_template, &admin_msp)?;
            Ok(true)
        })
        .await?;
        Ok(())
    }

    /// [`Self::restrict_admin_policy`] with the template stored under the
    /// onboarding templates.
    pub async fn restrict_admin_policy_from(&self, paths: &AdminPaths) -> Result<()> {
        let path = paths.org_policy();
        let template = fs::read_to_string(&path)
            .map_err(Error::io(format!("read policy template {}", path.display())))?;
        self.restrict_admin_policy(&template).await
    }
}

/// Brings a new organisation onto the channel: generates its configuration,
/// certificates and messaging keys, registers the public key in the
/// keystore and adds the organisation to the channel configuration.
pub struct Onboarding<'a, C, T> {
    admin: ChannelAdmin<'a, C, T>,
    executer: &'a dyn CommandExecuter,
    paths: AdminPaths,
    key_bits: Option<usize>,
}

impl<'a, C: LedgerClient, T: ConfigTranslator> Onboarding<'a, C, T> {
    pub fn new(
        admin: ChannelAdmin<'a, C, T>,
        executer: &'a dyn CommandExecuter,
        paths: AdminPaths,
    ) -> Self {
        Self {
            admin,
            executer,
            paths,
            key_bits: None,
        }
    }

    pub fn with_key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = Some(key_bits);
        self
    }

    pub async fn onboard(&self, organisation: &NewOrganisation) -> Result<OrganisationRecord> {
        info!("Onboarding organisation {}", organisation.msp_id);

        let configs = ConfigGenerator::new(self.executer, self.paths.clone(), organisation)?;
        configs.generate_crypto_config()?;

        let mut certificates =
            CertificateGenerator::new(self.executer, self.paths.clone(), organisation);
        if let Some(bits) = self.key_bits {
            certificates = certificates.with_key_bits(bits);
        }
        certificates.generate_certificates()?;
        let record = certificates.generate_messaging_keys()?;

        let organisation_json = configs.generate_org_json()?;

        KeystoreContract::new(self.admin.connector())
            .add_organisation(&record)
            .await?;
        info!("Registered public key of {} in keystore", record.msp_id);

        self.admin
            .add_organisation(&organisation.msp_id, &organisation_json)
            .await?;
        info!("Organisation {} added to channel", organisation.msp_id);
        Ok(record)
    }
}
