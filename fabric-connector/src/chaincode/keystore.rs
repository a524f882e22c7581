// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! The Keystore contract maps an organisation MSP id to the public key
//! envelopes for that organisation are wrapped with.

use log::debug;

use crate::{
    connector::{BlockchainConnector, QueryResponse, TransactionOutcome},
    error::{Error, Result},
    message::{OrganisationRecord, Recipient},
    network::LedgerClient,
};

use super::{ChaincodeId, ContractClient};

pub const CHAINCODE_NAME: &str = "Keystore";
pub const CHAINCODE_PATH: &str = "chaincode/Keystore";
pub const CHAINCODE_VERSION: &str = "1.1";

pub const FN_ADD_ORGANISATION: &str = "addOrganisation";
pub const FN_GET_ORGANISATION: &str = "getOrganisation";
pub const FN_GET_ORGANISATIONS: &str = "getOrganisations";

pub struct KeystoreContract<'a, C> {
    client: ContractClient<'a, C>,
}

impl<'a, C: LedgerClient> KeystoreContract<'a, C> {
    pub fn new(connector: &'a BlockchainConnector<C>) -> Self {
        Self {
            client: ContractClient::new(
                connector,
                ChaincodeId::new(CHAINCODE_NAME, CHAINCODE_PATH, CHAINCODE_VERSION),
            ),
        }
    }

    /// Register `organisation`. Arguments are the MSP id and the base64
    /// public key, in that order.
    pub async fn add_organisation(
        &self,
        organisation: &OrganisationRecord,
    ) -> Result<TransactionOutcome> {
        let args = vec![organisation.msp_id.clone(), organisation.public_key.clone()];
        let outcome = self.client.invoke(FN_ADD_ORGANISATION, args).await?;
        debug!("Added organisation {} to keystore", organisation.msp_id);
        Ok(outcome)
    }

    pub async fn get_organisation(&self, msp_id: &str) -> Result<Option<OrganisationRecord>> {
        let answer = self
            .client
            .query(FN_GET_ORGANISATION, vec![msp_id.to_string()])
            .await?
            .into_answer()?;

        answer
            .map(|json| {
                serde_json::from_str(&json).map_err(|source| Error::Serialization {
                    context: "keystore organisation",
                    source,
                })
            })
            .transpose()
    }

    pub async fn get_organisations(&self) -> Result<Vec<OrganisationRecord>> {
        let answer = self
            .client
            .query(FN_GET_ORGANISATIONS, Vec::new())
            .await?
            .into_answer()?;

        match answer {
            Some(json) => serde_json::from_str(&json).map_err(|source| Error::Serialization {
                context: "keystore organisations",
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    pub async fn get_keys(&self) -> Result<QueryResponse> {
        self.client.get_keys().await
    }

    /// Public key registered for `msp_id`, ready to wrap content keys with.
    pub async fn recipient(&self, msp_id: &str) -> Result<Recipient> {
        self.get_organisation(msp_id)
            .await?
            .ok_or_else(|| Error::UnknownOrganisation(msp_id.to_string()))?
            .recipient()
    }
}
