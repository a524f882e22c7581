// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Documents exchanged through the ledger contracts.
//!
//! Field names follow the JSON stored by the deployed contracts and must not
//! change.

use base64::{engine::general_purpose::STANDARD, Engine};
use crypto::{encrypt_content, rsa::RSAPublicKey, wrap_key};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmptyFullIndicator {
    Empty,
    Full,
}

/// One recipient of an envelope: the organisation and the content key
/// wrapped with its public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "MSPID")]
    pub msp_id: String,

    #[serde(rename = "encryptedKey")]
    pub encrypted_key: String,
}

/// An organisation that should be able to open a sealed envelope.
#[derive(Clone, Debug)]
pub struct Recipient {
    pub msp_id: String,
    pub public_key: RSAPublicKey,
}

/// Ledger-stored logistics message. Only `encrypted_message` is secret; the
/// remaining metadata travels in clear and is copied through untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMessage {
    /// Plaintext filled in locally after decryption. Never serialised.
    #[serde(skip)]
    pub decrypted_message: Option<String>,

    #[serde(default)]
    pub encrypted_message: String,

    #[serde(default)]
    pub participants: Vec<Participant>,

    #[serde(rename = "documentID", skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,

    /// MSP of the sending organisation.
    #[serde(rename = "organisationID", skip_serializing_if = "Option::is_none")]
    pub organisation_id: Option<String>,

    #[serde(rename = "supplyChainID", skip_serializing_if = "Option::is_none")]
    pub supply_chain_id: Option<String>,

    /// ISO 6346 container id.
    #[serde(rename = "containerID", skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_party: Option<String>,

    #[serde(rename = "RFIDTransportEquipment", skip_serializing_if = "Option::is_none")]
    pub rfid_transport_equipment: Option<String>,

    #[serde(rename = "RFIDTransportHandlingUnit", skip_serializing_if = "Option::is_none")]
    pub rfid_transport_handling_unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_type_code: Option<String>,

    /// `YYYY-MM-DD HH:MM:SS+TIMEZONE`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(rename = "carrierAssignedID", skip_serializing_if = "Option::is_none")]
    pub carrier_assigned_id: Option<String>,

    #[serde(rename = "shippingOrderID", skip_serializing_if = "Option::is_none")]
    pub shipping_order_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_full_indicator: Option<EmptyFullIndicator>,

    /// Standard of the original message, e.g. `UBL` or `GS1`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type_scheme_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_location_id: Option<String>,
}

impl EnvelopeMessage {
    /// Encrypt `plaintext` into this message, keeping its metadata.
    ///
    /// A single content key is generated and wrapped once per recipient.
    /// Any previous participants are replaced.
    pub fn seal(mut self, plaintext: &str, recipients: &[Recipient]) -> Result<Self> {
        let (ciphertext, key) =
            encrypt_content(plaintext.as_bytes()).map_err(Error::crypto("encrypt message body"))?;

        let participants = recipients
            .iter()
            .map(|recipient| {
                let encrypted_key = wrap_key(&key, &recipient.public_key)
                    .map_err(Error::crypto("wrap content key"))?;
                Ok(Participant {
                    msp_id: recipient.msp_id.clone(),
                    encrypted_key,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Sealed message for {} recipients", participants.len());
        self.encrypted_message = ciphertext;
        self.participants = participants;
        self.decrypted_message = None;
        Ok(self)
    }

    /// The first participant entry for `msp_id`.
    pub fn find_participant(&self, msp_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.msp_id == msp_id)
    }

    /// The argument form expected by `addMessage`: base64 of the JSON text.
    pub fn to_ledger_argument(&self) -> Result<String> {
        let json = serde_json::to_vec(self).map_err(|source| Error::Serialization {
            context: "envelope message",
            source,
        })?;
        Ok(STANDARD.encode(json))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| Error::Serialization {
            context: "envelope message",
            source,
        })
    }
}

/// Entry of the Keystore contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationRecord {
    #[serde(rename = "mspID")]
    pub msp_id: String,

    /// Base64 of the DER SubjectPublicKeyInfo.
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

impl OrganisationRecord {
    pub fn new(msp_id: impl Into<String>, public_key: &RSAPublicKey) -> Result<Self> {
        Ok(Self {
            msp_id: msp_id.into(),
            public_key: public_key
                .to_base64()
                .map_err(Error::crypto("encode public key"))?,
        })
    }

    pub fn recipient(&self) -> Result<Recipient> {
        let public_key = RSAPublicKey::from_base64(&self.public_key)
            .map_err(Error::crypto("decode registered public key"))?;
        Ok(Recipient {
            msp_id: self.msp_id.clone(),
            public_key,
        })
    }
}

/// Entry of the TransportChain contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportChainRecord {
    pub id: String,

    #[serde(default)]
    pub participants: Vec<String>,
}

impl TransportChainRecord {
    /// Parse a `getTransportChain` response. The contract answers a bare
    /// object when there is a single match and an array otherwise.
    pub fn parse_list(response: &str) -> Result<Vec<Self>> {
        let response = response.trim();
        let parsed = if response.starts_with('[') {
            serde_json::from_str(response)
        } else {
            serde_json::from_str(response).map(|record| vec![record])
        };

        parsed.map_err(|source| Error::Serialization {
            context: "transport chain",
            source,
        })
    }
}
