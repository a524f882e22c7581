// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! The UBL contract stores envelope messages under client generated keys.

use chrono::Utc;
use crypto::rand::random_alphanumeric;
use log::{debug, info};

use crate::{
    connector::{BlockchainConnector, QueryResponse},
    error::Result,
    message::EnvelopeMessage,
    network::LedgerClient,
};

use super::{ChaincodeId, ContractClient, KeystoreContract};

pub const CHAINCODE_NAME: &str = "UBL";
pub const CHAINCODE_PATH: &str = "smartlog_chaincode/UBL";
pub const CHAINCODE_VERSION: &str = "3.6";

pub const FN_ADD_MESSAGE: &str = "addMessage";
pub const FN_GET_MESSAGE: &str = "getMessage";

const DOCUMENT_KEY_RANDOM_LEN: usize = 10;

/// Ledger key for a new document: `{msp_id}_{unix_millis}_{10 alphanumerics}`.
///
/// Generated on the client because chaincode execution has to be
/// deterministic across endorsing peers.
pub fn document_key(msp_id: &str) -> String {
    format!(
        "{msp_id}_{}_{}",
        Utc::now().timestamp_millis(),
        random_alphanumeric(DOCUMENT_KEY_RANDOM_LEN)
    )
}

pub struct UblContract<'a, C> {
    client: ContractClient<'a, C>,
}

impl<'a, C: LedgerClient> UblContract<'a, C> {
    pub fn new(connector: &'a BlockchainConnector<C>) -> Self {
        Self {
            client: ContractClient::new(
                connector,
                ChaincodeId::new(CHAINCODE_NAME, CHAINCODE_PATH, CHAINCODE_VERSION),
            ),
        }
    }

    /// Store an already sealed message and return its ledger key.
    pub async fn add_message(&self, message: &EnvelopeMessage) -> Result<String> {
        let key = document_key(self.client.connector().msp_id());
        let args = vec![message.to_ledger_argument()?, key.clone()];
        self.client.invoke(FN_ADD_MESSAGE, args).await?;
        debug!("Stored message under {key}");
        Ok(key)
    }

    pub async fn get_message(&self, key: &str) -> Result<Option<EnvelopeMessage>> {
        let answer = self
            .client
            .query(FN_GET_MESSAGE, vec![key.to_string()])
            .await?
            .into_answer()?;

        answer.map(|json| EnvelopeMessage::from_json(&json)).transpose()
    }

    pub async fn get_keys(&self) -> Result<QueryResponse> {
        self.client.get_keys().await
    }

    /// Seal `plaintext` for `recipients` and store it.
    ///
    /// Public keys are resolved through the Keystore contract. `template`
    /// carries the clear metadata of the message.
    pub async fn send_message(
        &self,
        keystore: &KeystoreContract<'_, C>,
        template: EnvelopeMessage,
        plaintext: &str,
        recipients: &[&str],
    ) -> Result<String> {
        let mut resolved = Vec::with_capacity(recipients.len());
        for msp_id in recipients {
            resolved.push(keystore.recipient(msp_id).await?);
        }

        let message = template.seal(plaintext, &resolved)?;
        let key = self.add_message(&message).await?;
        info!("Sent message {key} to {} organisations", resolved.len());
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD, Engine};

    use super::*;
    use crate::connector::tests::{connector, identity, response, MockLedger};

    #[test]
    fn document_key_format() {
        let key = document_key("Org1MSP");
        let parts: Vec<&str> = key.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "Org1MSP");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 10);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn add_message_arguments() {
        let ledger = MockLedger {
            proposals: vec![response("p0", 200, "")],
            ..Default::default()
        };
        let connector = connector(ledger, Some(identity())).await;
        let message = EnvelopeMessage {
            encrypted_message: "c2VjcmV0".into(),
            document_id: Some("doc-1".into()),
            ..Default::default()
        };

        let key = UblContract::new(&connector)
            .add_message(&message)
            .await
            .unwrap();
        assert!(key.starts_with("Org1MSP_"));

        let requests = connector.client().requests.lock().unwrap();
        let (function, args) = &requests[0];
        assert_eq!(function, FN_ADD_MESSAGE);
        assert_eq!(args[1], key);
        let json = STANDARD.decode(&args[0]).unwrap();
        let stored: EnvelopeMessage = serde_json::from_slice(&json).unwrap();
        assert_eq!(stored, message);
    }

    #[tokio::test]
    async fn missing_message() {
        let ledger = MockLedger {
            queries: vec![response("p0", 200, "")],
            ..Default::default()
        };
        let connector = connector(ledger, None).await;
        assert!(UblContract::new(&connector)
            .get_message("nope")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn rejected_lookup_is_an_error() {
        let ledger = MockLedger {
            queries: vec![response("p0", 500, "chaincode error"), response("p1", 500, "")],
            ..Default::default()
        };
        let connector = connector(ledger, None).await;

        let err = UblContract::new(&connector)
            .get_message("Org1MSP_1_abc")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::NoSuccessfulEndorsement { rejected: 2 }
        ));
    }
}
