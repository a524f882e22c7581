// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! The TransportChain contract records which organisations take part in a
//! supply chain.

use crate::{
    connector::{BlockchainConnector, QueryResponse, TransactionOutcome},
    error::Result,
    message::TransportChainRecord,
    network::LedgerClient,
};

use super::{ChaincodeId, ContractClient};

pub const CHAINCODE_NAME: &str = "TransportChain";
pub const CHAINCODE_PATH: &str = "chaincode/TransportChain";
pub const CHAINCODE_VERSION: &str = "2.0";

pub const FN_SET_TRANSPORT_CHAIN: &str = "setTransportChain";
pub const FN_GET_TRANSPORT_CHAIN: &str = "getTransportChain";

pub struct TransportChainContract<'a, C> {
    client: ContractClient<'a, C>,
}

impl<'a, C: LedgerClient> TransportChainContract<'a, C> {
    pub fn new(connector: &'a BlockchainConnector<C>) -> Self {
        Self {
            client: ContractClient::new(
                connector,
                ChaincodeId::new(CHAINCODE_NAME, CHAINCODE_PATH, CHAINCODE_VERSION),
            ),
        }
    }

    /// Arguments are the chain id and the comma separated participant MSP ids.
    pub async fn set_transport_chain(
        &self,
        chain: &TransportChainRecord,
    ) -> Result<TransactionOutcome> {
        let args = vec![chain.id.clone(), chain.participants.join(",")];
        self.client.invoke(FN_SET_TRANSPORT_CHAIN, args).await
    }

    /// Chains stored under `chain_id`. Empty when the chain is unknown.
    pub async fn get_transport_chain(&self, chain_id: &str) -> Result<Vec<TransportChainRecord>> {
        let answer = self
            .client
            .query(FN_GET_TRANSPORT_CHAIN, vec![chain_id.to_string()])
            .await?
            .into_answer()?;

        match answer {
            Some(json) => TransportChainRecord::parse_list(&json),
            None => Ok(Vec::new()),
        }
    }

    pub async fn get_keys(&self) -> Result<QueryResponse> {
        self.client.get_keys().await
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::connector::tests::{connector, identity, response, MockLedger};
    use crate::error::Error;

    #[tokio::test]
    async fn participants_are_comma_joined() {
        let ledger = MockLedger {
            proposals: vec![response("p0", 200, "")],
            ..Default::default()
        };
        let connector = connector(ledger, Some(identity())).await;
        let chain = TransportChainRecord {
            id: "chain-1".into(),
            participants: vec!["Org1MSP".into(), "Org2MSP".into(), "Org3MSP".into()],
        };

        TransportChainContract::new(&connector)
            .set_transport_chain(&chain)
            .await
            .unwrap();

        let requests = connector.client().requests.lock().unwrap();
        assert_eq!(requests[0].0, FN_SET_TRANSPORT_CHAIN);
        assert_eq!(requests[0].1, vec!["chain-1", "Org1MSP,Org2MSP,Org3MSP"]);
    }

    #[rstest]
    #[case(r#"{"id":"chain-1","participants":["Org1MSP"]}"#, 1)]
    #[case(r#"[{"id":"chain-1","participants":[]},{"id":"chain-2","participants":[]}]"#, 2)]
    #[case("", 0)]
    #[tokio::test]
    async fn lookup(#[case] payload: &str, #[case] expected: usize) {
        let ledger = MockLedger {
            queries: vec![response("p0", 200, payload)],
            ..Default::default()
        };
        let connector = connector(ledger, None).await;

        let chains = TransportChainContract::new(&connector)
            .get_transport_chain("chain-1")
            .await
            .unwrap();
        assert_eq!(chains.len(), expected);
    }

    #[tokio::test]
    async fn unreachable_network() {
        let connector = connector(MockLedger::default(), None).await;
        let err = TransportChainContract::new(&connector)
            .get_transport_chain("chain-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
    }

    #[tokio::test]
    async fn rejected_lookup_is_not_an_empty_chain() {
        let ledger = MockLedger {
            queries: vec![response("p0", 500, ""), response("p1", 403, "")],
            ..Default::default()
        };
        let connector = connector(ledger, None).await;

        let err = TransportChainContract::new(&connector)
            .get_transport_chain("chain-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoSuccessfulEndorsement { rejected: 2 }));
    }
}
