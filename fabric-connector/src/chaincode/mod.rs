// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! # Chaincode invocations
//!
//! [`ChaincodeRequestFactory`] builds query and transaction descriptors for
//! one deployed contract. [`ContractClient`] pairs a factory with a
//! [`BlockchainConnector`] and is what the per-contract wrappers in
//! [`keystore`], [`transport`] and [`ubl`] are composed from.

use std::time::Duration;

use log::debug;

use crate::{
    connector::{BlockchainConnector, QueryResponse, TransactionOutcome},
    error::Result,
    identity::Identity,
    network::LedgerClient,
};

pub mod keystore;
pub mod transport;
pub mod ubl;

pub use keystore::KeystoreContract;
pub use transport::TransportChainContract;
pub use ubl::UblContract;

/// Upper bound a transaction proposal may wait for endorsements.
pub const PROPOSAL_WAIT_TIME: Duration = Duration::from_secs(120);

/// Function every contract exposes to list its stored keys.
pub const FN_GET_KEYS: &str = "getKeys";

/// Name, version and path triple identifying a deployed contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChaincodeId {
    pub name: String,
    pub version: String,
    pub path: String,
}

impl ChaincodeId {
    pub fn new(name: &str, path: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            path: path.to_string(),
        }
    }
}

/// Read-only invocation, answered by peers without ordering.
#[derive(Clone, Debug)]
pub struct QueryRequest {
    pub chaincode: ChaincodeId,
    pub function: String,
    pub args: Vec<String>,
    pub identity: Option<Identity>,
}

/// Invocation that goes through endorsement and ordering.
#[derive(Clone, Debug)]
pub struct TransactionRequest {
    pub chaincode: ChaincodeId,
    pub function: String,
    pub args: Vec<String>,
    pub proposal_wait_time: Duration,
    /// Identity the proposal is signed with.
    pub identity: Option<Identity>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChaincodeRequestFactory {
    chaincode: ChaincodeId,
}

impl ChaincodeRequestFactory {
    pub fn new(chaincode: ChaincodeId) -> Self {
        Self { chaincode }
    }

    pub fn chaincode(&self) -> &ChaincodeId {
        &self.chaincode
    }

    pub fn create_query(
        &self,
        identity: Option<&Identity>,
        function: &str,
        args: Vec<String>,
    ) -> QueryRequest {
        QueryRequest {
            chaincode: self.chaincode.clone(),
            function: function.to_string(),
            args,
            identity: identity.cloned(),
        }
    }

    pub fn create_transaction(
        &self,
        identity: Option<&Identity>,
        function: &str,
        args: Vec<String>,
    ) -> TransactionRequest {
        debug!(
            "Created transaction proposal for {}:{} with {} args",
            self.chaincode.name,
            function,
            args.len()
        );
        TransactionRequest {
            chaincode: self.chaincode.clone(),
            function: function.to_string(),
            args,
            proposal_wait_time: PROPOSAL_WAIT_TIME,
            identity: identity.cloned(),
        }
    }
}

/// A contract bound to a connector.
pub struct ContractClient<'a, C> {
    connector: &'a BlockchainConnector<C>,
    factory: ChaincodeRequestFactory,
}

impl<'a, C: LedgerClient> ContractClient<'a, C> {
    pub fn new(connector: &'a BlockchainConnector<C>, chaincode: ChaincodeId) -> Self {
        Self {
            connector,
            factory: ChaincodeRequestFactory::new(chaincode),
        }
    }

    pub fn connector(&self) -> &'a BlockchainConnector<C> {
        self.connector
    }

    pub async fn query(&self, function: &str, args: Vec<String>) -> Result<QueryResponse> {
        debug!(
            "Calling {} smart contract method: {function}",
            self.factory.chaincode().name
        );
        let request = self
            .factory
            .create_query(self.connector.identity(), function, args);
        self.connector.do_query(&request).await
    }

    pub async fn invoke(&self, function: &str, args: Vec<String>) -> Result<TransactionOutcome> {
        debug!(
            "Calling {} smart contract method: {function}",
            self.factory.chaincode().name
        );
        let request = self
            .factory
            .create_transaction(self.connector.identity(), function, args);
        self.connector.do_transaction(&request).await
    }

    /// All keys stored by the contract, as returned by `getKeys`.
    pub async fn get_keys(&self) -> Result<QueryResponse> {
        self.query(FN_GET_KEYS, Vec::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> ChaincodeRequestFactory {
        ChaincodeRequestFactory::new(ChaincodeId::new("UBL", "smartlog_chaincode/UBL", "3.6"))
    }

    #[test]
    fn query_carries_contract_and_args() {
        let request = factory().create_query(None, "getMessage", vec!["key-1".into()]);
        assert_eq!(request.chaincode.name, "UBL");
        assert_eq!(request.chaincode.version, "3.6");
        assert_eq!(request.chaincode.path, "smartlog_chaincode/UBL");
        assert_eq!(request.function, "getMessage");
        assert_eq!(request.args, vec!["key-1".to_string()]);
    }

    #[test]
    fn transaction_has_wait_time() {
        let args = vec!["b".to_string(), "a".to_string()];
        let request = factory().create_transaction(None, "addMessage", args.clone());
        assert_eq!(request.proposal_wait_time, Duration::from_millis(120_000));
        assert_eq!(request.args, args);
        assert!(request.identity.is_none());
    }

    #[test]
    fn builders_are_deterministic() {
        let a = factory().create_query(None, "getKeys", vec![]);
        let b = factory().create_query(None, "getKeys", vec![]);
        assert_eq!(a.chaincode, b.chaincode);
        assert_eq!(a.function, b.function);
        assert_eq!(a.args, b.args);
    }
}
