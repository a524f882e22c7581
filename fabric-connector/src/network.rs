// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! # Ledger network seam
//!
//! The connector never talks gRPC itself. Everything that reaches peers and
//! the ordering service goes through a [`LedgerClient`], which an embedding
//! application implements on top of its Fabric SDK of choice.
//!
//! ## APIs
//! - `join_channel`: bind the organisation topology to a channel once.
//! - `send_proposal` / `query_by_chaincode`: broadcast to the peer set and
//!   return one [`ProposalResponse`] per peer, failures included.
//! - `send_transaction`: submit endorsed responses to the ordering service.
//! - `channel_config` / `update_channel_config`: read the latest config block
//!   and submit a signed config update.

use async_trait::async_trait;

use crate::{
    chaincode::{QueryRequest, TransactionRequest},
    config::{NodeConfig, OrganisationConfig},
    identity::Identity,
};

/// Status code of a successful endorsement.
pub const STATUS_SUCCESS: i32 = 200;

/// Response of a single peer to a proposal or a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalResponse {
    pub peer: String,
    pub status: i32,
    pub message: String,
    pub payload: Vec<u8>,
}

impl ProposalResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Result of handing a transaction to the ordering service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    pub transaction_id: String,
    pub block_number: Option<u64>,
}

/// Opaque reference to a joined channel, handed back to the client on
/// every subsequent call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelHandle {
    pub name: String,
    pub peers: Vec<String>,
}

/// Where the organisation's peers, orderer and event hub live.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkTopology {
    pub channel: String,
    pub msp_id: String,
    pub peers: Vec<NodeConfig>,
    pub orderer: NodeConfig,
    pub eventhub: Option<NodeConfig>,
}

impl NetworkTopology {
    pub fn from_config(config: &OrganisationConfig) -> Self {
        Self {
            channel: config.channel.clone(),
            msp_id: config.organisation.mspid.clone(),
            peers: config.peers.clone(),
            orderer: config.orderer.clone(),
            eventhub: config.eventhub.clone(),
        }
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn join_channel(
        &self,
        topology: &NetworkTopology,
        identity: Option<&Identity>,
    ) -> anyhow::Result<ChannelHandle>;

    /// Broadcast a transaction proposal. Unreachable or rejecting peers are
    /// reported as non-success responses; an `Err` means nothing could be
    /// delivered at all.
    async fn send_proposal(
        &self,
        channel: &ChannelHandle,
        request: &TransactionRequest,
    ) -> anyhow::Result<Vec<ProposalResponse>>;

    async fn send_transaction(
        &self,
        channel: &ChannelHandle,
        endorsements: &[ProposalResponse],
        identity: &Identity,
    ) -> anyhow::Result<CommitReceipt>;

    async fn query_by_chaincode(
        &self,
        channel: &ChannelHandle,
        request: &QueryRequest,
    ) -> anyhow::Result<Vec<ProposalResponse>>;

    /// Latest configuration of the channel as a binary `common.Config`.
    async fn channel_config(&self, channel: &ChannelHandle) -> anyhow::Result<Vec<u8>>;

    async fn update_channel_config(
        &self,
        channel: &ChannelHandle,
        update: &[u8],
        signer: &Identity,
    ) -> anyhow::Result<()>;
}
