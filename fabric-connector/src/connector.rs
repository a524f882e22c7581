// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Proposal dispatch and response reconciliation.
//!
//! A write is proposed to every configured peer, the per-peer responses are
//! split into endorsements and rejections, and the transaction is handed to
//! the ordering service only when at least one peer endorsed it and there
//! is an identity to sign with. The caller gets the payload of the first
//! endorsement. Reads skip ordering and return the first non-empty payload.
//!
//! Nothing here retries. Retry policy belongs to the caller.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::timeout;

use crate::{
    chaincode::{QueryRequest, TransactionRequest},
    config::OrganisationConfig,
    error::{Error, Result},
    identity::Identity,
    network::{ChannelHandle, CommitReceipt, LedgerClient, NetworkTopology, ProposalResponse},
};

/// Peer responses split by status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Endorsements {
    pub successful: Vec<ProposalResponse>,
    pub failed: Vec<ProposalResponse>,
}

impl Endorsements {
    /// Split `responses` keeping the input order in both halves.
    pub fn partition(responses: Vec<ProposalResponse>) -> Self {
        let (successful, failed): (Vec<_>, Vec<_>) =
            responses.into_iter().partition(ProposalResponse::is_success);

        for rejected in &failed {
            warn!(
                "Peer {} rejected proposal with status {}: {}",
                rejected.peer, rejected.status, rejected.message
            );
        }

        Self { successful, failed }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutcome {
    /// Payload of the first successful endorsement, as UTF-8 text.
    pub payload: String,
    pub receipt: CommitReceipt,
    /// Peers that did not endorse. The transaction was committed anyway.
    pub rejected: Vec<ProposalResponse>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryResponse {
    Payload(String),
    /// No peer produced a payload. `responded` counts the peers that did
    /// answer, at least one of them successfully when non-zero.
    NoResponse { responded: usize },
    /// Every peer that answered rejected the query.
    Rejected { rejected: Vec<ProposalResponse> },
}

impl QueryResponse {
    pub fn payload(&self) -> Option<&str> {
        match self {
            QueryResponse::Payload(payload) => Some(payload),
            QueryResponse::NoResponse { .. } | QueryResponse::Rejected { .. } => None,
        }
    }

    /// The payload, or `None` when a peer answered successfully but empty.
    /// No answer at all is a `Network` error and a query every peer
    /// rejected is `NoSuccessfulEndorsement`.
    pub fn into_answer(self) -> Result<Option<String>> {
        match self {
            QueryResponse::Payload(payload) => Ok(Some(payload)),
            QueryResponse::NoResponse { responded: 0 } => Err(Error::Network {
                context: "query",
                source: anyhow::anyhow!("no peer responded"),
            }),
            QueryResponse::NoResponse { .. } => Ok(None),
            QueryResponse::Rejected { rejected } => Err(Error::NoSuccessfulEndorsement {
                rejected: rejected.len(),
            }),
        }
    }
}

pub struct BlockchainConnector<C> {
    client: C,
    channel: ChannelHandle,
    identity: Option<Identity>,
    msp_id: String,
    commit_timeout: Duration,
}

impl<C: LedgerClient> BlockchainConnector<C> {
    /// Load the peer admin identity and join the configured channel.
    pub async fn connect(config: &OrganisationConfig, client: C) -> Result<Self> {
        let identity = Identity::peer_admin(config)?;
        Self::with_identity(config, client, identity).await
    }

    pub async fn with_identity(
        config: &OrganisationConfig,
        client: C,
        identity: Option<Identity>,
    ) -> Result<Self> {
        let topology = NetworkTopology::from_config(config);
        info!("Initializing channel {}", topology.channel);

        let channel = client
            .join_channel(&topology, identity.as_ref())
            .await
            .map_err(|source| Error::Network {
                context: "join channel",
                source,
            })?;
        debug!("Joined channel '{}' successfully", channel.name);

        Ok(Self {
            client,
            channel,
            identity,
            msp_id: config.organisation.mspid.clone(),
            commit_timeout: config.commit_timeout(),
        })
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn channel(&self) -> &ChannelHandle {
        &self.channel
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// MSP id of the organisation this connector acts for.
    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub async fn do_transaction(&self, request: &TransactionRequest) -> Result<TransactionOutcome> {
        let responses = self
            .client
            .send_proposal(&self.channel, request)
            .await
            .map_err(|source| Error::Network {
                context: "send transaction proposal",
                source,
            })?;

        let Endorsements { successful, failed } = Endorsements::partition(responses);
        if successful.is_empty() {
            return Err(Error::NoSuccessfulEndorsement {
                rejected: failed.len(),
            });
        }

        let identity = request
            .identity
            .as_ref()
            .or(self.identity.as_ref())
            .ok_or(Error::NoSigningIdentity)?;

        let payload = payload_text(&successful[0])?;

        debug!(
            "{} of {} peers endorsed {}",
            successful.len(),
            successful.len() + failed.len(),
            request.function
        );
        let receipt = timeout(
            self.commit_timeout,
            self.client
                .send_transaction(&self.channel, &successful, identity),
        )
        .await
        .map_err(|_| Error::CommitTimeout(self.commit_timeout))?
        .map_err(|source| Error::Network {
            context: "send transaction",
            source,
        })?;

        Ok(TransactionOutcome {
            payload,
            receipt,
            rejected: failed,
        })
    }

    pub async fn do_query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let responses = self
            .client
            .query_by_chaincode(&self.channel, request)
            .await
            .map_err(|source| Error::Network {
                context: "query by chaincode",
                source,
            })?;

        let responded = responses.len();
        let Endorsements { successful, failed } = Endorsements::partition(responses);
        if successful.is_empty() && !failed.is_empty() {
            warn!(
                "Query {} rejected by all {} responding peers",
                request.function,
                failed.len()
            );
            return Ok(QueryResponse::Rejected { rejected: failed });
        }

        match successful.iter().find(|r| !r.payload.is_empty()) {
            Some(response) => {
                debug!("Received query response from {}", response.peer);
                Ok(QueryResponse::Payload(payload_text(response)?))
            }
            None => {
                warn!("Query {} received no response", request.function);
                Ok(QueryResponse::NoResponse { responded })
            }
        }
    }
}

/// Chaincode payloads are UTF-8 text. Anything else is reported, not
/// repaired.
fn payload_text(response: &ProposalResponse) -> Result<String> {
    String::from_utf8(response.payload.clone()).map_err(|source| Error::InvalidPayload {
        peer: response.peer.clone(),
        source,
    })
}
