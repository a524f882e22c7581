// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! # Fabric connector
//!
//! Client side of a Hyperledger Fabric network that stores logistics
//! documents as encrypted multi-recipient envelopes.
//!
//! The crate builds chaincode requests, dispatches them through a
//! [`network::LedgerClient`] and reconciles the endorsement responses
//! ([`connector`]), seals and opens envelopes ([`message`], [`decryptor`])
//! and carries the administrative glue used to onboard organisations onto a
//! channel ([`admin`], [`channel_config`], [`configtxlator`],
//! [`certificates`]).

pub mod admin;
pub mod certificates;
pub mod chaincode;
pub mod channel_config;
pub mod config;
pub mod configtxlator;
pub mod connector;
pub mod couchdb;
pub mod decryptor;
pub mod error;
pub mod identity;
pub mod message;
pub mod network;
pub mod runner;

pub use config::OrganisationConfig;
pub use connector::BlockchainConnector;
pub use decryptor::MessageDecryptor;
pub use error::{Error, Result};
