// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("load configuration file failed")]
    ConfigFile(#[from] config::ConfigError),

    #[error("ledger network error: {context}")]
    Network {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("no peer endorsed the proposal, {rejected} rejected")]
    NoSuccessfulEndorsement { rejected: usize },

    #[error("peer {peer} returned a payload that is not UTF-8")]
    InvalidPayload {
        peer: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("no signing identity available to submit the transaction")]
    NoSigningIdentity,

    #[error("transaction commit was not confirmed within {0:?}")]
    CommitTimeout(Duration),

    #[error("organisation {0} has no public key registered in the keystore")]
    UnknownOrganisation(String),

    #[error("decrypt message failed")]
    DecryptionFailed {
        #[source]
        source: anyhow::Error,
    },

    #[error("crypto operation failed: {context}")]
    Crypto {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("command `{command}` failed with {status}: {stderr}")]
    CommandExecution {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{count} records in view {view} match `{key}`, expected at most one")]
    DuplicateRecord {
        view: &'static str,
        key: String,
        count: usize,
    },

    #[error("configtxlator answered {status}: {body}")]
    ConfigTranslation { status: u16, body: String },

    #[error("document store request failed: {context}")]
    DocumentStore {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("channel configuration has no `{path}`")]
    ConfigEdit { path: String },

    #[error("malformed {context}")]
    Serialization {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let context = context.into();
        move |source| Error::Io { context, source }
    }

    pub(crate) fn crypto(context: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Error::Crypto { context, source }
    }
}
