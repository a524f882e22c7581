// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Client of the `configtxlator` REST service, which converts channel
//! configurations between their protobuf and JSON forms and computes the
//! config update between two versions.

use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Url};

use crate::config::OrganisationConfig;
use crate::error::{Error, Result};

const DECODE_PATH: &[&str] = &["protolator", "decode", "common.Config"];
const ENCODE_PATH: &[&str] = &["protolator", "encode", "common.Config"];
const COMPUTE_UPDATE_PATH: &[&str] = &["configtxlator", "compute", "update-from-configs"];

const OCTET_STREAM: &str = "application/octet-stream";

#[async_trait]
pub trait ConfigTranslator: Send + Sync {
    /// Protobuf `common.Config` to JSON.
    async fn decode(&self, config: &[u8]) -> Result<String>;

    /// JSON `common.Config` to protobuf.
    async fn encode(&self, config: &str) -> Result<Vec<u8>>;

    /// Protobuf `common.ConfigUpdate` turning `original` into `updated`.
    async fn compute_update(
        &self,
        original: Vec<u8>,
        updated: Vec<u8>,
        channel: &str,
    ) -> Result<Vec<u8>>;

    /// Encode both JSON configurations and compute the update between them.
    async fn wrap_new_and_old_config(
        &self,
        old_config: &str,
        new_config: &str,
        channel: &str,
    ) -> Result<Vec<u8>> {
        let original = self.encode(old_config).await?;
        let updated = self.encode(new_config).await?;
        self.compute_update(original, updated, channel).await
    }
}

pub struct ConfigTxLator {
    client: reqwest::Client,
    base: Url,
}

impl ConfigTxLator {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| {
            Error::Configuration(format!("invalid configtxlator url {base_url}: {e}"))
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "invalid configtxlator url {base_url}"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    /// Client for the service at `configtxlator_url`.
    pub fn from_config(config: &OrganisationConfig) -> Result<Self> {
        Self::new(&config.configtxlator_url)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, context: &'static str, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await.map_err(|e| Error::Network {
            context,
            source: e.into(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ConfigTranslation {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn bytes(&self, context: &'static str, builder: RequestBuilder) -> Result<Vec<u8>> {
        let response = self.send(context, builder).await?;
        let body = response.bytes().await.map_err(|e| Error::Network {
            context,
            source: e.into(),
        })?;
        Ok(body.to_vec())
    }
}

fn binary_part(bytes: Vec<u8>, file_name: &'static str) -> Result<Part> {
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(OCTET_STREAM)
        .map_err(|e| Error::Network {
            context: "build config update form",
            source: e.into(),
        })
}

#[async_trait]
impl ConfigTranslator for ConfigTxLator {
    async fn decode(&self, config: &[u8]) -> Result<String> {
        debug!("Decoding channel config of {} bytes", config.len());
        let request = self.client.post(self.endpoint(DECODE_PATH)).body(config.to_vec());
        let response = self.send("decode channel config", request).await?;
        response.text().await.map_err(|e| Error::Network {
            context: "decode channel config",
            source: e.into(),
        })
    }

    async fn encode(&self, config: &str) -> Result<Vec<u8>> {
        let request = self
            .client
            .post(self.endpoint(ENCODE_PATH))
            .body(config.to_string());
        self.bytes("encode channel config", request).await
    }

    async fn compute_update(
        &self,
        original: Vec<u8>,
        updated: Vec<u8>,
        channel: &str,
    ) -> Result<Vec<u8>> {
        let form = Form::new()
            .part("original", binary_part(original, "config.pb")?)
            .part("updated", binary_part(updated, "updated_config.pb")?)
            .text("channel", channel.to_string());

        let request = self
            .client
            .post(self.endpoint(COMPUTE_UPDATE_PATH))
            .multipart(form);
        self.bytes("compute config update", request).await
    }
}
