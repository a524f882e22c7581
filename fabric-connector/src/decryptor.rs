// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Opening envelope messages with the organisation's private key.
//!
//! Single-tenant installations use `private_key_path` and the configured
//! MSP id. Cloud installations act for the API user making the request: the
//! MSP id is the user's organisation and the key is read from
//! `{cloud_key_path}/{domain}/crypto-config/private.key`.

use std::path::PathBuf;

use anyhow::Context;
use crypto::{decrypt_content, load_private_key, rsa::RSAKeyPair, unwrap_key, PRIVATE_KEY_FILE};
use log::debug;

use crate::{
    config::OrganisationConfig,
    couchdb::ApiUser,
    error::{Error, Result},
    message::EnvelopeMessage,
};

/// A message of a batch that addressed this organisation but could not be
/// opened.
#[derive(Debug)]
pub struct DecryptFailure {
    /// Position of the message in the input batch.
    pub index: usize,
    pub document_id: Option<String>,
    pub error: Error,
}

/// Result of a batch decryption. `items` keep the input order. Messages not
/// addressed to this organisation appear in neither list.
#[derive(Debug)]
pub struct Decrypted<T> {
    pub items: Vec<T>,
    pub failures: Vec<DecryptFailure>,
}

impl<T> Default for Decrypted<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
enum KeySource {
    SingleTenant {
        msp_id: String,
        private_key_path: PathBuf,
    },
    Cloud {
        cloud_key_path: PathBuf,
    },
}

#[derive(Clone, Debug)]
pub struct MessageDecryptor {
    key_source: KeySource,
}

impl MessageDecryptor {
    pub fn new(config: &OrganisationConfig) -> Result<Self> {
        let key_source = if config.is_cloud_installation() {
            let cloud_key_path = config.cloud_key_path.clone().ok_or_else(|| {
                Error::Configuration("cloud installation requires cloud_key_path".into())
            })?;
            KeySource::Cloud { cloud_key_path }
        } else {
            let private_key_path = config.private_key_path.clone().ok_or_else(|| {
                Error::Configuration("private_key_path is not configured".into())
            })?;
            KeySource::SingleTenant {
                msp_id: config.organisation.mspid.clone(),
                private_key_path,
            }
        };

        Ok(Self { key_source })
    }

    /// Resolve the MSP id and private key to decrypt with.
    fn own_key(&self, user: Option<&ApiUser>) -> Result<(String, RSAKeyPair)> {
        let (msp_id, path) = match &self.key_source {
            KeySource::SingleTenant {
                msp_id,
                private_key_path,
            } => (msp_id.clone(), private_key_path.clone()),
            KeySource::Cloud { cloud_key_path } => {
                let user = user.ok_or_else(|| {
                    Error::Configuration(
                        "an API user is required to decrypt in a cloud installation".into(),
                    )
                })?;
                let path = cloud_key_path
                    .join(&user.domain_name)
                    .join("crypto-config")
                    .join(PRIVATE_KEY_FILE);
                (user.organisation.clone(), path)
            }
        };

        debug!("Loading private key of {msp_id} from {}", path.display());
        let key = load_private_key(&path)
            .map_err(|e| Error::Configuration(format!("cannot load private key: {e:#}")))?;
        Ok((msp_id, key))
    }

    /// Decrypt every message addressed to this organisation and return the
    /// plaintexts.
    pub fn decrypt(
        &self,
        messages: &[EnvelopeMessage],
        user: Option<&ApiUser>,
    ) -> Result<Decrypted<String>> {
        let (msp_id, key) = self.own_key(user)?;
        Ok(open_batch(messages.iter(), &msp_id, &key, |_, plaintext| plaintext))
    }

    /// Like [`decrypt`](Self::decrypt) but returns the messages themselves
    /// with `decrypted_message` filled in.
    pub fn decrypt_annotated(
        &self,
        messages: Vec<EnvelopeMessage>,
        user: Option<&ApiUser>,
    ) -> Result<Decrypted<EnvelopeMessage>> {
        let (msp_id, key) = self.own_key(user)?;
        Ok(open_batch(
            messages.into_iter(),
            &msp_id,
            &key,
            |mut message, plaintext| {
                message.decrypted_message = Some(plaintext);
                message
            },
        ))
    }
}

fn open_batch<M, T, F>(
    messages: impl Iterator<Item = M>,
    msp_id: &str,
    key: &RSAKeyPair,
    mut finish: F,
) -> Decrypted<T>
where
    M: std::borrow::Borrow<EnvelopeMessage>,
    F: FnMut(M, String) -> T,
{
    let mut decrypted = Decrypted::default();
    for (index, message) in messages.enumerate() {
        let opened = {
            let envelope: &EnvelopeMessage = message.borrow();
            let Some(participant) = envelope.find_participant(msp_id) else {
                debug!("Message {index} is not addressed to {msp_id}, skipped");
                continue;
            };
            open(envelope, &participant.encrypted_key, key)
                .map_err(|source| (envelope.document_id.clone(), source))
        };

        match opened {
            Ok(plaintext) => decrypted.items.push(finish(message, plaintext)),
            Err((document_id, source)) => decrypted.failures.push(DecryptFailure {
                index,
                document_id,
                error: Error::DecryptionFailed { source },
            }),
        }
    }

    debug!(
        "Decrypted {} messages, {} failures",
        decrypted.items.len(),
        decrypted.failures.len()
    );
    decrypted
}

fn open(
    message: &EnvelopeMessage,
    wrapped_key: &str,
    own_key: &RSAKeyPair,
) -> anyhow::Result<String> {
    let content_key = unwrap_key(wrapped_key, own_key).context("unwrap content key")?;
    let plaintext = decrypt_content(&content_key, &message.encrypted_message)
        .context("decrypt message body")?;
    String::from_utf8(plaintext).context("message body is not UTF-8")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crypto::KeyFiles;

    use super::*;
    use crate::config::PeerType;
    use crate::couchdb::tests::user;
    use crate::identity::tests::test_config;
    use crate::message::{Participant, Recipient};

    fn seal(plaintext: &str, recipients: &[(&str, &RSAKeyPair)]) -> EnvelopeMessage {
        let recipients: Vec<Recipient> = recipients
            .iter()
            .map(|(msp, pair)| Recipient {
                msp_id: msp.to_string(),
                public_key: pair.public_key(),
            })
            .collect();
        EnvelopeMessage::default().seal(plaintext, &recipients).unwrap()
    }

    fn single_tenant(dir: &Path, msp: &str, pair: &RSAKeyPair) -> MessageDecryptor {
        KeyFiles::new(dir).save(pair).unwrap();
        let mut config = test_config(dir);
        config.organisation.mspid = msp.into();
        MessageDecryptor::new(&config).unwrap()
    }

    #[test]
    fn batch_keeps_order_and_skips_others() {
        let dir = tempfile::tempdir().unwrap();
        let org1 = RSAKeyPair::with_bits(1024).unwrap();
        let org2 = RSAKeyPair::with_bits(1024).unwrap();
        let decryptor = single_tenant(dir.path(), "Org1MSP", &org1);

        let messages = vec![
            seal("first", &[("Org1MSP", &org1)]),
            seal("not ours", &[("Org2MSP", &org2)]),
            seal("third", &[("Org2MSP", &org2), ("Org1MSP", &org1)]),
        ];

        let result = decryptor.decrypt(&messages, None).unwrap();
        assert_eq!(result.items, vec!["first", "third"]);
        assert!(result.failures.is_empty());
    }

    #[test]
    fn corrupt_message_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let org1 = RSAKeyPair::with_bits(1024).unwrap();
        let decryptor = single_tenant(dir.path(), "Org1MSP", &org1);

        let mut broken = seal("broken", &[("Org1MSP", &org1)]);
        broken.document_id = Some("doc-2".into());
        broken.participants = vec![Participant {
            msp_id: "Org1MSP".into(),
            encrypted_key: "AAAA".into(),
        }];
        let messages = vec![
            seal("ok", &[("Org1MSP", &org1)]),
            broken,
            seal("also ok", &[("Org1MSP", &org1)]),
        ];

        let result = decryptor.decrypt_annotated(messages, None).unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[1].decrypted_message.as_deref(), Some("also ok"));
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 1);
        assert_eq!(result.failures[0].document_id.as_deref(), Some("doc-2"));
        assert!(matches!(
            result.failures[0].error,
            Error::DecryptionFailed { .. }
        ));
    }

    #[test]
    fn missing_private_key_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let decryptor = MessageDecryptor::new(&test_config(dir.path())).unwrap();
        let err = decryptor.decrypt(&[], None).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn cloud_mode_uses_api_user() {
        let dir = tempfile::tempdir().unwrap();
        let tenant = RSAKeyPair::with_bits(1024).unwrap();
        KeyFiles::new(dir.path().join("tenant.example.com/crypto-config"))
            .save(&tenant)
            .unwrap();

        let mut config = test_config(dir.path());
        config.peer_type = PeerType::Cloud;
        config.cloud_key_path = Some(dir.path().to_path_buf());
        let decryptor = MessageDecryptor::new(&config).unwrap();

        let messages = vec![seal("for tenant", &[("TenantMSP", &tenant)])];
        let api_user = user("Tenant", "token", "tenant.example.com");

        let result = decryptor.decrypt(&messages, Some(&api_user)).unwrap();
        assert_eq!(result.items, vec!["for tenant"]);

        let err = decryptor.decrypt(&messages, None).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
