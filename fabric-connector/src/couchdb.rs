// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! # API users
//!
//! Cloud installations serve several organisations from one host. Each
//! organisation talks to the connector as an API user stored in the CouchDB
//! database `ApiUsers`, and the user record decides which MSP id and which
//! key directory a request acts for.

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::{
    config::CouchDbConfig,
    error::{Error, Result},
};

pub const DATABASE: &str = "ApiUsers";
pub const DESIGN_DOC: &str = "ApiUser";

pub const VIEW_BY_AUTH_TOKEN: &str = "by_authToken";
pub const VIEW_BY_DOMAIN_NAME: &str = "by_domainName";
pub const VIEW_BY_SHA1: &str = "by_sha1";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    pub name: String,

    pub auth_token: String,

    /// MSP id the user acts for.
    pub organisation: String,

    /// Domain of the organisation, selects the key directory.
    pub domain_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
}

#[async_trait]
pub trait ApiUserStore: Send + Sync {
    /// Documents emitted by `view` for `key`.
    async fn query_view(&self, view: &'static str, key: &str) -> Result<Vec<ApiUser>>;

    async fn all(&self) -> Result<Vec<ApiUser>>;

    /// Store a new user and return it with the assigned id and revision.
    async fn create(&self, user: &ApiUser) -> Result<ApiUser>;

    async fn delete(&self, id: &str, revision: &str) -> Result<()>;
}

#[derive(Deserialize)]
struct ViewRow<T> {
    doc: Option<T>,
}

#[derive(Deserialize)]
struct ViewResponse<T> {
    rows: Vec<ViewRow<T>>,
}

#[derive(Deserialize)]
struct WriteResponse {
    id: String,
    rev: String,
}

fn map_function(field: &str) -> String {
    format!("function(doc) {{ if (doc.{field}) {{ emit(doc.{field}, doc._id) }} }}")
}

/// CouchDB over HTTP.
pub struct CouchDb {
    client: reqwest::Client,
    base: Url,
    username: Option<String>,
    password: Option<String>,
}

impl CouchDb {
    pub fn new(config: &CouchDbConfig) -> Result<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| Error::Configuration(format!("invalid CouchDB url {}: {e}", config.url)))?;
        if base.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "invalid CouchDB url {}",
                config.url
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(DATABASE).extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.username {
            Some(username) => builder.basic_auth(username, self.password.as_ref()),
            None => builder,
        }
    }

    async fn send(
        &self,
        context: &'static str,
        builder: RequestBuilder,
        accept: &[StatusCode],
    ) -> Result<reqwest::Response> {
        let response = builder.send().await.map_err(|e| Error::DocumentStore {
            context,
            source: e.into(),
        })?;

        let status = response.status();
        if status.is_success() || accept.contains(&status) {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::DocumentStore {
            context,
            source: anyhow::anyhow!("CouchDB answered {status}: {body}"),
        })
    }

    async fn json<T: DeserializeOwned>(
        context: &'static str,
        response: reqwest::Response,
    ) -> Result<T> {
        response.json().await.map_err(|e| Error::DocumentStore {
            context,
            source: e.into(),
        })
    }

    /// Create the database and the lookup views when they do not exist yet.
    pub async fn initialize(&self) -> Result<()> {
        let response = self
            .send(
                "create database",
                self.request(Method::PUT, self.endpoint(&[])),
                &[StatusCode::PRECONDITION_FAILED],
            )
            .await?;
        if response.status() != StatusCode::PRECONDITION_FAILED {
            info!("Created CouchDB database {DATABASE}");
        }

        let design = json!({
            "language": "javascript",
            "views": {
                "by_authToken": { "map": map_function("authToken") },
                "by_domainName": { "map": map_function("domainName") },
                "by_sha1": { "map": map_function("sha1") },
            }
        });
        let response = self
            .send(
                "create design document",
                self.request(Method::PUT, self.endpoint(&["_design", DESIGN_DOC]))
                    .json(&design),
                &[StatusCode::CONFLICT],
            )
            .await?;
        if response.status() == StatusCode::CONFLICT {
            debug!("Design document {DESIGN_DOC} already present");
        }
        Ok(())
    }
}

#[async_trait]
impl ApiUserStore for CouchDb {
    async fn query_view(&self, view: &'static str, key: &str) -> Result<Vec<ApiUser>> {
        let key = serde_json::to_string(key).map_err(|source| Error::Serialization {
            context: "view key",
            source,
        })?;
        let url = self.endpoint(&["_design", DESIGN_DOC, "_view", view]);
        let builder = self
            .request(Method::GET, url)
            .query(&[("key", key.as_str()), ("include_docs", "true")]);

        let response = self.send("query view", builder, &[]).await?;
        let rows: ViewResponse<ApiUser> = Self::json("query view", response).await?;
        Ok(rows.rows.into_iter().filter_map(|row| row.doc).collect())
    }

    async fn all(&self) -> Result<Vec<ApiUser>> {
        let builder = self
            .request(Method::GET, self.endpoint(&["_all_docs"]))
            .query(&[("include_docs", "true")]);

        let response = self.send("list documents", builder, &[]).await?;
        let rows: ViewResponse<serde_json::Value> = Self::json("list documents", response).await?;

        let mut users = Vec::new();
        for doc in rows.rows.into_iter().filter_map(|row| row.doc) {
            let is_design = doc
                .get("_id")
                .and_then(|id| id.as_str())
                .is_some_and(|id| id.starts_with("_design/"));
            if is_design {
                continue;
            }
            let user = serde_json::from_value(doc).map_err(|source| Error::Serialization {
                context: "api user",
                source,
            })?;
            users.push(user);
        }
        Ok(users)
    }

    async fn create(&self, user: &ApiUser) -> Result<ApiUser> {
        let builder = self.request(Method::POST, self.endpoint(&[])).json(user);
        let response = self.send("create document", builder, &[]).await?;
        let written: WriteResponse = Self::json("create document", response).await?;

        let mut user = user.clone();
        user.id = Some(written.id);
        user.revision = Some(written.rev);
        Ok(user)
    }

    async fn delete(&self, id: &str, revision: &str) -> Result<()> {
        let builder = self
            .request(Method::DELETE, self.endpoint(&[id]))
            .query(&[("rev", revision)]);
        self.send("delete document", builder, &[]).await?;
        Ok(())
    }
}

/// Lookups over a store that assume at most one user per key.
pub struct ApiUserRepository<S> {
    store: S,
}

impl<S: ApiUserStore> ApiUserRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn find_unique(&self, view: &'static str, key: &str) -> Result<Option<ApiUser>> {
        let mut users = self.store.query_view(view, key).await?;
        match users.len() {
            0 => {
                info!("No ApiUser found in {view}");
                Ok(None)
            }
            1 => Ok(users.pop()),
            count => {
                warn!("{count} ApiUsers share one key in {view}");
                Err(Error::DuplicateRecord {
                    view,
                    key: key.to_string(),
                    count,
                })
            }
        }
    }

    pub async fn find_by_auth_token(&self, auth_token: &str) -> Result<Option<ApiUser>> {
        self.find_unique(VIEW_BY_AUTH_TOKEN, auth_token).await
    }

    pub async fn find_by_domain_name(&self, domain_name: &str) -> Result<Option<ApiUser>> {
        self.find_unique(VIEW_BY_DOMAIN_NAME, domain_name).await
    }

    pub async fn find_by_sha1(&self, sha1: &str) -> Result<Option<ApiUser>> {
        self.find_unique(VIEW_BY_SHA1, sha1).await
    }

    pub async fn find_all(&self) -> Result<Vec<ApiUser>> {
        self.store.all().await
    }

    pub async fn add(&self, user: &ApiUser) -> Result<ApiUser> {
        self.store.create(user).await
    }

    pub async fn delete(&self, user: &ApiUser) -> Result<()> {
        match (&user.id, &user.revision) {
            (Some(id), Some(revision)) => self.store.delete(id, revision).await,
            _ => Err(Error::DocumentStore {
                context: "delete document",
                source: anyhow::anyhow!("ApiUser {} was never stored", user.name),
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use rstest::rstest;

    use super::*;

    pub(crate) fn user(name: &str, token: &str, domain: &str) -> ApiUser {
        ApiUser {
            name: name.into(),
            auth_token: token.into(),
            organisation: format!("{name}MSP"),
            domain_name: domain.into(),
            ..Default::default()
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        users: Mutex<Vec<ApiUser>>,
    }

    #[async_trait]
    impl ApiUserStore for MemoryStore {
        async fn query_view(&self, view: &'static str, key: &str) -> Result<Vec<ApiUser>> {
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .filter(|u| match view {
                    VIEW_BY_AUTH_TOKEN => u.auth_token == key,
                    VIEW_BY_DOMAIN_NAME => u.domain_name == key,
                    VIEW_BY_SHA1 => u.sha1.as_deref() == Some(key),
                    _ => false,
                })
                .cloned()
                .collect())
        }

        async fn all(&self) -> Result<Vec<ApiUser>> {
            Ok(self.users.lock().unwrap().clone())
        }

        async fn create(&self, user: &ApiUser) -> Result<ApiUser> {
            let mut users = self.users.lock().unwrap();
            let mut user = user.clone();
            user.id = Some(format!("id-{}", users.len()));
            user.revision = Some("1-a".into());
            users.push(user.clone());
            Ok(user)
        }

        async fn delete(&self, id: &str, _revision: &str) -> Result<()> {
            self.users
                .lock()
                .unwrap()
                .retain(|u| u.id.as_deref() != Some(id));
            Ok(())
        }
    }

    async fn repository() -> ApiUserRepository<MemoryStore> {
        let repository = ApiUserRepository::new(MemoryStore::default());
        repository.add(&user("Org1", "t1", "org1.example.com")).await.unwrap();
        repository.add(&user("Org2", "t2", "shared.example.com")).await.unwrap();
        repository.add(&user("Org3", "t3", "shared.example.com")).await.unwrap();
        repository
    }

    #[rstest]
    #[case("t1", Some("Org1"))]
    #[case("t9", None)]
    #[tokio::test]
    async fn by_auth_token(#[case] token: &str, #[case] expected: Option<&str>) {
        let found = repository().await.find_by_auth_token(token).await.unwrap();
        assert_eq!(found.map(|u| u.name).as_deref(), expected);
    }

    #[tokio::test]
    async fn duplicate_domain_is_an_error() {
        let err = repository()
            .await
            .find_by_domain_name("shared.example.com")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateRecord {
                view: VIEW_BY_DOMAIN_NAME,
                count: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn delete_stored_user() {
        let repository = repository().await;
        let stored = repository.find_by_auth_token("t1").await.unwrap().unwrap();
        repository.delete(&stored).await.unwrap();
        assert_eq!(repository.find_all().await.unwrap().len(), 2);

        assert!(repository.delete(&user("New", "t4", "d")).await.is_err());
    }

    #[test]
    fn document_field_names() {
        let mut u = user("Org1", "t1", "org1.example.com");
        u.id = Some("abc".into());
        let value = serde_json::to_value(&u).unwrap();
        assert_eq!(value["_id"], "abc");
        assert_eq!(value["authToken"], "t1");
        assert_eq!(value["domainName"], "org1.example.com");
        assert!(value.get("_rev").is_none());
    }

    #[rstest]
    #[case("http://localhost:5984", "http://localhost:5984/ApiUsers/_design/ApiUser/_view/by_sha1")]
    #[case("http://db:5984/prefix/", "http://db:5984/prefix/ApiUsers/_design/ApiUser/_view/by_sha1")]
    fn view_endpoint(#[case] base: &str, #[case] expected: &str) {
        let db = CouchDb::new(&CouchDbConfig {
            url: base.into(),
            username: None,
            password: None,
        })
        .unwrap();
        assert_eq!(
            db.endpoint(&["_design", DESIGN_DOC, "_view", VIEW_BY_SHA1]).as_str(),
            expected
        );
    }

    #[test]
    fn invalid_url() {
        let res = CouchDb::new(&CouchDbConfig {
            url: "not a url".into(),
            username: None,
            password: None,
        });
        assert!(matches!(res, Err(Error::Configuration(_))));
    }
}
