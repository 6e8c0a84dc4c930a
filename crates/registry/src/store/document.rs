//! CouchDB-style document store over HTTP
//!
//! One database per region (`{prefix}{region}`), one document per ticket
//! keyed by the storage key. Writes carry the `_rev` read earlier, so a
//! concurrent writer surfaces as HTTP 409 and then `Error::Conflict`.

use super::{BackendInfo, Consistency, StorageRegion, StoredTicket, TicketStore};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use ticketry_core::{Error, Result, TicketKind, TicketRecord};
use url::Url;

const BACKEND: &str = "document";

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DocumentStoreOptions {
    pub base_url: Url,
    pub database_prefix: String,
    pub request_timeout: Duration,
    pub credentials: Option<(String, String)>,
}

impl DocumentStoreOptions {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            database_prefix: "ticketry_".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            credentials: None,
        }
    }

    pub fn with_database_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.database_prefix = prefix.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TicketDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    kind: TicketKind,
    record: TicketRecord,
}

impl TicketDocument {
    fn into_stored(self) -> StoredTicket {
        StoredTicket {
            key: self.id,
            record: self.record,
            revision: self.rev,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AllDocs {
    #[serde(default)]
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    id: String,
    #[serde(default)]
    doc: Option<serde_json::Value>,
}

impl AllDocsRow {
    fn is_design(&self) -> bool {
        self.id.starts_with("_design/")
    }
}

#[derive(Debug, Deserialize)]
struct BulkResult {
    #[serde(default)]
    ok: bool,
}

/// Eventually consistent store for clustered deployments
pub struct DocumentTicketStore {
    client: Client,
    options: DocumentStoreOptions,
}

impl DocumentTicketStore {
    pub fn new(options: DocumentStoreOptions) -> Result<Self> {
        if options.base_url.cannot_be_a_base() {
            return Err(Error::configuration(format!(
                "document store url '{}' cannot be used as a base",
                options.base_url
            )));
        }
        let client = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| Error::configuration(format!("cannot build http client: {e}")))?;
        Ok(Self { client, options })
    }

    pub fn database_name(&self, region: &StorageRegion) -> String {
        format!("{}{}", self.options.database_prefix, region.name)
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.options.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::configuration("document store url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn document_url(&self, region: &StorageRegion, key: &str) -> Result<Url> {
        self.url(&[&self.database_name(region), key])
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.options.credentials {
            Some((username, password)) => builder.basic_auth(username, Some(password)),
            None => builder,
        }
    }

    async fn send(&self, operation: &'static str, builder: RequestBuilder) -> Result<Response> {
        builder
            .send()
            .await
            .map_err(|e| self.transport_error(operation, e))
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        response: Response,
    ) -> Result<T> {
        response
            .json()
            .await
            .map_err(|e| self.transport_error(operation, e))
    }

    fn transport_error(&self, operation: &'static str, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::timeout(format!("{BACKEND} {operation}"), self.options.request_timeout)
        } else {
            Error::backend_with_source(BACKEND, operation, error)
        }
    }

    async fn unexpected(operation: &'static str, response: Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Error::backend(BACKEND, operation, format!("unexpected status {status}: {body}"))
    }

    async fn resolve_revision(
        &self,
        region: &StorageRegion,
        key: &str,
        expected: Option<&str>,
    ) -> Result<Option<String>> {
        match expected {
            Some(revision) => Ok(Some(revision.to_string())),
            None => Ok(self.fetch(region, key).await?.and_then(|stored| stored.revision)),
        }
    }

    async fn put_document(
        &self,
        operation: &'static str,
        region: &StorageRegion,
        ticket: StoredTicket,
        revision: Option<String>,
    ) -> Result<()> {
        let url = self.document_url(region, &ticket.key)?;
        let key = ticket.key.clone();
        let document = TicketDocument {
            id: ticket.key,
            rev: revision,
            kind: region.kind,
            record: ticket.record,
        };
        let response = self
            .send(operation, self.request(Method::PUT, url).json(&document))
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(Error::conflict(key, operation)),
            _ => Err(Self::unexpected(operation, response).await),
        }
    }
}

#[async_trait]
impl TicketStore for DocumentTicketStore {
    fn backend(&self) -> BackendInfo {
        BackendInfo {
            name: BACKEND,
            consistency: Consistency::Eventual,
            native_expiry: false,
        }
    }

    async fn initialize(&self, regions: &[StorageRegion]) -> Result<()> {
        for region in regions {
            let database = self.database_name(region);
            let url = self.url(&[&database])?;
            let response = self
                .send("initialize", self.request(Method::PUT, url))
                .await?;
            match response.status() {
                status if status.is_success() => {
                    tracing::info!(database = %database, "created ticket database");
                }
                StatusCode::PRECONDITION_FAILED => {
                    tracing::debug!(database = %database, "ticket database already exists");
                }
                _ => return Err(Self::unexpected("initialize", response).await),
            }
        }
        Ok(())
    }

    async fn fetch(&self, region: &StorageRegion, key: &str) -> Result<Option<StoredTicket>> {
        let url = self.document_url(region, key)?;
        let response = self.send("fetch", self.request(Method::GET, url)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let document: TicketDocument = self.read_json("fetch", response).await?;
                Ok(Some(document.into_stored()))
            }
            _ => Err(Self::unexpected("fetch", response).await),
        }
    }

    async fn insert(&self, region: &StorageRegion, ticket: StoredTicket) -> Result<()> {
        let revision = self.resolve_revision(region, &ticket.key, None).await?;
        self.put_document("insert", region, ticket, revision).await
    }

    async fn replace(
        &self,
        region: &StorageRegion,
        ticket: StoredTicket,
        expected: Option<&str>,
    ) -> Result<bool> {
        let Some(revision) = self.resolve_revision(region, &ticket.key, expected).await? else {
            return Ok(false);
        };
        self.put_document("replace", region, ticket, Some(revision))
            .await
            .map(|()| true)
    }

    async fn remove(
        &self,
        region: &StorageRegion,
        key: &str,
        expected: Option<&str>,
    ) -> Result<bool> {
        let Some(revision) = self.resolve_revision(region, key, expected).await? else {
            return Ok(false);
        };
        let mut url = self.document_url(region, key)?;
        url.query_pairs_mut().append_pair("rev", &revision);

        let response = self.send("remove", self.request(Method::DELETE, url)).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            StatusCode::CONFLICT => Err(Error::conflict(key, "remove")),
            _ => Err(Self::unexpected("remove", response).await),
        }
    }

    async fn scan(&self, region: &StorageRegion) -> Result<Vec<StoredTicket>> {
        let mut url = self.url(&[&self.database_name(region), "_all_docs"])?;
        url.query_pairs_mut().append_pair("include_docs", "true");

        let response = self.send("scan", self.request(Method::GET, url)).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected("scan", response).await);
        }
        let all_docs: AllDocs = self.read_json("scan", response).await?;

        all_docs
            .rows
            .into_iter()
            .filter(|row| !row.is_design())
            .filter_map(|row| row.doc.map(|doc| (row.id, doc)))
            .map(|(id, doc)| {
                serde_json::from_value::<TicketDocument>(doc)
                    .map(TicketDocument::into_stored)
                    .map_err(|e| Error::serialization(id, e))
            })
            .collect()
    }

    async fn count(&self, region: &StorageRegion) -> Result<usize> {
        // Design documents are not tickets
        let url = self.url(&[&self.database_name(region), "_all_docs"])?;
        let response = self.send("count", self.request(Method::GET, url)).await?;
        if !response.status().is_success() {
            return Err(Self::unexpected("count", response).await);
        }
        let all_docs: AllDocs = self.read_json("count", response).await?;
        Ok(all_docs.rows.iter().filter(|row| !row.is_design()).count())
    }

    async fn clear(&self, region: &StorageRegion) -> Result<usize> {
        let docs: Vec<serde_json::Value> = self
            .scan(region)
            .await?
            .into_iter()
            .filter_map(|stored| {
                stored.revision.map(|revision| {
                    json!({ "_id": stored.key, "_rev": revision, "_deleted": true })
                })
            })
            .collect();
        if docs.is_empty() {
            return Ok(0);
        }

        let url = self.url(&[&self.database_name(region), "_bulk_docs"])?;
        let response = self
            .send(
                "clear",
                self.request(Method::POST, url).json(&json!({ "docs": docs })),
            )
            .await?;
        if !response.status().is_success() {
            return Err(Self::unexpected("clear", response).await);
        }
        let results: Vec<BulkResult> = self.read_json("clear", response).await?;
        Ok(results.iter().filter(|result| result.ok).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> DocumentTicketStore {
        let options = DocumentStoreOptions::new(Url::parse(base).unwrap())
            .with_database_prefix("sso_");
        DocumentTicketStore::new(options).unwrap()
    }

    #[test]
    fn test_document_url_joins_database_and_key() {
        let region = StorageRegion::new("service_tickets", TicketKind::Service, None);
        for base in ["http://couch:5984", "http://couch:5984/"] {
            let url = store(base).document_url(&region, "ST-abc-node1").unwrap();
            assert_eq!(url.as_str(), "http://couch:5984/sso_service_tickets/ST-abc-node1");
        }
    }

    #[test]
    fn test_base_path_is_preserved() {
        let region = StorageRegion::new("oauth_codes", TicketKind::OAuthCode, None);
        let url = store("https://proxy.local/couch/")
            .document_url(&region, "OC-1")
            .unwrap();
        assert_eq!(url.as_str(), "https://proxy.local/couch/sso_oauth_codes/OC-1");
    }

    #[test]
    fn test_rejects_non_base_url() {
        let options = DocumentStoreOptions::new(Url::parse("mailto:ops@example.com").unwrap());
        assert!(DocumentTicketStore::new(options).is_err());
    }
}
