use crate::api::BackendSession;
use crate::api::GraphBackend;
use crate::api::QueryResponse;
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct BackendOptions {
    pub endpoint: String,
    pub primary_key: String,
    pub traversal_source: String,
}

/// JSON-over-HTTP client for the graph store: catalog listing, session
/// open/close, query submission. Key-based auth on every request.
#[derive(Clone)]
pub struct HttpBackendClient {
    http: reqwest::Client,
    endpoint: String,
    primary_key: String,
    traversal_source: String,
}

#[derive(Deserialize)]
struct ResourceId {
    id: String,
}

#[derive(Deserialize)]
struct DatabaseFeed {
    #[serde(rename = "Databases", default)]
    databases: Vec<ResourceId>,
}

#[derive(Deserialize)]
struct CollectionFeed {
    #[serde(rename = "DocumentCollections", default)]
    collections: Vec<ResourceId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionHandle {
    session_id: String,
}

impl HttpBackendClient {
    pub fn new(options: BackendOptions) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: options.endpoint.trim_end_matches('/').to_string(),
            primary_key: options.primary_key,
            traversal_source: options.traversal_source,
        })
    }

    fn auth_headers(&self) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.primary_key))
            .map_err(|err| BackendError::Malformed(format!("invalid primary key: {err}")))?;
        headers.insert(AUTHORIZATION, value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Status { status, body })
}

#[async_trait]
impl GraphBackend for HttpBackendClient {
    async fn list_databases(&self) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/dbs", self.endpoint);
        let resp = self.http.get(url).headers(self.auth_headers()?).send().await?;
        let feed: DatabaseFeed = check_status(resp).await?.json().await?;
        Ok(feed.databases.into_iter().map(|db| db.id).collect())
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/dbs/{database}/colls", self.endpoint);
        let resp = self.http.get(url).headers(self.auth_headers()?).send().await?;
        let feed: CollectionFeed = check_status(resp).await?.json().await?;
        Ok(feed.collections.into_iter().map(|coll| coll.id).collect())
    }

    async fn open_session(
        &self,
        target: &str,
    ) -> Result<Box<dyn BackendSession>, BackendError> {
        let url = format!("{}/sessions", self.endpoint);
        let resp = self
            .http
            .post(url)
            .headers(self.auth_headers()?)
            .json(&json!({
                "target": target,
                "source": self.traversal_source,
            }))
            .send()
            .await?;
        let handle: SessionHandle = check_status(resp).await?.json().await?;
        Ok(Box::new(HttpSession {
            client: self.clone(),
            session_id: handle.session_id,
            target: target.to_string(),
        }))
    }
}

struct HttpSession {
    client: HttpBackendClient,
    session_id: String,
    target: String,
}

#[async_trait]
impl BackendSession for HttpSession {
    fn target(&self) -> &str {
        &self.target
    }

    async fn submit(&self, query: &str) -> Result<QueryResponse, BackendError> {
        let url = format!(
            "{}/sessions/{}/queries",
            self.client.endpoint, self.session_id
        );
        let resp = self
            .client
            .http
            .post(url)
            .headers(self.client.auth_headers()?)
            .json(&json!({ "gremlin": query }))
            .send()
            .await?;
        Ok(check_status(resp).await?.json().await?)
    }

    async fn close(&self) -> Result<(), BackendError> {
        let url = format!("{}/sessions/{}", self.client.endpoint, self.session_id);
        let resp = self
            .client
            .http
            .delete(url)
            .headers(self.client.auth_headers()?)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}
