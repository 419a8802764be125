//! Client for the Eagle library service's local HTTP API.
//!
//! The library service owns every item, folder, tag and file; this crate only
//! reads from it (and forwards uploads to it). [`LibraryClient`] is the seam
//! the rest of the crate talks to, so handlers and the assembler can be
//! exercised against an in-memory fake.
//!
//! # Wire format
//!
//! Every endpoint answers with an envelope:
//!
//! ```json
//! { "status": "success", "data": ... }
//! ```
//!
//! Anything other than `"success"`, a non-2xx HTTP status, a transport error
//! or a body that does not decode is reported as [`GalleryError::Upstream`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::LibraryConfig;
use crate::error::{GalleryError, Result};
use crate::models::{AddFromPathOptions, ApplicationInfo, Folder, Item, ItemListOptions, Tag};

/// Read (and upload) access to a media library.
#[async_trait]
pub trait LibraryClient: Send + Sync {
    /// Items matching the filter, in the requested order.
    async fn list_items(&self, filter: &ItemListOptions) -> Result<Vec<Item>>;

    /// The full folder tree.
    async fn list_folders(&self) -> Result<Vec<Folder>>;

    /// Every tag in the library.
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// The raw, percent-encoded thumbnail path for an item.
    async fn thumbnail_path(&self, item_id: &str) -> Result<String>;

    /// Imports a file on the local disk into the library.
    async fn add_from_path(&self, opts: &AddFromPathOptions) -> Result<()>;

    async fn application_info(&self) -> Result<ApplicationInfo>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

/// [`LibraryClient`] backed by the Eagle desktop application's API.
pub struct EagleClient {
    base_url: String,
    http: Client,
}

impl EagleClient {
    pub fn new(config: &LibraryConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .http
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await
            .map_err(|e| GalleryError::upstream(endpoint, e))?;
        decode(endpoint, response).await
    }
}

/// Unwraps the `{status, data}` envelope.
async fn decode<T: DeserializeOwned>(endpoint: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GalleryError::Upstream(format!(
            "{}: library service returned {}: {}",
            endpoint, status, body
        )));
    }

    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|e| GalleryError::upstream(endpoint, e))?;
    unwrap_envelope(endpoint, envelope)
}

fn unwrap_envelope<T>(endpoint: &str, envelope: Envelope<T>) -> Result<T> {
    if envelope.status != "success" {
        let detail = envelope.message.unwrap_or(envelope.status);
        return Err(GalleryError::Upstream(format!("{}: {}", endpoint, detail)));
    }
    envelope
        .data
        .ok_or_else(|| GalleryError::Upstream(format!("{}: response has no data", endpoint)))
}

/// Query pairs for `/api/item/list`. Empty filters are left out entirely.
fn item_list_query(filter: &ItemListOptions) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("limit", filter.limit.to_string()),
        ("offset", filter.offset.to_string()),
        ("orderBy", filter.order_by.to_param(filter.descending)),
    ];
    for (key, value) in [
        ("keyword", &filter.keyword),
        ("ext", &filter.ext),
        ("tags", &filter.tags),
        ("folders", &filter.folders),
    ] {
        if !value.is_empty() {
            query.push((key, value.clone()));
        }
    }
    query
}

#[async_trait]
impl LibraryClient for EagleClient {
    async fn list_items(&self, filter: &ItemListOptions) -> Result<Vec<Item>> {
        self.get("/api/item/list", &item_list_query(filter)).await
    }

    async fn list_folders(&self) -> Result<Vec<Folder>> {
        self.get("/api/folder/list", &[]).await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.get("/api/tag/list", &[]).await
    }

    async fn thumbnail_path(&self, item_id: &str) -> Result<String> {
        self.get("/api/item/thumbnail", &[("id", item_id.to_string())])
            .await
    }

    async fn add_from_path(&self, opts: &AddFromPathOptions) -> Result<()> {
        let endpoint = "/api/item/addFromPath";
        let response = self
            .http
            .post(self.url(endpoint))
            .json(opts)
            .send()
            .await
            .map_err(|e| GalleryError::upstream(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GalleryError::Upstream(format!(
                "{}: library service returned {}: {}",
                endpoint, status, body
            )));
        }

        // This endpoint answers with a bare status and no data.
        let envelope: Envelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| GalleryError::upstream(endpoint, e))?;
        if envelope.status != "success" {
            let detail = envelope.message.unwrap_or(envelope.status);
            return Err(GalleryError::Upstream(format!("{}: {}", endpoint, detail)));
        }
        Ok(())
    }

    async fn application_info(&self) -> Result<ApplicationInfo> {
        self.get("/api/application/info", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderBy;

    fn filter() -> ItemListOptions {
        ItemListOptions {
            limit: 20,
            offset: 3,
            order_by: OrderBy::CreateDate,
            descending: false,
            keyword: "cat".to_string(),
            ext: String::new(),
            tags: "a,b".to_string(),
            folders: String::new(),
        }
    }

    #[test]
    fn item_list_query_skips_empty_filters() {
        let query = item_list_query(&filter());
        let keys: Vec<&str> = query.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["limit", "offset", "orderBy", "keyword", "tags"]);
        assert!(query.contains(&("offset", "3".to_string())));
        assert!(query.contains(&("orderBy", "CREATEDATE".to_string())));
    }

    #[test]
    fn error_envelope_is_upstream_error() {
        let envelope: Envelope<String> =
            serde_json::from_str(r#"{"status":"error","message":"item not found"}"#).unwrap();
        let err = unwrap_envelope("/api/item/thumbnail", envelope).unwrap_err();
        assert!(matches!(err, GalleryError::Upstream(_)));
        assert!(err.to_string().contains("item not found"));
    }

    #[test]
    fn success_envelope_without_data_is_an_error() {
        let envelope: Envelope<Vec<Tag>> = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert!(unwrap_envelope("/api/tag/list", envelope).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = EagleClient::new(&LibraryConfig {
            base_url: "http://127.0.0.1:41595/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.url("/api/tag/list"), "http://127.0.0.1:41595/api/tag/list");
    }
}
