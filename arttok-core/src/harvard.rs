use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::art::ArtPiece;

pub const DEFAULT_BASE_URL: &str = "https://api.harvardartmuseums.org";

/// Field selection for the object endpoint; keeps response payloads down to
/// what the mapping step reads.
const OBJECT_FIELDS: &str = "objectid,title,primaryimageurl,people,description,\
labeltext,creditline,culture,dated,classification,medium,technique,dimensions,url";

/// Only records with curator-verified descriptions.
const VERIFICATION_FILTER: &str = "verificationlevel:4";

#[derive(Debug, Error)]
pub enum HarvardError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog returned status {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// One fetched page: the mapped pieces plus the server's own next-page hint.
#[derive(Debug, Clone)]
pub struct ArtPage {
    pub pieces: Vec<ArtPiece>,
    /// Whether the server reported a next page. The feed engine treats this
    /// as a hint, not the truth.
    pub has_next: bool,
}

/// Paginated artwork source the feed engine pulls from.
///
/// `HarvardClient` is the production implementation; tests inject in-memory
/// fakes.
#[async_trait]
pub trait ArtCatalog: Send + Sync {
    /// Fetch one page of artworks. `page` starts at 1; `size` is a small
    /// positive count per page. One request per call, no internal retries —
    /// retry policy lives in the feed engine via re-invocation.
    async fn fetch_page(&self, page: u32, size: u32) -> Result<ArtPage, HarvardError>;
}

// -- Wire types for the object endpoint --

#[derive(Debug, Deserialize)]
pub struct ObjectsResponse {
    pub info: PageInfo,
    #[serde(default)]
    pub records: Vec<ObjectRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub totalrecords: u64,
    /// URL of the next page when one exists.
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ObjectRecord {
    pub objectid: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub primaryimageurl: Option<String>,
    #[serde(default)]
    pub people: Option<Vec<PersonRecord>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub labeltext: Option<String>,
    #[serde(default)]
    pub creditline: Option<String>,
    #[serde(default)]
    pub culture: Option<String>,
    #[serde(default)]
    pub dated: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub technique: Option<String>,
    #[serde(default)]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PersonRecord {
    #[serde(default)]
    pub name: Option<String>,
}

/// A client for the Harvard Art Museums object API.
pub struct HarvardClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl HarvardClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetch one page of randomly sorted, image-bearing objects and map the
    /// records into feed pieces. Records without a primary image are dropped.
    pub async fn fetch_page(&self, page: u32, size: u32) -> Result<ArtPage, HarvardError> {
        let url = format!("{}/object", self.base_url);
        let page_str = page.to_string();
        let size_str = size.to_string();
        debug!("catalog request: page {} size {}", page, size);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("size", size_str.as_str()),
                ("page", page_str.as_str()),
                ("sort", "random"),
                ("hasimage", "1"),
                ("q", VERIFICATION_FILTER),
                ("fields", OBJECT_FIELDS),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("catalog error response ({}): {}", status, body);
            return Err(HarvardError::Api { status, body });
        }

        let parsed: ObjectsResponse = response.json().await?;
        let total = parsed.records.len();
        let has_next = parsed.info.next.is_some();
        let pieces: Vec<ArtPiece> = parsed
            .records
            .into_iter()
            .filter_map(ArtPiece::from_record)
            .collect();
        if pieces.len() < total {
            debug!(
                "dropped {} record(s) without a primary image",
                total - pieces.len()
            );
        }

        Ok(ArtPage { pieces, has_next })
    }
}

#[async_trait]
impl ArtCatalog for HarvardClient {
    async fn fetch_page(&self, page: u32, size: u32) -> Result<ArtPage, HarvardError> {
        HarvardClient::fetch_page(self, page, size).await
    }
}
