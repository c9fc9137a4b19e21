//! Remote storm catalog
//!
//! [`StormCatalog`] turns the storm index page into a filtered list of
//! [`Storm`]s and each storm page into its [`ArchiveRef`]s. Page retrieval is
//! delegated to a [`CatalogSource`] so that tests can count requests.

pub mod storm;

pub use storm::{title_case, Storm};

use crate::archive::ArchiveRef;
use crate::error::{CollectError, CollectResult};
use async_trait::async_trait;
use psi_common::config::CollectorConfig;
use regex::{Regex, RegexBuilder};
use reqwest::Url;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

const USER_AGENT: &str = concat!("psi-collect/", env!("CARGO_PKG_VERSION"));

/// Pattern that matches every entry
pub const MATCH_ALL: &str = ".*";

/// Fetches listing pages
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Body of the page at `url`
    async fn fetch_page(&self, url: &Url) -> CollectResult<String>;
}

/// [`CatalogSource`] over HTTP(S)
pub struct HttpCatalogSource {
    http_client: reqwest::Client,
}

impl HttpCatalogSource {
    pub fn new(config: &CollectorConfig) -> CollectResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CollectError::Network(e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_page(&self, url: &Url) -> CollectResult<String> {
        tracing::debug!(url = %url, "Fetching catalog page");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CollectError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Compile a user filter, case-insensitive
pub fn compile_filter(pattern: &str) -> CollectResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| CollectError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Last storm listing and the pattern it was built for
struct StormListing {
    pattern: String,
    storms: Vec<Storm>,
}

/// Storm catalog with a memoized storm listing and cached archive lists
pub struct StormCatalog<S> {
    source: S,
    index_url: Url,
    last_listing: Mutex<Option<StormListing>>,
    archive_lists: Mutex<HashMap<String, Vec<ArchiveRef>>>,
}

impl<S: CatalogSource> StormCatalog<S> {
    /// # Errors
    /// [`CollectError::MalformedUrl`] if `base_url` is not an absolute URL.
    pub fn new(source: S, base_url: &str) -> CollectResult<Self> {
        let index_url =
            Url::parse(base_url).map_err(|e| CollectError::MalformedUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self {
            source,
            index_url,
            last_listing: Mutex::new(None),
            archive_lists: Mutex::new(HashMap::new()),
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Storms whose id, title or year matches `pattern` (case-insensitive)
    ///
    /// The listing is re-resolved only when `pattern` differs from the one
    /// used last time; an identical pattern returns the remembered result
    /// without contacting the source.
    pub async fn list_storms(&self, pattern: &str) -> CollectResult<Vec<Storm>> {
        let mut last = self.last_listing.lock().await;
        if let Some(listing) = last.as_ref() {
            if listing.pattern == pattern {
                return Ok(listing.storms.clone());
            }
        }

        let filter = compile_filter(pattern)?;
        let html = self.source.fetch_page(&self.index_url).await?;
        let storms: Vec<Storm> = storm::parse_storm_index(&html, &self.index_url)
            .into_iter()
            .filter(|storm| storm.matches(&filter))
            .collect();

        tracing::info!(pattern, count = storms.len(), "Resolved storm listing");

        *last = Some(StormListing {
            pattern: pattern.to_string(),
            storms: storms.clone(),
        });
        Ok(storms)
    }

    /// Archives of one storm whose date, file name or label matches `pattern`
    ///
    /// Each storm page is fetched once; later calls filter the cached list.
    pub async fn list_archives(&self, storm: &Storm, pattern: &str) -> CollectResult<Vec<ArchiveRef>> {
        let filter = compile_filter(pattern)?;

        let mut lists = self.archive_lists.lock().await;
        if !lists.contains_key(&storm.storm_id) {
            let page_url = Url::parse(&storm.url)
                .map_err(|e| CollectError::MalformedUrl(format!("{}: {}", storm.url, e)))?;
            let html = self.source.fetch_page(&page_url).await?;
            let archives = storm::parse_archive_links(&html, &page_url);
            tracing::debug!(storm = %storm.storm_id, count = archives.len(), "Resolved archive list");
            lists.insert(storm.storm_id.clone(), archives);
        }

        Ok(lists
            .get(&storm.storm_id)
            .map(|archives| archives.iter().filter(|a| a.matches(&filter)).cloned().collect())
            .unwrap_or_default())
    }
}
