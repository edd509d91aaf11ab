//! YouTube Data API client: channel lookup, paginated video search and
//! per-video statistics, plus a fixture-backed API for offline runs.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use yth_core::{ChannelRecord, Statistic, VideoRecord};
use yth_http::{HttpClientConfig, HttpFetcher};

pub const CRATE_NAME: &str = "yth-youtube";

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// `maxResults` sent with every search page request.
pub const SEARCH_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error(transparent)]
    Http(#[from] yth_http::FetchError),
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("channel {channel_id} was not found upstream")]
    NotFound { channel_id: String },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListResponse<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl<T> ListResponse<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_page_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelItem {
    pub id: String,
    pub snippet: ChannelSnippet,
    pub status: Option<ChannelStatus>,
    pub statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatus {
    pub privacy_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    pub view_count: Option<String>,
    pub subscriber_count: Option<String>,
    #[serde(default)]
    pub hidden_subscriber_count: bool,
    pub video_count: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: SearchResultId,
    pub snippet: Option<SearchSnippet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    #[serde(default)]
    pub kind: String,
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub published_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    pub statistics: Option<VideoStatistics>,
    pub content_details: Option<ContentDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetails {
    pub duration: Option<String>,
}

/// The three read-only endpoints the harvester consumes.
#[async_trait]
pub trait YoutubeApi: Send + Sync {
    async fn channels(&self, channel_id: &str) -> Result<ListResponse<ChannelItem>, UpstreamError>;

    /// One page of a channel's videos, newest first. `page_token` is forwarded verbatim.
    async fn search_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListResponse<SearchItem>, UpstreamError>;

    async fn videos(&self, video_id: &str) -> Result<ListResponse<VideoItem>, UpstreamError>;
}

#[async_trait]
impl<T: YoutubeApi + ?Sized> YoutubeApi for Arc<T> {
    async fn channels(&self, channel_id: &str) -> Result<ListResponse<ChannelItem>, UpstreamError> {
        (**self).channels(channel_id).await
    }

    async fn search_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListResponse<SearchItem>, UpstreamError> {
        (**self).search_videos(channel_id, page_token).await
    }

    async fn videos(&self, video_id: &str) -> Result<ListResponse<VideoItem>, UpstreamError> {
        (**self).videos(video_id).await
    }
}

#[derive(Clone)]
pub struct YoutubeApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub http: HttpClientConfig,
}

impl YoutubeApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
            http: HttpClientConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_http(mut self, timeout: Duration, user_agent: Option<String>) -> Self {
        self.http = HttpClientConfig {
            timeout,
            user_agent,
        };
        self
    }
}

pub struct HttpYoutubeApi {
    http: HttpFetcher,
    base_url: String,
    api_key: String,
}

impl HttpYoutubeApi {
    pub fn new(config: YoutubeApiConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(!config.api_key.trim().is_empty(), "YouTube API key is empty");
        let http = HttpFetcher::new(config.http).context("building upstream http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/{resource}", self.base_url)
    }
}

#[async_trait]
impl YoutubeApi for HttpYoutubeApi {
    async fn channels(&self, channel_id: &str) -> Result<ListResponse<ChannelItem>, UpstreamError> {
        let query = [
            ("part", "snippet,status,statistics"),
            ("id", channel_id),
            ("key", self.api_key.as_str()),
        ];
        Ok(self.http.fetch_json(&self.endpoint("channels"), &query).await?)
    }

    async fn search_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListResponse<SearchItem>, UpstreamError> {
        let page_size = SEARCH_PAGE_SIZE.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("channelId", channel_id),
            ("order", "date"),
            ("maxResults", page_size.as_str()),
            ("key", self.api_key.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        Ok(self.http.fetch_json(&self.endpoint("search"), &query).await?)
    }

    async fn videos(&self, video_id: &str) -> Result<ListResponse<VideoItem>, UpstreamError> {
        let query = [
            ("part", "statistics,contentDetails"),
            ("id", video_id),
            ("key", self.api_key.as_str()),
        ];
        Ok(self.http.fetch_json(&self.endpoint("videos"), &query).await?)
    }
}

/// Turns raw API pages into channel and video records.
pub struct MetadataFetcher {
    api: Box<dyn YoutubeApi>,
}

impl MetadataFetcher {
    pub fn new(api: impl YoutubeApi + 'static) -> Self {
        Self { api: Box::new(api) }
    }

    pub async fn fetch_channel(&self, channel_id: &str) -> Result<ChannelRecord, FetchError> {
        let resp = self.api.channels(channel_id).await?;
        let item = resp
            .items
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound {
                channel_id: channel_id.to_string(),
            })?;
        Ok(channel_record(channel_id, item)?)
    }

    /// Every video of the channel, following continuation tokens until the
    /// upstream stops returning one. Any page failure aborts the whole fetch.
    pub async fn fetch_videos(&self, channel_id: &str) -> Result<Vec<VideoRecord>, FetchError> {
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut pages = 0usize;

        loop {
            let page = self
                .api
                .search_videos(channel_id, page_token.as_deref())
                .await?;
            pages += 1;

            for item in page.items {
                let Some(video_id) = item.id.video_id else {
                    continue;
                };
                let snippet = item.snippet.ok_or_else(|| {
                    UpstreamError::Malformed(format!("search result {video_id} has no snippet"))
                })?;
                let published_at = parse_published_at(&snippet.published_at)?;
                let details = self.video_details(&video_id).await?;

                videos.push(VideoRecord {
                    video_id,
                    channel_id: channel_id.to_string(),
                    title: snippet.title,
                    description: snippet.description,
                    views: details.views,
                    likes: details.likes,
                    total_comments: details.comments,
                    duration: details.duration,
                    published_at,
                });
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) if !seen_tokens.insert(next.clone()) => {
                    return Err(UpstreamError::Malformed(format!(
                        "search pagination repeated token {next}"
                    ))
                    .into());
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        info!(channel_id, pages, videos = videos.len(), "fetched channel videos");
        Ok(videos)
    }

    /// Missing or failed lookups degrade to `Unavailable`, except rejected
    /// credentials and exhausted quota, which abort the fetch.
    async fn video_details(&self, video_id: &str) -> Result<VideoDetails, UpstreamError> {
        match self.api.videos(video_id).await {
            Ok(resp) => match resp.items.into_iter().next() {
                Some(item) => Ok(VideoDetails::from_item(item)),
                None => {
                    warn!(video_id, "no statistics returned; marking unavailable");
                    Ok(VideoDetails::unavailable())
                }
            },
            Err(err) if is_quota_or_auth_failure(&err) => Err(err),
            Err(err) => {
                warn!(video_id, error = %err, "statistics lookup failed; marking unavailable");
                Ok(VideoDetails::unavailable())
            }
        }
    }
}

// Every later lookup would fail the same way and null out stored counts.
fn is_quota_or_auth_failure(err: &UpstreamError) -> bool {
    matches!(
        err,
        UpstreamError::Http(yth_http::FetchError::HttpStatus {
            status: 401 | 403 | 429,
            ..
        })
    )
}

struct VideoDetails {
    views: Statistic,
    likes: Statistic,
    comments: Statistic,
    duration: Option<String>,
}

impl VideoDetails {
    fn unavailable() -> Self {
        Self {
            views: Statistic::Unavailable,
            likes: Statistic::Unavailable,
            comments: Statistic::Unavailable,
            duration: None,
        }
    }

    fn from_item(item: VideoItem) -> Self {
        let stats = item.statistics.unwrap_or_default();
        Self {
            views: Statistic::parse(stats.view_count.as_deref()),
            likes: Statistic::parse(stats.like_count.as_deref()),
            comments: Statistic::parse(stats.comment_count.as_deref()),
            duration: item
                .content_details
                .and_then(|c| c.duration)
                .filter(|d| !d.trim().is_empty()),
        }
    }
}

fn channel_record(channel_id: &str, item: ChannelItem) -> Result<ChannelRecord, UpstreamError> {
    let stats = item
        .statistics
        .ok_or_else(|| UpstreamError::Malformed(format!("channel {channel_id} has no statistics")))?;
    let channel_status = item
        .status
        .and_then(|s| s.privacy_status)
        .ok_or_else(|| UpstreamError::Malformed(format!("channel {channel_id} has no privacy status")))?;

    let subscriber_count = match stats.subscriber_count.as_deref() {
        None if stats.hidden_subscriber_count => 0,
        raw => parse_count("subscriberCount", raw)?,
    };

    Ok(ChannelRecord {
        channel_id: channel_id.to_string(),
        channel_name: item.snippet.title,
        description: item.snippet.description,
        subscriber_count,
        total_videos: parse_count("videoCount", stats.video_count.as_deref())?,
        total_views: parse_count("viewCount", stats.view_count.as_deref())?,
        channel_status,
    })
}

fn parse_count(field: &str, raw: Option<&str>) -> Result<u64, UpstreamError> {
    let raw = raw.ok_or_else(|| UpstreamError::Malformed(format!("missing {field}")))?;
    raw.trim()
        .parse()
        .map_err(|_| UpstreamError::Malformed(format!("{field} is not a count: {raw:?}")))
}

/// Upstream timestamps look like `2022-03-14T10:00:00Z`.
pub fn parse_published_at(raw: &str) -> Result<DateTime<Utc>, UpstreamError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| UpstreamError::Malformed(format!("publishedAt {raw:?}: {e}")))
}

/// Canned API responses for one channel, with optional failure injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureBundle {
    pub fixture_id: String,
    pub channel_id: String,
    pub channels: ListResponse<ChannelItem>,
    #[serde(default)]
    pub search_pages: Vec<ListResponse<SearchItem>>,
    #[serde(default)]
    pub videos: BTreeMap<String, ListResponse<VideoItem>>,
    #[serde(default)]
    pub failures: FixtureFailures,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureFailures {
    /// Zero-based search page index that fails with a 503.
    pub search_page: Option<usize>,
    /// Video ids whose statistics lookup fails, with `video_status` (500 if unset).
    #[serde(default)]
    pub video_ids: Vec<String>,
    pub video_status: Option<u16>,
}

pub fn load_fixture_bundle(path: impl AsRef<Path>) -> anyhow::Result<FixtureBundle> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

pub struct FixtureYoutubeApi {
    bundle: FixtureBundle,
    requested_page_tokens: Mutex<Vec<Option<String>>>,
}

impl FixtureYoutubeApi {
    pub fn new(bundle: FixtureBundle) -> Self {
        Self {
            bundle,
            requested_page_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self::new(load_fixture_bundle(path)?))
    }

    /// Page tokens received by `search_videos`, in call order.
    pub fn requested_page_tokens(&self) -> Vec<Option<String>> {
        self.requested_page_tokens
            .lock()
            .map(|tokens| tokens.clone())
            .unwrap_or_default()
    }

    fn injected_failure(&self, resource: &str, status: u16) -> UpstreamError {
        UpstreamError::Http(yth_http::FetchError::HttpStatus {
            status,
            url: format!("fixture://{}/{resource}", self.bundle.fixture_id),
        })
    }
}

#[async_trait]
impl YoutubeApi for FixtureYoutubeApi {
    async fn channels(&self, channel_id: &str) -> Result<ListResponse<ChannelItem>, UpstreamError> {
        if channel_id != self.bundle.channel_id {
            return Ok(ListResponse::empty());
        }
        Ok(self.bundle.channels.clone())
    }

    async fn search_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> Result<ListResponse<SearchItem>, UpstreamError> {
        if let Ok(mut tokens) = self.requested_page_tokens.lock() {
            tokens.push(page_token.map(ToString::to_string));
        }
        if channel_id != self.bundle.channel_id {
            return Ok(ListResponse::empty());
        }

        let pages = &self.bundle.search_pages;
        let index = match page_token {
            None => 0,
            Some(token) => pages
                .iter()
                .position(|p| p.next_page_token.as_deref() == Some(token))
                .map(|i| i + 1)
                .ok_or_else(|| UpstreamError::Malformed(format!("unknown page token {token}")))?,
        };

        if self.bundle.failures.search_page == Some(index) {
            return Err(self.injected_failure("search", 503));
        }
        Ok(pages.get(index).cloned().unwrap_or_else(ListResponse::empty))
    }

    async fn videos(&self, video_id: &str) -> Result<ListResponse<VideoItem>, UpstreamError> {
        if self.bundle.failures.video_ids.iter().any(|id| id == video_id) {
            let status = self.bundle.failures.video_status.unwrap_or(500);
            return Err(self.injected_failure("videos", status));
        }
        Ok(self
            .bundle
            .videos
            .get(video_id)
            .cloned()
            .unwrap_or_else(ListResponse::empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../fixtures/youtube")
            .join(name)
            .join("bundle.json")
    }

    fn two_pages() -> FixtureBundle {
        load_fixture_bundle(fixture_path("two-pages")).unwrap()
    }

    #[tokio::test]
    async fn fetch_channel_maps_snippet_status_and_statistics() {
        let bundle = two_pages();
        let channel_id = bundle.channel_id.clone();
        let fetcher = MetadataFetcher::new(FixtureYoutubeApi::new(bundle));

        let channel = fetcher.fetch_channel(&channel_id).await.unwrap();
        assert_eq!(channel.channel_name, "Rust Harvest Lab");
        assert_eq!(channel.subscriber_count, 1200);
        assert_eq!(channel.total_videos, 4);
        assert_eq!(channel.total_views, 987_654);
        assert_eq!(channel.channel_status, "public");
    }

    #[tokio::test]
    async fn unknown_channel_is_not_found() {
        let fetcher = MetadataFetcher::new(FixtureYoutubeApi::new(two_pages()));
        let err = fetcher.fetch_channel("UCdoesNotExist").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound { ref channel_id } if channel_id == "UCdoesNotExist"));
    }

    #[tokio::test]
    async fn missing_statistics_is_malformed() {
        let mut bundle = two_pages();
        bundle.channels.items[0].statistics = None;
        let channel_id = bundle.channel_id.clone();
        let fetcher = MetadataFetcher::new(FixtureYoutubeApi::new(bundle));
        let err = fetcher.fetch_channel(&channel_id).await.unwrap_err();
        assert!(matches!(err, FetchError::Upstream(UpstreamError::Malformed(_))));
    }

    #[tokio::test]
    async fn hidden_subscriber_count_reads_as_zero() {
        let mut bundle = two_pages();
        let stats = bundle.channels.items[0].statistics.as_mut().unwrap();
        stats.subscriber_count = None;
        stats.hidden_subscriber_count = true;
        let channel_id = bundle.channel_id.clone();
        let fetcher = MetadataFetcher::new(FixtureYoutubeApi::new(bundle));
        assert_eq!(fetcher.fetch_channel(&channel_id).await.unwrap().subscriber_count, 0);
    }

    #[tokio::test]
    async fn pagination_follows_tokens_until_absent() {
        let bundle = two_pages();
        let channel_id = bundle.channel_id.clone();
        let api = Arc::new(FixtureYoutubeApi::new(bundle));
        let fetcher = MetadataFetcher::new(api.clone());

        let videos = fetcher.fetch_videos(&channel_id).await.unwrap();
        let ids: Vec<_> = videos.iter().map(|v| v.video_id.as_str()).collect();
        assert_eq!(ids, vec!["vidAAA", "vidBBB", "vidCCC", "vidDDD"]);
        assert_eq!(
            api.requested_page_tokens(),
            vec![None, Some("CAIQAA".to_string())]
        );
        assert!(videos.iter().all(|v| v.channel_id == channel_id));
    }

    #[tokio::test]
    async fn statistics_and_duration_are_attached() {
        let bundle = two_pages();
        let channel_id = bundle.channel_id.clone();
        let fetcher = MetadataFetcher::new(FixtureYoutubeApi::new(bundle));
        let videos = fetcher.fetch_videos(&channel_id).await.unwrap();

        let first = &videos[0];
        assert_eq!(first.views, Statistic::Count(1500));
        assert_eq!(first.likes, Statistic::Count(120));
        assert_eq!(first.total_comments, Statistic::Count(14));
        assert_eq!(first.duration.as_deref(), Some("PT1H0M"));
        assert_eq!(first.published_at.to_rfc3339(), "2022-03-14T10:00:00+00:00");

        let hidden_likes = &videos[1];
        assert_eq!(hidden_likes.views, Statistic::Count(800));
        assert_eq!(hidden_likes.likes, Statistic::Unavailable);

        let zeros = &videos[3];
        assert_eq!(zeros.likes, Statistic::Count(0));
        assert!(!zeros.is_degraded());
    }

    #[tokio::test]
    async fn empty_statistics_lookup_degrades_to_sentinel() {
        let bundle = two_pages();
        let channel_id = bundle.channel_id.clone();
        let fetcher = MetadataFetcher::new(FixtureYoutubeApi::new(bundle));
        let videos = fetcher.fetch_videos(&channel_id).await.unwrap();

        let no_stats = videos.iter().find(|v| v.video_id == "vidCCC").unwrap();
        assert_eq!(no_stats.views, Statistic::Unavailable);
        assert_eq!(no_stats.likes, Statistic::Unavailable);
        assert_eq!(no_stats.total_comments, Statistic::Unavailable);
        assert_eq!(no_stats.duration, None);
    }

    #[tokio::test]
    async fn failed_first_statistics_lookup_keeps_video() {
        let mut bundle = two_pages();
        bundle.failures.video_ids.push("vidAAA".into());
        let channel_id = bundle.channel_id.clone();
        let fetcher = MetadataFetcher::new(FixtureYoutubeApi::new(bundle));

        let videos = fetcher.fetch_videos(&channel_id).await.unwrap();
        assert_eq!(videos.len(), 4);
        assert_eq!(videos[0].video_id, "vidAAA");
        assert_eq!(videos[0].views, Statistic::Unavailable);
        assert_eq!(videos[1].views, Statistic::Count(800));
    }

    #[tokio::test]
    async fn page_failure_aborts_whole_fetch() {
        let mut bundle = two_pages();
        bundle.failures.search_page = Some(1);
        let channel_id = bundle.channel_id.clone();
        let fetcher = MetadataFetcher::new(FixtureYoutubeApi::new(bundle));

        let err = fetcher.fetch_videos(&channel_id).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Upstream(UpstreamError::Http(yth_http::FetchError::HttpStatus { status: 503, .. }))
        ));
    }

    #[tokio::test]
    async fn repeated_page_token_is_rejected() {
        let mut bundle = two_pages();
        bundle.search_pages[1].next_page_token = Some("CAIQAA".into());
        let channel_id = bundle.channel_id.clone();
        let fetcher = MetadataFetcher::new(FixtureYoutubeApi::new(bundle));

        let err = fetcher.fetch_videos(&channel_id).await.unwrap_err();
        assert!(matches!(err, FetchError::Upstream(UpstreamError::Malformed(_))));
    }

    #[tokio::test]
    async fn token_cycle_across_pages_is_rejected() {
        let mut bundle = two_pages();
        bundle.search_pages[0].next_page_token = Some("A".into());
        bundle.search_pages[1].next_page_token = Some("B".into());
        let mut third = bundle.search_pages[1].clone();
        third.next_page_token = Some("A".into());
        bundle.search_pages.push(third);
        let channel_id = bundle.channel_id.clone();
        let api = Arc::new(FixtureYoutubeApi::new(bundle));
        let fetcher = MetadataFetcher::new(api.clone());

        let err = fetcher.fetch_videos(&channel_id).await.unwrap_err();
        assert!(matches!(err, FetchError::Upstream(UpstreamError::Malformed(_))));
        assert_eq!(
            api.requested_page_tokens(),
            vec![None, Some("A".to_string()), Some("B".to_string())]
        );
    }

    #[tokio::test]
    async fn quota_exhaustion_during_statistics_aborts() {
        let mut bundle = two_pages();
        bundle.failures.video_ids.push("vidBBB".into());
        bundle.failures.video_status = Some(403);
        let channel_id = bundle.channel_id.clone();
        let fetcher = MetadataFetcher::new(FixtureYoutubeApi::new(bundle));

        let err = fetcher.fetch_videos(&channel_id).await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Upstream(UpstreamError::Http(yth_http::FetchError::HttpStatus { status: 403, .. }))
        ));
    }

    #[test]
    fn list_without_items_decodes_as_empty() {
        let resp: ListResponse<VideoItem> =
            serde_json::from_str(r#"{"kind": "youtube#videoListResponse"}"#).unwrap();
        assert!(resp.items.is_empty());
        assert_eq!(resp.next_page_token, None);

        let page: ListResponse<SearchItem> = serde_json::from_str(
            r#"{"nextPageToken": "CAIQAA", "items": [{"id": {"kind": "youtube#video", "videoId": "v1"}}]}"#,
        )
        .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("CAIQAA"));
        assert_eq!(page.items[0].id.video_id.as_deref(), Some("v1"));
    }

    #[test]
    fn published_at_requires_timestamp() {
        assert!(parse_published_at("2021-12-31T23:59:59Z").is_ok());
        assert!(parse_published_at("31/12/2021").is_err());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(HttpYoutubeApi::new(YoutubeApiConfig::new("  ")).is_err());
        assert!(HttpYoutubeApi::new(YoutubeApiConfig::new("key")).is_ok());
    }
}
