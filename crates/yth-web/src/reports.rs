//! The ten fixed analytics queries over stored channels and videos.

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgConnection, Row};
use yth_core::duration::DurationTally;
use yth_core::Statistic;
use yth_sync::StoreConfig;

pub const DEFAULT_REPORT_YEAR: i32 = 2022;
pub const NO_VIDEOS: &str = "No videos found";
pub const NOT_APPLICABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    VideosWithChannel,
    ChannelVideoCounts,
    TopViewedVideos,
    VideoComments,
    TopLikedPerChannel,
    VideoLikes,
    ChannelViews,
    ChannelsPublishedIn,
    AverageDuration,
    TopCommentedPerChannel,
}

impl ReportKind {
    pub const ALL: [ReportKind; 10] = [
        ReportKind::VideosWithChannel,
        ReportKind::ChannelVideoCounts,
        ReportKind::TopViewedVideos,
        ReportKind::VideoComments,
        ReportKind::TopLikedPerChannel,
        ReportKind::VideoLikes,
        ReportKind::ChannelViews,
        ReportKind::ChannelsPublishedIn,
        ReportKind::AverageDuration,
        ReportKind::TopCommentedPerChannel,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ReportKind::VideosWithChannel => "videos-with-channel",
            ReportKind::ChannelVideoCounts => "channel-video-counts",
            ReportKind::TopViewedVideos => "top-viewed-videos",
            ReportKind::VideoComments => "video-comments",
            ReportKind::TopLikedPerChannel => "top-liked-per-channel",
            ReportKind::VideoLikes => "video-likes",
            ReportKind::ChannelViews => "channel-views",
            ReportKind::ChannelsPublishedIn => "channels-published-in",
            ReportKind::AverageDuration => "average-duration",
            ReportKind::TopCommentedPerChannel => "top-commented-per-channel",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    /// 1-based position on the analytics page.
    pub fn number(self) -> usize {
        Self::ALL
            .iter()
            .position(|kind| *kind == self)
            .map_or(0, |idx| idx + 1)
    }

    pub fn title(self, params: &ReportParams) -> String {
        match self {
            ReportKind::VideosWithChannel => {
                "Names of all videos and their corresponding channels".into()
            }
            ReportKind::ChannelVideoCounts => {
                "Channels with the most number of videos and their total counts".into()
            }
            ReportKind::TopViewedVideos => {
                "Top 10 most viewed videos and their respective channels".into()
            }
            ReportKind::VideoComments => {
                "Number of comments made on each video and their corresponding video names".into()
            }
            ReportKind::TopLikedPerChannel => {
                "Videos with the highest number of likes for each selected channel".into()
            }
            ReportKind::VideoLikes => {
                "Total number of likes for each video and their corresponding video names".into()
            }
            ReportKind::ChannelViews => {
                "Total number of views for each channel and their corresponding channel names".into()
            }
            ReportKind::ChannelsPublishedIn => format!(
                "Names of selected channels that have published videos in the year {}",
                params.year
            ),
            ReportKind::AverageDuration => "Average duration of videos for selected channels".into(),
            ReportKind::TopCommentedPerChannel => {
                "Videos with the highest number of comments for each selected channel".into()
            }
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            ReportKind::VideosWithChannel => &["Video Title", "Channel Name"],
            ReportKind::ChannelVideoCounts => &["Channel Name", "Total Videos"],
            ReportKind::TopViewedVideos => &["Video Title", "Channel Name", "Views"],
            ReportKind::VideoComments => &["Video Title", "Number of Comments"],
            ReportKind::TopLikedPerChannel => &["Channel Name", "Video Title", "Total Likes"],
            ReportKind::VideoLikes => &["Video Title", "Total Likes"],
            ReportKind::ChannelViews => &["Channel Name", "Total Views"],
            ReportKind::ChannelsPublishedIn => &["Channel Name"],
            ReportKind::AverageDuration => &[
                "Channel Name",
                "Total Videos",
                "Total Duration (Seconds)",
                "Average Duration",
            ],
            ReportKind::TopCommentedPerChannel => {
                &["Channel Name", "Video Title", "Total Comments"]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportParams {
    /// Selected channel names in selection order, without repeats.
    pub channels: Vec<String>,
    pub year: i32,
}

impl ReportParams {
    pub fn new(channels: impl IntoIterator<Item = String>) -> Self {
        let mut selected: Vec<String> = Vec::new();
        for name in channels {
            let name = name.trim().to_string();
            if !name.is_empty() && !selected.contains(&name) {
                selected.push(name);
            }
        }
        Self {
            channels: selected,
            year: DEFAULT_REPORT_YEAR,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub kind: ReportKind,
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn empty(kind: ReportKind, params: &ReportParams) -> Self {
        Self {
            kind,
            title: kind.title(params),
            columns: kind.columns().iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn with_rows(kind: ReportKind, params: &ReportParams, rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            ..Self::empty(kind, params)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub channels: i64,
    pub videos: i64,
}

/// Read side used by the web UI.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn overview(&self) -> anyhow::Result<Overview>;

    async fn channel_names(&self) -> anyhow::Result<Vec<String>>;

    async fn run_report(&self, kind: ReportKind, params: &ReportParams)
        -> anyhow::Result<ReportTable>;
}

pub struct PgReportSource {
    config: StoreConfig,
}

impl PgReportSource {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> anyhow::Result<PgConnection> {
        PgConnection::connect(&self.config.database_url)
            .await
            .context("connecting to database")
    }
}

#[async_trait]
impl ReportSource for PgReportSource {
    async fn overview(&self) -> anyhow::Result<Overview> {
        let mut conn = self.connect().await?;
        let row = sqlx::query(
            r#"
            SELECT (SELECT COUNT(*) FROM channel) AS channels,
                   (SELECT COUNT(*) FROM video) AS videos
            "#,
        )
        .fetch_one(&mut conn)
        .await?;
        Ok(Overview {
            channels: row.try_get("channels")?,
            videos: row.try_get("videos")?,
        })
    }

    async fn channel_names(&self) -> anyhow::Result<Vec<String>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query("SELECT channel_name FROM channel ORDER BY channel_name")
            .fetch_all(&mut conn)
            .await?;
        rows.iter()
            .map(|row| row.try_get("channel_name").map_err(anyhow::Error::from))
            .collect()
    }

    async fn run_report(
        &self,
        kind: ReportKind,
        params: &ReportParams,
    ) -> anyhow::Result<ReportTable> {
        if params.is_empty() {
            return Ok(ReportTable::empty(kind, params));
        }
        let mut conn = self.connect().await?;
        let rows = query_rows(&mut conn, kind, params)
            .await
            .with_context(|| format!("running report {}", kind.slug()))?;
        Ok(ReportTable::with_rows(kind, params, rows))
    }
}

async fn query_rows(
    conn: &mut PgConnection,
    kind: ReportKind,
    params: &ReportParams,
) -> anyhow::Result<Vec<Vec<String>>> {
    let channels = &params.channels;
    let rows: Vec<Vec<String>> = match kind {
        ReportKind::VideosWithChannel => {
            let rows = sqlx::query(
                r#"
                SELECT v.title, c.channel_name
                  FROM video v
                  JOIN channel c ON c.channel_id = v.channel_id
                 WHERE c.channel_name = ANY($1)
                 ORDER BY c.channel_name, v.published_at DESC, v.video_id
                "#,
            )
            .bind(channels)
            .fetch_all(&mut *conn)
            .await?;
            rows.iter()
                .map(|r| Ok(vec![r.try_get("title")?, r.try_get("channel_name")?]))
                .collect::<Result<_, sqlx::Error>>()?
        }
        ReportKind::ChannelVideoCounts | ReportKind::ChannelViews => {
            let column = if kind == ReportKind::ChannelViews {
                "total_views"
            } else {
                "total_videos"
            };
            let sql = format!(
                "SELECT channel_name, {column} AS total FROM channel \
                 WHERE channel_name = ANY($1) ORDER BY {column} DESC, channel_name"
            );
            let rows = sqlx::query(&sql).bind(channels).fetch_all(&mut *conn).await?;
            rows.iter()
                .map(|r| {
                    Ok(vec![
                        r.try_get("channel_name")?,
                        r.try_get::<i64, _>("total")?.to_string(),
                    ])
                })
                .collect::<Result<_, sqlx::Error>>()?
        }
        ReportKind::TopViewedVideos => {
            let rows = sqlx::query(
                r#"
                SELECT v.title, c.channel_name, v.views
                  FROM video v
                  JOIN channel c ON c.channel_id = v.channel_id
                 WHERE c.channel_name = ANY($1)
                 ORDER BY v.views DESC NULLS LAST, v.video_id
                 LIMIT 10
                "#,
            )
            .bind(channels)
            .fetch_all(&mut *conn)
            .await?;
            rows.iter()
                .map(|r| {
                    Ok(vec![
                        r.try_get("title")?,
                        r.try_get("channel_name")?,
                        stat_cell(r.try_get("views")?),
                    ])
                })
                .collect::<Result<_, sqlx::Error>>()?
        }
        ReportKind::VideoComments | ReportKind::VideoLikes => {
            let column = if kind == ReportKind::VideoLikes {
                "likes"
            } else {
                "total_comments"
            };
            let sql = format!(
                "SELECT v.title, v.{column} AS stat FROM video v \
                 JOIN channel c ON c.channel_id = v.channel_id \
                 WHERE c.channel_name = ANY($1) \
                 ORDER BY v.{column} DESC NULLS LAST, v.video_id"
            );
            let rows = sqlx::query(&sql).bind(channels).fetch_all(&mut *conn).await?;
            rows.iter()
                .map(|r| Ok(vec![r.try_get("title")?, stat_cell(r.try_get("stat")?)]))
                .collect::<Result<_, sqlx::Error>>()?
        }
        ReportKind::TopLikedPerChannel | ReportKind::TopCommentedPerChannel => {
            let column = if kind == ReportKind::TopLikedPerChannel {
                "likes"
            } else {
                "total_comments"
            };
            let sql = format!(
                "SELECT s.name AS channel_name, top.title, top.stat \
                   FROM UNNEST($1::text[]) WITH ORDINALITY AS s(name, ord) \
                   LEFT JOIN LATERAL ( \
                        SELECT v.title, v.{column} AS stat FROM video v \
                          JOIN channel c ON c.channel_id = v.channel_id \
                         WHERE c.channel_name = s.name \
                         ORDER BY v.{column} DESC NULLS LAST, v.video_id \
                         LIMIT 1 \
                   ) top ON TRUE \
                  ORDER BY s.ord"
            );
            let rows = sqlx::query(&sql).bind(channels).fetch_all(&mut *conn).await?;
            rows.iter()
                .map(|r| {
                    Ok(top_per_channel_row(
                        r.try_get("channel_name")?,
                        r.try_get("title")?,
                        r.try_get("stat")?,
                    ))
                })
                .collect::<Result<_, sqlx::Error>>()?
        }
        ReportKind::ChannelsPublishedIn => {
            let rows = sqlx::query(
                r#"
                SELECT DISTINCT c.channel_name
                  FROM video v
                  JOIN channel c ON c.channel_id = v.channel_id
                 WHERE c.channel_name = ANY($1)
                   AND CAST(EXTRACT(YEAR FROM v.published_at AT TIME ZONE 'UTC') AS INTEGER) = $2
                 ORDER BY c.channel_name
                "#,
            )
            .bind(channels)
            .bind(params.year)
            .fetch_all(&mut *conn)
            .await?;
            rows.iter()
                .map(|r| Ok(vec![r.try_get("channel_name")?]))
                .collect::<Result<_, sqlx::Error>>()?
        }
        ReportKind::AverageDuration => {
            let rows = sqlx::query(
                r#"
                SELECT c.channel_name, v.duration
                  FROM video v
                  JOIN channel c ON c.channel_id = v.channel_id
                 WHERE c.channel_name = ANY($1)
                "#,
            )
            .bind(channels)
            .fetch_all(&mut *conn)
            .await?;
            let durations = rows
                .iter()
                .map(|r| Ok((r.try_get("channel_name")?, r.try_get("duration")?)))
                .collect::<Result<Vec<(String, Option<String>)>, sqlx::Error>>()?;
            average_duration_rows(channels, durations)
        }
    };
    Ok(rows)
}

fn stat_cell(value: Option<i64>) -> String {
    Statistic::from_db(value).to_string()
}

/// `title` is `None` when the channel has no stored videos.
fn top_per_channel_row(channel: String, title: Option<String>, stat: Option<i64>) -> Vec<String> {
    match title {
        Some(title) => vec![channel, title, stat_cell(stat)],
        None => vec![channel, NO_VIDEOS.to_string(), NOT_APPLICABLE.to_string()],
    }
}

/// One row per selected channel, in selection order. Videos without a duration
/// are left out of both the count and the total.
fn average_duration_rows(
    selected: &[String],
    durations: impl IntoIterator<Item = (String, Option<String>)>,
) -> Vec<Vec<String>> {
    let mut tallies: HashMap<String, DurationTally> = HashMap::new();
    for (channel, duration) in durations {
        tallies.entry(channel).or_default().add(duration.as_deref());
    }
    selected
        .iter()
        .map(|channel| {
            let tally = tallies.remove(channel).unwrap_or_default();
            vec![
                channel.clone(),
                tally.videos.to_string(),
                tally.total_seconds.to_string(),
                tally.average_compact(),
            ]
        })
        .collect()
}
