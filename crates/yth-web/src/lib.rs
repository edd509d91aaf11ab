//! Axum + Askama web UI: channel ingestion form and the analytics page.

pub mod reports;

use std::path::PathBuf;
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Form, Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{info, warn};
use yth_core::UNAVAILABLE_LABEL;
use yth_sync::{Ingest, IngestError, IngestService, IngestSummary, SyncConfig};

pub use reports::{
    Overview, PgReportSource, ReportKind, ReportParams, ReportSource, ReportTable,
    DEFAULT_REPORT_YEAR,
};

pub const CRATE_NAME: &str = "yth-web";

pub const MSG_EMPTY_CHANNEL_ID: &str = "Please enter the YouTube Channel ID.";
pub const MSG_CHECK_CHANNEL_ID: &str = "Please check the Channel ID.";
pub const MSG_EMPTY_SELECTION: &str = "Please select at least one channel.";

#[derive(Clone)]
pub struct AppState {
    /// `None` when no API key is configured; the add-channel form then reports that.
    pub ingest: Option<Arc<dyn Ingest>>,
    pub reports: Arc<dyn ReportSource>,
    pub workspace_root: PathBuf,
}

impl AppState {
    pub fn new(
        ingest: Option<Arc<dyn Ingest>>,
        reports: Arc<dyn ReportSource>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ingest,
            reports,
            workspace_root: workspace_root.into(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        let ingest = match IngestService::from_config(config) {
            Ok(service) => Some(Arc::new(service) as Arc<dyn Ingest>),
            Err(err) => {
                warn!(error = %err, "channel ingestion disabled");
                None
            }
        };
        Self::new(
            ingest,
            Arc::new(PgReportSource::new(config.store_config())),
            config.workspace_root.clone(),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct AddChannelForm {
    #[serde(default)]
    channel_id: String,
}

#[derive(Debug, Clone)]
struct ChannelView {
    channel_id: String,
    channel_name: String,
    description: String,
    subscriber_count: String,
    total_videos: String,
    total_views: String,
    channel_status: String,
}

#[derive(Debug, Clone)]
struct VideoView {
    video_id: String,
    title: String,
    published_at: String,
    views: String,
    likes: String,
    total_comments: String,
    duration: String,
}

#[derive(Debug, Clone)]
struct ChannelOption {
    name: String,
    selected: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    total_channels: i64,
    total_videos: i64,
}

#[derive(Template)]
#[template(path = "add_channel.html")]
struct AddChannelTemplate {
    channel_id: String,
    errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "ingest_result.html")]
struct IngestResultTemplate {
    channel: ChannelView,
    videos: Vec<VideoView>,
    inserted: usize,
    updated: usize,
    degraded: usize,
}

#[derive(Template)]
#[template(path = "analytics.html")]
struct AnalyticsTemplate {
    channels: Vec<ChannelOption>,
    year: i32,
    error: String,
    reports: Vec<ReportTable>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/channels/add", get(add_channel_form_handler).post(add_channel_handler))
        .route("/analytics", get(analytics_handler))
        .route("/analytics/chart", get(analytics_chart_handler))
        .route("/analytics/{slug}", get(report_json_handler))
        .route("/assets/static/app.css", get(app_css_handler))
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let port: u16 = std::env::var("YTH_WEB_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let state = AppState::from_config(&SyncConfig::from_env());
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "serving web ui");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.reports.overview().await {
        Ok(overview) => render_html(IndexTemplate {
            total_channels: overview.channels,
            total_videos: overview.videos,
        }),
        Err(err) => server_error(err),
    }
}

async fn add_channel_form_handler() -> Response {
    render_html(AddChannelTemplate {
        channel_id: String::new(),
        errors: Vec::new(),
    })
}

async fn add_channel_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AddChannelForm>,
) -> Response {
    let channel_id = form.channel_id.trim().to_string();
    if channel_id.is_empty() {
        return render_form_errors(channel_id, vec![MSG_EMPTY_CHANNEL_ID.to_string()]);
    }
    let Some(ingest) = state.ingest.as_ref() else {
        return render_form_errors(
            channel_id,
            vec!["Error: YOUTUBE_API_KEY is not configured.".to_string()],
        );
    };

    match ingest.ingest(&channel_id).await {
        Ok(summary) => render_html(ingest_result(&summary)),
        Err(err) => {
            warn!(channel_id = %channel_id, error = %err, "ingest from web form failed");
            render_form_errors(channel_id, ingest_error_messages(&err))
        }
    }
}

fn ingest_error_messages(err: &IngestError) -> Vec<String> {
    match err {
        IngestError::EmptyChannelId => vec![MSG_EMPTY_CHANNEL_ID.to_string()],
        IngestError::NotFound { .. } => {
            vec![format!("Error: {err}"), MSG_CHECK_CHANNEL_ID.to_string()]
        }
        IngestError::Upstream(_) | IngestError::Persistence(_) => vec![format!("Error: {err}")],
    }
}

fn render_form_errors(channel_id: String, errors: Vec<String>) -> Response {
    let mut resp = render_html(AddChannelTemplate { channel_id, errors });
    *resp.status_mut() = StatusCode::UNPROCESSABLE_ENTITY;
    resp
}

fn ingest_result(summary: &IngestSummary) -> IngestResultTemplate {
    let channel = &summary.channel;
    IngestResultTemplate {
        channel: ChannelView {
            channel_id: channel.channel_id.clone(),
            channel_name: channel.channel_name.clone(),
            description: channel.description.clone(),
            subscriber_count: channel.subscriber_count.to_string(),
            total_videos: channel.total_videos.to_string(),
            total_views: channel.total_views.to_string(),
            channel_status: channel.channel_status.clone(),
        },
        videos: summary
            .videos
            .iter()
            .map(|v| VideoView {
                video_id: v.video_id.clone(),
                title: v.title.clone(),
                published_at: v.published_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                views: v.views.to_string(),
                likes: v.likes.to_string(),
                total_comments: v.total_comments.to_string(),
                duration: v
                    .duration
                    .clone()
                    .unwrap_or_else(|| UNAVAILABLE_LABEL.to_string()),
            })
            .collect(),
        inserted: summary.outcome.videos_inserted,
        updated: summary.outcome.videos_updated,
        degraded: summary.degraded_videos,
    }
}

/// `channel` may repeat; `year` and `submitted` are optional.
fn report_params(query: &[(String, String)]) -> (ReportParams, bool) {
    let mut year = DEFAULT_REPORT_YEAR;
    let mut submitted = false;
    let mut channels = Vec::new();
    for (key, value) in query {
        match key.as_str() {
            "channel" => channels.push(value.clone()),
            "year" => year = value.trim().parse().unwrap_or(DEFAULT_REPORT_YEAR),
            "submitted" => submitted = true,
            _ => {}
        }
    }
    (ReportParams::new(channels).with_year(year), submitted)
}

async fn analytics_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    let (params, submitted) = report_params(&query);
    let names = match state.reports.channel_names().await {
        Ok(names) => names,
        Err(err) => return server_error(err),
    };
    let channels = names
        .into_iter()
        .map(|name| ChannelOption {
            selected: params.channels.contains(&name),
            name,
        })
        .collect();

    let mut error = String::new();
    let mut tables = Vec::new();
    if submitted {
        if params.is_empty() {
            error = MSG_EMPTY_SELECTION.to_string();
        } else {
            for kind in ReportKind::ALL {
                match state.reports.run_report(kind, &params).await {
                    Ok(table) => tables.push(table),
                    Err(err) => return server_error(err),
                }
            }
        }
    }

    render_html(AnalyticsTemplate {
        channels,
        year: params.year,
        error,
        reports: tables,
    })
}

async fn analytics_chart_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    let (params, _) = report_params(&query);
    match state.reports.run_report(ReportKind::ChannelViews, &params).await {
        Ok(table) => {
            let x = table.rows.iter().map(|r| r[0].clone()).collect::<Vec<_>>();
            let y = table
                .rows
                .iter()
                .map(|r| r[1].parse::<i64>().unwrap_or(0))
                .collect::<Vec<_>>();
            Json(serde_json::json!({
                "data": [{
                    "type": "bar",
                    "x": x,
                    "y": y,
                    "marker": {"color": "#dc2626"}
                }],
                "layout": {
                    "title": "Total Views Per Channel",
                    "paper_bgcolor": "#ffffff",
                    "plot_bgcolor": "#f8fafc"
                }
            }))
            .into_response()
        }
        Err(err) => server_error(err),
    }
}

async fn report_json_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(slug): AxumPath<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    let Some(kind) = ReportKind::from_slug(&slug) else {
        return (StatusCode::NOT_FOUND, Html("Report not found".to_string())).into_response();
    };
    let (params, _) = report_params(&query);
    match state.reports.run_report(kind, &params).await {
        Ok(table) => Json(table).into_response(),
        Err(err) => server_error(err),
    }
}

async fn app_css_handler(State(state): State<Arc<AppState>>) -> Response {
    let css_path = state.workspace_root.join("assets/static/app.css");
    match tokio::fs::read_to_string(&css_path).await {
        Ok(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, Html("/* missing app.css */".to_string())).into_response(),
    }
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    warn!(error = %format!("{err:#}"), "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {err:#}")),
    )
        .into_response()
}
