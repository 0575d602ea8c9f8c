// ── HTTP surface ──
//
// Routes scrapes to the collector, serves the listings and the debug view,
// and runs the server until Ctrl-C or a fatal session refresh.

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use cnmaestro_core::{Controller, CoreError, FleetSnapshot, TEXT_CONTENT_TYPE, encode_text};

use crate::error::ExporterError;

/// Bytes escaped when a name becomes a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Header Prometheus sends with its configured scrape timeout.
pub const SCRAPE_TIMEOUT_HEADER: &str = "x-prometheus-scrape-timeout-seconds";

#[derive(Clone)]
pub struct AppState {
    pub controller: Controller,
    /// Deadline when the scraper does not send one.
    pub scrape_timeout: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/apgroups", get(list_ap_groups))
        .route("/apgroups/{ap_group}/metrics", get(ap_group_metrics))
        .route("/apgroups/{ap_group}/debug", get(ap_group_debug))
        .route("/portals", get(list_portals))
        .route("/portals/{portal}/metrics", get(portal_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Errors ──────────────────────────────────────────────────────────

/// Handler error: upstream failures are a bad gateway, the rest internal.
struct AppError(CoreError);

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_upstream() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, self.0.to_string()).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────────

async fn index(State(state): State<AppState>) -> Html<String> {
    let groups = state.controller.ap_groups().await.unwrap_or_else(|e| {
        warn!(error = %e, "fetching AP groups for index failed");
        Vec::new()
    });
    let portals = state
        .controller
        .collector()
        .list_portals()
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "fetching portals for index failed");
            Vec::new()
        });

    Html(render_index(
        state.controller.config().url.as_str(),
        &groups,
        &portals,
    ))
}

async fn list_ap_groups(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.controller.collector().list_ap_groups().await?))
}

async fn list_portals(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.controller.collector().list_portals().await?))
}

async fn ap_group_debug(
    State(state): State<AppState>,
    Path(ap_group): Path<String>,
) -> Result<Json<FleetSnapshot>, AppError> {
    Ok(Json(
        state.controller.collector().fleet_snapshot(&ap_group).await?,
    ))
}

async fn ap_group_metrics(
    State(state): State<AppState>,
    Path(ap_group): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let deadline = scrape_deadline(&headers, state.scrape_timeout);
    let families = state
        .controller
        .collector()
        .collect_fleet_metrics(&ap_group, deadline)
        .await?;
    Ok(exposition(encode_text(&families)?))
}

async fn portal_metrics(
    State(state): State<AppState>,
    Path(portal): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let deadline = scrape_deadline(&headers, state.scrape_timeout);
    let families = state
        .controller
        .collector()
        .collect_portal_metrics(&portal, deadline)
        .await?;
    Ok(exposition(encode_text(&families)?))
}

fn exposition(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
        body,
    )
        .into_response()
}

/// The scraper's timeout if it sent a usable one, else `fallback`.
fn scrape_deadline(headers: &HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(SCRAPE_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .filter(|d| !d.is_zero())
        .unwrap_or(fallback)
}

// ── Index page ──────────────────────────────────────────────────────

fn render_index(instance: &str, groups: &[String], portals: &[String]) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let mut html = String::with_capacity(1024);

    let _ = write!(
        html,
        "<!doctype html>\n<html>\n<head>\n\t<meta charset=\"UTF-8\">\n\
         \t<title>Cambium cnMaestro Exporter (Version {version})</title>\n</head>\n<body>\n\
         \t<h1>Cambium cnMaestro Exporter</h1>\n\t<p>Version: {version}</p>\n\
         \t<p><a href=\"{instance}\" target=\"_blank\">Open controller in new tab.</a></p>\n\
         \t<h2>Endpoints</h2>\n\t<ul>\n\
         \t\t<li><a href=\"/apgroups\">List of WiFi AP Group names</a> (JSON)</li>\n\
         \t\t<li><a href=\"/portals\">List of guest portal names</a> (JSON)</li>\n\
         \t\t<li><strong>AP group metrics</strong>\n\t\t\t<ul>\n",
        instance = escape_html(instance),
    );
    for group in groups {
        let href = segment_href(group);
        let group = escape_html(group);
        let _ = writeln!(
            html,
            "\t\t\t\t<li><a href=\"/apgroups/{href}/metrics\">{group}</a> &bull; \
             <a href=\"/apgroups/{href}/debug\">debug data</a> (JSON)</li>"
        );
    }
    html.push_str(
        "\t\t\t</ul>\n\t\t</li>\n\t\t<li><strong>Guest portal metrics</strong>\n\t\t\t<ul>\n",
    );
    for portal in portals {
        let href = segment_href(portal);
        let portal = escape_html(portal);
        let _ = writeln!(
            html,
            "\t\t\t\t<li><a href=\"/portals/{href}/metrics\">{portal}</a></li>"
        );
    }
    html.push_str("\t\t\t</ul>\n\t\t</li>\n\t</ul>\n</body>\n</html>\n");
    html
}

/// Percent-encode `name` as one path segment, then escape it for an attribute.
fn segment_href(name: &str) -> String {
    escape_html(&utf8_percent_encode(name, PATH_SEGMENT).to_string())
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

// ── Lifecycle ───────────────────────────────────────────────────────

/// Serve until Ctrl-C or until the session refresh gives up.
///
/// Expects an authenticated controller; starts the refresh task itself.
pub async fn serve(
    controller: Controller,
    addr: SocketAddr,
    scrape_timeout: Duration,
) -> Result<(), ExporterError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ExporterError::Bind { addr, source })?;

    let cancel = CancellationToken::new();
    let mut refresh = controller.spawn_refresh(cancel.clone());

    let app = router(AppState {
        controller,
        scrape_timeout,
    });
    let server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(cancel.clone().cancelled_owned())
            .into_future(),
    );
    info!("starting exporter on http://{addr}/");

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            signal.map_err(ExporterError::from)
        }
        fatal = &mut refresh.fatal => match fatal {
            Ok(err) => {
                error!(error = %err, "session refresh gave up, shutting down");
                Err(ExporterError::from(err))
            }
            Err(_) => Err(ExporterError::RefreshStopped),
        },
    };

    cancel.cancel();
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "HTTP server stopped with an error"),
        Err(e) => warn!(error = %e, "HTTP server task failed"),
    }
    if let Err(e) = refresh.handle.await {
        warn!(error = %e, "refresh task failed");
    }
    outcome
}
