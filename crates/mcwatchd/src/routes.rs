//! API routes for mcwatchd

use crate::commands;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use mcwatch_shared::api::{
    AckResponse, CommandRequest, PresenceView, ServerOverview, StatusResponse, TrackRequest,
};
use mcwatch_shared::{ServerId, VERSION};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, info};

type AppStateArc = Arc<AppState>;
type ApiError = (StatusCode, String);

fn parse_id(raw: &str) -> Result<ServerId, ApiError> {
    ServerId::new(raw).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn unknown_server(id: &ServerId) -> ApiError {
    (StatusCode::NOT_FOUND, format!("Server '{}' not found", id))
}

// ============================================================================
// Status Routes
// ============================================================================

pub fn status_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(overview_page))
        .route("/status/:server", get(live_status))
        .route("/status/:server/icon", get(server_icon))
        .route("/v1/servers", get(list_servers))
}

async fn live_status(
    State(state): State<AppStateArc>,
    Path(server): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_id(&server)?;
    let monitor = &state.monitor;
    let address = monitor.registry().resolve(&id).ok_or_else(|| unknown_server(&id))?;

    let response = match monitor.provider().query(address).await {
        Ok(snapshot) => StatusResponse::from_snapshot(&snapshot),
        Err(failure) => {
            debug!("  Live status for {} failed: {}", id, failure);
            StatusResponse::offline(failure.message)
        }
    };
    Ok(Json(response))
}

async fn server_icon(
    State(state): State<AppStateArc>,
    Path(server): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&server)?;
    let monitor = &state.monitor;
    let address = monitor.registry().resolve(&id).ok_or_else(|| unknown_server(&id))?;

    let icon = monitor
        .provider()
        .query(address)
        .await
        .ok()
        .and_then(|snapshot| snapshot.icon)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("No icon for '{}'", id)))?;

    Ok(([(header::CONTENT_TYPE, "image/png")], icon).into_response())
}

async fn collect_overviews(state: &AppState) -> Vec<ServerOverview> {
    let monitor = &state.monitor;
    let tracked = monitor.tracking().entries().await;

    let mut rows = Vec::with_capacity(monitor.registry().len());
    for (id, address) in monitor.registry().iter() {
        let observed = monitor.observed(id).await;
        rows.push(ServerOverview {
            server: id.clone(),
            address: address.to_string(),
            tracked_channel: tracked.get(id).copied(),
            polling: monitor.is_polling(id).await,
            presence: observed
                .as_ref()
                .map(|o| PresenceView::from(o.presence))
                .unwrap_or(PresenceView::Unobserved),
            players: observed
                .map(|o| o.players.into_iter().collect())
                .unwrap_or_default(),
        });
    }
    rows
}

async fn list_servers(State(state): State<AppStateArc>) -> Json<Vec<ServerOverview>> {
    Json(collect_overviews(&state).await)
}

async fn overview_page(State(state): State<AppStateArc>) -> Html<String> {
    Html(render_overview(&collect_overviews(&state).await))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_overview(rows: &[ServerOverview]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>mcwatch</title></head><body>\n\
         <h1>Servers</h1>\n<table>\n<tr><th>Server</th><th>Address</th><th>State</th><th>Players</th><th>Tracked</th></tr>\n",
    );
    for row in rows {
        let tracked = row
            .tracked_channel
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            html,
            "<tr><td><a href=\"/status/{id}\">{id}</a></td><td>{addr}</td><td>{state}</td><td>{players}</td><td>{tracked}</td></tr>",
            id = escape_html(row.server.as_str()),
            addr = escape_html(&row.address),
            state = row.presence.as_str(),
            players = escape_html(&row.players.join(", ")),
            tracked = tracked,
        );
    }
    html.push_str("</table>\n</body></html>\n");
    html
}

// ============================================================================
// Tracking Routes
// ============================================================================

pub fn tracking_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/tracking", get(list_tracking).post(track_on))
        .route("/v1/tracking/:server", delete(track_off))
        .route("/v1/command", post(run_command))
}

async fn list_tracking(State(state): State<AppStateArc>) -> Json<BTreeMap<ServerId, u64>> {
    let entries = state.monitor.tracking().entries().await;
    Json(entries.into_iter().map(|(id, channel)| (id, channel.0)).collect())
}

async fn track_on(
    State(state): State<AppStateArc>,
    Json(req): Json<TrackRequest>,
) -> Json<AckResponse> {
    info!("  track on {} -> channel {}", req.server, req.channel);
    let message = commands::track_on(&state.monitor, &req.server, req.channel).await;
    Json(AckResponse { message })
}

async fn track_off(
    State(state): State<AppStateArc>,
    Path(server): Path<String>,
) -> Json<AckResponse> {
    info!("  track off {}", server);
    let message = commands::track_off(&state.monitor, &server).await;
    Json(AckResponse { message })
}

async fn run_command(
    State(state): State<AppStateArc>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    let message = commands::execute(&state.monitor, req.channel, &req.text)
        .await
        .ok_or_else(|| (StatusCode::BAD_REQUEST, commands::HELP_TEXT.to_string()))?;
    Ok(Json(AckResponse { message }))
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    version: &'static str,
    uptime_seconds: u64,
    registered: usize,
    polling: usize,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        version: VERSION,
        uptime_seconds: state.start_time.elapsed().as_secs(),
        registered: state.monitor.registry().len(),
        polling: state.monitor.polling().await.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcwatch_shared::ChannelId;

    #[test]
    fn test_overview_escapes_names() {
        let rows = vec![ServerOverview {
            server: ServerId::new("lobby").unwrap(),
            address: "lobby.example:25565".to_string(),
            tracked_channel: Some(ChannelId(5)),
            polling: true,
            presence: PresenceView::Online,
            players: vec!["<script>".to_string()],
        }];
        let html = render_overview(&rows);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("<td>online</td>"));
        assert!(html.contains("<td>5</td>"));
    }
}
