//! API route definitions.

use super::state::AppState;
use super::{ws, ApiError};
use crate::alert::{AlertId, AlertLevel, AlertQuery, AlertStatus, StatusUpdate};
use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_RADIUS_KM: f64 = 50.0;
const MAX_LOOKBACK_HOURS: u32 = 72;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/alerts", get(list_alerts))
        .route("/alerts/nearby", get(alerts_nearby))
        .route("/alerts/level/{level}", get(alerts_by_level))
        .route("/alerts/{id}", get(get_alert))
        .route("/alerts/{id}/status", put(update_status))
        .route("/sources", get(sources))
        .route("/severities", get(severities))
        .route("/ws", get(ws::subscribe))
}

fn meta_now() -> Value {
    json!({ "timestamp": Utc::now().to_rfc3339() })
}

fn parse_id(raw: &str) -> Result<AlertId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid alert id '{}'", raw)))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let stats = state.store().stats().await;
    let subscribers = state.hub.subscriber_count().await;
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
            "alerts": stats,
            "subscribers": subscribers
        },
        "meta": meta_now()
    }))
}

#[derive(Debug, Deserialize)]
struct AlertsParams {
    level: Option<String>,
    source: Option<String>,
    hours: Option<u32>,
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertsParams>,
) -> Result<Json<Value>, ApiError> {
    let level = params
        .level
        .as_deref()
        .map(str::parse::<AlertLevel>)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let since = match params.hours {
        Some(h) if !(1..=MAX_LOOKBACK_HOURS).contains(&h) => {
            return Err(ApiError::bad_request(format!(
                "hours must be between 1 and {}",
                MAX_LOOKBACK_HOURS
            )));
        }
        Some(h) => Some(Utc::now() - chrono::Duration::hours(h as i64)),
        None => None,
    };

    let query = AlertQuery {
        level,
        source: params.source.clone(),
        since,
    };
    let alerts = state.store().query(&query).await;

    Ok(Json(json!({
        "data": alerts,
        "meta": {
            "total": alerts.len(),
            "timestamp": Utc::now().to_rfc3339(),
            "filters": {
                "level": level,
                "source": params.source,
                "hours": params.hours
            }
        }
    })))
}

async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    match state.store().get_by_id(id).await {
        Some(alert) => Ok(Json(json!({ "data": alert, "meta": meta_now() }))),
        None => Err(ApiError::not_found(format!("alert {} not found", id))),
    }
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let status: AlertStatus = body
        .status
        .parse()
        .map_err(|e: crate::alert::ParseError| ApiError::bad_request(e.to_string()))?;

    match state.store().update_status(id, status).await {
        StatusUpdate::Updated { previous, current } => Ok(Json(json!({
            "data": { "id": id, "previous": previous, "status": current },
            "meta": meta_now()
        }))),
        StatusUpdate::NotFound => Err(ApiError::not_found(format!("alert {} not found", id))),
        StatusUpdate::Rejected { current } => Err(ApiError::conflict(format!(
            "alert {} is {} and cannot become {}",
            id, current, status
        ))),
    }
}

async fn alerts_by_level(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let level: AlertLevel = level
        .parse()
        .map_err(|e: crate::alert::ParseError| ApiError::bad_request(e.to_string()))?;
    let alerts = state.store().get_by_level(level).await;
    Ok(Json(json!({
        "data": alerts,
        "meta": { "total": alerts.len(), "level": level }
    })))
}

#[derive(Debug, Deserialize)]
struct NearbyParams {
    lat: f64,
    lon: f64,
    radius_km: Option<f64>,
}

async fn alerts_nearby(
    State(state): State<AppState>,
    Query(params): Query<NearbyParams>,
) -> Result<Json<Value>, ApiError> {
    if !(-90.0..=90.0).contains(&params.lat) || !(-180.0..=180.0).contains(&params.lon) {
        return Err(ApiError::bad_request("lat/lon out of range"));
    }
    let radius_km = params.radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(ApiError::bad_request("radius_km must be a non-negative number"));
    }

    let alerts = state.store().get_by_radius(params.lat, params.lon, radius_km).await;
    Ok(Json(json!({
        "data": alerts,
        "meta": {
            "total": alerts.len(),
            "center": { "lat": params.lat, "lon": params.lon },
            "radius_km": radius_km
        }
    })))
}

async fn sources(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "data": { "sources": state.sources.as_slice() }, "meta": meta_now() }))
}

async fn severities() -> Json<Value> {
    Json(json!({
        "data": {
            "levels": AlertLevel::ALL,
            "hints": ["Extreme", "Severe", "Moderate", "Minor"]
        },
        "meta": meta_now()
    }))
}
