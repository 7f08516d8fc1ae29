//! Surveillance data API.
//!
//! Serves the cached `govdata` rows, per-year district maps built from a
//! GeoJSON file, and keyword chat answers over the same rows.

use std::{path::Path, sync::Arc, time::Duration};

use axum::{
    extract::{rejection::JsonRejection, Path as UrlPath, State},
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use tokio::{net::TcpListener, signal::ctrl_c, sync::RwLock};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::chat;
use crate::config::Config;
use crate::db;
use crate::error::ApiError;
use crate::normalize::{normalize_rows, parse_count, parse_int, KEY_AREA, KEY_CASES, KEY_YEAR};

pub struct AppState {
    pool: PgPool,
    page_size: i64,
    rows: RwLock<Arc<Vec<Value>>>,
    geo: Option<Value>,
}

impl AppState {
    pub async fn new(pool: PgPool, config: &Config) -> Arc<Self> {
        let state = Arc::new(Self {
            pool,
            page_size: config.page_size,
            rows: RwLock::new(Arc::new(Vec::new())),
            geo: load_geojson(&config.geojson_path),
        });
        state.reload().await;
        state
    }

    /// Replaces the row cache. A failed read leaves the cache empty.
    async fn reload(&self) -> usize {
        let rows = match db::fetch_surveillance_rows(&self.pool, self.page_size).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to load data from database: {e}");
                Vec::new()
            }
        };
        let count = rows.len();
        *self.rows.write().await = Arc::new(rows);
        count
    }

    async fn rows(&self) -> Arc<Vec<Value>> {
        self.rows.read().await.clone()
    }
}

fn load_geojson(path: &Path) -> Option<Value> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| warn!("GeoJSON not found at {}: {e}", path.display()))
        .ok()?;
    let geo = serde_json::from_str(&raw)
        .map_err(|e| warn!("GeoJSON at {} is invalid: {e}", path.display()))
        .ok()?;
    info!("GeoJSON loaded from {}", path.display());
    Some(geo)
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/data", get(data_handler))
        .route("/refresh-data", get(refresh_handler))
        .route("/map_data/{year}", get(map_data_handler))
        .route("/chat", post(chat_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(pool: PgPool, config: &Config) -> anyhow::Result<()> {
    info!("Initializing state...");
    let state = AppState::new(pool, config).await;

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn data_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let rows = state.rows().await;
    Json(Value::Array(rows.as_ref().clone()))
}

async fn refresh_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let rows = state.reload().await;
    Json(json!({ "status": "success", "rows": rows }))
}

async fn map_data_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(year): UrlPath<i32>,
) -> Result<Json<Value>, ApiError> {
    let rows = state.rows().await;
    let geo = state.geo.as_ref().ok_or(ApiError::DataUnavailable)?;
    if rows.is_empty() {
        return Err(ApiError::DataUnavailable);
    }

    Ok(Json(build_map_data(geo, &rows, year)))
}

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct ChatReply {
    response: String,
}

async fn chat_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        warn!("Rejected chat request: {e}");
        ApiError::MalformedPayload
    })?;
    info!(message = %payload.message, "Chat question");
    let records = normalize_rows(&state.rows().await);
    let response = chat::answer(&records, &payload.message);
    Ok(Json(ChatReply { response }))
}

/// Copies the district collection and stamps each feature with the year's
/// case total for its district and a display name.
pub fn build_map_data(geo: &Value, rows: &[Value], year: i32) -> Value {
    let mut case_counts: Vec<(String, u64)> = Vec::new();
    for row in rows {
        if parse_int(row.get(KEY_YEAR)) != Some(i64::from(year)) {
            continue;
        }
        let Some(area) = row.get(KEY_AREA).and_then(Value::as_str) else {
            continue;
        };
        if area.is_empty() {
            continue;
        }
        let cases = parse_count(row.get(KEY_CASES));
        match case_counts.iter_mut().find(|(a, _)| a == area) {
            Some(entry) => entry.1 = entry.1.saturating_add(cases),
            None => case_counts.push((area.to_string(), cases)),
        }
    }

    let mut map = geo.clone();
    if let Some(features) = map.get_mut("features").and_then(Value::as_array_mut) {
        for feature in features {
            let Some(props) = feature
                .get_mut("properties")
                .and_then(Value::as_object_mut)
            else {
                continue;
            };

            let district = props
                .get("DTNAME")
                .map(|name| match name {
                    Value::String(s) => s.trim().to_lowercase(),
                    other => other.to_string().to_lowercase(),
                })
                .unwrap_or_default();

            let cases = case_counts
                .iter()
                .find(|(area, _)| area.trim().to_lowercase() == district)
                .map_or(0, |(_, count)| *count);

            props.insert("cases".to_string(), json!(cases));
            props.insert("district_display".to_string(), json!(title_case(&district)));
        }
    }

    map
}

fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_data_matches_districts_case_insensitively() {
        let geo = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"DTNAME": " PUNE "}, "geometry": null},
                {"type": "Feature", "properties": {"DTNAME": "nashik"}, "geometry": null},
                {"type": "Feature", "properties": {"DTNAME": "mumbai suburban"}, "geometry": null},
            ]
        });
        let rows = vec![
            json!({"Year": "2024", "Area": "Pune", "No of cases": "40"}),
            json!({"Year": 2024, "Area": "Pune", "No of cases": 10}),
            json!({"Year": "2023", "Area": "Pune", "No of cases": "99"}),
            json!({"Year": "2024", "Area": "Mumbai Suburban", "No of cases": "oops"}),
        ];

        let map = build_map_data(&geo, &rows, 2024);
        let features = map["features"].as_array().unwrap();
        assert_eq!(features[0]["properties"]["cases"], 50);
        assert_eq!(features[0]["properties"]["district_display"], "Pune");
        assert_eq!(features[1]["properties"]["cases"], 0);
        assert_eq!(features[2]["properties"]["district_display"], "Mumbai Suburban");
        assert_eq!(features[2]["properties"]["cases"], 0);

        assert!(geo["features"][0]["properties"].get("cases").is_none());
    }

    #[test]
    fn map_data_saturates_huge_case_counts() {
        let geo = json!({"features": [{"properties": {"DTNAME": "Pune"}}]});
        let rows = vec![
            json!({"Year": "2024", "Area": "Pune", "No of cases": "99999999999999999999"}),
            json!({"Year": "2024", "Area": "Pune", "No of cases": "99999999999999999999"}),
            json!({"Year": "2024", "Area": "Pune", "No of cases": "99999999999999999999"}),
        ];

        let map = build_map_data(&geo, &rows, 2024);
        assert_eq!(map["features"][0]["properties"]["cases"], u64::MAX);
    }

    #[test]
    fn title_cases_each_word() {
        assert_eq!(title_case("navi mumbai"), "Navi Mumbai");
        assert_eq!(title_case("ahmednagar-north"), "Ahmednagar-North");
        assert_eq!(title_case(""), "");
    }
}
