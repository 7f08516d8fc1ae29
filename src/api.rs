//! Client side of the surveillance data API.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{DeskError, Result};

/// What the dashboard needs from the data API.
pub trait DataApi {
    /// Raw surveillance rows, newest report first.
    async fn fetch_rows(&self) -> Result<Vec<Value>>;

    /// District feature collection carrying `cases` and `district_display`
    /// for the given year.
    async fn fetch_map(&self, year: i32) -> Result<Value>;

    async fn chat(&self, message: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: Option<String>,
}

pub struct HttpDataApi {
    client: Client,
    base_url: String,
}

impl HttpDataApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl DataApi for HttpDataApi {
    async fn fetch_rows(&self) -> Result<Vec<Value>> {
        let response = self.client.get(self.url("/data")).send().await?;
        debug!(status = %response.status(), "data response");

        let rows = response.error_for_status()?.json::<Vec<Value>>().await?;
        Ok(rows)
    }

    async fn fetch_map(&self, year: i32) -> Result<Value> {
        let response = self
            .client
            .get(self.url(&format!("/map_data/{year}")))
            .send()
            .await?;
        debug!(status = %response.status(), year, "map data response");

        // error bodies are JSON too, so decode before looking at the status
        let payload = response.json::<Value>().await?;
        check_map_payload(payload)
    }

    async fn chat(&self, message: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/chat"))
            .json(&ChatRequest { message })
            .send()
            .await?
            .error_for_status()?;

        response
            .json::<ChatResponse>()
            .await?
            .response
            .ok_or_else(|| DeskError::Backend("unexpected chat response format".to_string()))
    }
}

pub fn check_map_payload(payload: Value) -> Result<Value> {
    if let Some(error) = payload.get("error").and_then(Value::as_str) {
        return Err(DeskError::Backend(error.to_string()));
    }

    let has_features = payload
        .get("features")
        .and_then(Value::as_array)
        .is_some_and(|features| !features.is_empty());
    if !has_features {
        return Err(DeskError::Backend("no features in map data".to_string()));
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn map_error_field_is_a_backend_error() {
        let result = check_map_payload(json!({"error": "Data not available"}));
        assert!(matches!(result, Err(DeskError::Backend(msg)) if msg == "Data not available"));
    }

    #[test]
    fn map_without_features_is_rejected() {
        assert!(check_map_payload(json!({"features": []})).is_err());
        assert!(check_map_payload(json!({"features": [{"properties": {}}]})).is_ok());
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let api = HttpDataApi::new("http://localhost:5000/");
        assert_eq!(api.url("/data"), "http://localhost:5000/data");
    }
}
