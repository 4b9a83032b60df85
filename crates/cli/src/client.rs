//! API client for communicating with the predictor service

use anyhow::{Context, Result};
use predictor_lib::ModelSummary;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the predictor service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// GET a JSON body whatever the status code; probes report state in both
    pub async fn get_with_status<T: DeserializeOwned>(&self, path: &str) -> Result<(StatusCode, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response.json().await.context("Failed to parse response")?;
        Ok((status, body))
    }

    /// Request a prediction
    ///
    /// Failed predictions still carry a `PredictResponse` body, so error
    /// statuses are only fatal when the body is something else.
    pub async fn predict(&self, features: &BTreeMap<&str, f64>) -> Result<PredictResponse> {
        let url = self
            .base_url
            .join("api/v1/predict")
            .context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(features)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;
        match serde_json::from_str::<PredictResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => anyhow::bail!("API error ({}): {}", status, body),
            Err(e) => Err(e).context("Failed to parse response"),
        }
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub status: String,
    pub message: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub formatted: Option<String>,
    pub scaled: bool,
    #[serde(default)]
    pub scaler: Option<String>,
    #[serde(default)]
    pub error_kind: Option<String>,
    #[serde(default)]
    pub model: Option<ModelSummary>,
}

impl PredictResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_predict_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/predict")
            .match_body(mockito::Matcher::Json(serde_json::json!({ "rm": 6.5 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"success","message":"The predicted house price is: $24.53",
                   "price":24.531,"formatted":"$24.53","scaled":false,"scaler":"absent",
                   "model":{"kind":"linear","params":{}}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let features = BTreeMap::from([("rm", 6.5)]);
        let response = client.predict(&features).await.unwrap();

        mock.assert_async().await;
        assert!(response.is_success());
        assert_eq!(response.formatted.as_deref(), Some("$24.53"));
        assert_eq!(response.model.unwrap().kind, "linear");
    }

    #[tokio::test]
    async fn test_predict_failure_body_is_returned() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/predict")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"error","message":"Error loading the model: artifact file not found: model.gz",
                   "scaled":false,"scaler":"not_loaded","error_kind":"artifact_unavailable"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let response = client.predict(&BTreeMap::new()).await.unwrap();

        assert!(!response.is_success());
        assert_eq!(response.error_kind.as_deref(), Some("artifact_unavailable"));
        assert!(response.price.is_none());
    }

    #[tokio::test]
    async fn test_non_json_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/predict")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.predict(&BTreeMap::new()).await.unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_get_model_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/model")
            .with_status(503)
            .with_body(r#"{"error":"Error loading the model","kind":"not_found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.get::<ModelSummary>("api/v1/model").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_readiness_body_on_503() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/readyz")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ready":false,"reason":"Service not yet initialized"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let (status, readiness): (StatusCode, ReadinessResponse) =
            client.get_with_status("readyz").await.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!readiness.ready);
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
