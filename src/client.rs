//! Client for the student performance service.
//!
//! One upstream process plays three collaborator roles: the roster store
//! (`/students`, `/upload`, `/download`), the analytics service
//! (`/analytics`, `/analytics/{name}`) and the prediction service (`/predict`).

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{InsightsError, Result};
use crate::model::{
    CohortAnalytics, ExportNotice, IndividualAnalytics, PredictRequest, PredictionResult,
    StudentRecord, UploadOutcome,
};

/// The calls the dashboard makes against its collaborators.
#[async_trait]
pub trait PerformanceApi: Send + Sync {
    async fn fetch_roster(&self) -> Result<Vec<StudentRecord>>;

    async fn cohort_analytics(&self) -> Result<CohortAnalytics>;

    /// Exact, case-sensitive name lookup. Unknown names yield [`InsightsError::NotFound`].
    async fn individual_analytics(&self, name: &str) -> Result<IndividualAnalytics>;

    async fn predict(&self, request: &PredictRequest) -> Result<PredictionResult>;

    async fn upload_roster(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadOutcome>;

    async fn export_roster(&self) -> Result<ExportNotice>;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the performance service
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Deserialize)]
struct ServiceMessage {
    message: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

pub struct HttpPerformanceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpPerformanceClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| InsightsError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(InsightsError::InvalidUrl(config.base_url));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        info!(base_url = %base_url, timeout_ms = config.timeout_ms, "Performance service client created");

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| InsightsError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self.http.get(url).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        Err(InsightsError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PerformanceApi for HttpPerformanceClient {
    async fn fetch_roster(&self) -> Result<Vec<StudentRecord>> {
        self.get_json(self.endpoint(&["students"])?).await
    }

    async fn cohort_analytics(&self) -> Result<CohortAnalytics> {
        self.get_json(self.endpoint(&["analytics"])?).await
    }

    async fn individual_analytics(&self, name: &str) -> Result<IndividualAnalytics> {
        match self.get_json(self.endpoint(&["analytics", name])?).await {
            Err(InsightsError::Server { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(InsightsError::NotFound(name.to_string()))
            }
            other => other,
        }
    }

    async fn predict(&self, request: &PredictRequest) -> Result<PredictionResult> {
        let url = self.endpoint(&["predict"])?;
        debug!(url = %url, "POST");
        let response = self.http.post(url).json(request).send().await?;
        Self::decode(response).await
    }

    async fn upload_roster(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadOutcome> {
        let url = self.endpoint(&["upload"])?;
        let part = Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        debug!(url = %url, file_name, "POST multipart");
        let response = self.http.post(url).multipart(form).send().await?;
        let status = response.status();
        let message = match response.json::<ServiceMessage>().await {
            Ok(body) => body.message,
            Err(_) => "Upload failed".to_string(),
        };

        Ok(UploadOutcome::from_response(status.is_success(), message))
    }

    async fn export_roster(&self) -> Result<ExportNotice> {
        self.get_json(self.endpoint(&["download"])?).await
    }
}
