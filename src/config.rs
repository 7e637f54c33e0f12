//! Command line and environment configuration.

use clap::Parser;
use reqwest::Url;
use std::net::SocketAddr;
use std::time::Duration;

use crate::client::ClientConfig;

/// Student insights - dashboard view models over the student performance service
#[derive(Parser, Debug, Clone)]
#[command(name = "student-insights")]
#[command(about = "Cohort metrics, analytics views, predictions and study recommendations")]
pub struct Args {
    /// Base URL of the student performance service (roster, analytics, predictions)
    #[arg(long, env = "STUDENT_SERVICE_URL", default_value = "http://localhost:5000")]
    pub service_url: String,

    /// Address the view-model API listens on
    #[arg(long, env = "LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Timeout for each call to the performance service, in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// How long a route waits for the view it asked for to settle, in milliseconds
    #[arg(long, env = "SETTLE_TIMEOUT_MS", default_value = "15000")]
    pub settle_timeout_ms: u64,

    /// Number of students listed on the dashboard
    #[arg(long, env = "DASHBOARD_PREVIEW", default_value = "5")]
    pub dashboard_preview: usize,

    /// Student whose analytics are shown first (cohort analytics when unset)
    #[arg(long, env = "STUDENT")]
    pub student: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.service_url)
            .map_err(|e| format!("STUDENT_SERVICE_URL is not a valid URL ({}): {}", self.service_url, e))?;
        if url.cannot_be_a_base() {
            return Err(format!("STUDENT_SERVICE_URL cannot be used as a base URL: {}", self.service_url));
        }
        if self.dashboard_preview == 0 {
            return Err("DASHBOARD_PREVIEW must be at least 1".to_string());
        }
        if self.request_timeout_ms == 0 || self.settle_timeout_ms == 0 {
            return Err("Timeouts must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.service_url.clone(),
            timeout_ms: self.request_timeout_ms,
        }
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}
