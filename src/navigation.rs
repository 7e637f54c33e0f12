//! Cohort / individual analytics mode.
//!
//! The selector never performs I/O itself. Every transition that needs data
//! hands back a [`FetchCommand`]; the caller runs it and feeds the outcome to
//! [`ModeSelector::resolve`] together with the command's token.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analytics::ChartSeries;
use crate::client::PerformanceApi;
use crate::error::Result;
use crate::model::AnalyticsSnapshot;
use crate::token::{RequestToken, TokenIssuer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "student", rename_all = "snake_case")]
pub enum AnalyticsMode {
    Cohort,
    Individual(String),
}

impl AnalyticsMode {
    /// Mode implied by the optional student-name route parameter.
    pub fn from_route(student: Option<String>) -> Self {
        match student {
            Some(name) if !name.is_empty() => AnalyticsMode::Individual(name),
            _ => AnalyticsMode::Cohort,
        }
    }

    pub fn route(&self) -> Option<&str> {
        match self {
            AnalyticsMode::Cohort => None,
            AnalyticsMode::Individual(name) => Some(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCommand {
    pub token: RequestToken,
    pub mode: AnalyticsMode,
}

impl FetchCommand {
    pub async fn execute(&self, api: &dyn PerformanceApi) -> Result<AnalyticsSnapshot> {
        match &self.mode {
            AnalyticsMode::Cohort => api.cohort_analytics().await.map(AnalyticsSnapshot::Cohort),
            AnalyticsMode::Individual(name) => api
                .individual_analytics(name)
                .await
                .map(AnalyticsSnapshot::Individual),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The snapshot replaced the displayed one.
    Applied,
    /// The student was unknown; the selector moved to cohort mode and needs this fetch.
    Redirected(FetchCommand),
    /// The fetch failed; the previous snapshot is shown again.
    Failed,
    /// A newer fetch was issued after this one; the outcome was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsContent {
    pub snapshot: Arc<AnalyticsSnapshot>,
    pub charts: Arc<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsView {
    pub mode: AnalyticsMode,
    pub loading: bool,
    pub latest_token: RequestToken,
    /// Hidden while a fetch is pending.
    pub content: Option<AnalyticsContent>,
    /// Set when an unknown student sent the view back to cohort mode.
    pub redirected_from: Option<String>,
}

#[derive(Debug)]
pub struct ModeSelector {
    mode: AnalyticsMode,
    issuer: TokenIssuer,
    loading: bool,
    content: Option<AnalyticsContent>,
    redirected_from: Option<String>,
}

impl ModeSelector {
    /// Starts in the mode given by the route and requests its data.
    pub fn enter(student: Option<String>) -> (Self, FetchCommand) {
        let mut selector = ModeSelector {
            mode: AnalyticsMode::Cohort,
            issuer: TokenIssuer::default(),
            loading: false,
            content: None,
            redirected_from: None,
        };
        let command = selector.navigate(student);
        (selector, command)
    }

    /// Switches to the mode given by the route. Always refetches.
    pub fn navigate(&mut self, student: Option<String>) -> FetchCommand {
        self.mode = AnalyticsMode::from_route(student);
        self.redirected_from = None;
        self.begin_fetch()
    }

    fn begin_fetch(&mut self) -> FetchCommand {
        self.loading = true;
        let command = FetchCommand {
            token: self.issuer.issue(),
            mode: self.mode.clone(),
        };
        info!(token = %command.token, mode = ?command.mode, "Fetching analytics");
        command
    }

    pub fn resolve(&mut self, token: RequestToken, outcome: Result<AnalyticsSnapshot>) -> Transition {
        if !self.issuer.is_current(token) {
            debug!(token = %token, latest = %self.issuer.latest(), "Dropping stale analytics response");
            return Transition::Stale;
        }

        match outcome {
            Ok(snapshot) => {
                let charts = ChartSeries::from_snapshot(&snapshot);
                self.content = Some(AnalyticsContent {
                    snapshot: Arc::new(snapshot),
                    charts: Arc::new(charts),
                });
                self.loading = false;
                Transition::Applied
            }
            Err(err) if err.is_not_found() => match self.mode.route().map(str::to_string) {
                Some(name) => {
                    info!(student = %name, "Student not found, returning to cohort analytics");
                    self.mode = AnalyticsMode::Cohort;
                    self.redirected_from = Some(name);
                    Transition::Redirected(self.begin_fetch())
                }
                None => self.fail(err.to_string()),
            },
            Err(err) => self.fail(err.to_string()),
        }
    }

    fn fail(&mut self, reason: String) -> Transition {
        warn!(mode = ?self.mode, error = %reason, "Error fetching analytics data");
        self.loading = false;
        Transition::Failed
    }

    pub fn mode(&self) -> &AnalyticsMode {
        &self.mode
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn view(&self) -> AnalyticsView {
        AnalyticsView {
            mode: self.mode.clone(),
            loading: self.loading,
            latest_token: self.issuer.latest(),
            content: if self.loading { None } else { self.content.clone() },
            redirected_from: self.redirected_from.clone(),
        }
    }
}
