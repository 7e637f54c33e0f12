//! Dashboard session driver.
//!
//! One task owns the roster, the analytics mode selector and the prediction
//! flow. UI events arrive over an mpsc channel, service responses arrive as
//! completions tagged with the token they were issued under, and after every
//! message a fresh [`DashboardView`] replaces the previous one in a watch
//! channel. Outbound calls are never aborted; late results are simply not
//! applied.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::client::PerformanceApi;
use crate::error::{InsightsError, Result};
use crate::metrics::CohortMetrics;
use crate::model::{AnalyticsSnapshot, PredictionResult, StudentId, StudentRecord};
use crate::navigation::{AnalyticsView, FetchCommand, ModeSelector, Transition};
use crate::prediction::{PredictionCommand, PredictionFlow, PredictionView};
use crate::roster;
use crate::token::{RequestToken, TokenIssuer};

const EVENT_BUFFER: usize = 64;

#[derive(Debug)]
pub enum SessionEvent {
    ReloadRoster {
        ack: oneshot::Sender<RequestToken>,
    },
    Navigate {
        student: Option<String>,
        ack: oneshot::Sender<RequestToken>,
    },
    SelectStudent {
        id: StudentId,
        ack: oneshot::Sender<Option<RequestToken>>,
    },
}

enum Completion {
    Roster {
        token: RequestToken,
        outcome: Result<Vec<StudentRecord>>,
    },
    Analytics {
        token: RequestToken,
        outcome: Result<AnalyticsSnapshot>,
    },
    Prediction {
        token: RequestToken,
        outcome: Result<PredictionResult>,
    },
}

/// Everything the rendering layer needs, replaced as a whole on every change.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub revision: u64,
    pub roster: Arc<Vec<StudentRecord>>,
    pub roster_loading: bool,
    pub roster_token: RequestToken,
    /// Why the latest roster load failed; the previously loaded roster stays in place.
    pub roster_error: Option<String>,
    pub metrics: CohortMetrics,
    pub analytics: AnalyticsView,
    pub prediction: PredictionView,
}

struct DashboardSession {
    api: Arc<dyn PerformanceApi>,
    roster: Arc<Vec<StudentRecord>>,
    roster_issuer: TokenIssuer,
    roster_loading: bool,
    roster_error: Option<String>,
    metrics: CohortMetrics,
    navigation: ModeSelector,
    predictions: PredictionFlow,
    revision: u64,
    completions: mpsc::UnboundedSender<Completion>,
    view: watch::Sender<DashboardView>,
}

/// Cloneable entry point to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
    view: watch::Receiver<DashboardView>,
}

/// Starts a session on the current tokio runtime.
///
/// The roster and the analytics for `initial_student` (cohort when `None`)
/// are requested immediately.
pub fn spawn_session(api: Arc<dyn PerformanceApi>, initial_student: Option<String>) -> SessionHandle {
    let (navigation, first_fetch) = ModeSelector::enter(initial_student);
    let (completion_tx, completion_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

    let predictions = PredictionFlow::new();
    let initial_view = DashboardView {
        revision: 0,
        roster: Arc::new(Vec::new()),
        roster_loading: false,
        roster_token: RequestToken::default(),
        roster_error: None,
        metrics: CohortMetrics::default(),
        analytics: navigation.view(),
        prediction: predictions.view(),
    };
    let (view_tx, view_rx) = watch::channel(initial_view);

    let mut session = DashboardSession {
        api,
        roster: Arc::new(Vec::new()),
        roster_issuer: TokenIssuer::default(),
        roster_loading: false,
        roster_error: None,
        metrics: CohortMetrics::default(),
        navigation,
        predictions,
        revision: 0,
        completions: completion_tx,
        view: view_tx,
    };

    session.load_roster();
    session.fetch_analytics(first_fetch);
    session.publish();

    tokio::spawn(session.run(event_rx, completion_rx));

    SessionHandle {
        events: event_tx,
        view: view_rx,
    }
}

impl DashboardSession {
    async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        info!("Dashboard session started");
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
            }
            self.publish();
        }
        info!("Dashboard session stopped");
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ReloadRoster { ack } => {
                let token = self.load_roster();
                let _ = ack.send(token);
            }
            SessionEvent::Navigate { student, ack } => {
                let command = self.navigation.navigate(student);
                let token = command.token;
                self.fetch_analytics(command);
                let _ = ack.send(token);
            }
            SessionEvent::SelectStudent { id, ack } => {
                let token = match roster::find_by_id(&self.roster, &id) {
                    Some(record) => {
                        let command = self.predictions.select(record.clone());
                        let token = command.token;
                        self.request_prediction(command);
                        Some(token)
                    }
                    None => {
                        warn!(student_id = %id, "Selected student is not in the roster");
                        None
                    }
                };
                let _ = ack.send(token);
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Roster { token, outcome } => self.apply_roster(token, outcome),
            Completion::Analytics { token, outcome } => {
                if let Transition::Redirected(command) = self.navigation.resolve(token, outcome) {
                    self.fetch_analytics(command);
                }
            }
            Completion::Prediction { token, outcome } => {
                self.predictions.resolve(token, outcome);
            }
        }
    }

    fn apply_roster(&mut self, token: RequestToken, outcome: Result<Vec<StudentRecord>>) {
        if !self.roster_issuer.is_current(token) {
            debug!(token = %token, "Dropping stale roster response");
            return;
        }

        self.roster_loading = false;
        match outcome {
            Ok(records) => {
                self.roster_error = None;
                self.metrics = CohortMetrics::from_roster(&records);
                self.roster = Arc::new(records);
                info!(
                    students = self.metrics.count,
                    average_performance = self.metrics.average_performance,
                    average_attendance = self.metrics.average_attendance,
                    top_achievers = self.metrics.top_achiever_count,
                    "Roster loaded"
                );
            }
            Err(err) => {
                warn!(error = %err, "Error fetching students");
                self.roster_error = Some(err.to_string());
            }
        }
    }

    fn load_roster(&mut self) -> RequestToken {
        let token = self.roster_issuer.issue();
        self.roster_loading = true;

        let api = Arc::clone(&self.api);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let outcome = api.fetch_roster().await;
            let _ = completions.send(Completion::Roster { token, outcome });
        });
        token
    }

    fn fetch_analytics(&self, command: FetchCommand) {
        let api = Arc::clone(&self.api);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let outcome = command.execute(api.as_ref()).await;
            let _ = completions.send(Completion::Analytics {
                token: command.token,
                outcome,
            });
        });
    }

    fn request_prediction(&self, command: PredictionCommand) {
        let api = Arc::clone(&self.api);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let outcome = api.predict(&command.request).await;
            let _ = completions.send(Completion::Prediction {
                token: command.token,
                outcome,
            });
        });
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.view.send_replace(DashboardView {
            revision: self.revision,
            roster: Arc::clone(&self.roster),
            roster_loading: self.roster_loading,
            roster_token: self.roster_issuer.latest(),
            roster_error: self.roster_error.clone(),
            metrics: self.metrics,
            analytics: self.navigation.view(),
            prediction: self.predictions.view(),
        });
    }
}

impl SessionHandle {
    pub fn view(&self) -> DashboardView {
        self.view.borrow().clone()
    }

    pub async fn reload_roster(&self) -> Result<RequestToken> {
        let (ack, token) = oneshot::channel();
        self.send(SessionEvent::ReloadRoster { ack }).await?;
        token.await.map_err(|_| InsightsError::SessionClosed)
    }

    /// Moves the analytics view to `student` (cohort when `None`).
    pub async fn navigate(&self, student: Option<String>) -> Result<RequestToken> {
        let (ack, token) = oneshot::channel();
        self.send(SessionEvent::Navigate { student, ack }).await?;
        token.await.map_err(|_| InsightsError::SessionClosed)
    }

    /// Makes the student the active prediction selection. `None` when the id is not in the roster.
    pub async fn select_student(&self, id: StudentId) -> Result<Option<RequestToken>> {
        let (ack, token) = oneshot::channel();
        self.send(SessionEvent::SelectStudent { id, ack }).await?;
        token.await.map_err(|_| InsightsError::SessionClosed)
    }

    pub async fn roster_settled(&self, token: RequestToken, timeout: Duration) -> Result<DashboardView> {
        self.wait_for(
            |view| view.roster_token >= token && !view.roster_loading,
            timeout,
            "roster",
        )
        .await
    }

    /// Waits until the analytics request `token`, or a newer one, has settled.
    pub async fn analytics_settled(&self, token: RequestToken, timeout: Duration) -> Result<DashboardView> {
        self.wait_for(
            |view| view.analytics.latest_token >= token && !view.analytics.loading,
            timeout,
            "analytics",
        )
        .await
    }

    pub async fn prediction_settled(&self, token: RequestToken, timeout: Duration) -> Result<DashboardView> {
        self.wait_for(
            |view| view.prediction.latest_token >= token && !view.prediction.loading,
            timeout,
            "prediction",
        )
        .await
    }

    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&DashboardView) -> bool,
        timeout: Duration,
        what: &'static str,
    ) -> Result<DashboardView> {
        let mut receiver = self.view.clone();
        let settled = match tokio::time::timeout(timeout, receiver.wait_for(predicate)).await {
            Ok(Ok(view)) => Ok(view.clone()),
            Ok(Err(_)) => Err(InsightsError::SessionClosed),
            Err(_) => Err(InsightsError::Timeout(what)),
        };
        settled
    }

    async fn send(&self, event: SessionEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| InsightsError::SessionClosed)
    }
}
