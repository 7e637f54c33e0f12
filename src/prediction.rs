use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{PredictRequest, PredictionResult, StudentRecord};
use crate::recommend::{recommend, RecommendationSet};
use crate::token::{RequestToken, TokenIssuer};

#[derive(Debug, Clone, PartialEq)]
pub enum PredictionState {
    Idle,
    Pending {
        selection: StudentRecord,
        token: RequestToken,
    },
    Ready {
        selection: StudentRecord,
        result: PredictionResult,
    },
    Failed {
        selection: StudentRecord,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionCommand {
    pub token: RequestToken,
    pub request: PredictRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionView {
    pub selection: Option<StudentRecord>,
    pub loading: bool,
    pub latest_token: RequestToken,
    pub result: Option<PredictionResult>,
    pub recommendations: Option<RecommendationSet>,
}

/// Tracks the active selection and accepts only the response issued for it.
#[derive(Debug)]
pub struct PredictionFlow {
    issuer: TokenIssuer,
    state: PredictionState,
}

impl Default for PredictionFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionFlow {
    pub fn new() -> Self {
        PredictionFlow {
            issuer: TokenIssuer::default(),
            state: PredictionState::Idle,
        }
    }

    /// Makes `record` the active selection before its request goes out.
    pub fn select(&mut self, record: StudentRecord) -> PredictionCommand {
        let token = self.issuer.issue();
        let request = PredictRequest::from(&record);
        info!(student = %record.name, token = %token, "Requesting prediction");
        self.state = PredictionState::Pending {
            selection: record,
            token,
        };
        PredictionCommand { token, request }
    }

    /// Applies a response if it belongs to the active selection. Returns whether it did.
    pub fn resolve(&mut self, token: RequestToken, outcome: Result<PredictionResult>) -> bool {
        let selection = match &self.state {
            PredictionState::Pending { selection, token: pending } if *pending == token && self.issuer.is_current(token) => {
                selection.clone()
            }
            _ => {
                debug!(token = %token, latest = %self.issuer.latest(), "Dropping stale prediction response");
                return false;
            }
        };

        self.state = match outcome {
            Ok(result) => {
                info!(student = %selection.name, label = %result.label, score = result.score, "Prediction received");
                PredictionState::Ready { selection, result }
            }
            Err(err) => {
                warn!(student = %selection.name, error = %err, "Error predicting performance");
                PredictionState::Failed { selection }
            }
        };
        true
    }

    pub fn state(&self) -> &PredictionState {
        &self.state
    }

    pub fn active_selection(&self) -> Option<&StudentRecord> {
        match &self.state {
            PredictionState::Idle => None,
            PredictionState::Pending { selection, .. }
            | PredictionState::Ready { selection, .. }
            | PredictionState::Failed { selection } => Some(selection),
        }
    }

    pub fn view(&self) -> PredictionView {
        let result = match &self.state {
            PredictionState::Ready { result, .. } => Some(result.clone()),
            _ => None,
        };
        let selection = self.active_selection().cloned();
        let recommendations = selection
            .as_ref()
            .map(|record| recommend(record, result.as_ref()));

        PredictionView {
            loading: matches!(self.state, PredictionState::Pending { .. }),
            latest_token: self.issuer.latest(),
            selection,
            result,
            recommendations,
        }
    }
}
