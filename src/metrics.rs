use serde::{Deserialize, Serialize};

use crate::data::feature_matrix;
use crate::model::StudentRecord;

/// Mean assessment score at or above which a student counts as a top achiever.
pub const TOP_ACHIEVER_THRESHOLD: f64 = 15.0;

/// Summary figures shown at the top of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CohortMetrics {
    pub count: usize,
    pub average_performance: f64,
    pub average_attendance: f64,
    pub top_achiever_count: usize,
}

impl CohortMetrics {
    /// Reduces a roster in one pass. An empty roster yields all zeroes.
    pub fn from_roster(records: &[StudentRecord]) -> Self {
        if records.is_empty() {
            return CohortMetrics::default();
        }

        let features = feature_matrix(records);
        let performance = (&features.column(0) + &features.column(1)) / 2.0;
        let attendance = features.column(2);

        CohortMetrics {
            count: records.len(),
            average_performance: round_to_tenth(performance.mean().unwrap_or(0.0)),
            average_attendance: round_to_tenth(attendance.mean().unwrap_or(0.0)),
            top_achiever_count: performance
                .iter()
                .filter(|&&score| score >= TOP_ACHIEVER_THRESHOLD)
                .count(),
        }
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
