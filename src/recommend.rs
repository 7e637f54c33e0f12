use serde::{Serialize, Serializer};
use std::fmt;

use crate::model::{PredictionResult, StudentRecord};

pub const MIN_ATTENDANCE: f64 = 60.0;
pub const MIN_ASSESSMENT_1: f64 = 15.0;
pub const MIN_PARTICIPATION: f64 = 5.0;
pub const MIN_PREVIOUS_GRADE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    ImproveAttendance,
    FocusOnAssessment1,
    IncreaseParticipation,
    ReviewPreviousSemester,
    OnTrack,
}

impl Recommendation {
    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::ImproveAttendance => "📌 Improve attendance to at least 60%",
            Recommendation::FocusOnAssessment1 => "📝 Focus on improving Internal Assessment 1 scores",
            Recommendation::IncreaseParticipation => "🙋‍♂️ Increase class participation",
            Recommendation::ReviewPreviousSemester => "📚 Review previous semester materials",
            Recommendation::OnTrack => "🎯 You're on track! Keep up the good work!",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for Recommendation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

/// Guidance for one student, in rule order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecommendationSet(Vec<Recommendation>);

impl RecommendationSet {
    pub fn items(&self) -> &[Recommendation] {
        &self.0
    }

    pub fn messages(&self) -> Vec<&'static str> {
        self.0.iter().map(Recommendation::message).collect()
    }

    pub fn is_on_track(&self) -> bool {
        self.0 == [Recommendation::OnTrack]
    }

    pub fn render(&self) -> String {
        self.messages().join("\n")
    }
}

/// Evaluates every threshold rule against the record.
///
/// The prediction is accepted so callers can pass what they have on screen,
/// but no rule reads it.
pub fn recommend(record: &StudentRecord, _prediction: Option<&PredictionResult>) -> RecommendationSet {
    let rules = [
        (record.attendance < MIN_ATTENDANCE, Recommendation::ImproveAttendance),
        (record.assessment_1 < MIN_ASSESSMENT_1, Recommendation::FocusOnAssessment1),
        (record.participation < MIN_PARTICIPATION, Recommendation::IncreaseParticipation),
        (record.previous_grade < MIN_PREVIOUS_GRADE, Recommendation::ReviewPreviousSemester),
    ];

    let triggered: Vec<Recommendation> = rules
        .iter()
        .filter(|(fires, _)| *fires)
        .map(|(_, recommendation)| *recommendation)
        .collect();

    if triggered.is_empty() {
        RecommendationSet(vec![Recommendation::OnTrack])
    } else {
        RecommendationSet(triggered)
    }
}
