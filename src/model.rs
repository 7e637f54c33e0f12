use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Number of numeric features sent to the prediction service.
pub const FEATURE_COUNT: usize = 5;

/// Student identity as issued by the roster store.
///
/// The store encodes ids either as strings (`"S001"`) or bare numbers, so both
/// are accepted and carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    pub fn new(id: impl Into<String>) -> Self {
        StudentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StudentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Integer(i64),
            Float(f64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => StudentId(text),
            RawId::Integer(number) => StudentId(number.to_string()),
            RawId::Float(number) => StudentId(number.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(rename = "Student_ID")]
    pub id: StudentId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Internal_Assessment_1")]
    pub assessment_1: f64,
    #[serde(rename = "Internal_Assessment_2")]
    pub assessment_2: f64,
    #[serde(rename = "Attendance_Percentage")]
    pub attendance: f64,
    #[serde(rename = "Previous_Semester_Grade")]
    pub previous_grade: f64,
    #[serde(rename = "Participation_Score")]
    pub participation: f64,
}

impl StudentRecord {
    /// Mean of the two internal assessments.
    pub fn performance(&self) -> f64 {
        (self.assessment_1 + self.assessment_2) / 2.0
    }

    /// Features in the order the prediction model was trained on.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.assessment_1,
            self.assessment_2,
            self.attendance,
            self.previous_grade,
            self.participation,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "Internal_Assessment_1")]
    pub assessment_1: f64,
    #[serde(rename = "Internal_Assessment_2")]
    pub assessment_2: f64,
    #[serde(rename = "Attendance_Percentage")]
    pub attendance: f64,
    #[serde(rename = "Previous_Semester_Grade")]
    pub previous_grade: f64,
    #[serde(rename = "Participation_Score")]
    pub participation: f64,
}

impl From<&StudentRecord> for PredictRequest {
    fn from(record: &StudentRecord) -> Self {
        PredictRequest {
            assessment_1: record.assessment_1,
            assessment_2: record.assessment_2,
            attendance: record.attendance,
            previous_grade: record.previous_grade,
            participation: record.participation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionLabel {
    Pass,
    Fail,
}

impl fmt::Display for PredictionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictionLabel::Pass => f.write_str("Pass"),
            PredictionLabel::Fail => f.write_str("Fail"),
        }
    }
}

/// Outcome of the prediction model for one student.
///
/// The predict endpoint names the label `prediction`, the individual analytics
/// payload names it `result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "prediction", alias = "result")]
    pub label: PredictionLabel,
    pub score: f64,
}

/// A student's value next to the class average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePair {
    pub student: f64,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentInfo {
    pub name: String,
    pub id: StudentId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortAnalytics {
    pub performance_trend: Vec<f64>,
    pub subject_scores: OrderedPairs<f64>,
    pub attendance_distribution: OrderedPairs<u32>,
    pub pass_fail_distribution: OrderedPairs<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualAnalytics {
    pub student_info: StudentInfo,
    pub individual_performance: OrderedPairs<f64>,
    pub performance_trend: Vec<f64>,
    pub subject_comparison: OrderedPairs<ScorePair>,
    pub prediction: PredictionResult,
    pub attendance_comparison: ScorePair,
    pub class_averages: OrderedPairs<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyticsSnapshot {
    Cohort(CohortAnalytics),
    Individual(IndividualAnalytics),
}

/// Result of handing a CSV file to the roster store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub message: String,
    pub succeeded: bool,
}

impl UploadOutcome {
    /// The roster store only reports its outcome as free text. A 2xx status is
    /// required, and the message must mention "success" to stay compatible with
    /// how that text has always been read.
    pub fn from_response(status_ok: bool, message: String) -> Self {
        let succeeded = status_ok && message.to_lowercase().contains("success");
        UploadOutcome { message, succeeded }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        UploadOutcome {
            message: message.into(),
            succeeded: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportNotice {
    pub message: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Key/value pairs that keep the order in which the service sent them.
///
/// Decodes from a JSON object without passing through a hash or btree map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderedPairs<V>(Vec<(String, V)>);

impl<V> OrderedPairs<V> {
    pub fn new() -> Self {
        OrderedPairs(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedPairs<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        OrderedPairs(iter.into_iter().map(|(key, value)| (key.into(), value)).collect())
    }
}

impl<V: Serialize> Serialize for OrderedPairs<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedPairs<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PairsVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for PairsVisitor<V> {
            type Value = OrderedPairs<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object of named values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    pairs.push((key, value));
                }
                Ok(OrderedPairs(pairs))
            }
        }

        deserializer.deserialize_map(PairsVisitor(PhantomData))
    }
}
