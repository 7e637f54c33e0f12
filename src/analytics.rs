use serde::Serialize;

use crate::model::{AnalyticsSnapshot, CohortAnalytics, IndividualAnalytics, OrderedPairs, ScorePair};

// Chart data structures
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct TrendPoint {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SubjectScorePoint {
    pub subject: String,
    pub score: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AttendanceBucketPoint {
    pub range: String,
    pub count: u32,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PassFailSlice {
    pub name: String,
    pub value: u32,
    /// Whole-number percentage of all outcomes.
    pub share: u32,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SubjectComparisonPoint {
    pub subject: String,
    pub student: f64,
    pub average: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MetricComparisonPoint {
    pub metric: String,
    pub student: f64,
    pub average: Option<f64>,
    pub difference: Option<f64>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CohortCharts {
    pub performance_trend: Vec<TrendPoint>,
    pub subject_scores: Vec<SubjectScorePoint>,
    pub attendance_distribution: Vec<AttendanceBucketPoint>,
    pub pass_fail_distribution: Vec<PassFailSlice>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct IndividualCharts {
    pub performance_trend: Vec<TrendPoint>,
    pub subject_comparison: Vec<SubjectComparisonPoint>,
    pub metric_comparison: Vec<MetricComparisonPoint>,
    pub attendance_comparison: ScorePair,
}

/// Plot-ready series for whichever analytics snapshot is on screen.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSeries {
    Cohort(CohortCharts),
    Individual(IndividualCharts),
}

impl ChartSeries {
    pub fn from_snapshot(snapshot: &AnalyticsSnapshot) -> Self {
        match snapshot {
            AnalyticsSnapshot::Cohort(cohort) => ChartSeries::Cohort(cohort_charts(cohort)),
            AnalyticsSnapshot::Individual(individual) => {
                ChartSeries::Individual(individual_charts(individual))
            }
        }
    }
}

pub fn cohort_charts(cohort: &CohortAnalytics) -> CohortCharts {
    CohortCharts {
        performance_trend: trend_series(&cohort.performance_trend),
        subject_scores: subject_scores(&cohort.subject_scores),
        attendance_distribution: attendance_buckets(&cohort.attendance_distribution),
        pass_fail_distribution: pass_fail_shares(&cohort.pass_fail_distribution),
    }
}

pub fn individual_charts(individual: &IndividualAnalytics) -> IndividualCharts {
    IndividualCharts {
        performance_trend: trend_series(&individual.performance_trend),
        subject_comparison: subject_comparison(&individual.subject_comparison),
        metric_comparison: metric_comparison(
            &individual.individual_performance,
            &individual.class_averages,
        ),
        attendance_comparison: individual.attendance_comparison,
    }
}

pub fn trend_series(scores: &[f64]) -> Vec<TrendPoint> {
    scores
        .iter()
        .enumerate()
        .map(|(index, &score)| TrendPoint {
            name: format!("Assessment {}", index + 1),
            score,
        })
        .collect()
}

pub fn subject_scores(scores: &OrderedPairs<f64>) -> Vec<SubjectScorePoint> {
    scores
        .iter()
        .map(|(subject, &score)| SubjectScorePoint {
            subject: subject.to_string(),
            score: round_to_hundredth(score),
        })
        .collect()
}

pub fn attendance_buckets(buckets: &OrderedPairs<u32>) -> Vec<AttendanceBucketPoint> {
    buckets
        .iter()
        .map(|(range, &count)| AttendanceBucketPoint {
            range: range.to_string(),
            count,
        })
        .collect()
}

pub fn pass_fail_shares(outcomes: &OrderedPairs<u32>) -> Vec<PassFailSlice> {
    let total: u64 = outcomes.iter().map(|(_, &count)| u64::from(count)).sum();
    outcomes
        .iter()
        .map(|(name, &value)| PassFailSlice {
            name: name.to_string(),
            value,
            share: if total == 0 {
                0
            } else {
                (f64::from(value) / total as f64 * 100.0).round() as u32
            },
        })
        .collect()
}

pub fn subject_comparison(subjects: &OrderedPairs<ScorePair>) -> Vec<SubjectComparisonPoint> {
    subjects
        .iter()
        .map(|(subject, pair)| SubjectComparisonPoint {
            subject: subject.to_string(),
            student: pair.student,
            average: pair.average,
        })
        .collect()
}

pub fn metric_comparison(
    individual: &OrderedPairs<f64>,
    class_averages: &OrderedPairs<f64>,
) -> Vec<MetricComparisonPoint> {
    individual
        .iter()
        .map(|(metric, &student)| {
            let average = class_averages.get(metric).copied();
            MetricComparisonPoint {
                metric: metric.to_string(),
                student,
                average,
                difference: average.map(|avg| student - avg),
            }
        })
        .collect()
}

fn round_to_hundredth(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_labels_are_one_based() {
        let points = trend_series(&[12.5, 14.0, 16.25]);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].name, "Assessment 1");
        assert_eq!(points[2].name, "Assessment 3");
        assert_eq!(points[2].score, 16.25);
        assert!(trend_series(&[]).is_empty());
    }

    #[test]
    fn subject_scores_round_to_two_places_in_order() {
        let scores: OrderedPairs<f64> =
            vec![("Science", 14.456), ("Math", 12.0), ("Art", 5.333333)].into_iter().collect();
        let points = subject_scores(&scores);
        let subjects: Vec<&str> = points.iter().map(|p| p.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Science", "Math", "Art"]);
        assert_eq!(points[0].score, 14.46);
        assert_eq!(points[2].score, 5.33);
    }

    #[test]
    fn attendance_buckets_keep_every_range() {
        let buckets: OrderedPairs<u32> =
            vec![("0-60%", 5), ("60-70%", 0), ("70-80%", 15), ("80-90%", 20), ("90-100%", 10)]
                .into_iter()
                .collect();
        let points = attendance_buckets(&buckets);
        assert_eq!(points.len(), buckets.len());
        assert_eq!(points[1], AttendanceBucketPoint { range: "60-70%".into(), count: 0 });
    }

    #[test]
    fn pass_fail_shares_are_whole_percentages() {
        let outcomes: OrderedPairs<u32> = vec![("Pass", 45), ("Fail", 15)].into_iter().collect();
        let slices = pass_fail_shares(&outcomes);
        assert_eq!(slices[0].share, 75);
        assert_eq!(slices[1].share, 25);

        let thirds: OrderedPairs<u32> = vec![("Pass", 2), ("Fail", 1)].into_iter().collect();
        let slices = pass_fail_shares(&thirds);
        assert_eq!((slices[0].share, slices[1].share), (67, 33));
    }

    #[test]
    fn pass_fail_with_no_outcomes_has_zero_shares() {
        let outcomes: OrderedPairs<u32> = vec![("Pass", 0), ("Fail", 0)].into_iter().collect();
        assert!(pass_fail_shares(&outcomes).iter().all(|slice| slice.share == 0));
    }

    #[test]
    fn subject_comparison_follows_mapping_order() {
        let subjects: OrderedPairs<ScorePair> = vec![
            ("Physics", ScorePair { student: 17.5, average: 14.2 }),
            ("Biology", ScorePair { student: 9.0, average: 12.75 }),
            ("Chemistry", ScorePair { student: 15.0, average: 15.0 }),
        ]
        .into_iter()
        .collect();

        let points = subject_comparison(&subjects);
        assert_eq!(points.len(), subjects.len());
        let order: Vec<&str> = points.iter().map(|p| p.subject.as_str()).collect();
        assert_eq!(order, vec!["Physics", "Biology", "Chemistry"]);
        let pairs: Vec<(f64, f64)> = points.iter().map(|p| (p.student, p.average)).collect();
        assert_eq!(pairs, vec![(17.5, 14.2), (9.0, 12.75), (15.0, 15.0)]);
        assert!(subject_comparison(&OrderedPairs::new()).is_empty());
    }

    #[test]
    fn metric_comparison_tolerates_missing_averages() {
        let individual: OrderedPairs<f64> =
            vec![("Internal_Assessment_1", 18.0), ("Participation_Score", 4.0)].into_iter().collect();
        let averages: OrderedPairs<f64> = vec![("Internal_Assessment_1", 15.5)].into_iter().collect();
        let points = metric_comparison(&individual, &averages);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].difference, Some(2.5));
        assert_eq!(points[1].average, None);
        assert_eq!(points[1].difference, None);
    }
}
