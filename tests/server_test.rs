use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use student_insights::client::PerformanceApi;
use student_insights::model::{
    CohortAnalytics, ExportNotice, IndividualAnalytics, OrderedPairs, PredictRequest,
    PredictionLabel, PredictionResult, ScorePair, StudentId, StudentInfo, StudentRecord,
    UploadOutcome,
};
use student_insights::server::{self, AppState};
use student_insights::session::{spawn_session, SessionHandle};
use student_insights::{InsightsError, Result};

const WAIT: Duration = Duration::from_secs(5);

const ROSTER_CSV: &str = "Student_ID,Name,Internal_Assessment_1,Internal_Assessment_2,Attendance_Percentage,Previous_Semester_Grade,Participation_Score\n\
S001,Avery Lee,18,16,91,14,7\n";

/// Answers every call immediately from fixed data.
struct StaticApi;

fn student(id: &str, name: &str, a1: f64, attendance: f64) -> StudentRecord {
    StudentRecord {
        id: StudentId::new(id),
        name: name.to_string(),
        assessment_1: a1,
        assessment_2: 14.0,
        attendance,
        previous_grade: 12.0,
        participation: 6.0,
    }
}

#[async_trait]
impl PerformanceApi for StaticApi {
    async fn fetch_roster(&self) -> Result<Vec<StudentRecord>> {
        Ok(vec![
            student("S001", "Avery Lee", 18.0, 91.0),
            student("S002", "Jules Moreno", 9.0, 55.0),
            student("S003", "Priya Natarajan", 16.0, 82.0),
        ])
    }

    async fn cohort_analytics(&self) -> Result<CohortAnalytics> {
        Ok(CohortAnalytics {
            performance_trend: vec![14.0, 15.0],
            subject_scores: vec![("Internal_Assessment_1", 14.3333)].into_iter().collect(),
            attendance_distribution: vec![("0-60%", 1), ("80-90%", 1), ("90-100%", 1)]
                .into_iter()
                .collect(),
            pass_fail_distribution: vec![("Pass", 2), ("Fail", 1)].into_iter().collect(),
        })
    }

    async fn individual_analytics(&self, name: &str) -> Result<IndividualAnalytics> {
        if name != "Avery Lee" {
            return Err(InsightsError::NotFound(name.to_string()));
        }
        Ok(IndividualAnalytics {
            student_info: StudentInfo {
                name: name.to_string(),
                id: StudentId::new("S001"),
            },
            individual_performance: vec![("Internal_Assessment_1", 18.0)].into_iter().collect(),
            performance_trend: vec![18.0, 14.0],
            subject_comparison: vec![("Internal_Assessment_1", ScorePair { student: 18.0, average: 14.33 })]
                .into_iter()
                .collect(),
            prediction: PredictionResult {
                label: PredictionLabel::Pass,
                score: 16.2,
            },
            attendance_comparison: ScorePair {
                student: 91.0,
                average: 76.0,
            },
            class_averages: OrderedPairs::new(),
        })
    }

    async fn predict(&self, request: &PredictRequest) -> Result<PredictionResult> {
        let label = if request.assessment_1 >= 10.0 {
            PredictionLabel::Pass
        } else {
            PredictionLabel::Fail
        };
        Ok(PredictionResult {
            label,
            score: request.assessment_1,
        })
    }

    async fn upload_roster(&self, _file_name: &str, _contents: Vec<u8>) -> Result<UploadOutcome> {
        Ok(UploadOutcome::from_response(true, "File uploaded successfully".to_string()))
    }

    async fn export_roster(&self) -> Result<ExportNotice> {
        Ok(ExportNotice {
            message: "Data exported successfully".to_string(),
            filename: Some("students_export.csv".to_string()),
        })
    }
}

async fn loaded_state() -> (web::Data<AppState>, SessionHandle) {
    let api: Arc<dyn PerformanceApi> = Arc::new(StaticApi);
    let session = spawn_session(Arc::clone(&api), None);
    session
        .wait_for(|view| !view.roster_loading && !view.analytics.loading, WAIT, "startup")
        .await
        .unwrap();

    let state = web::Data::new(AppState {
        session: session.clone(),
        api,
        settle_timeout: WAIT,
        dashboard_preview: 2,
    });
    (state, session)
}

#[actix_web::test]
async fn health_check_responds() {
    let (state, _) = loaded_state().await;
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn dashboard_lists_a_preview_of_matches() {
    let (state, _) = loaded_state().await;
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let req = test::TestRequest::get().uri("/dashboard").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["metrics"]["count"], 3);
    assert_eq!(body["metrics"]["top_achiever_count"], 2);
    assert_eq!(body["match_count"], 3);
    assert_eq!(body["students"].as_array().map(Vec::len), Some(2));

    let req = test::TestRequest::get().uri("/dashboard?search=JULES").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["match_count"], 1);
    assert_eq!(body["students"][0]["Name"], "Jules Moreno");
}

#[actix_web::test]
async fn individual_analytics_come_with_chart_series() {
    let (state, _) = loaded_state().await;
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let req = test::TestRequest::get().uri("/analytics/Avery%20Lee").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["mode"]["mode"], "individual");
    assert_eq!(body["mode"]["student"], "Avery Lee");
    assert_eq!(body["content"]["charts"]["kind"], "individual");
    assert_eq!(body["content"]["charts"]["performance_trend"][1]["name"], "Assessment 2");
}

#[actix_web::test]
async fn unknown_student_analytics_fall_back_to_cohort() {
    let (state, _) = loaded_state().await;
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let req = test::TestRequest::get().uri("/analytics/Nobody").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["mode"]["mode"], "cohort");
    assert_eq!(body["redirected_from"], "Nobody");
    assert_eq!(body["content"]["snapshot"]["kind"], "cohort");
}

#[actix_web::test]
async fn prediction_includes_recommendations() {
    let (state, _) = loaded_state().await;
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let req = test::TestRequest::post().uri("/predictions/S002").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["result"]["prediction"], "Fail");
    assert_eq!(body["selection"]["Student_ID"], "S002");
    assert_eq!(
        body["recommendations"],
        serde_json::json!([
            "📌 Improve attendance to at least 60%",
            "📝 Focus on improving Internal Assessment 1 scores"
        ])
    );
}

#[actix_web::test]
async fn prediction_for_unknown_student_is_404() {
    let (state, _) = loaded_state().await;
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let req = test::TestRequest::post().uri("/predictions/S999").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn upload_rejects_files_that_are_not_csv() {
    let (state, _) = loaded_state().await;
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let req = test::TestRequest::post()
        .uri("/upload?filename=grades.xlsx")
        .set_payload("not a roster")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["succeeded"], false);
    assert_eq!(body["message"], "Invalid file format! Please upload a CSV file.");
}

#[actix_web::test]
async fn upload_reloads_roster_on_success() {
    let (state, session) = loaded_state().await;
    let before = session.view().roster_token;
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let req = test::TestRequest::post()
        .uri("/upload?filename=students.csv")
        .set_payload(ROSTER_CSV)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["succeeded"], true);

    let view = session.view();
    assert!(view.roster_token > before);
    assert!(!view.roster_loading);
    assert!(view.roster_error.is_none());
}

#[actix_web::test]
async fn upload_without_student_ids_is_rejected_locally() {
    let (state, session) = loaded_state().await;
    let before = session.view().roster_token;
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let csv = "Name,Internal_Assessment_1,Internal_Assessment_2,Attendance_Percentage,Previous_Semester_Grade,Participation_Score\n\
Avery Lee,18,16,91,14,7\n";
    let req = test::TestRequest::post()
        .uri("/upload?filename=students.csv")
        .set_payload(csv)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["succeeded"], false);
    assert_eq!(body["message"], "CSV file missing required columns: Student_ID");
    assert_eq!(session.view().roster_token, before);
}

/// Accepts uploads, but every roster fetch after the first one fails to decode.
struct UnreadableAfterUpload {
    fetches: AtomicUsize,
}

#[async_trait]
impl PerformanceApi for UnreadableAfterUpload {
    async fn fetch_roster(&self) -> Result<Vec<StudentRecord>> {
        if self.fetches.fetch_add(1, Ordering::SeqCst) == 0 {
            StaticApi.fetch_roster().await
        } else {
            Err(InsightsError::Server {
                status: 200,
                message: "missing field `Student_ID`".to_string(),
            })
        }
    }

    async fn cohort_analytics(&self) -> Result<CohortAnalytics> {
        StaticApi.cohort_analytics().await
    }

    async fn individual_analytics(&self, name: &str) -> Result<IndividualAnalytics> {
        StaticApi.individual_analytics(name).await
    }

    async fn predict(&self, request: &PredictRequest) -> Result<PredictionResult> {
        StaticApi.predict(request).await
    }

    async fn upload_roster(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadOutcome> {
        StaticApi.upload_roster(file_name, contents).await
    }

    async fn export_roster(&self) -> Result<ExportNotice> {
        StaticApi.export_roster().await
    }
}

#[actix_web::test]
async fn upload_reports_failure_when_reload_fails() {
    let api: Arc<dyn PerformanceApi> = Arc::new(UnreadableAfterUpload {
        fetches: AtomicUsize::new(0),
    });
    let session = spawn_session(Arc::clone(&api), None);
    session
        .wait_for(|view| !view.roster_loading && !view.roster.is_empty(), WAIT, "startup")
        .await
        .unwrap();
    let state = web::Data::new(AppState {
        session: session.clone(),
        api,
        settle_timeout: WAIT,
        dashboard_preview: 5,
    });
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let req = test::TestRequest::post()
        .uri("/upload?filename=students.csv")
        .set_payload(ROSTER_CSV)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["succeeded"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Upload accepted but the roster could not be reloaded"));

    let view = session.view();
    assert_eq!(view.roster.len(), 3);
    assert!(view.roster_error.is_some());
}

#[actix_web::test]
async fn roster_downloads_as_csv() {
    let (state, _) = loaded_state().await;
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let req = test::TestRequest::get().uri("/roster.csv").to_request();
    let body = test::call_and_read_body(&app, req).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.starts_with("Student_ID,Name,Internal_Assessment_1"));
    assert_eq!(text.lines().count(), 4);
}

#[actix_web::test]
async fn export_passes_notice_through() {
    let (state, _) = loaded_state().await;
    let app = test::init_service(App::new().app_data(state).configure(server::configure)).await;

    let req = test::TestRequest::get().uri("/export").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["filename"], "students_export.csv");
}
