use actix_web::{web, App, HttpResponse, HttpServer};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::client::PerformanceApi;
use crate::data;
use crate::error::InsightsError;
use crate::metrics::CohortMetrics;
use crate::model::{StudentId, StudentRecord, UploadOutcome};
use crate::roster;
use crate::session::SessionHandle;

const UPLOAD_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub struct AppState {
    pub session: SessionHandle,
    pub api: Arc<dyn PerformanceApi>,
    pub settle_timeout: Duration,
    pub dashboard_preview: usize,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    search: String,
}

#[derive(Deserialize)]
pub struct UploadQuery {
    filename: String,
}

#[derive(Serialize)]
struct DashboardPage {
    metrics: CohortMetrics,
    roster_loading: bool,
    match_count: usize,
    students: Vec<StudentRecord>,
}

// Dashboard: metrics plus the first few matching students
async fn dashboard(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> HttpResponse {
    let view = state.session.view();
    let (match_count, shown) = roster::preview(&view.roster, &query.search, state.dashboard_preview);

    HttpResponse::Ok().json(DashboardPage {
        metrics: view.metrics,
        roster_loading: view.roster_loading,
        match_count,
        students: shown.into_iter().cloned().collect(),
    })
}

async fn students(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> HttpResponse {
    let view = state.session.view();
    let matches: Vec<&StudentRecord> = roster::search(&view.roster, &query.search);
    HttpResponse::Ok().json(matches)
}

async fn roster_csv(state: web::Data<AppState>) -> Result<HttpResponse, InsightsError> {
    let view = state.session.view();
    let mut buffer = Vec::new();
    data::write_roster(&view.roster, &mut buffer)?;
    Ok(HttpResponse::Ok().content_type("text/csv").body(buffer))
}

async fn upload(
    state: web::Data<AppState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, InsightsError> {
    if let Err(message) = data::validate_upload(&query.filename, &body) {
        warn!(file_name = %query.filename, reason = %message, "Rejected roster upload");
        return Ok(HttpResponse::BadRequest().json(UploadOutcome::rejected(message)));
    }

    let outcome = state.api.upload_roster(&query.filename, body.to_vec()).await?;
    if !outcome.succeeded {
        warn!(file_name = %query.filename, message = %outcome.message, "Roster store refused upload");
        return Ok(HttpResponse::BadRequest().json(outcome));
    }

    info!(file_name = %query.filename, "Roster uploaded, reloading students");
    let token = state.session.reload_roster().await?;
    let view = state.session.roster_settled(token, state.settle_timeout).await?;
    if let Some(reason) = view.roster_error {
        warn!(file_name = %query.filename, error = %reason, "Uploaded roster could not be reloaded");
        return Ok(HttpResponse::BadGateway().json(UploadOutcome::rejected(format!(
            "Upload accepted but the roster could not be reloaded: {}",
            reason
        ))));
    }
    Ok(HttpResponse::Ok().json(outcome))
}

async fn export(state: web::Data<AppState>) -> Result<HttpResponse, InsightsError> {
    let notice = state.api.export_roster().await?;
    Ok(HttpResponse::Ok().json(notice))
}

async fn show_analytics(
    state: &AppState,
    student: Option<String>,
) -> Result<HttpResponse, InsightsError> {
    let token = state.session.navigate(student).await?;
    let view = state
        .session
        .analytics_settled(token, state.settle_timeout)
        .await?;
    Ok(HttpResponse::Ok().json(view.analytics))
}

async fn cohort_analytics(state: web::Data<AppState>) -> Result<HttpResponse, InsightsError> {
    show_analytics(&state, None).await
}

async fn student_analytics(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, InsightsError> {
    show_analytics(&state, Some(path.into_inner())).await
}

async fn predict_student(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, InsightsError> {
    let id = path.into_inner();
    let token = state
        .session
        .select_student(StudentId::new(id.clone()))
        .await?
        .ok_or(InsightsError::NotFound(id))?;
    let view = state
        .session
        .prediction_settled(token, state.settle_timeout)
        .await?;
    Ok(HttpResponse::Ok().json(view.prediction))
}

async fn session_view(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.session.view())
}

// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Student Insights API is running!")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(UPLOAD_LIMIT_BYTES))
        .route("/health", web::get().to(health_check))
        .route("/dashboard", web::get().to(dashboard))
        .route("/students", web::get().to(students))
        .route("/roster.csv", web::get().to(roster_csv))
        .route("/upload", web::post().to(upload))
        .route("/export", web::get().to(export))
        .route("/analytics", web::get().to(cohort_analytics))
        .route("/analytics/{name}", web::get().to(student_analytics))
        .route("/predictions/{student_id}", web::post().to(predict_student))
        .route("/session", web::get().to(session_view));
}

pub async fn start_api(state: AppState, listen: SocketAddr) -> std::io::Result<()> {
    let state = web::Data::new(state);

    info!(%listen, "Starting Student Insights API");
    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(listen)?
        .run()
        .await
}
