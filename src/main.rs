use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use student_insights::client::{HttpPerformanceClient, PerformanceApi};
use student_insights::config::Args;
use student_insights::server::{self, AppState};
use student_insights::session;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("student_insights={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("Performance service: {}", args.service_url);
    info!("Listen: {}", args.listen);

    let api: Arc<dyn PerformanceApi> = Arc::new(HttpPerformanceClient::new(args.client_config())?);
    let session = session::spawn_session(Arc::clone(&api), args.student.clone());

    let state = AppState {
        session,
        api,
        settle_timeout: args.settle_timeout(),
        dashboard_preview: args.dashboard_preview,
    };

    server::start_api(state, args.listen).await?;

    Ok(())
}
