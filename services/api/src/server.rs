use crate::cli::ServeArgs;
use crate::infra::{default_badges, scoring_policy, AppState};
use crate::routes::with_submission_routes;
use aquavriksh::config::AppConfig;
use aquavriksh::error::AppError;
use aquavriksh::telemetry;
use aquavriksh::workflows::submissions::{HttpClassifier, MemoryStore, SubmissionService};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let policy = scoring_policy(config.scoring);
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        policy: Arc::new(policy.clone()),
    };

    let store = Arc::new(MemoryStore::with_badges(default_badges()));
    let classifier = Arc::new(HttpClassifier::new(&config.classifier)?);
    let submission_service = Arc::new(SubmissionService::new(
        store,
        classifier,
        policy,
        config.retry,
        config.classifier.timeout,
    ));

    let app = with_submission_routes(submission_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        classifier = %config.classifier.endpoint,
        max_attempts = config.retry.max_attempts,
        "submission scoring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
