use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    error::{CollaboratorError, TrialAnalysisError},
    models::{AnalysisState, AnalyzeTrialRequest},
    pipeline::TrialAnalyzer,
};

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

fn analysis_error(err: &TrialAnalysisError) -> ApiError {
    let status = match err {
        TrialAnalysisError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        TrialAnalysisError::Step(failure) => match failure.source {
            CollaboratorError::Schema { .. } => StatusCode::BAD_GATEWAY,
            CollaboratorError::Unavailable { .. } | CollaboratorError::Timeout { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        },
        TrialAnalysisError::Workflow(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(json!({
            "error": "Trial analysis failed",
            "step": err.step().map(|step| step.as_str()),
            "details": err.to_string()
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub analyzer: TrialAnalyzer,
}

pub fn create_app(analyzer: TrialAnalyzer) -> Router {
    build_router(AppState { analyzer })
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/trials/analyze", post(analyze_trial))
        .route("/trials/workflow", get(workflow_diagram))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Clinical Trial Analysis Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Multi-step AI analysis of clinical trial protocols, safety and data quality",
        "endpoints": {
            "POST /trials/analyze": "Analyze a trial's documents and return the full analysis",
            "GET /trials/workflow": "Mermaid diagram of the analysis workflow",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn analyze_trial(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeTrialRequest>,
) -> ApiResult<AnalysisState> {
    info!(
        trial_id = %request.trial_id,
        documents = request.documents.len(),
        "Received trial analysis request"
    );

    match state
        .analyzer
        .run(&request.trial_id, request.documents)
        .await
    {
        Ok(analysis) => Ok(Json(analysis)),
        Err(e @ TrialAnalysisError::InvalidInput(_)) => {
            warn!(trial_id = %request.trial_id, error = %e, "Rejected trial analysis request");
            Err(analysis_error(&e))
        }
        Err(e) => {
            error!(trial_id = %request.trial_id, error = %e, "Trial analysis failed");
            Err(analysis_error(&e))
        }
    }
}

async fn workflow_diagram(State(state): State<AppState>) -> String {
    state.analyzer.graph().to_mermaid()
}
