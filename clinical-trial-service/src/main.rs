use clinical_trial_service::telemetry::{DEFAULT_LOG_FILTER, LogFormat, init_tracing};
use clinical_trial_service::{AnalysisConfig, TrialAnalyzer, create_app};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env_or(LogFormat::Json), DEFAULT_LOG_FILTER);

    let config = match AnalysisConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let analyzer = TrialAnalyzer::from_config(&config)?;
    let app = create_app(analyzer);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    let addr = listener.local_addr()?;

    info!(model = %config.model, timeout_secs = config.call_policy.timeout.as_secs(), "Clinical Trial Analysis Service starting on {}", addr);
    info!("Health check endpoint: http://{}/health", addr);
    info!("Analysis endpoint: POST http://{}/trials/analyze", addr);
    info!("Workflow diagram: GET http://{}/trials/workflow", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
