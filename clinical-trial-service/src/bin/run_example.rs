//! Runs the analysis once over two sample documents and prints the result.
//!
//! Needs `OPENROUTER_API_KEY`; the other settings come from the same
//! environment variables as the service.

use clap::Parser;
use clinical_trial_service::telemetry::{LogFormat, init_tracing};
use clinical_trial_service::{
    AnalysisConfig, AnalysisState, ClinicalDocument, DocumentType, TrialAnalyzer,
};

#[derive(Parser)]
#[command(name = "run_example")]
#[command(about = "Analyze a sample clinical trial with the configured model")]
struct Cli {
    /// Trial identifier attached to the analysis
    #[arg(long, default_value = "TRIAL-001")]
    trial_id: String,
    /// Print the full analysis as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn sample_documents() -> Vec<ClinicalDocument> {
    vec![
        ClinicalDocument::new(
            "PROTO-001",
            DocumentType::Protocol,
            "Sample protocol content describing trial design and criteria",
        )
        .with_metadata("version", "1.0"),
        ClinicalDocument::new(
            "SAFETY-001",
            DocumentType::SafetyReport,
            "Safety monitoring data and observations",
        )
        .with_metadata("date", "2024-01-01"),
    ]
}

fn print_summary(analysis: &AnalysisState) {
    println!("Trial: {}", analysis.trial_id);

    match &analysis.protocol_findings {
        Some(findings) => {
            println!("\nProtocol findings:");
            println!("  inclusion criteria: {}", findings.inclusion_criteria.len());
            println!("  exclusion criteria: {}", findings.exclusion_criteria.len());
            println!("  endpoints: {}", findings.endpoints.len());
        }
        None => println!("\nProtocol findings: none"),
    }

    println!("\nSafety alerts ({}):", analysis.safety_alerts.len());
    for alert in &analysis.safety_alerts {
        println!("  [{}] {}: {}", alert.severity, alert.id, alert.description);
    }

    println!("\nQuality issues ({}):", analysis.quality_issues.len());
    for issue in &analysis.quality_issues {
        println!("  [{}] {}: {}", issue.impact_level, issue.category, issue.description);
    }

    println!("\nRecommendations:");
    for recommendation in analysis
        .recommendations
        .iter()
        .filter(|line| !line.trim().is_empty())
    {
        println!("  {recommendation}");
    }

    println!("\nFinal report:\n{}", analysis.final_report);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(
        LogFormat::from_env_or(LogFormat::Compact),
        "clinical_trial_service=info",
    );

    let cli = Cli::parse();
    let config = AnalysisConfig::from_env()?;
    let analyzer = TrialAnalyzer::from_config(&config)?;

    let analysis = analyzer.run(&cli.trial_id, sample_documents()).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_summary(&analysis);
    }

    Ok(())
}
