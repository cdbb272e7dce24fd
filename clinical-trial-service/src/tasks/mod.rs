pub mod final_report;
pub mod prompts;
pub mod protocol_analysis;
pub mod quality_monitor;
pub mod recommendations;
pub mod safety_monitor;
pub mod types;

pub use final_report::FinalReportTask;
pub use protocol_analysis::ProtocolAnalysisTask;
pub use quality_monitor::QualityMonitorTask;
pub use recommendations::RecommendationsTask;
pub use safety_monitor::SafetyMonitorTask;

// Re-export context keys
pub use types::state_keys;
