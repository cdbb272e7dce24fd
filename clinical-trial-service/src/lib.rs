pub mod collaborator;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod tasks;
pub mod telemetry;
pub mod workflow;

pub use collaborator::{Collaborator, OpenRouterCollaborator, ResilientCollaborator};
pub use config::{AnalysisConfig, CallPolicy, ConfigError};
pub use error::{AnalysisStep, CollaboratorError, StepFailure, TrialAnalysisError};
pub use models::*;
pub use pipeline::TrialAnalyzer;
pub use service::{AppState, create_app};
pub use workflow::build_trial_workflow;
