use async_trait::async_trait;

use crate::{context::Context, error::Result};

/// Result of a task execution
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Response surfaced to the caller
    pub response: Option<String>,
    /// Next action to take
    pub next_action: NextAction,
    /// Id of the task that produced this result, filled in by the graph
    pub task_id: String,
    /// Human readable progress note copied onto the session
    pub status_message: Option<String>,
}

impl TaskResult {
    pub fn new(response: Option<String>, next_action: NextAction) -> Self {
        Self {
            response,
            next_action,
            task_id: String::new(),
            status_message: None,
        }
    }

    pub fn new_with_status(
        response: Option<String>,
        next_action: NextAction,
        status_message: Option<String>,
    ) -> Self {
        Self {
            response,
            next_action,
            task_id: String::new(),
            status_message,
        }
    }
}

/// Defines what should happen after a task completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// Move to the next task but hand control back to the caller
    Continue,
    /// Move to the next task and execute it immediately
    ContinueAndExecute,
    /// End the graph execution
    End,
}

/// Core trait that all tasks must implement
#[async_trait]
pub trait Task: Send + Sync {
    /// Unique identifier for this task
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Ids of tasks this one runs in parallel, if any. Used for rendering.
    fn branch_ids(&self) -> Vec<String> {
        Vec::new()
    }

    /// Execute the task with the given context
    async fn run(&self, context: Context) -> Result<TaskResult>;
}
