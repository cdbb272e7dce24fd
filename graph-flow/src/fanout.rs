use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::{
    context::Context,
    error::{GraphError, Result},
    task::{NextAction, Task, TaskResult},
};

/// Hook executed once every branch of a [`FanOutTask`] has finished.
pub type JoinHook = Arc<dyn Fn(&Context) -> Result<()> + Send + Sync>;

/// Runs a fixed set of child tasks concurrently and waits for all of them.
///
/// Children share the parent's [`Context`], so each one should write to keys
/// no sibling writes. Combining their outputs happens afterwards in the join
/// hook, which sees every branch's writes and nothing else is running.
///
/// The first failing child aborts its siblings and its error is returned
/// unchanged. The join hook is skipped in that case. A child's `next_action`
/// is ignored; the fan-out node itself always continues along its edge.
/// Child responses are not written to the context; they are folded into the
/// fan-out's own response as `child_id: response` lines, in declaration order.
pub struct FanOutTask {
    id: String,
    children: Vec<Arc<dyn Task>>,
    join_hook: Option<JoinHook>,
}

impl FanOutTask {
    pub fn new(id: impl Into<String>, children: Vec<Arc<dyn Task>>) -> Self {
        Self {
            id: id.into(),
            children,
            join_hook: None,
        }
    }

    pub fn with_join<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Context) -> Result<()> + Send + Sync + 'static,
    {
        self.join_hook = Some(Arc::new(hook));
        self
    }
}

#[async_trait]
impl Task for FanOutTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn branch_ids(&self) -> Vec<String> {
        self.children
            .iter()
            .map(|child| child.id().to_string())
            .collect()
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        info!(task_id = %self.id, branches = self.children.len(), "fanning out");

        let mut branches = JoinSet::new();
        for (index, child) in self.children.iter().enumerate() {
            let child = Arc::clone(child);
            let context = context.clone();
            branches.spawn(async move { (index, child.run(context).await) });
        }

        let mut results: Vec<Option<TaskResult>> = vec![None; self.children.len()];
        while let Some(joined) = branches.join_next().await {
            let (index, outcome) = joined.map_err(|e| {
                GraphError::TaskExecutionFailed(format!(
                    "branch of '{}' did not finish: {e}",
                    self.id
                ))
            })?;
            let child_id = self.children[index].id();

            match outcome {
                Ok(mut result) => {
                    result.task_id = child_id.to_string();
                    results[index] = Some(result);
                }
                Err(e) => {
                    warn!(task_id = %self.id, branch = %child_id, error = %e, "branch failed, aborting siblings");
                    branches.abort_all();
                    return Err(e);
                }
            }
        }

        let responses: Vec<String> = results
            .into_iter()
            .flatten()
            .filter_map(|result| {
                result
                    .response
                    .map(|response| format!("{}: {}", result.task_id, response))
            })
            .collect();

        if let Some(hook) = &self.join_hook {
            hook(&context)?;
        }

        info!(task_id = %self.id, "all branches joined");
        Ok(TaskResult::new_with_status(
            (!responses.is_empty()).then(|| responses.join("\n")),
            NextAction::ContinueAndExecute,
            Some(format!("{} parallel branches completed", self.children.len())),
        ))
    }
}
