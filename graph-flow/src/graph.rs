use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    context::Context,
    error::{GraphError, Result},
    session::Session,
    task::{NextAction, Task, TaskResult},
};

/// Edge between tasks in the graph
#[derive(Clone, Debug)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// A graph of tasks that can be executed.
///
/// Graphs are assembled through [`GraphBuilder`] and are immutable afterwards.
/// Every task has at most one outgoing edge; parallel work is expressed with a
/// [`crate::FanOutTask`] node instead of diverging edges.
pub struct Graph {
    pub id: String,
    tasks: HashMap<String, Arc<dyn Task>>,
    order: Vec<String>,
    edges: Vec<Edge>,
    start_task_id: Option<String>,
}

impl Graph {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: HashMap::new(),
            order: Vec::new(),
            edges: Vec::new(),
            start_task_id: None,
        }
    }

    fn add_task(&mut self, task: Arc<dyn Task>) {
        let task_id = task.id().to_string();

        // Set as start task if it's the first one
        if self.tasks.is_empty() {
            self.start_task_id = Some(task_id.clone());
        }

        if self.tasks.insert(task_id.clone(), task).is_none() {
            self.order.push(task_id);
        }
    }

    fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
        });
    }

    /// Check that the graph can be driven to an end deterministically.
    pub fn validate(&self) -> Result<()> {
        let start = self
            .start_task_id
            .as_deref()
            .ok_or_else(|| GraphError::InvalidEdge(format!("graph '{}' has no tasks", self.id)))?;
        if !self.tasks.contains_key(start) {
            return Err(GraphError::TaskNotFound(start.to_string()));
        }

        let mut outgoing = HashSet::new();
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !self.tasks.contains_key(endpoint) {
                    return Err(GraphError::InvalidEdge(format!(
                        "edge {} -> {} references unknown task '{}'",
                        edge.from, edge.to, endpoint
                    )));
                }
            }
            if !outgoing.insert(edge.from.as_str()) {
                return Err(GraphError::InvalidEdge(format!(
                    "task '{}' has more than one outgoing edge",
                    edge.from
                )));
            }
        }

        let mut visited = HashSet::new();
        let mut current = Some(start.to_string());
        while let Some(task_id) = current {
            if !visited.insert(task_id.clone()) {
                return Err(GraphError::InvalidEdge(format!(
                    "cycle detected at task '{task_id}'"
                )));
            }
            current = self.find_next_task(&task_id);
        }

        Ok(())
    }

    /// Execute the current task of the session.
    ///
    /// `ContinueAndExecute` keeps going in the same call, `Continue` returns
    /// after advancing the session by one task.
    pub async fn execute_session(&self, session: &mut Session) -> Result<ExecutionResult> {
        let result = self
            .execute_single_task(&session.current_task_id, session.context.clone())
            .await?;

        session.status_message = result.status_message.clone();

        match result.next_action {
            NextAction::End => {
                session.current_task_id = result.task_id;
                Ok(ExecutionResult {
                    response: result.response,
                    status: ExecutionStatus::Completed,
                })
            }
            NextAction::Continue | NextAction::ContinueAndExecute => {
                let next_task_id = self.find_next_task(&result.task_id).ok_or_else(|| {
                    GraphError::InvalidEdge(format!(
                        "task '{}' asked to continue but has no outgoing edge",
                        result.task_id
                    ))
                })?;
                debug!(from = %result.task_id, to = %next_task_id, "advancing session");
                session.current_task_id = next_task_id;

                if result.next_action == NextAction::ContinueAndExecute {
                    return Box::pin(self.execute_session(session)).await;
                }

                Ok(ExecutionResult {
                    response: result.response,
                    status: ExecutionStatus::Paused,
                })
            }
        }
    }

    /// Drive the session until a task ends the graph or one fails.
    pub async fn run_to_completion(&self, session: &mut Session) -> Result<ExecutionResult> {
        loop {
            let result = self.execute_session(session).await?;
            if matches!(result.status, ExecutionStatus::Completed) {
                info!(graph_id = %self.id, session_id = %session.id, "graph execution completed");
                return Ok(result);
            }
        }
    }

    /// Execute a single task without following Continue actions
    async fn execute_single_task(&self, task_id: &str, context: Context) -> Result<TaskResult> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| GraphError::TaskNotFound(task_id.to_string()))?;

        debug!(graph_id = %self.id, task_id = %task_id, "running task");
        let mut result = task.run(context).await?;

        // Set the task_id in the result to track which task generated it
        result.task_id = task_id.to_string();

        Ok(result)
    }

    /// Find the task reached by the outgoing edge of `current_task_id`
    pub fn find_next_task(&self, current_task_id: &str) -> Option<String> {
        self.edges
            .iter()
            .find(|edge| edge.from == current_task_id)
            .map(|edge| edge.to.clone())
    }

    /// Get the start task ID
    pub fn start_task_id(&self) -> Option<String> {
        self.start_task_id.clone()
    }

    /// Get a task by ID
    pub fn get_task(&self, task_id: &str) -> Option<Arc<dyn Task>> {
        self.tasks.get(task_id).cloned()
    }

    /// Render the topology as a Mermaid flowchart.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");
        let _ = writeln!(out, "    __start__([START])");
        let _ = writeln!(out, "    __end__([END])");

        for task_id in &self.order {
            let _ = writeln!(out, "    {}[\"{}\"]", node_id(task_id), short_name(task_id));
            if let Some(task) = self.tasks.get(task_id) {
                for branch in task.branch_ids() {
                    let _ = writeln!(out, "    {}[\"{}\"]", node_id(&branch), short_name(&branch));
                }
            }
        }

        if let Some(start) = &self.start_task_id {
            let _ = writeln!(out, "    __start__ --> {}", node_id(start));
        }

        for task_id in &self.order {
            let successor = self
                .find_next_task(task_id)
                .map(|next| node_id(&next))
                .unwrap_or_else(|| "__end__".to_string());
            let branches = self
                .tasks
                .get(task_id)
                .map(|task| task.branch_ids())
                .unwrap_or_default();

            if branches.is_empty() {
                let _ = writeln!(out, "    {} --> {}", node_id(task_id), successor);
                continue;
            }
            for branch in &branches {
                let _ = writeln!(out, "    {} --> {}", node_id(task_id), node_id(branch));
                let _ = writeln!(out, "    {} --> {}", node_id(branch), successor);
            }
        }

        out
    }
}

fn short_name(task_id: &str) -> &str {
    task_id.rsplit("::").next().unwrap_or(task_id)
}

fn node_id(task_id: &str) -> String {
    short_name(task_id)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Builder for creating graphs
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            graph: Graph::new(id),
        }
    }

    pub fn add_task(mut self, task: Arc<dyn Task>) -> Self {
        self.graph.add_task(task);
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.graph.add_edge(from, to);
        self
    }

    pub fn set_start_task(mut self, task_id: impl Into<String>) -> Self {
        self.graph.start_task_id = Some(task_id.into());
        self
    }

    /// Finish the graph, rejecting topologies that could not run to an end.
    pub fn build(self) -> Result<Graph> {
        self.graph.validate()?;
        Ok(self.graph)
    }
}

/// Status of graph execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub response: Option<String>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Advanced by one task; call again to continue
    Paused,
    /// A task ended the graph
    Completed,
}
