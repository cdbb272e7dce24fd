//! Small task-graph engine: tasks share a [`Context`], edges decide what runs
//! next, and [`FanOutTask`] runs independent branches in parallel before a join.

pub mod context;
pub mod error;
pub mod fanout;
pub mod graph;
pub mod session;
pub mod task;

// Re-export commonly used types
pub use context::Context;
pub use error::{GraphError, Result};
pub use fanout::{FanOutTask, JoinHook};
pub use graph::{Edge, ExecutionResult, ExecutionStatus, Graph, GraphBuilder};
pub use session::Session;
pub use task::{NextAction, Task, TaskResult};
