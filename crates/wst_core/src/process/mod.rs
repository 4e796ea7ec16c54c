//! External process invocation.
//!
//! - `command`: command lines, pipe stages and per-item plans
//! - `tool`: the one-time "required program" precondition check
//! - `invoker`: runs a plan for one work item and records the outcome
//! - `outcome`: the `(item, status)` record handed to the collector

mod command;
mod invoker;
mod outcome;
mod tool;

pub use command::{CommandLine, Plan, Stage};
pub use invoker::{InvokeOptions, Invoker, PlanError, Planner, ProcessInvoker};
pub use outcome::{Outcome, Status};
pub use tool::{require_tool, require_tool_in, require_tools, ToolError, ToolResult};

pub(crate) use invoker::exit_code;
