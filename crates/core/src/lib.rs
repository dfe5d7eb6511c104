//! Core logic including tool-call extraction, the tool loop, tool
//! execution, etc.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod extract;
mod model_client;
pub mod prompt;
pub mod tool;
mod tool_loop;

pub use model_client::ModelClient;
pub use tool_loop::{LoopError, LoopRun, ToolLoop, ToolLoopBuilder};
