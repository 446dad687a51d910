pub mod api;
pub mod cli;
pub mod connectors;
pub mod engine;
pub mod storage;

pub use engine::WorkflowEngine;
