pub mod json_store;
pub mod memory_store;

use async_trait::async_trait;

use crate::engine::error::Result;
use crate::engine::types::{Run, WorkflowDefinition};

/// Trait for workflow definition and run persistence.
///
/// The engine is the single writer of a given run for the duration of its
/// execution; implementations only need to keep individual reads and writes
/// from interleaving corruptly.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist a new workflow definition. Fails with `AlreadyExists` on a
    /// duplicate id.
    async fn create_workflow(&self, workflow: &WorkflowDefinition) -> Result<WorkflowDefinition>;

    /// Fetch a workflow definition by id. Fails with `NotFound` if absent.
    async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowDefinition>;

    /// Replace an existing workflow definition. Fails with `NotFound` if absent.
    async fn update_workflow(&self, workflow: &WorkflowDefinition) -> Result<WorkflowDefinition>;

    /// Delete a workflow definition. Returns `false` if nothing was deleted.
    async fn delete_workflow(&self, workflow_id: &str) -> Result<bool>;

    /// List all workflow definitions.
    async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>>;

    /// Persist a new run. Fails with `AlreadyExists` on a duplicate id.
    async fn create_run(&self, run: &Run) -> Result<()>;

    /// Fetch a run by id. Fails with `NotFound` if absent.
    async fn get_run(&self, run_id: &str) -> Result<Run>;

    /// Full-record upsert of a run. Last writer wins.
    async fn update_run(&self, run: &Run) -> Result<()>;

    /// List runs, optionally filtered by owning workflow, newest first.
    async fn list_runs(&self, workflow_id: Option<&str>) -> Result<Vec<Run>>;
}
