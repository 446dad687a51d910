pub mod error;
pub mod types;

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::connectors::ConnectorRegistry;
use crate::engine::error::Result;
use crate::engine::types::{Context, Run, WorkflowDefinition};
use crate::storage::Storage;

/// The workflow execution engine.
///
/// Owns the run state machine: a triggered run is driven by its own tokio
/// task from the workflow's entry step to a terminal status, with every
/// transition written through storage before the next step begins. Cheap to
/// clone; clones share the registry and storage.
#[derive(Clone)]
pub struct WorkflowEngine {
    registry: Arc<ConnectorRegistry>,
    storage: Arc<dyn Storage>,
}

impl WorkflowEngine {
    pub fn new(registry: Arc<ConnectorRegistry>, storage: Arc<dyn Storage>) -> Self {
        Self { registry, storage }
    }

    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    /// Trigger a new run of a workflow.
    ///
    /// Resolves the definition (`NotFound` propagates to the caller and no
    /// run is created), persists a pending run seeded with the supplied
    /// context, and schedules its execution on an independent task. Returns
    /// the pending run immediately without waiting for any step.
    pub async fn trigger(&self, workflow_id: &str, context: Context) -> Result<Run> {
        let workflow = self.storage.get_workflow(workflow_id).await?;

        let run = Run::new(workflow_id, &workflow.entry_point, context);
        self.storage.create_run(&run).await?;

        info!(run_id = %run.id, workflow = %workflow_id, "Run triggered");

        let engine = self.clone();
        let run_id = run.id.clone();
        tokio::spawn(async move {
            engine.execute_run(&run_id).await;
        });

        Ok(run)
    }

    /// Fetch a run by id.
    pub async fn get_run(&self, run_id: &str) -> Result<Run> {
        self.storage.get_run(run_id).await
    }

    /// List runs, optionally filtered by owning workflow.
    pub async fn list_runs(&self, workflow_id: Option<&str>) -> Result<Vec<Run>> {
        self.storage.list_runs(workflow_id).await
    }

    // --- Workflow CRUD pass-through ---

    /// Validate and persist a new workflow definition.
    pub async fn create_workflow(&self, workflow: &WorkflowDefinition) -> Result<WorkflowDefinition> {
        workflow.validate()?;
        self.storage.create_workflow(workflow).await
    }

    /// Validate and replace an existing workflow definition.
    pub async fn update_workflow(&self, workflow: &WorkflowDefinition) -> Result<WorkflowDefinition> {
        workflow.validate()?;
        self.storage.update_workflow(workflow).await
    }

    pub async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowDefinition> {
        self.storage.get_workflow(workflow_id).await
    }

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>> {
        self.storage.list_workflows().await
    }

    pub async fn delete_workflow(&self, workflow_id: &str) -> Result<bool> {
        self.storage.delete_workflow(workflow_id).await
    }

    /// Entry point of the spawned execution task. Any internal error is
    /// recorded on the run so a scheduled run can never vanish silently.
    async fn execute_run(&self, run_id: &str) {
        info!(run_id = %run_id, "Starting background execution");

        if let Err(e) = self.drive(run_id).await {
            error!(run_id = %run_id, error = %e, "Run execution aborted");

            match self.storage.get_run(run_id).await {
                Ok(mut run) if !run.status.is_terminal() => {
                    run.fail(&e.to_string());
                    if let Err(update_err) = self.storage.update_run(&run).await {
                        error!(
                            run_id = %run_id,
                            error = %update_err,
                            "Failed to record run failure"
                        );
                    }
                }
                Ok(_) => {}
                Err(fetch_err) => {
                    error!(
                        run_id = %run_id,
                        error = %fetch_err,
                        "Failed to load run while recording failure"
                    );
                }
            }
        }
    }

    /// Drive the run state machine until a terminal status.
    ///
    /// Steps execute strictly sequentially along the `next_step_id` chain.
    /// Dispatch failures (unknown step type, invalid config, connector
    /// error) and dangling step references fail the run; errors returned
    /// from here are storage-level and handled by `execute_run`.
    async fn drive(&self, run_id: &str) -> Result<()> {
        let mut run = self.storage.get_run(run_id).await?;
        let workflow = self.storage.get_workflow(&run.workflow_id).await?;

        run.begin();
        self.storage.update_run(&run).await?;

        while let Some(step_id) = run.current_step_id.clone() {
            let Some(step) = workflow.step(&step_id) else {
                run.fail(&format!(
                    "step '{}' not found in workflow '{}'",
                    step_id, workflow.id
                ));
                self.storage.update_run(&run).await?;
                return Ok(());
            };

            run.start_step(&step_id);
            self.storage.update_run(&run).await?;

            info!(
                run_id = %run.id,
                step = %step_id,
                step_type = %step.step_type,
                "Executing step"
            );

            match self
                .registry
                .dispatch(&step.id, &step.step_type, &step.config, &run.context)
                .await
            {
                Ok(output) => {
                    run.complete_step(output);
                    run.current_step_id = step.next_step_id.clone();
                    if run.current_step_id.is_none() {
                        run.complete();
                        info!(run_id = %run.id, "Run completed");
                    }
                    self.storage.update_run(&run).await?;
                }
                Err(e) => {
                    warn!(run_id = %run.id, step = %step_id, error = %e, "Step failed");
                    run.fail_step(&e.to_string());
                    self.storage.update_run(&run).await?;
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}
