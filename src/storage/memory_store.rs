use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::error::{EngineError, Result};
use crate::engine::types::{Run, WorkflowDefinition};
use crate::storage::Storage;

/// In-memory store. Holds state only for the lifetime of the instance;
/// useful for tests and for embedding the engine without persistence.
pub struct MemoryStore {
    workflows: Mutex<HashMap<String, WorkflowDefinition>>,
    runs: Mutex<HashMap<String, Run>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            workflows: Mutex::new(HashMap::new()),
            runs: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn create_workflow(&self, workflow: &WorkflowDefinition) -> Result<WorkflowDefinition> {
        let mut workflows = self.workflows.lock().unwrap();
        if workflows.contains_key(&workflow.id) {
            return Err(EngineError::AlreadyExists {
                kind: "workflow",
                id: workflow.id.clone(),
            });
        }
        workflows.insert(workflow.id.clone(), workflow.clone());
        Ok(workflow.clone())
    }

    async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowDefinition> {
        self.workflows
            .lock()
            .unwrap()
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| EngineError::workflow_not_found(workflow_id))
    }

    async fn update_workflow(&self, workflow: &WorkflowDefinition) -> Result<WorkflowDefinition> {
        let mut workflows = self.workflows.lock().unwrap();
        if !workflows.contains_key(&workflow.id) {
            return Err(EngineError::workflow_not_found(&workflow.id));
        }
        workflows.insert(workflow.id.clone(), workflow.clone());
        Ok(workflow.clone())
    }

    async fn delete_workflow(&self, workflow_id: &str) -> Result<bool> {
        Ok(self.workflows.lock().unwrap().remove(workflow_id).is_some())
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>> {
        let mut workflows: Vec<WorkflowDefinition> =
            self.workflows.lock().unwrap().values().cloned().collect();
        workflows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(workflows)
    }

    async fn create_run(&self, run: &Run) -> Result<()> {
        let mut runs = self.runs.lock().unwrap();
        if runs.contains_key(&run.id) {
            return Err(EngineError::AlreadyExists {
                kind: "run",
                id: run.id.clone(),
            });
        }
        runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> Result<Run> {
        self.runs
            .lock()
            .unwrap()
            .get(run_id)
            .cloned()
            .ok_or_else(|| EngineError::run_not_found(run_id))
    }

    async fn update_run(&self, run: &Run) -> Result<()> {
        self.runs.lock().unwrap().insert(run.id.clone(), run.clone());
        Ok(())
    }

    async fn list_runs(&self, workflow_id: Option<&str>) -> Result<Vec<Run>> {
        let runs = self.runs.lock().unwrap();
        let mut runs: Vec<Run> = runs
            .values()
            .filter(|r| workflow_id.is_none_or(|id| r.workflow_id == id))
            .cloned()
            .collect();

        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(runs)
    }
}
