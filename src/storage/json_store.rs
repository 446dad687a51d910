use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::engine::error::{EngineError, Result};
use crate::engine::types::{Run, WorkflowDefinition};
use crate::storage::Storage;

/// File-based JSON store. Workflows and runs each get a directory with one
/// JSON file per entity, named by id.
pub struct JsonStore {
    workflows_dir: PathBuf,
    runs_dir: PathBuf,
    lock: RwLock<()>,
}

impl JsonStore {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let base = base_dir.as_ref();
        Self {
            workflows_dir: base.join("workflows"),
            runs_dir: base.join("runs"),
            lock: RwLock::new(()),
        }
    }

    fn entity_path(dir: &Path, id: &str) -> PathBuf {
        dir.join(format!("{}.json", id))
    }

    async fn read_entity<T: DeserializeOwned>(dir: &Path, id: &str) -> Option<Result<T>> {
        let path = Self::entity_path(dir, id);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(_) => return None,
        };
        Some(serde_json::from_str(&data).map_err(EngineError::from))
    }

    /// Write through a temp file and rename, so a crash mid-write never
    /// leaves a truncated entity behind.
    async fn write_entity<T: Serialize>(dir: &Path, id: &str, entity: &T) -> Result<()> {
        tokio::fs::create_dir_all(dir).await?;

        let path = Self::entity_path(dir, id);
        let tmp_path = path.with_extension("json.tmp");

        let data = serde_json::to_string_pretty(entity)?;
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        Ok(())
    }

    async fn list_entities<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entities = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json")
                && let Ok(data) = tokio::fs::read_to_string(&path).await
                && let Ok(entity) = serde_json::from_str::<T>(&data)
            {
                entities.push(entity);
            }
        }

        Ok(entities)
    }
}

#[async_trait]
impl Storage for JsonStore {
    async fn create_workflow(&self, workflow: &WorkflowDefinition) -> Result<WorkflowDefinition> {
        let _lock = self.lock.write().await;
        if Self::entity_path(&self.workflows_dir, &workflow.id).exists() {
            return Err(EngineError::AlreadyExists {
                kind: "workflow",
                id: workflow.id.clone(),
            });
        }
        Self::write_entity(&self.workflows_dir, &workflow.id, workflow).await?;
        Ok(workflow.clone())
    }

    async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowDefinition> {
        let _lock = self.lock.read().await;
        Self::read_entity(&self.workflows_dir, workflow_id)
            .await
            .unwrap_or_else(|| Err(EngineError::workflow_not_found(workflow_id)))
    }

    async fn update_workflow(&self, workflow: &WorkflowDefinition) -> Result<WorkflowDefinition> {
        let _lock = self.lock.write().await;
        if !Self::entity_path(&self.workflows_dir, &workflow.id).exists() {
            return Err(EngineError::workflow_not_found(&workflow.id));
        }
        Self::write_entity(&self.workflows_dir, &workflow.id, workflow).await?;
        Ok(workflow.clone())
    }

    async fn delete_workflow(&self, workflow_id: &str) -> Result<bool> {
        let _lock = self.lock.write().await;
        let path = Self::entity_path(&self.workflows_dir, workflow_id);
        if !path.exists() {
            return Ok(false);
        }
        tokio::fs::remove_file(&path).await?;
        Ok(true)
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>> {
        let _lock = self.lock.read().await;
        let mut workflows: Vec<WorkflowDefinition> =
            Self::list_entities(&self.workflows_dir).await?;
        workflows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(workflows)
    }

    async fn create_run(&self, run: &Run) -> Result<()> {
        let _lock = self.lock.write().await;
        if Self::entity_path(&self.runs_dir, &run.id).exists() {
            return Err(EngineError::AlreadyExists {
                kind: "run",
                id: run.id.clone(),
            });
        }
        Self::write_entity(&self.runs_dir, &run.id, run).await
    }

    async fn get_run(&self, run_id: &str) -> Result<Run> {
        let _lock = self.lock.read().await;
        Self::read_entity(&self.runs_dir, run_id)
            .await
            .unwrap_or_else(|| Err(EngineError::run_not_found(run_id)))
    }

    async fn update_run(&self, run: &Run) -> Result<()> {
        let _lock = self.lock.write().await;
        Self::write_entity(&self.runs_dir, &run.id, run).await
    }

    async fn list_runs(&self, workflow_id: Option<&str>) -> Result<Vec<Run>> {
        let _lock = self.lock.read().await;
        let mut runs: Vec<Run> = Self::list_entities(&self.runs_dir).await?;

        if let Some(workflow_id) = workflow_id {
            runs.retain(|r| r.workflow_id == workflow_id);
        }

        // Newest first
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(runs)
    }
}
