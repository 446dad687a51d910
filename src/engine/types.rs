use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::engine::error::EngineError;

/// Shared context threaded through a run's steps — a JSON-compatible key-value store.
pub type Context = HashMap<String, serde_json::Value>;

/// Output returned by a connector execution, merged into the run context.
pub type ConnectorOutput = HashMap<String, serde_json::Value>;

/// Status of a workflow run.
///
/// `Paused` is reserved for future use; the state machine never produces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Paused,
}

impl RunStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Paused => write!(f, "paused"),
        }
    }
}

/// Status of an individual step within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Execution record for a single step within a run. One record is opened the
/// moment the engine enters a step and finalized before advancing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<ConnectorOutput>,
}

impl StepRecord {
    pub fn new(step_id: &str) -> Self {
        Self {
            step_id: step_id.to_string(),
            status: StepStatus::Pending,
            started_at: None,
            ended_at: None,
            error: None,
            output: None,
        }
    }
}

/// Definition of a single step in a workflow. Immutable once saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Unique within the owning workflow.
    pub id: String,
    /// Discriminator selecting a registered connector.
    #[serde(rename = "type")]
    pub step_type: String,
    /// Connector-specific configuration, validated against the connector's schema.
    #[serde(default)]
    pub config: serde_json::Value,
    /// Next step in the chain; `None` marks a dead end.
    #[serde(default)]
    pub next_step_id: Option<String>,
}

/// Immutable template describing a chain of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Id of the first step to execute.
    pub entry_point: String,
    pub steps: Vec<StepDefinition>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Look up a step by id.
    pub fn step(&self, step_id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Structural validation: step ids are unique, and `entry_point` plus
    /// every `next_step_id` resolve to a step in this definition.
    pub fn validate(&self) -> Result<(), EngineError> {
        // Workflow ids end up as storage filenames; keep them path-safe.
        if self.id.is_empty() || self.id.contains(['/', '\\']) || self.id.contains("..") {
            return Err(EngineError::InvalidDefinition(format!(
                "workflow id '{}' must be a non-empty, path-safe identifier",
                self.id
            )));
        }

        if self.steps.is_empty() {
            return Err(EngineError::InvalidDefinition(format!(
                "workflow '{}' has no steps",
                self.id
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.id.as_str()) {
                return Err(EngineError::InvalidDefinition(format!(
                    "duplicate step id '{}'",
                    step.id
                )));
            }
        }

        if self.step(&self.entry_point).is_none() {
            return Err(EngineError::InvalidDefinition(format!(
                "entry_point '{}' is not a step in workflow '{}'",
                self.entry_point, self.id
            )));
        }

        for step in &self.steps {
            if let Some(ref next) = step.next_step_id
                && self.step(next).is_none()
            {
                return Err(EngineError::InvalidDefinition(format!(
                    "next_step_id '{}' in step '{}' is not a step in workflow '{}'",
                    next, step.id, self.id
                )));
            }
        }

        Ok(())
    }
}

/// One live or completed execution of a workflow definition.
///
/// Mutated exclusively by the engine's execution loop; every transition is
/// written through storage before the next step begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub workflow_id: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub context: Context,
    /// Append-only, one record per step actually entered, in entry order.
    pub steps: Vec<StepRecord>,
    /// Id of the current or next step; `None` once terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Run {
    /// Create a pending run positioned at the workflow's entry step.
    pub fn new(workflow_id: &str, entry_point: &str, context: Context) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.to_string(),
            status: RunStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            context,
            steps: Vec::new(),
            current_step_id: Some(entry_point.to_string()),
            error: None,
        }
    }

    /// pending → running, on first entry into execution.
    pub fn begin(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Open a record for a step the engine is about to execute.
    pub fn start_step(&mut self, step_id: &str) {
        let mut record = StepRecord::new(step_id);
        record.status = StepStatus::Running;
        record.started_at = Some(Utc::now());
        self.steps.push(record);
    }

    /// Finalize the open record as completed and merge its output into the
    /// context. Keys from later steps overwrite same-named earlier keys.
    pub fn complete_step(&mut self, output: ConnectorOutput) {
        for (k, v) in &output {
            self.context.insert(k.clone(), v.clone());
        }
        if let Some(record) = self.steps.last_mut() {
            record.status = StepStatus::Completed;
            record.ended_at = Some(Utc::now());
            record.output = if output.is_empty() { None } else { Some(output) };
        }
    }

    /// Finalize the open record as failed and move the run to its failure
    /// terminal state.
    pub fn fail_step(&mut self, error: &str) {
        let step_id = self
            .steps
            .last()
            .map(|r| r.step_id.clone())
            .unwrap_or_default();
        if let Some(record) = self.steps.last_mut() {
            record.status = StepStatus::Failed;
            record.ended_at = Some(Utc::now());
            record.error = Some(error.to_string());
        }
        self.fail(&format!("step '{}' failed: {}", step_id, error));
    }

    /// running → failed, without touching step records. Used when the failure
    /// happens outside any step (e.g., a dangling step reference).
    pub fn fail(&mut self, error: &str) {
        self.status = RunStatus::Failed;
        self.error = Some(error.to_string());
        self.completed_at = Some(Utc::now());
        self.current_step_id = None;
    }

    /// running → completed, the one success-terminal transition.
    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.current_step_id = None;
    }

    /// Look up the execution record for a step, if it was entered.
    pub fn step_record(&self, step_id: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|r| r.step_id == step_id)
    }
}
