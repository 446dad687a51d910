pub mod builtin;
pub mod interpolate;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::error::{ConnectorExecutionError, EngineError, Result};
use crate::engine::types::{ConnectorOutput, Context};

/// Trait that all connectors must implement.
///
/// A connector is a stateless unit of work bound to one step type. It receives
/// the step's configuration (already validated against `config_schema`) and
/// read access to the run's accumulated context, and may return new context
/// keys to be merged for downstream steps. The only failure channel is
/// `ConnectorExecutionError`.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Step type identifier (e.g., "delay", "webhook").
    fn step_type(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema the step's raw config is validated against before execution.
    fn config_schema(&self) -> serde_json::Value;

    /// Execute against the run's current context.
    async fn execute(
        &self,
        config: &serde_json::Value,
        ctx: &Context,
    ) -> std::result::Result<ConnectorOutput, ConnectorExecutionError>;
}

/// A registered connector paired with its compiled config-schema validator.
pub struct RegisteredConnector {
    pub connector: Arc<dyn Connector>,
    validator: jsonschema::Validator,
}

impl RegisteredConnector {
    /// Validate a step's raw config against the connector's schema.
    pub fn validate_config(&self, config: &serde_json::Value) -> std::result::Result<(), String> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(config)
            .map(|e| format!("{} at {}", e, e.instance_path()))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}

/// Registry mapping step type → (connector, config-schema validator).
///
/// Built once at startup and passed to the engine explicitly, so multiple
/// engine instances do not interfere.
pub struct ConnectorRegistry {
    entries: HashMap<String, RegisteredConnector>,
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Create a registry with all built-in connectors registered.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::new();
        builtin::register_all(&mut registry)?;
        Ok(registry)
    }

    /// Register a connector. Errors if the connector's config schema is not
    /// itself valid JSON Schema.
    pub fn register(&mut self, connector: Arc<dyn Connector>) -> Result<()> {
        let schema = connector.config_schema();
        let validator =
            jsonschema::validator_for(&schema).map_err(|e| EngineError::InvalidConnectorSchema {
                step_type: connector.step_type().to_string(),
                message: e.to_string(),
            })?;
        self.entries.insert(
            connector.step_type().to_string(),
            RegisteredConnector {
                connector,
                validator,
            },
        );
        Ok(())
    }

    /// Look up a connector by step type.
    pub fn get(&self, step_type: &str) -> Option<&RegisteredConnector> {
        self.entries.get(step_type)
    }

    /// Validate a step's config and execute its connector.
    ///
    /// Maps the three dispatch failures onto the engine taxonomy: unknown
    /// step type, invalid config, connector execution error.
    pub async fn dispatch(
        &self,
        step_id: &str,
        step_type: &str,
        config: &serde_json::Value,
        ctx: &Context,
    ) -> Result<ConnectorOutput> {
        let entry = self
            .get(step_type)
            .ok_or_else(|| EngineError::UnknownStepType(step_type.to_string()))?;

        entry
            .validate_config(config)
            .map_err(|message| EngineError::InvalidStepConfig {
                step_id: step_id.to_string(),
                message,
            })?;

        let output = entry.connector.execute(config, ctx).await?;
        Ok(output)
    }

    /// List all registered step types with descriptions.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .entries
            .values()
            .map(|e| (e.connector.step_type(), e.connector.description()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }
}
