use async_trait::async_trait;

use crate::connectors::Connector;
use crate::engine::error::ConnectorExecutionError;
use crate::engine::types::{ConnectorOutput, Context};

/// Suspends the owning run for a configured duration. Only the run's own
/// task sleeps; other runs keep progressing.
pub struct DelayConnector;

#[async_trait]
impl Connector for DelayConnector {
    fn step_type(&self) -> &str {
        "delay"
    }

    fn description(&self) -> &str {
        "Pause the run for a specified number of seconds"
    }

    fn config_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "seconds": { "type": "number", "exclusiveMinimum": 0 }
            },
            "required": ["seconds"],
            "additionalProperties": false
        })
    }

    async fn execute(
        &self,
        config: &serde_json::Value,
        _ctx: &Context,
    ) -> Result<ConnectorOutput, ConnectorExecutionError> {
        // Guaranteed present and positive by the config schema.
        let seconds = config
            .get("seconds")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| ConnectorExecutionError::new("delay requires numeric 'seconds'"))?;

        // The schema only bounds below; out-of-range values must stay on the
        // error channel instead of panicking the run's task.
        let duration = std::time::Duration::try_from_secs_f64(seconds).map_err(|e| {
            ConnectorExecutionError::new(format!("invalid delay of {} seconds: {}", seconds, e))
        })?;

        tokio::time::sleep(duration).await;

        Ok(ConnectorOutput::new())
    }
}
