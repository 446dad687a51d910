use async_trait::async_trait;

use crate::connectors::Connector;
use crate::connectors::interpolate::interpolate_ctx;
use crate::engine::error::ConnectorExecutionError;
use crate::engine::types::{ConnectorOutput, Context};

pub struct LogConnector;

#[async_trait]
impl Connector for LogConnector {
    fn step_type(&self) -> &str {
        "log"
    }

    fn description(&self) -> &str {
        "Write a message to the run log"
    }

    fn config_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": { "type": "string" },
                "level": {
                    "type": "string",
                    "enum": ["debug", "info", "warn", "error"]
                }
            },
            "required": ["message"],
            "additionalProperties": false
        })
    }

    async fn execute(
        &self,
        config: &serde_json::Value,
        ctx: &Context,
    ) -> Result<ConnectorOutput, ConnectorExecutionError> {
        let message = config.get("message").and_then(|v| v.as_str()).unwrap_or("");
        let level = config
            .get("level")
            .and_then(|v| v.as_str())
            .unwrap_or("info");

        let rendered = interpolate_ctx(message, ctx);

        match level {
            "debug" => tracing::debug!("{}", rendered),
            "warn" => tracing::warn!("{}", rendered),
            "error" => tracing::error!("{}", rendered),
            _ => tracing::info!("{}", rendered),
        }

        let mut output = ConnectorOutput::new();
        output.insert(
            "log_message".to_string(),
            serde_json::Value::String(rendered),
        );
        Ok(output)
    }
}
