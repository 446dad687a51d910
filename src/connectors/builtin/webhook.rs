use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::connectors::Connector;
use crate::connectors::interpolate::{interpolate_ctx, interpolate_json_value};
use crate::engine::error::ConnectorExecutionError;
use crate::engine::types::{ConnectorOutput, Context};

/// Performs a single outbound HTTP call. Header and body strings support
/// `${ctx.key}` interpolation against the run context. Any transport error
/// or non-success status fails the step.
pub struct WebhookConnector;

#[async_trait]
impl Connector for WebhookConnector {
    fn step_type(&self) -> &str {
        "webhook"
    }

    fn description(&self) -> &str {
        "Call an HTTP endpoint with a payload derived from context"
    }

    fn config_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "minLength": 1 },
                "method": {
                    "type": "string",
                    "enum": ["GET", "POST", "PUT", "PATCH", "DELETE"]
                },
                "headers": {
                    "type": "object",
                    "additionalProperties": { "type": "string" }
                },
                "body": {},
                "timeout": { "type": "number", "exclusiveMinimum": 0 }
            },
            "required": ["url"],
            "additionalProperties": false
        })
    }

    async fn execute(
        &self,
        config: &serde_json::Value,
        ctx: &Context,
    ) -> Result<ConnectorOutput, ConnectorExecutionError> {
        let url = config
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConnectorExecutionError::new("webhook requires 'url'"))?;
        let url = interpolate_ctx(url, ctx);

        let method = config
            .get("method")
            .and_then(|v| v.as_str())
            .unwrap_or("POST");

        let timeout_s = config
            .get("timeout")
            .and_then(|v| v.as_f64())
            .unwrap_or(30.0);
        let timeout = Duration::try_from_secs_f64(timeout_s).map_err(|e| {
            ConnectorExecutionError::new(format!("invalid timeout of {} seconds: {}", timeout_s, e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectorExecutionError::new(format!("http client error: {}", e)))?;

        let mut request = match method {
            "GET" => client.get(&url),
            "POST" => client.post(&url),
            "PUT" => client.put(&url),
            "PATCH" => client.patch(&url),
            "DELETE" => client.delete(&url),
            other => {
                return Err(ConnectorExecutionError::new(format!(
                    "unsupported HTTP method: {}",
                    other
                )));
            }
        };

        if let Some(headers) = config.get("headers").and_then(|v| v.as_object()) {
            let mut header_map = HeaderMap::new();
            for (k, v) in headers {
                if let Some(val) = v.as_str() {
                    let val = interpolate_ctx(val, ctx);
                    let name = HeaderName::from_bytes(k.as_bytes()).map_err(|e| {
                        ConnectorExecutionError::new(format!("invalid header '{}': {}", k, e))
                    })?;
                    let value = HeaderValue::from_str(&val).map_err(|e| {
                        ConnectorExecutionError::new(format!("invalid header '{}': {}", k, e))
                    })?;
                    header_map.insert(name, value);
                }
            }
            request = request.headers(header_map);
        }

        if let Some(body) = config.get("body") {
            request = request.json(&interpolate_json_value(body, ctx));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConnectorExecutionError::new(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorExecutionError::new(format!(
                "webhook {} returned {}",
                url, status
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ConnectorExecutionError::new(format!("failed to read response: {}", e)))?;

        // Parse JSON bodies; fall back to the raw text otherwise.
        let body = serde_json::from_str::<serde_json::Value>(&text)
            .unwrap_or(serde_json::Value::String(text));

        let mut output = ConnectorOutput::new();
        output.insert(
            "response".to_string(),
            serde_json::json!({
                "status": status.as_u16(),
                "body": body,
            }),
        );
        Ok(output)
    }
}
