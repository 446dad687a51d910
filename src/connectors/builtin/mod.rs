mod delay;
mod log;
mod webhook;

pub use delay::DelayConnector;
pub use log::LogConnector;
pub use webhook::WebhookConnector;

use std::sync::Arc;

use crate::connectors::ConnectorRegistry;
use crate::engine::error::Result;

/// Register all built-in connectors into the registry.
pub fn register_all(registry: &mut ConnectorRegistry) -> Result<()> {
    registry.register(Arc::new(DelayConnector))?;
    registry.register(Arc::new(WebhookConnector))?;
    registry.register(Arc::new(LogConnector))?;
    Ok(())
}
