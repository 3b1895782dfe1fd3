use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{error, info, warn};
use vandebron_green::logging::init_logging;
use vandebron_green::setup::FlowInput;
use vandebron_green::{Config, ConfigEntry, Integration, SetupFlow};

/// Stored entry, or a default one created through the setup flow
fn load_or_create_entry(integration: &Integration) -> Result<ConfigEntry> {
    if let Some(entry) = integration.store().load()? {
        return Ok(entry);
    }

    let mut input = FlowInput::new();
    input.insert("setup_mode".to_string(), Value::from("default"));
    let result = SetupFlow::new().step_user(Some(&input));
    let entry = ConfigEntry::from_flow(&result)
        .ok_or_else(|| anyhow::anyhow!("Default setup did not produce an entry"))?;
    integration.store().save(&entry)?;
    info!(
        "Created default config entry {} at {}",
        entry.entry_id,
        integration.store().path().display()
    );
    Ok(entry)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config.validate()?;
    init_logging(&config.logging)?;

    info!(
        "Vandebron green energy service {} starting up",
        env!("APP_VERSION")
    );

    let integration = Arc::new(Integration::new(config.clone()));
    let entry = load_or_create_entry(&integration)?;

    // A failed first refresh leaves the service up so setup can be retried
    if let Err(e) = integration.setup(entry).await {
        error!("Entry setup failed: {}", e);
    }

    #[cfg(feature = "web")]
    let web_task = {
        let web_integration = integration.clone();
        let host = config.web.host.clone();
        let port = config.web.port;
        tokio::spawn(async move {
            if let Err(e) = vandebron_green::web::serve(web_integration, &host, port).await {
                error!("Web server error: {}", e);
            }
        })
    };

    #[cfg(not(feature = "web"))]
    {
        if !integration.is_running().await {
            return Err(anyhow::anyhow!("No config entry is running"));
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    if let Err(e) = integration.unload().await {
        warn!("Unload failed: {}", e);
    }
    #[cfg(feature = "web")]
    web_task.abort();

    info!("Shutdown complete");
    Ok(())
}
