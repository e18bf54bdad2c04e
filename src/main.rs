use std::path::PathBuf;

use anyhow::{Context, Result};
use frontier_select::replay::{run_scenario, Scenario};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: select-replay <scenario.yaml>");
        std::process::exit(2);
    };

    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let mut scenario = Scenario::load(&path)
        .with_context(|| format!("failed to load scenario {}", path.display()))?;
    let preferences = scenario
        .resolve_preferences()
        .context("failed to load preferences")?;
    debug!(?preferences, "replaying with preferences");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let entries = rt
        .block_on(run_scenario(&scenario))
        .context("scenario replay failed")?;

    for entry in entries {
        println!("{}", serde_json::to_string(&entry)?);
    }
    Ok(())
}
