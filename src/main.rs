//! hello-agent - run the Qwen3 Coder preset on the workspace.
//!
//! Set `OPENROUTER_API_KEY` (environment or `.env`). `LLM_MODEL` swaps in a
//! different routed model id.

use routed_agent::dispatch::{self, RunOptions};
use routed_agent::{logging, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env()?;

    let options = RunOptions {
        model_override: config.model_override.clone(),
        ..RunOptions::default()
    };
    dispatch::run_qwen_agent(&config, options).await?;

    Ok(())
}
