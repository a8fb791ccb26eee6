//! gpt-oss-agent - run the GPT-OSS-120B preset on the workspace.
//!
//! Requires `OPENROUTER_API_KEY` (environment or `.env`).

use routed_agent::dispatch::{self, RunOptions};
use routed_agent::{logging, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env()?;
    dispatch::run_gpt_oss_agent(&config, RunOptions::default()).await?;

    Ok(())
}
