//! openrouter-ping - check that credentials and routing work.
//!
//! Sends one short prompt to `LLM_MODEL` (default `openrouter/qwen/qwen3-coder`)
//! and prints the reply, the model that answered, and token counts.

use routed_agent::{logging, smoke, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env()?;
    println!("Testing routing API with model: {}", smoke::ping_model(&config));

    let report = smoke::ping(&config).await?;

    println!("Response: {}", report.reply);
    println!(
        "Model used: {}",
        report.model.as_deref().unwrap_or(&report.requested_model)
    );
    match &report.usage {
        Some(usage) => println!(
            "Tokens: {} in, {} out",
            usage.prompt_tokens, usage.completion_tokens
        ),
        None => println!("Tokens: not reported"),
    }

    Ok(())
}
