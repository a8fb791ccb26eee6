//! Live tool-calling runs against the routing service.
//!
//! These need network access and `OPENROUTER_API_KEY`, so they are ignored by
//! default:
//!
//! ```text
//! cargo test --test tool_calling -- --ignored
//! cargo test --test tool_calling -- --ignored qwen
//! ```

use std::path::Path;

use routed_agent::agent::Conversation;
use routed_agent::dispatch::{self, RunOptions};
use routed_agent::llm::Provider;
use routed_agent::Config;

/// Configuration with a usable OpenRouter key, or `None` to skip.
fn live_config() -> Option<Config> {
    let config = Config::from_env().ok()?;
    match config.api_key_for(Provider::OpenRouter) {
        Ok(_) => Some(config),
        Err(e) => {
            eprintln!("skipping: {}", e);
            None
        }
    }
}

async fn run_in(key: &str, task: &str, workspace: &Path) -> Option<Conversation> {
    let config = live_config()?;
    let conversation = dispatch::run_agent(
        &config,
        key,
        RunOptions::task(task).in_workspace(workspace).quiet(),
    )
    .await
    .unwrap_or_else(|e| panic!("{} run failed: {:#}", key, e));
    Some(conversation)
}

async fn hello_py(key: &str) {
    let dir = tempfile::tempdir().unwrap();
    let Some(conversation) =
        run_in(key, "Create a hello.py file with a greeting function", dir.path()).await
    else {
        return;
    };

    let response = conversation.final_response().unwrap_or_default();
    assert!(!response.trim().is_empty(), "{}: empty response", key);
}

async fn file_creation(key: &str, greeting: &str) {
    let dir = tempfile::tempdir().unwrap();
    let task = format!(
        "Create a file called test_output.txt with the text '{}'",
        greeting
    );
    let Some(_conversation) = run_in(key, &task, dir.path()).await else {
        return;
    };

    let output_file = dir.path().join("test_output.txt");
    assert!(output_file.exists(), "Expected file not created: {}", output_file.display());

    let content = std::fs::read_to_string(&output_file).unwrap();
    assert!(content.contains("Hello"), "Unexpected content: {}", content);
}

async fn directory_listing(key: &str) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sample.txt"), "Sample content for testing").unwrap();

    let Some(_conversation) = run_in(
        key,
        "List the files in the current directory and save the list to file_list.txt",
        dir.path(),
    )
    .await
    else {
        return;
    };

    let output_file = dir.path().join("file_list.txt");
    assert!(output_file.exists(), "{}: Expected file_list.txt not created", key);
    let content = std::fs::read_to_string(&output_file).unwrap();
    assert!(!content.is_empty(), "{}: file_list.txt is empty", key);
}

#[tokio::test]
#[ignore = "requires network and OPENROUTER_API_KEY"]
async fn gpt_oss_hello_py() {
    hello_py("gpt-oss").await;
}

#[tokio::test]
#[ignore = "requires network and OPENROUTER_API_KEY"]
async fn qwen_hello_py() {
    hello_py("qwen").await;
}

#[tokio::test]
#[ignore = "requires network and OPENROUTER_API_KEY"]
async fn gpt_oss_file_creation() {
    file_creation("gpt-oss", "Hello from GPT-OSS").await;
}

#[tokio::test]
#[ignore = "requires network and OPENROUTER_API_KEY"]
async fn qwen_file_creation() {
    file_creation("qwen", "Hello from Qwen").await;
}

#[tokio::test]
#[ignore = "requires network and OPENROUTER_API_KEY"]
async fn gpt_oss_directory_listing() {
    directory_listing("gpt-oss").await;
}

#[tokio::test]
#[ignore = "requires network and OPENROUTER_API_KEY"]
async fn qwen_directory_listing() {
    directory_listing("qwen").await;
}

#[tokio::test]
#[ignore = "requires network and OPENROUTER_API_KEY"]
async fn ping_routing_api() {
    let Some(config) = live_config() else {
        return;
    };
    let report = routed_agent::smoke::ping(&config).await.unwrap();
    assert!(!report.reply.is_empty());
}
