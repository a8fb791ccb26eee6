//! # routed_agent
//!
//! Run a coding agent against models served through a hosted routing
//! service (OpenRouter by default), selected by preset nickname.
//!
//! ## Architecture
//!
//! ```text
//!  nickname ──► presets ──► dispatch ──► Llm ──► Agent (+ tools) ──► Conversation::run
//!                              ▲
//!  env / .env ──► Config ──────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use routed_agent::{dispatch::{self, RunOptions}, Config};
//!
//! let config = Config::from_env()?;
//! let options = RunOptions::task("Create a hello world script");
//! let conversation = dispatch::run_qwen_agent(&config, options).await?;
//! println!("{}", conversation.final_response().unwrap_or_default());
//! ```

pub mod agent;
pub mod config;
pub mod dispatch;
pub mod llm;
pub mod logging;
pub mod presets;
pub mod smoke;
pub mod tools;

pub use config::{Config, ConfigError};
pub use presets::{ModelPreset, MODELS};
