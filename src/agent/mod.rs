//! Agent module - a model plus the tools it may call.
//!
//! The conversation follows a "tools in a loop" pattern:
//! 1. Build context with system prompt and user task
//! 2. Call LLM with available tools
//! 3. If LLM requests tool calls, execute them and feed results back
//! 4. Repeat until LLM produces a final response or max iterations reached

mod conversation;
mod prompt;

pub use conversation::{Conversation, ConversationEvent, EventKind, DEFAULT_MAX_ITERATIONS};
pub use prompt::build_system_prompt;

use crate::llm::Llm;
use crate::tools::{ToolKind, ToolRegistry};

/// An LLM together with an ordered tool list.
#[derive(Debug, Clone)]
pub struct Agent {
    llm: Llm,
    tools: ToolRegistry,
}

impl Agent {
    pub fn new(llm: Llm, tools: ToolRegistry) -> Self {
        Self { llm, tools }
    }

    /// Agent with fresh instances of the given built-in tools.
    pub fn with_tool_kinds(llm: Llm, kinds: &[ToolKind]) -> Self {
        Self::new(llm, ToolRegistry::from_kinds(kinds))
    }

    pub fn llm(&self) -> &Llm {
        &self.llm
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Tool names in the order they are offered to the model.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.names()
    }
}
