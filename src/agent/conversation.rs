//! Conversation: an agent bound to a workspace, driven to completion.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::prompt::build_system_prompt;
use super::Agent;
use crate::llm::{ChatMessage, Role, TokenUsage, ToolCall};
use crate::tools::truncate_output;

pub const DEFAULT_MAX_ITERATIONS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UserMessage,
    ToolCall,
    ToolResult,
    Response,
}

/// One entry in the conversation's execution log.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub content: String,
}

/// A single task-oriented exchange between a user and an [`Agent`].
#[derive(Debug)]
pub struct Conversation {
    id: Uuid,
    agent: Agent,
    workspace: PathBuf,
    max_iterations: usize,
    messages: Vec<ChatMessage>,
    events: Vec<ConversationEvent>,
    awaiting_run: bool,
    final_response: Option<String>,
    usage: TokenUsage,
}

impl Conversation {
    pub fn new(agent: Agent, workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        let system_prompt = build_system_prompt(&workspace.to_string_lossy(), agent.tools());

        Self {
            id: Uuid::new_v4(),
            agent,
            workspace,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            messages: vec![ChatMessage::new(Role::System, system_prompt)],
            events: Vec::new(),
            awaiting_run: false,
            final_response: None,
            usage: TokenUsage::new(0, 0),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn events(&self) -> &[ConversationEvent] {
        &self.events
    }

    /// The agent's last plain-text answer, once `run` has completed.
    pub fn final_response(&self) -> Option<&str> {
        self.final_response.as_deref()
    }

    /// Tokens consumed across all completions in this conversation.
    pub fn usage(&self) -> &TokenUsage {
        &self.usage
    }

    /// Queue a user message for the next `run`.
    pub fn send_message(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.record(EventKind::UserMessage, text.clone());
        self.messages.push(ChatMessage::new(Role::User, text));
        self.awaiting_run = true;
    }

    /// Drive the agent until it answers without calling a tool.
    ///
    /// Tool failures are reported back to the model rather than returned.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        if !self.awaiting_run {
            return Err(anyhow::anyhow!("No pending user message; call send_message first"));
        }

        let tool_schemas = self.agent.tools().get_tool_schemas();
        let tools = (!tool_schemas.is_empty()).then_some(tool_schemas.as_slice());

        for iteration in 0..self.max_iterations {
            tracing::debug!(conversation = %self.id, "Agent iteration {}", iteration + 1);

            let response = self.agent.llm().complete(&self.messages, tools).await?;

            if let Some(usage) = &response.usage {
                self.usage = TokenUsage::new(
                    self.usage.prompt_tokens + usage.prompt_tokens,
                    self.usage.completion_tokens + usage.completion_tokens,
                );
            }

            if let Some(tool_calls) = response.tool_calls.filter(|calls| !calls.is_empty()) {
                self.messages.push(ChatMessage::assistant_tool_calls(
                    response.content,
                    tool_calls.clone(),
                ));

                for tool_call in &tool_calls {
                    self.record(
                        EventKind::ToolCall,
                        format!(
                            "Calling tool: {} with args: {}",
                            tool_call.function.name, tool_call.function.arguments
                        ),
                    );

                    let result_str = match self.execute_tool_call(tool_call).await {
                        Ok(output) => output,
                        Err(e) => {
                            tracing::warn!("Tool {} failed: {}", tool_call.function.name, e);
                            format!("Error: {}", e)
                        }
                    };

                    let mut logged = result_str.clone();
                    truncate_output(&mut logged, 1000);
                    self.record(EventKind::ToolResult, logged);
                    self.messages
                        .push(ChatMessage::tool_result(tool_call.id.clone(), result_str));
                }

                continue;
            }

            let content = response
                .content
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("LLM returned empty response"))?;

            let mut logged = content.clone();
            truncate_output(&mut logged, 2000);
            self.record(EventKind::Response, logged);
            self.messages
                .push(ChatMessage::new(Role::Assistant, content.clone()));
            self.final_response = Some(content);
            self.awaiting_run = false;

            tracing::info!(
                conversation = %self.id,
                iterations = iteration + 1,
                prompt_tokens = self.usage.prompt_tokens,
                completion_tokens = self.usage.completion_tokens,
                "Conversation finished"
            );
            return Ok(());
        }

        Err(anyhow::anyhow!(
            "Max iterations ({}) reached without completion",
            self.max_iterations
        ))
    }

    /// Execute a single tool call.
    async fn execute_tool_call(&self, tool_call: &ToolCall) -> anyhow::Result<String> {
        let raw = tool_call.function.arguments.trim();
        let args: serde_json::Value = if raw.is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("Invalid JSON arguments: {}", e))?
        };

        self.agent
            .tools()
            .execute(&tool_call.function.name, args, &self.workspace)
            .await
    }

    fn record(&mut self, kind: EventKind, content: String) {
        self.events.push(ConversationEvent {
            timestamp: Utc::now(),
            kind,
            content,
        });
    }
}
