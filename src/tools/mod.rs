//! Tool system for the agent.
//!
//! Tools run against the conversation's workspace directory. An agent carries
//! an ordered [`ToolRegistry`]; its schemas are offered to the LLM and calls are
//! dispatched back by name.

mod file_editor;
mod task_tracker;
mod terminal;

pub use file_editor::FileEditor;
pub use task_tracker::{TaskItem, TaskStatus, TaskTracker};
pub use terminal::Terminal;

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{FunctionDefinition, ToolDefinition};

/// A tool the agent can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the LLM uses to call this tool.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    /// Run the tool with parsed JSON arguments.
    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String>;
}

/// The built-in tools a preset can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Terminal,
    FileEditor,
    TaskTracker,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Terminal => "terminal",
            ToolKind::FileEditor => "file_editor",
            ToolKind::TaskTracker => "task_tracker",
        }
    }

    fn build(&self) -> Arc<dyn Tool> {
        match self {
            ToolKind::Terminal => Arc::new(Terminal),
            ToolKind::FileEditor => Arc::new(FileEditor::new()),
            ToolKind::TaskTracker => Arc::new(TaskTracker::new()),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name and description of a registered tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Ordered collection of tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding fresh instances of `kinds`, in order.
    pub fn from_kinds(kinds: &[ToolKind]) -> Self {
        let mut registry = Self::new();
        for kind in kinds {
            registry.register(kind.build());
        }
        registry
    }

    /// Add a tool, replacing any existing tool with the same name in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if let Some(slot) = self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            *slot = tool;
        } else {
            self.tools.push(tool);
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Function-calling schemas for the LLM.
    pub fn get_tool_schemas(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.parameters_schema(),
                },
            })
            .collect()
    }

    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        workspace: &Path,
    ) -> anyhow::Result<String> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;

        tool.execute(args, workspace).await
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Resolve a path - if absolute, use as-is; if relative, join with the workspace.
///
/// `.` components are dropped, so `a.txt` and `./a.txt` resolve to the same path.
pub(crate) fn resolve_path(path_str: &str, workspace: &Path) -> PathBuf {
    let path = Path::new(path_str);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    };
    let normalized: PathBuf = joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Truncate to at most `max_len` bytes on a char boundary.
pub(crate) fn truncate_output(s: &mut String, max_len: usize) {
    if s.len() <= max_len {
        return;
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
    s.push_str("\n... [output truncated]");
}
