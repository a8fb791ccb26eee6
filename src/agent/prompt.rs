//! System prompt template for the agent.

use crate::tools::ToolRegistry;

/// Build the system prompt with tool descriptions.
pub fn build_system_prompt(workspace_path: &str, tools: &ToolRegistry) -> String {
    let tool_descriptions = tools
        .list_tools()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a coding agent working in the workspace directory: {workspace_path}

Relative paths are resolved against the workspace, and shell commands run there.

## Tools

{tool_descriptions}

## Rules

1. Use tools to inspect state instead of guessing. Read a file before editing it.
2. If a command fails, read the output and fix the problem before moving on.
3. Only make changes the task asks for.
4. For multi-step work, keep the task list up to date.

When the task is complete, reply without a tool call and summarize what you did and which files you created or changed."#,
        workspace_path = workspace_path,
        tool_descriptions = tool_descriptions
    )
}
