//! Task list the agent keeps for itself while working.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::Tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "todo"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
}

fn default_status() -> TaskStatus {
    TaskStatus::Todo
}

/// In-memory task list with `view` and `plan` commands.
pub struct TaskTracker {
    tasks: Mutex<Vec<TaskItem>>,
}

impl TaskTracker {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub async fn tasks(&self) -> Vec<TaskItem> {
        self.tasks.lock().await.clone()
    }
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn render(tasks: &[TaskItem]) -> String {
    if tasks.is_empty() {
        return "No tasks in the list. Use the `plan` command to add some.".to_string();
    }

    let done = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
    let mut out = format!("Task list ({}/{} done):\n", done, tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        let mark = match task.status {
            TaskStatus::Todo => "[ ]",
            TaskStatus::InProgress => "[~]",
            TaskStatus::Done => "[x]",
        };
        out.push_str(&format!("{}. {} {}", i + 1, mark, task.title));
        if !task.notes.is_empty() {
            out.push_str(&format!(" ({})", task.notes));
        }
        out.push('\n');
    }
    out
}

#[async_trait]
impl Tool for TaskTracker {
    fn name(&self) -> &str {
        "task_tracker"
    }

    fn description(&self) -> &str {
        "Track progress on multi-step work. `view` shows the current task list; `plan` replaces it with task_list (each item has a title, optional notes and a status of todo, in_progress or done)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "enum": ["view", "plan"]
                },
                "task_list": {
                    "type": "array",
                    "description": "Full replacement task list (plan only)",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string"},
                            "notes": {"type": "string"},
                            "status": {"type": "string", "enum": ["todo", "in_progress", "done"]}
                        },
                        "required": ["title"]
                    }
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value, _workspace: &Path) -> anyhow::Result<String> {
        let command = args["command"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'command' argument"))?;

        match command {
            "view" => Ok(render(&self.tasks.lock().await)),
            "plan" => {
                let list = args
                    .get("task_list")
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("Missing 'task_list' argument"))?;
                let items: Vec<TaskItem> = serde_json::from_value(list)
                    .map_err(|e| anyhow::anyhow!("Invalid task_list: {}", e))?;

                let mut tasks = self.tasks.lock().await;
                *tasks = items;
                Ok(format!("Task list updated with {} items.\n{}", tasks.len(), render(&tasks)))
            }
            other => Err(anyhow::anyhow!("Unknown task_tracker command: {}", other)),
        }
    }
}
