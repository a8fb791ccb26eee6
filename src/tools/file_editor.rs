//! File viewing and editing tool.
//!
//! Paths can be absolute or relative to the workspace. Every mutating command
//! records the previous file content so `undo_edit` can step back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use walkdir::WalkDir;

use super::{resolve_path, Tool};

const DIRECTORY_DEPTH: usize = 2;

/// View, create and edit files.
pub struct FileEditor {
    /// Previous contents per file, most recent last. `None` means the file did
    /// not exist before the edit.
    history: Mutex<HashMap<PathBuf, Vec<Option<String>>>>,
}

impl FileEditor {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(HashMap::new()),
        }
    }

    async fn remember(&self, path: &Path, previous: Option<String>) {
        self.history
            .lock()
            .await
            .entry(path.to_path_buf())
            .or_default()
            .push(previous);
    }

    async fn view(&self, path: &Path, display: &str, args: &Value) -> anyhow::Result<String> {
        if path.is_dir() {
            return Ok(list_directory(path, display));
        }
        if !path.exists() {
            return Err(anyhow::anyhow!("File not found: {}", display));
        }

        let content = tokio::fs::read_to_string(path).await?;
        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len();

        let (start, end) = match args.get("view_range").and_then(|v| v.as_array()) {
            Some(range) if range.len() == 2 => {
                let start = range[0].as_i64().unwrap_or(1).max(1) as usize;
                // -1 means through end of file
                let end = match range[1].as_i64() {
                    Some(n) if n >= 0 => (n as usize).min(total),
                    _ => total,
                };
                (start, end)
            }
            Some(_) => return Err(anyhow::anyhow!("'view_range' must be [start, end]")),
            None => (1, total),
        };

        if total > 0 && start > total {
            return Err(anyhow::anyhow!(
                "File has {} lines, requested start line {} is beyond end of file",
                total,
                start
            ));
        }
        if end < start {
            return Ok(String::new());
        }

        Ok(lines[start - 1..end]
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:6}\t{}", start + i, line))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn create(&self, path: &Path, display: &str, args: &Value) -> anyhow::Result<String> {
        let content = args["file_text"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'file_text' argument"))?;

        if path.exists() {
            return Err(anyhow::anyhow!(
                "File already exists: {}. Use str_replace or insert to modify it",
                display
            ));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        self.remember(path, None).await;

        Ok(format!("File created successfully at: {}", display))
    }

    async fn str_replace(
        &self,
        path: &Path,
        display: &str,
        args: &Value,
    ) -> anyhow::Result<String> {
        let old_str = args["old_str"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'old_str' argument"))?;
        let new_str = args["new_str"].as_str().unwrap_or("");

        if old_str.is_empty() {
            return Err(anyhow::anyhow!("'old_str' must not be empty"));
        }

        let content = read_existing(path, display).await?;
        match content.matches(old_str).count() {
            0 => Err(anyhow::anyhow!(
                "No replacement was performed: old_str did not appear in {}",
                display
            )),
            1 => {
                let updated = content.replacen(old_str, new_str, 1);
                tokio::fs::write(path, &updated).await?;
                self.remember(path, Some(content)).await;
                Ok(format!("The file {} has been edited.", display))
            }
            n => Err(anyhow::anyhow!(
                "No replacement was performed: old_str appears {} times in {}. Include more context to make it unique",
                n,
                display
            )),
        }
    }

    async fn insert(&self, path: &Path, display: &str, args: &Value) -> anyhow::Result<String> {
        let insert_line = args["insert_line"]
            .as_u64()
            .ok_or_else(|| anyhow::anyhow!("Missing 'insert_line' argument"))? as usize;
        let new_str = args["new_str"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'new_str' argument"))?;

        let content = read_existing(path, display).await?;
        let eol = if content.contains("\r\n") { "\r\n" } else { "\n" };
        let mut lines: Vec<&str> = content.lines().collect();
        if insert_line > lines.len() {
            return Err(anyhow::anyhow!(
                "insert_line {} is out of range; file has {} lines",
                insert_line,
                lines.len()
            ));
        }

        let inserted: Vec<&str> = new_str.lines().collect();
        lines.splice(insert_line..insert_line, inserted);

        let mut updated = lines.join(eol);
        if content.ends_with('\n') || content.is_empty() {
            updated.push_str(eol);
        }
        tokio::fs::write(path, &updated).await?;
        self.remember(path, Some(content)).await;

        Ok(format!("The file {} has been edited.", display))
    }

    async fn undo_edit(&self, path: &Path, display: &str) -> anyhow::Result<String> {
        let previous = self
            .history
            .lock()
            .await
            .get_mut(path)
            .and_then(|stack| stack.pop())
            .ok_or_else(|| anyhow::anyhow!("No edit history found for {}", display))?;

        match previous {
            Some(content) => {
                tokio::fs::write(path, content).await?;
                Ok(format!("Last edit to {} undone successfully.", display))
            }
            None => {
                tokio::fs::remove_file(path).await?;
                Ok(format!("Creation of {} undone; file removed.", display))
            }
        }
    }
}

impl Default for FileEditor {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_existing(path: &Path, display: &str) -> anyhow::Result<String> {
    if !path.is_file() {
        return Err(anyhow::anyhow!("File not found: {}", display));
    }
    Ok(tokio::fs::read_to_string(path).await?)
}

/// Non-hidden entries up to two levels deep.
fn list_directory(path: &Path, display: &str) -> String {
    let mut entries: Vec<String> = WalkDir::new(path)
        .min_depth(1)
        .max_depth(DIRECTORY_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.ok())
        .map(|e| {
            let rel = e.path().strip_prefix(path).unwrap_or(e.path());
            if e.file_type().is_dir() {
                format!("{}/", rel.display())
            } else {
                rel.display().to_string()
            }
        })
        .collect();

    if entries.is_empty() {
        return format!("{} is an empty directory", display);
    }

    entries.insert(
        0,
        format!("Files and directories up to {} levels deep in {}:", DIRECTORY_DEPTH, display),
    );
    entries.join("\n")
}

#[async_trait]
impl Tool for FileEditor {
    fn name(&self) -> &str {
        "file_editor"
    }

    fn description(&self) -> &str {
        "View, create and edit files. Commands: `view` shows a file with line numbers (or lists a directory), `create` writes a new file, `str_replace` replaces one exact occurrence of old_str with new_str, `insert` adds new_str after line insert_line (0 = top of file), `undo_edit` reverts the last edit to a file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "enum": ["view", "create", "str_replace", "insert", "undo_edit"],
                    "description": "The operation to perform"
                },
                "path": {
                    "type": "string",
                    "description": "File or directory path, absolute or relative to the workspace"
                },
                "file_text": {
                    "type": "string",
                    "description": "Content of the new file (create)"
                },
                "old_str": {
                    "type": "string",
                    "description": "Exact text to replace; must occur exactly once (str_replace)"
                },
                "new_str": {
                    "type": "string",
                    "description": "Replacement text (str_replace) or text to insert (insert)"
                },
                "insert_line": {
                    "type": "integer",
                    "description": "Line after which to insert; 0 inserts at the top (insert)"
                },
                "view_range": {
                    "type": "array",
                    "items": {"type": "integer"},
                    "description": "Optional [start, end] line range, 1-indexed; end -1 reads to the end (view)"
                }
            },
            "required": ["command", "path"]
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let command = args["command"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'command' argument"))?;
        let display = args["path"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'path' argument"))?;
        let path = resolve_path(display, workspace);

        tracing::debug!("file_editor {} {}", command, path.display());

        match command {
            "view" => self.view(&path, display, &args).await,
            "create" => self.create(&path, display, &args).await,
            "str_replace" => self.str_replace(&path, display, &args).await,
            "insert" => self.insert(&path, display, &args).await,
            "undo_edit" => self.undo_edit(&path, display).await,
            other => Err(anyhow::anyhow!("Unknown file_editor command: {}", other)),
        }
    }
}
