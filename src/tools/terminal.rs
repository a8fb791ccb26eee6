//! Terminal/shell command execution tool.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use super::{truncate_output, Tool};

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_OUTPUT_CHARS: usize = 10_000;

const WRAPPERS: &[&str] = &["sudo", "time", "nice", "nohup"];

fn is_root(arg: &str) -> bool {
    matches!(arg, "/" | "/*")
}

fn is_recursive_flag(flag: &str) -> bool {
    flag == "--recursive"
        || (flag.starts_with('-') && !flag.starts_with("--") && flag.contains(['r', 'R']))
}

/// Refuse commands that walk or wipe the filesystem root, or touch raw
/// devices. Paths below the root, including the workspace, are allowed.
fn validate_command(cmd: &str) -> Result<(), String> {
    let tokens: Vec<&str> = cmd.split_whitespace().collect();
    let start = tokens
        .iter()
        .position(|t| !WRAPPERS.contains(t))
        .unwrap_or(tokens.len());
    let Some((&program, args)) = tokens[start..].split_first() else {
        return Ok(());
    };

    let targets_root = args.iter().any(|a| is_root(a));
    let recursive = args.iter().any(|a| is_recursive_flag(a));

    let suggestion = match program {
        "rm" if targets_root && recursive => Some("This would destroy the entire system"),
        "find" | "du" if targets_root => Some("Use a specific directory path instead of root"),
        "ls" if targets_root && recursive => Some("Use a specific directory path instead of root"),
        "dd" if args.iter().any(|a| a.starts_with("if=/dev/")) => {
            Some("Direct disk operations are blocked")
        }
        ">" if args.first().is_some_and(|a| a.starts_with("/dev/")) => {
            Some("Writing to device files is blocked")
        }
        p if p.starts_with(">/dev/") => Some("Writing to device files is blocked"),
        _ => None,
    };

    match suggestion {
        Some(suggestion) => Err(format!(
            "Blocked dangerous command '{}'. {}",
            tokens[start..].join(" "),
            suggestion
        )),
        None => Ok(()),
    }
}

/// Run a shell command in the workspace.
pub struct Terminal;

#[async_trait]
impl Tool for Terminal {
    fn name(&self) -> &str {
        "terminal"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the workspace directory. Returns the exit code, stdout and stderr. Use for listing files, running tests, installing dependencies, compiling code, etc."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout_secs": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 60)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let command = args["command"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'command' argument"))?;
        let timeout_secs = args["timeout_secs"]
            .as_u64()
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .max(1);

        validate_command(command).map_err(|e| anyhow::anyhow!(e))?;

        tracing::info!("Executing command: {}", command);

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let output = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            Command::new(shell)
                .arg(shell_arg)
                .arg(command)
                .current_dir(workspace)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Command timed out after {} seconds", timeout_secs))?
        .map_err(|e| anyhow::anyhow!("Failed to execute command: {}", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);

        let mut result = format!("Exit code: {}\n", exit_code);

        if !stdout.is_empty() {
            result.push_str("\n--- stdout ---\n");
            result.push_str(&stdout);
        }

        if !stderr.is_empty() {
            result.push_str("\n--- stderr ---\n");
            result.push_str(&stderr);
        }

        truncate_output(&mut result, MAX_OUTPUT_CHARS);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_destructive_commands() {
        assert!(validate_command("rm -rf /").is_err());
        assert!(validate_command("rm -rf /*").is_err());
        assert!(validate_command("sudo rm -rf /*").is_err());
        assert!(validate_command("rm -r -f /").is_err());
        assert!(validate_command("find / -name x").is_err());
        assert!(validate_command("ls -laR /").is_err());
        assert!(validate_command("du -a /").is_err());
        assert!(validate_command("dd if=/dev/sda of=disk.img").is_err());
        assert!(validate_command("> /dev/sda").is_err());
    }

    #[test]
    fn allows_paths_below_root() {
        assert!(validate_command("rm -rf /tmp/ws/build").is_ok());
        assert!(validate_command("rm -rf ./build").is_ok());
        assert!(validate_command("rm /").is_ok());
        assert!(validate_command("find /tmp/ws -name '*.py'").is_ok());
        assert!(validate_command("ls -la /").is_ok());
        assert!(validate_command("du -sh /tmp/ws").is_ok());
        assert!(validate_command("echo hi > /dev/null").is_ok());
        assert!(validate_command("").is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sample.txt"), "x").unwrap();

        let out = Terminal
            .execute(json!({"command": "ls"}), dir.path())
            .await
            .unwrap();
        assert!(out.starts_with("Exit code: 0"));
        assert!(out.contains("sample.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_nonzero_exit_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let out = Terminal
            .execute(json!({"command": "echo oops >&2; exit 3"}), dir.path())
            .await
            .unwrap();
        assert!(out.starts_with("Exit code: 3"));
        assert!(out.contains("--- stderr ---\noops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn times_out() {
        let dir = tempfile::tempdir().unwrap();
        let err = Terminal
            .execute(json!({"command": "sleep 5", "timeout_secs": 1}), dir.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn missing_command_argument() {
        let err = Terminal
            .execute(json!({}), Path::new("."))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Missing 'command'"));
    }
}
