use crate::domain::ports::CommandRunner;
use crate::utils::error::{InstallError, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// 透過系統 shell 執行指令 (`sh -c` / `cmd /C`)
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(line: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", line]);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", line]);
            cmd
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<String> {
        tracing::debug!("$ {}", command);

        let output = Self::command(command)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| InstallError::CommandFailed {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        // sc.exe 之類的工具把錯誤寫到 stdout
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        Err(InstallError::CommandFailed {
            command: command.to_string(),
            message: if detail.is_empty() {
                output.status.to_string()
            } else {
                detail
            },
        })
    }
}
