use crate::domain::model::ProbeOutcome;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::net::Ipv4Addr;

/// 外部指令執行
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// 執行一條 shell 指令並回傳 stdout，非零結束碼視為錯誤
    async fn run(&self, command: &str) -> Result<String>;

    /// 依序執行，個別失敗只記錄不中斷；回傳成功的指令數
    async fn run_best_effort(&self, commands: &[String]) -> usize {
        let mut succeeded = 0;
        for command in commands {
            match self.run(command).await {
                Ok(_) => succeeded += 1,
                Err(e) => tracing::warn!("⚠️ best-effort command failed: {}", e),
            }
        }
        succeeded
    }
}

#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// 單次 `GET http://127.0.0.1:<port>/admin/`
    async fn probe(&self, port: u16) -> ProbeOutcome;
}

#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve_ipv4(&self, host: &str) -> std::io::Result<Ipv4Addr>;
}

pub trait ProcessInspector: Send + Sync {
    fn is_running(&self, pattern: &str) -> bool;
}
