use crate::domain::model::{InstallationContext, ProbeResult};
use crate::domain::ports::LivenessProbe;
use crate::utils::error::{InstallError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortPolicy {
    /// 最多嘗試幾個連續埠號
    pub max_candidates: u16,
    pub probe_timeout_ms: u64,
}

impl Default for PortPolicy {
    fn default() -> Self {
        Self {
            max_candidates: 100,
            probe_timeout_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyPolicy {
    pub attempts: u32,
    pub interval_ms: u64,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval_ms: 2000,
        }
    }
}

pub struct PortNegotiator<'a> {
    probe: &'a dyn LivenessProbe,
    policy: PortPolicy,
}

impl<'a> PortNegotiator<'a> {
    pub fn new(probe: &'a dyn LivenessProbe, policy: PortPolicy) -> Self {
        Self { probe, policy }
    }

    /// 從 `preferred` 開始找第一個沒有回應的埠
    pub async fn find_free(&self, preferred: u16) -> Result<u16> {
        let last = preferred.saturating_add(self.policy.max_candidates.saturating_sub(1));

        for candidate in preferred..=last {
            let outcome = self.probe.probe(candidate).await;
            if outcome.is_connected() {
                tracing::debug!("🔌 port {} is occupied ({:?})", candidate, outcome);
                continue;
            }
            tracing::info!("🔌 port {} is free", candidate);
            return Ok(candidate);
        }

        Err(InstallError::PortNegotiationFailure {
            first: preferred,
            last,
        })
    }

    /// 協商並凍結 context 中的埠號
    pub async fn negotiate(&self, ctx: &InstallationContext) -> Result<u16> {
        let port = self.find_free(ctx.preferred_port).await?;
        ctx.assign_port(port)?;
        Ok(port)
    }
}

/// 輪詢 `/admin/` 直到回 200 或次數用完
pub async fn poll_until_alive(
    probe: &dyn LivenessProbe,
    port: u16,
    policy: &VerifyPolicy,
) -> ProbeResult {
    let mut attempts = 0;
    while attempts < policy.attempts {
        attempts += 1;
        if probe.probe(port).await.is_ok() {
            return ProbeResult {
                alive: true,
                attempts,
            };
        }
        if attempts < policy.attempts {
            tokio::time::sleep(Duration::from_millis(policy.interval_ms)).await;
        }
    }
    ProbeResult {
        alive: false,
        attempts,
    }
}
