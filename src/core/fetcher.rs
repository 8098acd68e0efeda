use crate::domain::ports::HostResolver;
use crate::utils::error::{InstallError, Result};
use reqwest::{header::LOCATION, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::{Host, Url};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    pub max_redirects: usize,
    pub dns_attempts: u32,
    pub dns_backoff_step_ms: u64,
    pub user_agent: String,
    pub connect_timeout_seconds: Option<u64>,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            dns_attempts: 5,
            dns_backoff_step_ms: 1500,
            user_agent: "Mozilla/5.0".to_string(),
            connect_timeout_seconds: None,
        }
    }
}

impl FetchPolicy {
    /// 第 i 次 DNS 失敗後的等待時間 (1-based)
    pub fn dns_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.dns_backoff_step_ms * u64::from(attempt))
    }
}

/// HTTP(S) 下載：手動追蹤轉址、DNS 失敗退避重試、強制 IPv4
pub struct ArtifactFetcher {
    resolver: Arc<dyn HostResolver>,
    policy: FetchPolicy,
}

impl ArtifactFetcher {
    pub fn new(resolver: Arc<dyn HostResolver>, policy: FetchPolicy) -> Self {
        Self { resolver, policy }
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut current = Url::parse(url)?;

        for hop in 0..=self.policy.max_redirects {
            let response = self.get_once(&current).await?;
            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| {
                        InstallError::download(current.as_str(), "redirect without Location header")
                    })?;
                let next = current.join(location)?;
                tracing::debug!("↪️ redirect {} ({}) -> {}", hop + 1, status, next);
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(InstallError::download(
                    current.as_str(),
                    format!("unexpected status {}", status),
                ));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| InstallError::download(current.as_str(), e.to_string()))?;
            tracing::debug!("⬇️ {} bytes from {}", bytes.len(), current);
            return Ok(bytes.to_vec());
        }

        Err(InstallError::download(
            url,
            format!("more than {} redirects", self.policy.max_redirects),
        ))
    }

    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// 下載到檔案，必要時建立上層目錄
    pub async fn download_to(&self, url: &str, destination: &Path) -> Result<u64> {
        let bytes = self.fetch_bytes(url).await?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, &bytes).await?;
        Ok(bytes.len() as u64)
    }

    /// 解析主機的 IPv4 位址，只有 DNS 失敗會重試
    pub async fn resolve_host(&self, host: &str) -> Result<Ipv4Addr> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.resolver.resolve_ipv4(host).await {
                Ok(ip) => return Ok(ip),
                Err(e) if attempt < self.policy.dns_attempts => {
                    let delay = self.policy.dns_delay(attempt);
                    tracing::warn!(
                        "🔁 DNS lookup for {} failed (attempt {}/{}): {}; retrying in {:?}",
                        host,
                        attempt,
                        self.policy.dns_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(InstallError::download(
                        host,
                        format!("DNS resolution failed after {} attempts: {}", attempt, e),
                    ))
                }
            }
        }
    }

    async fn get_once(&self, url: &Url) -> Result<reqwest::Response> {
        let mut builder = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(self.policy.user_agent.as_str())
            .local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        if let Some(secs) = self.policy.connect_timeout_seconds {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        // IP 直連不需解析；網域名稱先解析成 IPv4 再釘在 client 上
        if let Some(Host::Domain(domain)) = url.host() {
            let ip = self.resolve_host(domain).await?;
            builder = builder.resolve(domain, SocketAddr::new(IpAddr::V4(ip), 0));
        }

        let client = builder.build()?;
        client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| InstallError::download(url.as_str(), e.to_string()))
    }
}
