use crate::domain::ports::HostResolver;
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, Ipv4Addr};

/// 只回傳 IPv4 位址；部分環境的 IPv6 路由是壞的
#[derive(Debug, Clone, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve_ipv4(&self, host: &str) -> io::Result<Ipv4Addr> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        addrs
            .filter_map(|addr| match addr.ip() {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no IPv4 address for {}", host),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolves_localhost_to_ipv4() {
        let ip = SystemResolver.resolve_ipv4("localhost").await.unwrap();
        assert!(ip.is_loopback());
    }

    #[tokio::test]
    async fn test_invalid_host_fails() {
        assert!(SystemResolver
            .resolve_ipv4("no-such-host.invalid")
            .await
            .is_err());
    }
}
