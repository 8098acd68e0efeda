use crate::domain::ports::ProcessInspector;
use sysinfo::System;

/// 以 sysinfo 掃描行程表，比對名稱、執行檔路徑與命令列
#[derive(Debug, Clone, Default)]
pub struct SysinfoInspector;

impl ProcessInspector for SysinfoInspector {
    fn is_running(&self, pattern: &str) -> bool {
        let system = System::new_all();
        let current = sysinfo::get_current_pid().ok();

        system.processes().iter().any(|(pid, process)| {
            if Some(*pid) == current {
                return false;
            }
            if process.name().to_string_lossy().contains(pattern) {
                return true;
            }
            if process
                .exe()
                .is_some_and(|exe| exe.to_string_lossy().contains(pattern))
            {
                return true;
            }
            process
                .cmd()
                .iter()
                .any(|arg| arg.to_string_lossy().contains(pattern))
        })
    }
}

/// 非 loopback 的 IPv4 介面位址，用於摘要中的網頁介面連結
pub fn external_ipv4_addresses() -> Vec<std::net::Ipv4Addr> {
    let networks = sysinfo::Networks::new_with_refreshed_list();
    let mut addrs: Vec<std::net::Ipv4Addr> = networks
        .iter()
        .flat_map(|(_, data)| data.ip_networks().iter().map(|net| net.addr))
        .filter_map(|addr| match addr {
            std::net::IpAddr::V4(ip) if !ip.is_loopback() => Some(ip),
            _ => None,
        })
        .collect();
    addrs.sort();
    addrs.dedup();
    addrs
}
