use crate::utils::error::{InstallError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    Macos,
    Windows,
    Freebsd,
    Openbsd,
    Other,
}

impl OsFamily {
    pub fn current() -> Self {
        Self::from_target(std::env::consts::OS)
    }

    pub fn from_target(os: &str) -> Self {
        match os {
            "linux" | "android" => Self::Linux,
            "macos" => Self::Macos,
            "windows" => Self::Windows,
            "freebsd" => Self::Freebsd,
            "openbsd" => Self::Openbsd,
            _ => Self::Other,
        }
    }

    /// 依賴目錄中各平台指令所使用的鍵
    pub fn key(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
            Self::Freebsd => "freebsd",
            Self::Openbsd => "openbsd",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: OsFamily,
    pub arch: String,
    /// 受限/嵌入式目標，需要在 runtime 設定中寫出工具路徑
    pub embedded: bool,
}

impl Platform {
    pub fn current(embedded: bool) -> Self {
        Self {
            os: OsFamily::current(),
            arch: std::env::consts::ARCH.to_string(),
            embedded,
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == OsFamily::Windows
    }

    pub fn identifier(&self) -> String {
        format!("{}/{}", self.os, self.arch)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencySpec {
    pub name: String,
    #[serde(default)]
    pub check: BTreeMap<String, String>,
    #[serde(default)]
    pub install: BTreeMap<String, String>,
    #[serde(skip)]
    pub installed: bool,
}

impl DependencySpec {
    pub fn check_command(&self, os: OsFamily) -> Option<&str> {
        self.check.get(os.key()).map(String::as_str)
    }

    pub fn install_command(&self, os: OsFamily) -> Option<&str> {
        self.install.get(os.key()).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub url: String,
    pub tag: String,
}

/// 輔助套件 (plugin / agent) 的部署項目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxPackage {
    pub name: String,
    pub id: String,
    /// 遠端 repository 名稱
    pub repository: String,
}

#[derive(Debug)]
pub struct InstallationContext {
    pub variant: String,
    pub lang: String,
    pub service_name: String,
    pub project_name: String,
    pub install_path: PathBuf,
    pub data_path: PathBuf,
    pub home_dir: PathBuf,
    pub preferred_port: u16,
    pub platform: Platform,
    port: OnceLock<u16>,
}

impl InstallationContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        variant: impl Into<String>,
        lang: impl Into<String>,
        service_name: impl Into<String>,
        project_name: impl Into<String>,
        install_path: impl Into<PathBuf>,
        data_path: impl Into<PathBuf>,
        preferred_port: u16,
        platform: Platform,
    ) -> Self {
        Self {
            variant: variant.into(),
            lang: lang.into(),
            service_name: service_name.into(),
            project_name: project_name.into(),
            install_path: install_path.into(),
            data_path: data_path.into(),
            home_dir: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root")),
            preferred_port,
            platform,
            port: OnceLock::new(),
        }
    }

    pub fn with_home_dir(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = home_dir.into();
        self
    }

    /// 協商完成的埠號；尚未協商前讀取視為程式錯誤
    pub fn port(&self) -> Result<u16> {
        self.port
            .get()
            .copied()
            .ok_or_else(|| InstallError::ConfigError {
                message: "port has not been negotiated yet".to_string(),
            })
    }

    pub fn negotiated_port(&self) -> Option<u16> {
        self.port.get().copied()
    }

    /// 固定協商出的埠號，只由埠號協商呼叫
    pub(crate) fn assign_port(&self, port: u16) -> Result<()> {
        self.port.set(port).map_err(|_| InstallError::ConfigError {
            message: format!(
                "port already fixed at {}, refusing to reassign {}",
                self.port.get().copied().unwrap_or_default(),
                port
            ),
        })
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.install_path.join("temp")
    }

    pub fn node_binary(&self) -> PathBuf {
        if self.platform.is_windows() {
            self.install_path.join("node").join("node.exe")
        } else {
            self.install_path.join("node").join("bin").join("node")
        }
    }

    pub fn npm_binary(&self) -> PathBuf {
        if self.platform.is_windows() {
            self.install_path.join("node").join("npm.cmd")
        } else {
            self.install_path.join("node").join("bin").join("npm")
        }
    }

    /// 服務的進入點腳本
    pub fn app_entry(&self) -> PathBuf {
        self.install_path.join("backend").join("app.js")
    }

    pub fn admin_url(&self, host: &str) -> Result<String> {
        Ok(format!("http://{}:{}/admin", host, self.port()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitSystemKind {
    Systemd,
    Upstart,
    SystemV,
    OpenRC,
    Launchd,
    Rcd,
    RcdOpenBSD,
    SMF,
    WindowsService,
    Docker,
    Unsupported,
}

impl InitSystemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Systemd => "systemd",
            Self::Upstart => "upstart",
            Self::SystemV => "systemv",
            Self::OpenRC => "openrc",
            Self::Launchd => "launchd",
            Self::Rcd => "rcd",
            Self::RcdOpenBSD => "rcd-openbsd",
            Self::SMF => "smf",
            Self::WindowsService => "windows",
            Self::Docker => "docker",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for InitSystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub destination: PathBuf,
    pub commands: Vec<String>,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub alive: bool,
    pub attempts: u32,
}

/// 單次探測的結果：任何 HTTP 回應都算連上
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Connected { status: u16 },
    NotConnected,
}

impl ProbeOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Connected { status: 200 })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    Ok,
    Skipped,
    Failed(String),
}

/// 最終摘要中的一列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStatus {
    pub name: String,
    pub state: ItemState,
}

impl ItemStatus {
    pub fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ItemState::Ok,
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ItemState::Failed(message.into()),
        }
    }

    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ItemState::Skipped,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.state == ItemState::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> InstallationContext {
        InstallationContext::new(
            "ih-v5",
            "ru",
            "ih-v5",
            "demo",
            "/opt/ih-v5",
            "/var/lib/ih-v5",
            8088,
            Platform::current(false),
        )
    }

    #[test]
    fn test_port_is_frozen_after_assignment() {
        let ctx = context();
        assert!(ctx.port().is_err());
        assert_eq!(ctx.negotiated_port(), None);

        ctx.assign_port(8090).unwrap();
        assert_eq!(ctx.port().unwrap(), 8090);
        assert!(ctx.assign_port(8091).is_err());
        assert_eq!(ctx.port().unwrap(), 8090);
    }

    #[test]
    fn test_dependency_commands_by_platform() {
        let spec = DependencySpec {
            name: "zip".into(),
            check: BTreeMap::from([("linux".to_string(), "zip -L".to_string())]),
            install: BTreeMap::new(),
            installed: false,
        };
        assert_eq!(spec.check_command(OsFamily::Linux), Some("zip -L"));
        assert_eq!(spec.check_command(OsFamily::Windows), None);
        assert_eq!(spec.install_command(OsFamily::Linux), None);
    }

    #[test]
    fn test_os_family_from_target() {
        assert_eq!(OsFamily::from_target("linux"), OsFamily::Linux);
        assert_eq!(OsFamily::from_target("macos"), OsFamily::Macos);
        assert_eq!(OsFamily::from_target("solaris"), OsFamily::Other);
    }
}
