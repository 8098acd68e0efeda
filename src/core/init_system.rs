use crate::domain::model::{InitSystemKind, OsFamily};
use std::path::{Path, PathBuf};

/// 控制程式名稱與對應的 init system，順序即優先權
pub const INIT_BINARIES: [(&str, InitSystemKind); 8] = [
    ("systemctl", InitSystemKind::Systemd),
    ("update-rc.d", InitSystemKind::Upstart),
    ("chkconfig", InitSystemKind::SystemV),
    ("rc-update", InitSystemKind::OpenRC),
    ("launchctl", InitSystemKind::Launchd),
    ("sysrc", InitSystemKind::Rcd),
    ("rcctl", InitSystemKind::RcdOpenBSD),
    ("svcadm", InitSystemKind::SMF),
];

const CGROUP_MARKERS: [&str; 3] = ["docker", "kubepods", "containerd"];

/// 偵測所需的主機資訊，測試可自行建構
#[derive(Debug, Clone)]
pub struct HostEnvironment {
    pub os: OsFamily,
    pub search_path: Vec<PathBuf>,
    pub container_markers: Vec<PathBuf>,
    pub cgroup_file: PathBuf,
}

impl HostEnvironment {
    pub fn current() -> Self {
        let search_path = std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();

        Self {
            os: OsFamily::current(),
            search_path,
            container_markers: vec![PathBuf::from("/.dockerenv")],
            cgroup_file: PathBuf::from("/proc/self/cgroup"),
        }
    }

    fn in_container(&self) -> bool {
        if self.container_markers.iter().any(|marker| marker.exists()) {
            return true;
        }
        std::fs::read_to_string(&self.cgroup_file)
            .map(|content| CGROUP_MARKERS.iter().any(|marker| content.contains(marker)))
            .unwrap_or(false)
    }

    fn has_binary(&self, name: &str) -> bool {
        self.search_path
            .iter()
            .any(|dir| is_regular_entry(&dir.join(name)))
    }
}

fn is_regular_entry(path: &Path) -> bool {
    path.metadata().map(|meta| !meta.is_dir()).unwrap_or(false)
}

pub struct InitSystemDetector {
    env: HostEnvironment,
}

impl InitSystemDetector {
    pub fn new(env: HostEnvironment) -> Self {
        Self { env }
    }

    pub fn detect(&self) -> InitSystemKind {
        if self.env.os == OsFamily::Windows {
            return InitSystemKind::WindowsService;
        }

        if self.env.in_container() {
            return InitSystemKind::Docker;
        }

        INIT_BINARIES
            .iter()
            .find(|(binary, _)| self.env.has_binary(binary))
            .map(|(_, kind)| *kind)
            .unwrap_or(InitSystemKind::Unsupported)
    }
}
