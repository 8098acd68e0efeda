use crate::domain::model::InstallationContext;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 寫到 `<install_path>/config.json` 的執行期設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub project: String,
    pub name_service: String,
    pub lang: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vardir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unzip: Option<String>,
}

fn path_string(path: PathBuf) -> Option<String> {
    Some(path.display().to_string())
}

impl RuntimeConfig {
    /// 埠號協商完成前會失敗
    pub fn from_context(ctx: &InstallationContext) -> Result<Self> {
        let mut config = Self {
            project: ctx.project_name.clone(),
            name_service: ctx.service_name.clone(),
            lang: ctx.lang.clone(),
            port: ctx.port()?,
            vardir: None,
            node: None,
            npm: None,
            zip: None,
            unzip: None,
        };

        // Windows 與嵌入式平台上沒有系統工具可用，需指明路徑
        if ctx.platform.is_windows() || ctx.platform.embedded {
            let exe = if ctx.platform.is_windows() { ".exe" } else { "" };
            let tools = ctx.install_path.join("tools");
            config.vardir = path_string(ctx.data_path.clone());
            config.node = path_string(ctx.node_binary());
            config.npm = path_string(ctx.npm_binary());
            config.zip = path_string(tools.join(format!("zip{}", exe)));
            config.unzip = path_string(tools.join(format!("unzip{}", exe)));
        }

        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn path_in(install_path: &Path) -> PathBuf {
        install_path.join("config.json")
    }

    pub async fn write(&self, install_path: &Path) -> Result<PathBuf> {
        let path = Self::path_in(install_path);
        tokio::fs::create_dir_all(install_path).await?;
        tokio::fs::write(&path, self.to_json_pretty()?).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{OsFamily, Platform};
    use tempfile::TempDir;

    fn context(os: OsFamily, embedded: bool, root: &Path) -> InstallationContext {
        InstallationContext::new(
            "ih-v5",
            "ru",
            "ih-v5",
            "demo_1",
            root.join("opt"),
            root.join("data"),
            8088,
            Platform {
                os,
                arch: "x86_64".to_string(),
                embedded,
            },
        )
    }

    #[test]
    fn test_requires_final_port() {
        let temp = TempDir::new().unwrap();
        let ctx = context(OsFamily::Linux, false, temp.path());
        assert!(RuntimeConfig::from_context(&ctx).is_err());
    }

    #[test]
    fn test_linux_config_has_only_base_keys() {
        let temp = TempDir::new().unwrap();
        let ctx = context(OsFamily::Linux, false, temp.path());
        ctx.assign_port(8090).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&RuntimeConfig::from_context(&ctx).unwrap().to_json_pretty().unwrap())
                .unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "project": "demo_1",
                "name_service": "ih-v5",
                "lang": "ru",
                "port": 8090
            })
        );
    }

    #[test]
    fn test_embedded_config_names_tools() {
        let temp = TempDir::new().unwrap();
        let ctx = context(OsFamily::Linux, true, temp.path());
        ctx.assign_port(8088).unwrap();

        let config = RuntimeConfig::from_context(&ctx).unwrap();
        assert_eq!(config.vardir, Some(temp.path().join("data").display().to_string()));
        assert!(config.node.as_deref().unwrap().ends_with("node"));
        assert!(config.unzip.as_deref().unwrap().ends_with("unzip"));
    }

    #[test]
    fn test_windows_config_uses_exe_tools() {
        let temp = TempDir::new().unwrap();
        let ctx = context(OsFamily::Windows, false, temp.path());
        ctx.assign_port(8088).unwrap();

        let config = RuntimeConfig::from_context(&ctx).unwrap();
        assert!(config.node.as_deref().unwrap().ends_with("node.exe"));
        assert!(config.zip.as_deref().unwrap().ends_with("zip.exe"));
    }

    #[tokio::test]
    async fn test_write_creates_config_json() {
        let temp = TempDir::new().unwrap();
        let ctx = context(OsFamily::Linux, false, temp.path());
        ctx.assign_port(8088).unwrap();

        let path = RuntimeConfig::from_context(&ctx)
            .unwrap()
            .write(&ctx.install_path)
            .await
            .unwrap();

        let back: RuntimeConfig =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.port, 8088);
        assert_eq!(path, temp.path().join("opt/config.json"));
    }
}
