use crate::core::archive::ArchiveTool;
use crate::core::dependency::FailureMode;
use crate::core::fetcher::FetchPolicy;
use crate::core::port::{PortPolicy, VerifyPolicy};
use crate::core::service::WindowsServiceOptions;
use crate::domain::model::{AuxPackage, DependencySpec};
use crate::utils::error::{InstallError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// 安裝設定檔：遠端位置、依賴目錄、輔助套件與各種重試策略
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallProfile {
    pub release: ReleaseSources,
    pub dependencies: Vec<DependencySpec>,
    pub plugins: Vec<AuxPackage>,
    pub agents: Vec<AuxPackage>,
    pub fetch: FetchPolicy,
    pub port: PortPolicy,
    pub verify: VerifyPolicy,
    pub windows: WindowsServiceOptions,
    pub archive_tool: ArchiveTool,
    pub abort_on_dependency_failure: bool,
    pub summary: SummaryCredentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseSources {
    /// `{variant}` 會被替換
    pub metadata_url: String,
    pub asset_name: String,
    pub modules_url: String,
    /// 空字串時略過預設專案
    pub project_url: Option<String>,
    /// `{repo}` 會被替換
    pub aux_latest_url: String,
}

impl Default for ReleaseSources {
    fn default() -> Self {
        Self {
            metadata_url: "https://api.github.com/repos/intrahouseio/{variant}/releases/latest"
                .to_string(),
            asset_name: "ih-systems.zip".to_string(),
            modules_url:
                "https://github.com/intrahouseio/{variant}/releases/download/v0.0.0/node_modules.zip"
                    .to_string(),
            project_url: Some(
                "https://github.com/intrahouseio/{variant}/raw/main/projects/smarthome5.ihpack"
                    .to_string(),
            ),
            aux_latest_url: "https://api.github.com/repos/intrahouseio/{repo}/releases/latest"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryCredentials {
    pub login: String,
    pub password: String,
}

impl Default for SummaryCredentials {
    fn default() -> Self {
        Self {
            login: "admin".to_string(),
            password: "202020".to_string(),
        }
    }
}

fn apt_dependency(name: &str, check: &str) -> DependencySpec {
    DependencySpec {
        name: name.to_string(),
        check: BTreeMap::from([("linux".to_string(), check.to_string())]),
        install: BTreeMap::from([(
            "linux".to_string(),
            format!("sudo apt-get install -y {}", name),
        )]),
        installed: false,
    }
}

impl Default for InstallProfile {
    fn default() -> Self {
        Self {
            release: ReleaseSources::default(),
            dependencies: vec![
                apt_dependency("zip", "zip -L"),
                apt_dependency("unzip", "unzip"),
                apt_dependency("rsync", "rsync --version"),
            ],
            plugins: vec![AuxPackage {
                name: "emulator".to_string(),
                id: "emuls".to_string(),
                repository: "intraHouse.plugin-Sensors-Emulator".to_string(),
            }],
            agents: vec![AuxPackage {
                name: "influxDB".to_string(),
                id: "influx".to_string(),
                repository: "ih-dbagent-influx".to_string(),
            }],
            fetch: FetchPolicy::default(),
            port: PortPolicy::default(),
            verify: VerifyPolicy::default(),
            windows: WindowsServiceOptions::default(),
            archive_tool: ArchiveTool::platform_default(),
            abort_on_dependency_failure: true,
            summary: SummaryCredentials::default(),
        }
    }
}

impl InstallProfile {
    /// 從 TOML 檔案載入
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(InstallError::MissingConfigError {
                field: "profile".to_string(),
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析；缺少的欄位使用預設值
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| InstallError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GITHUB_MIRROR})，未定義的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| InstallError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn metadata_url(&self, variant: &str) -> String {
        self.release.metadata_url.replace("{variant}", variant)
    }

    pub fn modules_url(&self, variant: &str) -> String {
        self.release.modules_url.replace("{variant}", variant)
    }

    pub fn project_url(&self, variant: &str) -> Option<String> {
        self.release
            .project_url
            .as_ref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| url.replace("{variant}", variant))
    }

    pub fn dependency_failure_mode(&self) -> FailureMode {
        if self.abort_on_dependency_failure {
            FailureMode::Abort
        } else {
            FailureMode::BestEffort
        }
    }

    fn validate_packages(field: &str, packages: &[AuxPackage]) -> Result<()> {
        for package in packages {
            validation::validate_identifier(&format!("{}.id", field), &package.id)?;
            validation::validate_non_empty_string(&format!("{}.repository", field), &package.repository)?;
        }
        Ok(())
    }
}

impl Validate for InstallProfile {
    fn validate(&self) -> Result<()> {
        validation::validate_url("release.metadata_url", &self.release.metadata_url)?;
        validation::validate_url("release.modules_url", &self.release.modules_url)?;
        validation::validate_url("release.aux_latest_url", &self.release.aux_latest_url)?;
        if let Some(project_url) = self.release.project_url.as_deref().filter(|u| !u.trim().is_empty()) {
            validation::validate_url("release.project_url", project_url)?;
        }
        validation::validate_non_empty_string("release.asset_name", &self.release.asset_name)?;

        for dependency in &self.dependencies {
            validation::validate_non_empty_string("dependencies.name", &dependency.name)?;
        }
        Self::validate_packages("plugins", &self.plugins)?;
        Self::validate_packages("agents", &self.agents)?;

        validation::validate_positive_number("fetch.dns_attempts", self.fetch.dns_attempts as usize, 1)?;
        validation::validate_range("fetch.max_redirects", self.fetch.max_redirects, 0, 50)?;
        validation::validate_positive_number("port.max_candidates", self.port.max_candidates as usize, 1)?;
        validation::validate_positive_number("verify.attempts", self.verify.attempts as usize, 1)?;
        validation::validate_non_empty_string("windows.wrapper", &self.windows.wrapper)?;

        Ok(())
    }
}
