use crate::domain::model::{DependencySpec, ItemStatus, OsFamily};
use crate::domain::ports::CommandRunner;
use crate::utils::error::{InstallError, Result};
use futures::future::join_all;

/// 安裝失敗時的處理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Abort,
    BestEffort,
}

pub struct DependencyManager<'a> {
    runner: &'a dyn CommandRunner,
    os: OsFamily,
}

impl<'a> DependencyManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner, os: OsFamily) -> Self {
        Self { runner, os }
    }

    /// 同時執行所有檢查指令並標記 `installed`
    pub async fn check(&self, catalog: &mut [DependencySpec]) -> Vec<ItemStatus> {
        let checks = catalog.iter().map(|spec| async move {
            match spec.check_command(self.os) {
                // 此平台沒有定義檢查指令，代表不需要這個套件
                None => true,
                Some(command) => match self.runner.run(command).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::debug!("dependency {} missing: {}", spec.name, e);
                        false
                    }
                },
            }
        });
        let results = join_all(checks).await;

        catalog
            .iter_mut()
            .zip(results)
            .map(|(spec, installed)| {
                spec.installed = installed;
                if installed {
                    ItemStatus::ok(&spec.name)
                } else {
                    ItemStatus::failed(&spec.name, "will be installed")
                }
            })
            .collect()
    }

    pub fn missing(catalog: &[DependencySpec]) -> impl Iterator<Item = &DependencySpec> {
        catalog.iter().filter(|spec| !spec.installed)
    }

    /// 安裝單一缺少的依賴，成功後標記為已安裝
    pub async fn install_one(&self, spec: &mut DependencySpec) -> Result<()> {
        let command = spec.install_command(self.os).ok_or_else(|| {
            InstallError::DependencyInstallFailure {
                name: spec.name.clone(),
                message: format!("no install command for {}", self.os),
            }
        })?;

        self.runner
            .run(command)
            .await
            .map_err(|e| InstallError::DependencyInstallFailure {
                name: spec.name.clone(),
                message: e.to_string(),
            })?;

        spec.installed = true;
        Ok(())
    }

    /// 依目錄順序安裝缺少的套件
    pub async fn install_missing(
        &self,
        catalog: &mut [DependencySpec],
        mode: FailureMode,
    ) -> Result<Vec<ItemStatus>> {
        let mut statuses = Vec::new();
        for spec in catalog.iter_mut().filter(|spec| !spec.installed) {
            match self.install_one(spec).await {
                Ok(()) => statuses.push(ItemStatus::ok(&spec.name)),
                Err(e) if mode == FailureMode::BestEffort => {
                    tracing::warn!("⚠️ {}", e);
                    statuses.push(ItemStatus::failed(&spec.name, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    /// 在 `ok` 集合中的指令成功，其餘失敗
    struct FakeRunner {
        ok: Mutex<HashSet<String>>,
        log: Mutex<Vec<String>>,
        installs_succeed: bool,
    }

    impl FakeRunner {
        fn new(ok: &[&str], installs_succeed: bool) -> Self {
            Self {
                ok: Mutex::new(ok.iter().map(|s| s.to_string()).collect()),
                log: Mutex::new(Vec::new()),
                installs_succeed,
            }
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, command: &str) -> Result<String> {
            self.log.lock().unwrap().push(command.to_string());
            if command.starts_with("install ") && self.installs_succeed {
                return Ok(String::new());
            }
            if self.ok.lock().unwrap().contains(command) {
                Ok(String::new())
            } else {
                Err(InstallError::CommandFailed {
                    command: command.to_string(),
                    message: "not found".to_string(),
                })
            }
        }
    }

    fn spec(name: &str) -> DependencySpec {
        DependencySpec {
            name: name.to_string(),
            check: BTreeMap::from([("linux".to_string(), format!("check {}", name))]),
            install: BTreeMap::from([("linux".to_string(), format!("install {}", name))]),
            installed: false,
        }
    }

    #[tokio::test]
    async fn test_check_marks_installed() {
        let runner = FakeRunner::new(&["check zip"], true);
        let mut catalog = vec![spec("zip"), spec("unzip")];

        let statuses = DependencyManager::new(&runner, OsFamily::Linux)
            .check(&mut catalog)
            .await;

        assert!(catalog[0].installed);
        assert!(!catalog[1].installed);
        assert!(statuses[0].is_ok());
        assert!(!statuses[1].is_ok());
    }

    #[tokio::test]
    async fn test_install_in_catalog_order() {
        let runner = FakeRunner::new(&["check unzip"], true);
        let mut catalog = vec![spec("zip"), spec("unzip"), spec("rsync")];
        let manager = DependencyManager::new(&runner, OsFamily::Linux);

        manager.check(&mut catalog).await;
        manager
            .install_missing(&mut catalog, FailureMode::Abort)
            .await
            .unwrap();

        assert!(catalog.iter().all(|spec| spec.installed));
        let installs: Vec<String> = runner
            .log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with("install"))
            .cloned()
            .collect();
        assert_eq!(installs, vec!["install zip", "install rsync"]);
    }

    #[tokio::test]
    async fn test_install_failure_aborts() {
        let runner = FakeRunner::new(&[], false);
        let mut catalog = vec![spec("zip"), spec("unzip")];
        let manager = DependencyManager::new(&runner, OsFamily::Linux);

        manager.check(&mut catalog).await;
        let err = manager
            .install_missing(&mut catalog, FailureMode::Abort)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InstallError::DependencyInstallFailure { ref name, .. } if name == "zip"
        ));
        // 第一個失敗就停止
        assert!(!runner.log.lock().unwrap().contains(&"install unzip".to_string()));
    }

    #[tokio::test]
    async fn test_best_effort_reports_and_continues() {
        let runner = FakeRunner::new(&[], false);
        let mut catalog = vec![spec("zip"), spec("unzip")];
        let manager = DependencyManager::new(&runner, OsFamily::Linux);

        manager.check(&mut catalog).await;
        let statuses = manager
            .install_missing(&mut catalog, FailureMode::BestEffort)
            .await
            .unwrap();

        assert_eq!(statuses.len(), 2);
        assert!(statuses.iter().all(|s| !s.is_ok()));
        assert_eq!(DependencyManager::missing(&catalog).count(), 2);
    }

    #[tokio::test]
    async fn test_platform_without_commands_counts_as_installed() {
        let runner = FakeRunner::new(&[], false);
        let mut catalog = vec![spec("zip")];

        DependencyManager::new(&runner, OsFamily::Windows)
            .check(&mut catalog)
            .await;

        assert!(catalog[0].installed);
        assert!(runner.log.lock().unwrap().is_empty());
    }
}
