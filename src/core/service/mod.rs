pub mod templates;

use crate::core::port::{poll_until_alive, VerifyPolicy};
use crate::domain::model::{InitSystemKind, InstallationContext, ProbeResult, ServiceDescriptor};
use crate::domain::ports::{CommandRunner, LivenessProbe, ProcessInspector};
use crate::utils::error::{InstallError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowsServiceOptions {
    /// 相對於 `<install>/daemon` 的 winsw 執行檔
    pub wrapper: String,
    pub max_memory_mb: u32,
    pub restart_delay_seconds: u32,
}

impl Default for WindowsServiceOptions {
    fn default() -> Self {
        Self {
            wrapper: "winsw.exe".to_string(),
            max_memory_mb: 4096,
            restart_delay_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationPlan {
    /// 容器內：不註冊，請操作者手動執行
    Manual { command: String },
    Descriptor(ServiceDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub process_found: bool,
    pub http: ProbeResult,
}

impl Verification {
    pub fn is_healthy(&self) -> bool {
        self.process_found && self.http.alive
    }
}

/// 依 init system 產生服務描述檔、寫入、啟用並驗證服務
pub struct ServiceRegistrar<'a> {
    runner: &'a dyn CommandRunner,
    probe: &'a dyn LivenessProbe,
    inspector: &'a dyn ProcessInspector,
    verify_policy: VerifyPolicy,
    windows: WindowsServiceOptions,
}

impl<'a> ServiceRegistrar<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        probe: &'a dyn LivenessProbe,
        inspector: &'a dyn ProcessInspector,
        verify_policy: VerifyPolicy,
        windows: WindowsServiceOptions,
    ) -> Self {
        Self {
            runner,
            probe,
            inspector,
            verify_policy,
            windows,
        }
    }

    pub fn render(&self, kind: InitSystemKind, ctx: &InstallationContext) -> Result<RegistrationPlan> {
        let descriptor = match kind {
            InitSystemKind::Docker => {
                return Ok(RegistrationPlan::Manual {
                    command: templates::manual_command(ctx),
                })
            }
            InitSystemKind::Systemd => templates::systemd(ctx),
            InitSystemKind::Upstart => templates::upstart(ctx),
            InitSystemKind::Launchd => templates::launchd(ctx),
            InitSystemKind::WindowsService => templates::windows(ctx, &self.windows),
            InitSystemKind::SystemV
            | InitSystemKind::OpenRC
            | InitSystemKind::Rcd
            | InitSystemKind::RcdOpenBSD
            | InitSystemKind::SMF
            | InitSystemKind::Unsupported => {
                return Err(InstallError::UnsupportedInitSystem {
                    system: kind.to_string(),
                    platform: ctx.platform.identifier(),
                })
            }
        };
        Ok(RegistrationPlan::Descriptor(descriptor))
    }

    pub async fn write_descriptor(&self, descriptor: &ServiceDescriptor) -> Result<()> {
        if let Some(parent) = descriptor.destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&descriptor.destination, &descriptor.body).await?;
        tracing::info!("📝 service descriptor written to {}", descriptor.destination.display());
        Ok(())
    }

    pub async fn activate(&self, kind: InitSystemKind, descriptor: &ServiceDescriptor) -> Result<()> {
        match kind {
            InitSystemKind::WindowsService => self.activate_windows(descriptor).await,
            _ => {
                let succeeded = self.runner.run_best_effort(&descriptor.commands).await;
                if succeeded == 0 && !descriptor.commands.is_empty() {
                    return Err(InstallError::ServiceActivationFailure {
                        message: format!(
                            "none of the {} activation commands succeeded",
                            descriptor.commands.len()
                        ),
                    });
                }
                Ok(())
            }
        }
    }

    async fn activate_windows(&self, descriptor: &ServiceDescriptor) -> Result<()> {
        let Some((install, rest)) = descriptor.commands.split_first() else {
            return Ok(());
        };

        match self.runner.run(install).await {
            Ok(_) => tracing::info!("🪟 service installed"),
            Err(InstallError::CommandFailed { message, .. }) if is_already_installed(&message) => {
                tracing::info!("🪟 service already installed");
            }
            Err(e) => {
                return Err(InstallError::ServiceActivationFailure {
                    message: format!("invalid installation: {}", e),
                })
            }
        }

        // 失敗自動重啟與啟動
        self.runner.run_best_effort(rest).await;
        Ok(())
    }

    /// 寫入並啟用；`Manual` 直接視為成功
    pub async fn register(&self, kind: InitSystemKind, plan: &RegistrationPlan) -> Result<()> {
        match plan {
            RegistrationPlan::Manual { command } => {
                tracing::info!("🐳 container detected, run manually: {}", command);
                Ok(())
            }
            RegistrationPlan::Descriptor(descriptor) => {
                self.write_descriptor(descriptor).await?;
                self.activate(kind, descriptor).await
            }
        }
    }

    pub async fn process_running(&self, kind: InitSystemKind, ctx: &InstallationContext) -> bool {
        if kind == InitSystemKind::WindowsService {
            return self
                .runner
                .run(&format!("sc.exe query {}", ctx.service_name))
                .await
                .map(|out| out.contains("RUNNING"))
                .unwrap_or(false);
        }

        // 只比對進入點路徑，服務名稱也會出現在安裝程式自己的命令列
        self.inspector
            .is_running(&ctx.app_entry().display().to_string())
    }

    pub async fn check_http(&self, port: u16) -> ProbeResult {
        poll_until_alive(self.probe, port, &self.verify_policy).await
    }

    pub async fn verify(&self, kind: InitSystemKind, ctx: &InstallationContext) -> Result<Verification> {
        let process_found = self.process_running(kind, ctx).await;
        let http = self.check_http(ctx.port()?).await;
        Ok(Verification {
            process_found,
            http,
        })
    }
}

/// Windows 的 ERROR_SERVICE_EXISTS
const SERVICE_EXISTS_CODE: &str = "1073";

fn is_already_installed(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("already exists")
        || lower.contains("already installed")
        || lower
            .split(|c: char| !c.is_ascii_digit())
            .any(|code| code == SERVICE_EXISTS_CODE)
}
