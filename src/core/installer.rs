use crate::adapters::process::external_ipv4_addresses;
use crate::adapters::{HttpLivenessProbe, ShellRunner, SysinfoInspector, SystemResolver};
use crate::config::{InstallProfile, RuntimeConfig};
use crate::core::archive::{mirror_tree, ArchiveExtractor};
use crate::core::aux_deploy::AuxRepoDeployer;
use crate::core::dependency::DependencyManager;
use crate::core::fetcher::ArtifactFetcher;
use crate::core::init_system::{HostEnvironment, InitSystemDetector};
use crate::core::port::PortNegotiator;
use crate::core::release::ReleaseResolver;
use crate::core::service::{RegistrationPlan, ServiceRegistrar, Verification};
use crate::domain::model::{
    AuxPackage, InitSystemKind, InstallationContext, ItemStatus, ReleaseAsset,
};
use crate::domain::ports::{CommandRunner, HostResolver, LivenessProbe, ProcessInspector};
use crate::utils::error::{InstallError, Result};
use crate::utils::progress::ProgressReporter;
use crate::utils::report;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 安裝流程對外的所有協作者
#[derive(Clone)]
pub struct Collaborators {
    pub runner: Arc<dyn CommandRunner>,
    pub probe: Arc<dyn LivenessProbe>,
    pub resolver: Arc<dyn HostResolver>,
    pub inspector: Arc<dyn ProcessInspector>,
    pub host: HostEnvironment,
}

impl Collaborators {
    pub fn system(profile: &InstallProfile) -> Result<Self> {
        let probe = HttpLivenessProbe::new(
            Duration::from_millis(profile.port.probe_timeout_ms),
            &profile.fetch.user_agent,
        )?;
        Ok(Self {
            runner: Arc::new(ShellRunner::new()),
            probe: Arc::new(probe),
            resolver: Arc::new(SystemResolver),
            inspector: Arc::new(SysinfoInspector),
            host: HostEnvironment::current(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct InstallSummary {
    pub release_tag: String,
    pub port: u16,
    pub init_system: InitSystemKind,
    /// 容器內需手動執行的指令
    pub manual_command: Option<String>,
    pub verification: Option<Verification>,
    pub items: Vec<ItemStatus>,
    pub web_urls: Vec<String>,
    pub login: String,
    pub password: String,
}

impl InstallSummary {
    pub fn failed_items(&self) -> impl Iterator<Item = &ItemStatus> {
        self.items.iter().filter(|item| !item.is_ok())
    }

    pub fn print(&self) {
        report::print_title("Summary");
        for item in &self.items {
            report::print_row(item);
        }
        println!();
        report::print_field("Version", &self.release_tag);
        report::print_field("Init system", self.init_system.as_str());
        report::print_field("Port", &self.port.to_string());
        if let Some(command) = &self.manual_command {
            report::print_field("Start manually", command);
        }
        report::print_field("Login", &self.login);
        report::print_field("Password", &self.password);
        report::print_field("Web interface", &self.web_urls.join(", "));
        println!();
        println!("  Complete! Thank you.");
    }
}

/// Dry run 結果：要安裝的版本與服務註冊方式
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub metadata_url: String,
    pub asset_name: String,
    pub init_system: InitSystemKind,
    pub registration: RegistrationPlan,
}

impl InstallPlan {
    pub fn print(&self, ctx: &InstallationContext) {
        report::print_title("Dry run");
        report::print_field("Variant", &ctx.variant);
        report::print_field("Service", &ctx.service_name);
        report::print_field("Project", &ctx.project_name);
        report::print_field("Install path", &ctx.install_path.display().to_string());
        report::print_field("Data path", &ctx.data_path.display().to_string());
        report::print_field("Preferred port", &ctx.preferred_port.to_string());
        report::print_field("Platform", &ctx.platform.identifier());
        report::print_field("Release", &self.metadata_url);
        report::print_field("Asset", &self.asset_name);
        report::print_field("Init system", self.init_system.as_str());

        match &self.registration {
            RegistrationPlan::Manual { command } => report::print_field("Start manually", command),
            RegistrationPlan::Descriptor(descriptor) => {
                report::print_field("Descriptor", &descriptor.destination.display().to_string());
                for command in &descriptor.commands {
                    report::print_field("Activation", command);
                }
                println!();
                println!("{}", descriptor.body);
            }
        }
    }
}

pub struct Installer {
    ctx: InstallationContext,
    profile: InstallProfile,
    deps: Collaborators,
    fetcher: ArtifactFetcher,
    progress: ProgressReporter,
    items: Mutex<Vec<ItemStatus>>,
}

impl Installer {
    pub fn new(ctx: InstallationContext, profile: InstallProfile, deps: Collaborators) -> Self {
        let fetcher = ArtifactFetcher::new(Arc::clone(&deps.resolver), profile.fetch.clone());
        Self {
            ctx,
            profile,
            deps,
            fetcher,
            progress: ProgressReporter::quiet(),
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn context(&self) -> &InstallationContext {
        &self.ctx
    }

    pub fn detect_init_system(&self) -> InitSystemKind {
        InitSystemDetector::new(self.deps.host.clone()).detect()
    }

    fn registrar(&self) -> ServiceRegistrar<'_> {
        ServiceRegistrar::new(
            self.deps.runner.as_ref(),
            self.deps.probe.as_ref(),
            self.deps.inspector.as_ref(),
            self.profile.verify.clone(),
            self.profile.windows.clone(),
        )
    }

    /// 只偵測與產生描述檔，不動到主機
    pub fn plan(&self) -> Result<InstallPlan> {
        let init_system = self.detect_init_system();
        let registration = self.registrar().render(init_system, &self.ctx)?;
        Ok(InstallPlan {
            metadata_url: self.profile.metadata_url(&self.ctx.variant),
            asset_name: self.profile.release.asset_name.clone(),
            init_system,
            registration,
        })
    }

    pub async fn run(&self) -> Result<InstallSummary> {
        tracing::info!(
            "🚀 installing {} into {} ({})",
            self.ctx.variant,
            self.ctx.install_path.display(),
            self.ctx.platform.identifier()
        );

        self.cleanup().await;
        self.install_dependencies().await?;
        let release = self.install_core().await?;
        self.deploy_aux("Install plugins", "plugins", &self.profile.plugins)
            .await?;
        self.deploy_aux("Install agents", "agents", &self.profile.agents)
            .await?;
        let port = self.configure().await?;
        let (init_system, registration, verification) = self.register_service().await?;

        let manual_command = match registration {
            RegistrationPlan::Manual { command } => Some(command),
            RegistrationPlan::Descriptor(_) => None,
        };
        let web_urls = external_ipv4_addresses()
            .into_iter()
            .map(|ip| self.ctx.admin_url(&ip.to_string()))
            .collect::<Result<Vec<_>>>()?;

        Ok(InstallSummary {
            release_tag: release.tag,
            port,
            init_system,
            manual_command,
            verification,
            items: self.items(),
            web_urls,
            login: self.profile.summary.login.clone(),
            password: self.profile.summary.password.clone(),
        })
    }

    pub fn items(&self) -> Vec<ItemStatus> {
        self.items.lock().map(|items| items.clone()).unwrap_or_default()
    }

    fn record(&self, status: ItemStatus) {
        self.progress.finish(&status);
        if let Ok(mut items) = self.items.lock() {
            items.push(status);
        }
    }

    /// 失敗即中止整個安裝
    async fn mandatory<T>(&self, title: &str, step: impl Future<Output = Result<T>>) -> Result<T> {
        self.progress.start(title);
        match step.await {
            Ok(value) => {
                self.record(ItemStatus::ok(title));
                Ok(value)
            }
            Err(e) => {
                tracing::error!("❌ {} failed: {}", title, e);
                self.record(ItemStatus::failed(title, e.to_string()));
                Err(e)
            }
        }
    }

    /// 失敗只記錄，流程繼續
    async fn optional<T>(&self, title: &str, step: impl Future<Output = Result<T>>) -> Option<T> {
        self.progress.start(title);
        match step.await {
            Ok(value) => {
                self.record(ItemStatus::ok(title));
                Some(value)
            }
            Err(e) => {
                tracing::warn!("⚠️ {} failed: {}", title, e);
                self.record(ItemStatus::failed(title, e.to_string()));
                None
            }
        }
    }

    fn cleanup_commands(&self) -> Vec<String> {
        let name = &self.ctx.service_name;
        if self.ctx.platform.is_windows() {
            vec![format!("sc.exe stop {}", name)]
        } else {
            vec![
                format!("service {} stop", name),
                format!("initctl stop {}", name),
                format!("launchctl stop {}", name),
            ]
        }
    }

    /// 停掉可能存在的舊實例，錯誤一律忽略
    async fn cleanup(&self) {
        let commands = self.cleanup_commands();
        let stopped = self.deps.runner.run_best_effort(&commands).await;
        tracing::debug!("🧹 cleanup: {}/{} stop commands succeeded", stopped, commands.len());
    }

    async fn install_dependencies(&self) -> Result<()> {
        let manager = DependencyManager::new(self.deps.runner.as_ref(), self.ctx.platform.os);
        let mut catalog = self.profile.dependencies.clone();

        self.progress.title("Check dependencies");
        self.progress.start("checking");
        for status in manager.check(&mut catalog).await {
            self.progress.finish(&status);
        }

        if DependencyManager::missing(&catalog).next().is_none() {
            return Ok(());
        }

        self.progress.title("Installing dependencies");
        self.progress.start("installing");
        match manager
            .install_missing(&mut catalog, self.profile.dependency_failure_mode())
            .await
        {
            Ok(statuses) => {
                self.progress.stop();
                for status in statuses {
                    self.record(status);
                }
                Ok(())
            }
            Err(e) => {
                let name = match &e {
                    InstallError::DependencyInstallFailure { name, .. } => name.clone(),
                    _ => "dependencies".to_string(),
                };
                self.record(ItemStatus::failed(name, e.to_string()));
                Err(e)
            }
        }
    }

    async fn extract(&self, archive: &Path, destination: &Path) -> Result<()> {
        ArchiveExtractor::new(self.profile.archive_tool, self.deps.runner.as_ref())
            .extract(archive, destination)
            .await
    }

    async fn install_core(&self) -> Result<ReleaseAsset> {
        self.progress.title("Install core");
        let temp = self.ctx.temp_dir();
        tokio::fs::create_dir_all(&temp).await?;

        let metadata_url = self.profile.metadata_url(&self.ctx.variant);
        let release = self
            .mandatory(
                "found version",
                ReleaseResolver::new(&self.fetcher)
                    .resolve_asset(&metadata_url, &self.profile.release.asset_name),
            )
            .await?;
        tracing::info!("🏷️ release {} ({})", release.tag, release.url);

        let core_zip = temp.join("core.zip");
        self.mandatory("downloading core", self.fetcher.download_to(&release.url, &core_zip))
            .await?;
        self.mandatory("extract core", self.extract(&core_zip, &self.ctx.install_path))
            .await?;

        let deps_zip = temp.join("deps.zip");
        let modules_url = self.profile.modules_url(&self.ctx.variant);
        self.mandatory(
            "downloading dependencies",
            self.fetcher.download_to(&modules_url, &deps_zip),
        )
        .await?;
        self.mandatory(
            "extract dependencies",
            self.extract(&deps_zip, &self.ctx.install_path.join("backend")),
        )
        .await?;

        if let Some(project_url) = self.profile.project_url(&self.ctx.variant) {
            self.optional("deploy project", self.deploy_project(&project_url))
                .await;
        }

        Ok(release)
    }

    async fn deploy_project(&self, project_url: &str) -> Result<u64> {
        let temp = self.ctx.temp_dir();
        let archive = temp.join("project.zip");
        let unpack_dir = temp.join("project");

        self.fetcher.download_to(project_url, &archive).await?;
        if unpack_dir.exists() {
            tokio::fs::remove_dir_all(&unpack_dir).await?;
        }
        self.extract(&archive, &unpack_dir).await?;

        let destination = self
            .ctx
            .data_path
            .join("projects")
            .join(&self.ctx.project_name);
        tokio::task::spawn_blocking(move || mirror_tree(&unpack_dir, &destination))
            .await
            .map_err(|e| InstallError::IoError(std::io::Error::other(e)))?
    }

    async fn deploy_aux(&self, title: &str, subdir: &str, packages: &[AuxPackage]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        self.progress.title(title);

        let dest_root = self.ctx.data_path.join(subdir);
        tokio::fs::create_dir_all(&dest_root).await?;

        let deployer = AuxRepoDeployer::new(
            &self.fetcher,
            self.deps.runner.as_ref(),
            self.profile.archive_tool,
            self.profile.release.aux_latest_url.clone(),
            self.ctx.temp_dir(),
        );
        for package in packages {
            self.optional(
                &format!("deploy {}", package.name),
                deployer.deploy(&package.id, &package.repository, &dest_root),
            )
            .await;
        }
        Ok(())
    }

    /// 協商埠號後才寫出 config.json
    async fn configure(&self) -> Result<u16> {
        self.progress.title("Configure");
        let negotiator = PortNegotiator::new(self.deps.probe.as_ref(), self.profile.port.clone());
        let port = self
            .mandatory("select port", negotiator.negotiate(&self.ctx))
            .await?;
        tracing::info!("🔌 using port {}", port);

        self.mandatory("create config", async {
            RuntimeConfig::from_context(&self.ctx)?
                .write(&self.ctx.install_path)
                .await
        })
        .await?;
        Ok(port)
    }

    async fn register_service(
        &self,
    ) -> Result<(InitSystemKind, RegistrationPlan, Option<Verification>)> {
        self.progress.title("Register service");
        let init_system = self.detect_init_system();
        let registrar = self.registrar();

        let plan = match registrar.render(init_system, &self.ctx) {
            Ok(plan) => {
                self.record(ItemStatus::ok(format!("init system detected: {}", init_system)));
                plan
            }
            Err(e) => {
                self.record(ItemStatus::failed(
                    format!("init system detected: {}", init_system),
                    "not supported",
                ));
                return Err(e);
            }
        };

        if let RegistrationPlan::Manual { .. } = &plan {
            registrar.register(init_system, &plan).await?;
            self.record(ItemStatus::skipped("service activation"));
            return Ok((init_system, plan, None));
        }

        self.mandatory("service activation", registrar.register(init_system, &plan))
            .await?;

        self.progress.start("check service");
        let verification = registrar.verify(init_system, &self.ctx).await?;
        self.record(if verification.process_found {
            ItemStatus::ok("check service")
        } else {
            ItemStatus::failed("check service", "service process not found")
        });
        self.record(if verification.http.alive {
            ItemStatus::ok("check port")
        } else {
            ItemStatus::failed(
                "check port",
                format!(
                    "/admin/ did not answer 200 after {} attempts",
                    verification.http.attempts
                ),
            )
        });

        Ok((init_system, plan, Some(verification)))
    }
}
