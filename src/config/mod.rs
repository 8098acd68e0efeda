pub mod profile;
pub mod runtime;

pub use profile::InstallProfile;
pub use runtime::RuntimeConfig;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use super::InstallProfile;
    use crate::domain::model::{InstallationContext, Platform};
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::Parser;
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "ih-installer")]
    #[command(about = "Unattended installer for the ih-v5 runtime")]
    pub struct CliConfig {
        /// Product variant (release repository name)
        #[arg(default_value = "ih-v5")]
        pub variant: String,

        /// Interface language written to config.json
        #[arg(default_value = "ru")]
        pub lang: String,

        /// Service name; defaults to the variant
        pub service_name: Option<String>,

        #[arg(long)]
        pub install_path: Option<PathBuf>,

        #[arg(long)]
        pub data_path: Option<PathBuf>,

        #[arg(long, default_value_t = 8088)]
        pub port: u16,

        #[arg(long)]
        pub project_name: Option<String>,

        #[arg(long, help = "TOML install profile overriding built-in sources and policies")]
        pub profile: Option<PathBuf>,

        #[arg(long, help = "Constrained target: write tool paths into config.json")]
        pub embedded: bool,

        #[arg(long, help = "Print the plan without touching the host")]
        pub dry_run: bool,

        #[arg(long, help = "No progress rows, only errors")]
        pub quiet: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub log_json: bool,
    }

    impl CliConfig {
        pub fn service_name(&self) -> &str {
            self.service_name.as_deref().unwrap_or(&self.variant)
        }

        pub fn install_path(&self) -> PathBuf {
            self.install_path.clone().unwrap_or_else(|| {
                if cfg!(windows) {
                    PathBuf::from(format!("C:\\{}", self.variant))
                } else {
                    PathBuf::from("/opt").join(&self.variant)
                }
            })
        }

        pub fn data_path(&self) -> PathBuf {
            self.data_path.clone().unwrap_or_else(|| {
                if cfg!(windows) {
                    self.install_path().join("data")
                } else {
                    PathBuf::from("/var/lib").join(&self.variant)
                }
            })
        }

        pub fn project_name(&self) -> String {
            self.project_name
                .clone()
                .unwrap_or_else(|| format!("demo_{}", chrono::Utc::now().timestamp_millis()))
        }

        pub fn load_profile(&self) -> Result<InstallProfile> {
            match &self.profile {
                Some(path) => InstallProfile::from_file(path),
                None => Ok(InstallProfile::default()),
            }
        }

        pub fn context(&self) -> InstallationContext {
            InstallationContext::new(
                self.variant.clone(),
                self.lang.clone(),
                self.service_name(),
                self.project_name(),
                self.install_path(),
                self.data_path(),
                self.port,
                Platform::current(self.embedded),
            )
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_identifier("variant", &self.variant)?;
            validation::validate_identifier("lang", &self.lang)?;
            validation::validate_identifier("service_name", self.service_name())?;
            if let Some(project) = &self.project_name {
                validation::validate_identifier("project_name", project)?;
            }
            validation::validate_path("install_path", &self.install_path().display().to_string())?;
            validation::validate_path("data_path", &self.data_path().display().to_string())?;
            validation::validate_range("port", self.port, 1, u16::MAX)?;
            Ok(())
        }
    }

}
