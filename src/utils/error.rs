use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Dependency '{name}' could not be installed: {message}")]
    DependencyInstallFailure { name: String, message: String },

    #[error("Asset '{asset}' not found in release metadata from {url}")]
    AssetNotFound { url: String, asset: String },

    #[error("Download of {url} failed: {reason}")]
    DownloadFailure { url: String, reason: String },

    #[error("Extraction of {archive} failed: {reason}")]
    ExtractionFailure { archive: String, reason: String },

    #[error("Unexpected archive layout in {path}: expected exactly one top-level entry, found {found}")]
    UnpackLayoutError { path: String, found: usize },

    #[error("Init system '{system}' is not supported on {platform}")]
    UnsupportedInitSystem { system: String, platform: String },

    #[error("Service activation failed: {message}")]
    ServiceActivationFailure { message: String },

    #[error("No free port found in {first}..={last}")]
    PortNegotiationFailure { first: u16, last: u16 },

    #[error("Command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration file for {field}: {path}")]
    MissingConfigError { field: String, path: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Filesystem,
    Platform,
    Process,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl InstallError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AssetNotFound { .. }
            | Self::DownloadFailure { .. }
            | Self::HttpError(_)
            | Self::UrlError(_)
            | Self::PortNegotiationFailure { .. } => ErrorCategory::Network,
            Self::ExtractionFailure { .. }
            | Self::UnpackLayoutError { .. }
            | Self::ZipError(_)
            | Self::IoError(_)
            | Self::SerializationError(_) => ErrorCategory::Filesystem,
            Self::UnsupportedInitSystem { .. } | Self::ServiceActivationFailure { .. } => {
                ErrorCategory::Platform
            }
            Self::DependencyInstallFailure { .. } | Self::CommandFailed { .. } => {
                ErrorCategory::Process
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 可忽略的項目 (輔助套件) 只會出現在狀態列
            Self::UnpackLayoutError { .. } => ErrorSeverity::Low,
            Self::DownloadFailure { .. } | Self::HttpError(_) | Self::CommandFailed { .. } => {
                ErrorSeverity::Medium
            }
            Self::UnsupportedInitSystem { .. } | Self::ServiceActivationFailure { .. } => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::DependencyInstallFailure { .. } => {
                "Install the missing package manually or re-run the installer with root privileges"
            }
            Self::AssetNotFound { .. } => {
                "Check that the release exists and publishes the expected asset name"
            }
            Self::DownloadFailure { .. } | Self::HttpError(_) => {
                "Check network connectivity and DNS settings, then retry"
            }
            Self::ExtractionFailure { .. } | Self::ZipError(_) => {
                "Make sure an unzip tool is available and there is enough free disk space"
            }
            Self::UnpackLayoutError { .. } => "The release archive layout changed; report it upstream",
            Self::UnsupportedInitSystem { .. } => {
                "Register the service manually with your init system"
            }
            Self::ServiceActivationFailure { .. } => {
                "Inspect the service manager logs and start the service manually"
            }
            Self::PortNegotiationFailure { .. } => "Free a port or pass a different --port",
            Self::CommandFailed { .. } => "Re-run the command manually to see its full output",
            Self::IoError(_) | Self::SerializationError(_) => {
                "Check permissions on the install and data directories"
            }
            Self::MissingConfigError { .. } => {
                "Pass an existing --profile path or omit it to use the built-in defaults"
            }
            Self::UrlError(_) | Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                "Fix the command line arguments or the profile file"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Filesystem => format!("File system problem: {}", self),
            ErrorCategory::Platform => format!("Platform problem: {}", self),
            ErrorCategory::Process => format!("External command problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
        }
    }

    pub(crate) fn download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DownloadFailure {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn extraction(archive: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        Self::ExtractionFailure {
            archive: archive.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InstallError>;
