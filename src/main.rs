use clap::Parser;
use ih_installer::utils::progress::ProgressReporter;
use ih_installer::utils::{logger, report, validation::Validate};
use ih_installer::{CliConfig, Collaborators, InstallError, Installer};

fn abort(e: &InstallError) -> ! {
    tracing::error!(
        "❌ installation aborted: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    report::print_abort_banner(e);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置，在碰觸主機之前
    if let Err(e) = config.validate() {
        abort(&e);
    }
    let profile = match config.load_profile().and_then(|p| p.validate().map(|_| p)) {
        Ok(profile) => profile,
        Err(e) => abort(&e),
    };

    let collaborators = match Collaborators::system(&profile) {
        Ok(collaborators) => collaborators,
        Err(e) => abort(&e),
    };
    let installer = Installer::new(config.context(), profile, collaborators)
        .with_progress(ProgressReporter::new(!config.quiet));

    if config.dry_run {
        match installer.plan() {
            Ok(plan) => plan.print(installer.context()),
            Err(e) => abort(&e),
        }
        return Ok(());
    }

    match installer.run().await {
        Ok(summary) => {
            for item in summary.failed_items() {
                tracing::warn!("⚠️ {} did not complete", item.name);
            }
            summary.print();
            Ok(())
        }
        Err(e) => abort(&e),
    }
}
