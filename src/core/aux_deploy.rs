use crate::core::archive::{mirror_tree, top_level_entries, ArchiveExtractor, ArchiveTool};
use crate::core::fetcher::ArtifactFetcher;
use crate::core::release::ReleaseResolver;
use crate::domain::ports::CommandRunner;
use crate::utils::error::{InstallError, Result};
use std::path::{Path, PathBuf};

/// 下載輔助 repository 的最新 release 並展開到 `dest_root/<id>`
pub struct AuxRepoDeployer<'a> {
    fetcher: &'a ArtifactFetcher,
    runner: &'a dyn CommandRunner,
    archive_tool: ArchiveTool,
    /// `{repo}` 會被替換成 repository 名稱
    latest_url_template: String,
    temp_dir: PathBuf,
}

impl<'a> AuxRepoDeployer<'a> {
    pub fn new(
        fetcher: &'a ArtifactFetcher,
        runner: &'a dyn CommandRunner,
        archive_tool: ArchiveTool,
        latest_url_template: impl Into<String>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fetcher,
            runner,
            archive_tool,
            latest_url_template: latest_url_template.into(),
            temp_dir: temp_dir.into(),
        }
    }

    pub fn latest_release_url(&self, repo_name: &str) -> String {
        self.latest_url_template.replace("{repo}", repo_name)
    }

    pub async fn deploy(&self, repo_id: &str, repo_name: &str, dest_root: &Path) -> Result<PathBuf> {
        let metadata_url = self.latest_release_url(repo_name);
        let release = ReleaseResolver::new(self.fetcher)
            .resolve_source_archive(&metadata_url)
            .await?;
        tracing::info!("🧩 {} {} -> {}", repo_name, release.tag, dest_root.display());

        let archive = self.temp_dir.join(format!("{}.zip", repo_id));
        self.fetcher.download_to(&release.url, &archive).await?;

        // 先清掉舊的解壓目錄，避免重跑時出現多個頂層目錄
        let unpack_dir = self.temp_dir.join(repo_id);
        if unpack_dir.exists() {
            tokio::fs::remove_dir_all(&unpack_dir).await?;
        }
        ArchiveExtractor::new(self.archive_tool, self.runner)
            .extract(&archive, &unpack_dir)
            .await?;

        let entries = top_level_entries(&unpack_dir)?;
        let root = match entries.as_slice() {
            [single] => single.clone(),
            _ => {
                return Err(InstallError::UnpackLayoutError {
                    path: unpack_dir.display().to_string(),
                    found: entries.len(),
                })
            }
        };

        let destination = dest_root.join(repo_id);
        let copied = tokio::task::spawn_blocking({
            let destination = destination.clone();
            move || mirror_tree(&root, &destination)
        })
        .await
        .map_err(|e| InstallError::IoError(std::io::Error::other(e)))??;
        tracing::debug!("copied {} files into {}", copied, destination.display());

        Ok(destination)
    }
}
