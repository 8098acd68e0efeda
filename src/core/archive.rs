use crate::domain::ports::CommandRunner;
use crate::utils::error::{InstallError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveTool {
    /// 系統的 `unzip`
    System,
    /// 內建的 zip 解壓 (沒有 unzip 的平台)
    Bundled,
}

impl ArchiveTool {
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::Bundled
        } else {
            Self::System
        }
    }
}

impl Default for ArchiveTool {
    fn default() -> Self {
        Self::platform_default()
    }
}

pub struct ArchiveExtractor<'a> {
    tool: ArchiveTool,
    runner: &'a dyn CommandRunner,
}

impl<'a> ArchiveExtractor<'a> {
    pub fn new(tool: ArchiveTool, runner: &'a dyn CommandRunner) -> Self {
        Self { tool, runner }
    }

    /// 解壓縮到目的目錄 (不存在則建立)，既有檔案直接覆蓋
    pub async fn extract(&self, archive: &Path, destination: &Path) -> Result<()> {
        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|e| InstallError::extraction(archive, e))?;

        tracing::debug!(
            "📦 extracting {} -> {} ({:?})",
            archive.display(),
            destination.display(),
            self.tool
        );

        // unzip 對空壓縮檔會回傳錯誤，空目錄交給後續的結構檢查
        if is_empty_archive(archive) {
            tracing::debug!("📦 {} has no entries", archive.display());
            return Ok(());
        }

        match self.tool {
            ArchiveTool::System => {
                let command = format!(
                    "unzip -o \"{}\" -d \"{}\"",
                    archive.display(),
                    destination.display()
                );
                self.runner
                    .run(&command)
                    .await
                    .map(|_| ())
                    .map_err(|e| InstallError::extraction(archive, e))
            }
            ArchiveTool::Bundled => {
                let archive = archive.to_path_buf();
                let destination = destination.to_path_buf();
                tokio::task::spawn_blocking(move || extract_bundled(&archive, &destination))
                    .await
                    .map_err(|e| InstallError::ExtractionFailure {
                        archive: "<worker>".to_string(),
                        reason: e.to_string(),
                    })?
            }
        }
    }
}

fn is_empty_archive(archive: &Path) -> bool {
    fs::File::open(archive)
        .ok()
        .and_then(|file| zip::ZipArchive::new(file).ok())
        .is_some_and(|zip| zip.len() == 0)
}

fn extract_bundled(archive: &Path, destination: &Path) -> Result<()> {
    let file = fs::File::open(archive).map_err(|e| InstallError::extraction(archive, e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| InstallError::extraction(archive, e))?;
    zip.extract(destination)
        .map_err(|e| InstallError::extraction(archive, e))
}

/// 列出目錄第一層的項目 (排序後)
pub fn top_level_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

/// 遞迴複製 (鏡像，不搬移)。來源是檔案時直接複製到 `dest`
pub fn mirror_tree(src: &Path, dest: &Path) -> Result<u64> {
    if src.is_file() {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dest)?;
        return Ok(1);
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| InstallError::IoError(std::io::Error::other(e)))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| InstallError::IoError(std::io::Error::other(e)))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
