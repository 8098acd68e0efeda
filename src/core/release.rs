use crate::core::fetcher::ArtifactFetcher;
use crate::domain::model::ReleaseAsset;
use crate::utils::error::{InstallError, Result};
use serde::Deserialize;

/// Release 中繼資料 (只取需要的欄位)
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseMetadata {
    #[serde(default)]
    pub tag_name: String,
    pub assets: Option<Vec<AssetEntry>>,
    pub zipball_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetEntry {
    pub name: String,
    pub browser_download_url: Option<String>,
}

impl ReleaseMetadata {
    pub fn find_asset(&self, name: &str) -> Option<&AssetEntry> {
        self.assets.as_ref()?.iter().find(|asset| asset.name == name)
    }
}

pub struct ReleaseResolver<'a> {
    fetcher: &'a ArtifactFetcher,
}

impl<'a> ReleaseResolver<'a> {
    pub fn new(fetcher: &'a ArtifactFetcher) -> Self {
        Self { fetcher }
    }

    pub async fn fetch_metadata(&self, metadata_url: &str) -> Result<ReleaseMetadata> {
        self.fetcher.fetch_json(metadata_url).await
    }

    /// 在 release 中找出名稱完全相符的檔案
    pub async fn resolve_asset(&self, metadata_url: &str, asset_name: &str) -> Result<ReleaseAsset> {
        let metadata = self.fetch_metadata(metadata_url).await?;
        tracing::debug!("🏷️ release {} from {}", metadata.tag_name, metadata_url);

        metadata
            .find_asset(asset_name)
            .and_then(|asset| {
                asset.browser_download_url.as_ref().map(|url| ReleaseAsset {
                    name: asset.name.clone(),
                    url: url.clone(),
                    tag: metadata.tag_name.clone(),
                })
            })
            .ok_or_else(|| InstallError::AssetNotFound {
                url: metadata_url.to_string(),
                asset: asset_name.to_string(),
            })
    }

    /// 最新 release 的原始碼壓縮檔
    pub async fn resolve_source_archive(&self, metadata_url: &str) -> Result<ReleaseAsset> {
        let metadata = self.fetch_metadata(metadata_url).await?;
        match metadata.zipball_url {
            Some(url) => Ok(ReleaseAsset {
                name: format!("{}.zip", metadata.tag_name),
                url,
                tag: metadata.tag_name,
            }),
            None => Err(InstallError::AssetNotFound {
                url: metadata_url.to_string(),
                asset: "zipball".to_string(),
            }),
        }
    }
}
