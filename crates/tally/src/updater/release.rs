//! 发布信息与更新信息

use serde::{Deserialize, Serialize};

/// GitHub Release API 返回的发布信息（只保留用到的字段）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// 版本标签，如 "v1.0.1"
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    /// 更新日志
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
    /// ISO-8601 发布时间
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// 发布附件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    /// 字节数
    #[serde(default)]
    pub size: u64,
    pub browser_download_url: String,
}

impl Release {
    /// 第一个文件名以 `extension` 结尾的附件
    pub fn find_package(&self, extension: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|asset| asset.name.ends_with(extension))
    }

    /// 更新日志：优先使用 body，其次 name
    pub fn changelog(&self) -> String {
        self.body
            .as_deref()
            .filter(|b| !b.is_empty())
            .or(self.name.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

/// 可用更新
///
/// 只有在发现严格更新的版本并且找到匹配的安装包时才会创建
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    pub latest_version: String,
    pub current_version: String,
    pub download_url: String,
    pub file_size: u64,
    pub file_name: String,
    pub update_log: String,
    pub release_url: String,
    pub published_at: Option<String>,
}
