//! 代理配置和支持
//!
//! 两类代理：出站 HTTP/HTTPS 代理（作用于整个客户端），
//! 以及下载加速前缀（只拼接在安装包下载地址前）

use serde::{Deserialize, Serialize};
use std::env;

/// 出站代理配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// HTTP 代理 URL
    #[serde(default)]
    pub http: Option<String>,
    /// HTTPS 代理 URL
    #[serde(default)]
    pub https: Option<String>,
    /// 绕过代理的域名列表
    #[serde(default)]
    pub no_proxy: Vec<String>,
}

impl ProxyConfig {
    /// 从标准环境变量读取
    pub fn from_env() -> Self {
        let no_proxy = env::var("NO_PROXY")
            .or_else(|_| env::var("no_proxy"))
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            http: env::var("HTTP_PROXY")
                .or_else(|_| env::var("http_proxy"))
                .ok(),
            https: env::var("HTTPS_PROXY")
                .or_else(|_| env::var("https_proxy"))
                .ok(),
            no_proxy,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }

    /// 转换为 reqwest 代理；无效 URL 会被忽略
    pub fn to_reqwest_proxies(&self) -> Vec<reqwest::Proxy> {
        let no_proxy = reqwest::NoProxy::from_string(&self.no_proxy.join(","));
        let mut proxies = Vec::new();

        if let Some(http) = self.http.as_deref() {
            match reqwest::Proxy::http(http) {
                Ok(p) => proxies.push(p.no_proxy(no_proxy.clone())),
                Err(e) => tracing::warn!("忽略无效的 HTTP 代理 {}: {}", http, e),
            }
        }
        if let Some(https) = self.https.as_deref() {
            match reqwest::Proxy::https(https) {
                Ok(p) => proxies.push(p.no_proxy(no_proxy)),
                Err(e) => tracing::warn!("忽略无效的 HTTPS 代理 {}: {}", https, e),
            }
        }

        proxies
    }
}

/// 把下载加速前缀拼接到原始下载地址之前
///
/// 前缀为空或未配置时原样返回；不做任何其他转换
pub fn rewrite_download_url(prefix: Option<&str>, original_url: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}{}", prefix, original_url),
        _ => original_url.to_string(),
    }
}
