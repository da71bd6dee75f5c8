//! HTTP 客户端构建

use super::{ProxyConfig, TimeoutConfig};

/// 默认 User-Agent；GitHub API 拒绝没有 User-Agent 的请求
pub fn default_user_agent() -> String {
    format!("tally-updater/{}", env!("CARGO_PKG_VERSION"))
}

/// 按代理与超时配置构建共享的 reqwest 客户端
///
/// 请求级超时只作用于普通请求；下载的逐块超时由下载器自己控制
pub fn build_http_client(
    user_agent: &str,
    proxy: &ProxyConfig,
    timeouts: &TimeoutConfig,
) -> Result<reqwest::Client, reqwest::Error> {
    // 只使用显式传入的代理，环境变量由 ProxyConfig::from_env 负责读取
    let mut builder = reqwest::Client::builder()
        .user_agent(user_agent)
        .no_proxy();

    if let Some(connect) = timeouts.connect_duration() {
        builder = builder.connect_timeout(connect);
    }

    for p in proxy.to_reqwest_proxies() {
        builder = builder.proxy(p);
    }

    builder.build()
}
