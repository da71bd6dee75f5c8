//! 网络超时和取消控制
//!
//! 默认不启用任何超时，调用方显式配置后才生效

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// 超时配置（毫秒），`None` 表示不限制
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// 连接超时
    #[serde(default)]
    pub connect: Option<u64>,
    /// 单次请求超时；下载时作为两次数据块之间的最长等待
    #[serde(default)]
    pub request: Option<u64>,
}

impl TimeoutConfig {
    pub fn connect_duration(&self) -> Option<Duration> {
        self.connect.map(Duration::from_millis)
    }

    pub fn request_duration(&self) -> Option<Duration> {
        self.request.map(Duration::from_millis)
    }
}

/// 超时错误
#[derive(Debug, Error)]
#[error("Operation timed out after {timeout_ms}ms")]
pub struct TimeoutError {
    pub timeout_ms: u64,
}

/// 取消错误
#[derive(Debug, Error)]
#[error("Operation aborted")]
pub struct AbortError;

/// 超时或取消错误
#[derive(Debug, Error)]
pub enum TimeoutOrAbortError {
    #[error("{0}")]
    Timeout(#[from] TimeoutError),
    #[error("{0}")]
    Abort(#[from] AbortError),
}

/// 在可选的超时与取消令牌约束下等待 future
///
/// 两者都为 `None` 时等价于直接 `.await`
pub async fn with_limits<T, F>(
    future: F,
    timeout: Option<Duration>,
    cancel_token: Option<&CancellationToken>,
) -> Result<T, TimeoutOrAbortError>
where
    F: Future<Output = T>,
{
    let limited = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, future).await.map_err(|_| {
                TimeoutOrAbortError::Timeout(TimeoutError {
                    timeout_ms: limit.as_millis() as u64,
                })
            }),
            None => Ok(future.await),
        }
    };

    match cancel_token {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(TimeoutOrAbortError::Abort(AbortError)),
                result = limited => result,
            }
        }
        None => limited.await,
    }
}
