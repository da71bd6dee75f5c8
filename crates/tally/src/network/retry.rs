//! 可选的请求重试策略
//!
//! 默认 `max_retries = 0`，即不做任何自动重试；只有调用方显式配置时才会重试

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// 重试与退避设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 首次请求之外最多再试几次
    pub max_retries: u32,
    /// 第一次重试前的等待（毫秒）
    pub base_delay_ms: u64,
    /// 单次等待上限（毫秒）
    pub max_delay_ms: u64,
    /// 每次重试等待翻倍
    pub backoff: bool,
    /// 随机抖动比例，0 表示不抖动
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff: true,
            jitter_ratio: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }
}

/// HTTP 状态码是否值得重试
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// 计算第 `attempt` 次重试前的延迟（毫秒）
pub fn calculate_retry_delay(attempt: u32, config: &RetryConfig) -> u64 {
    let factor = if config.backoff {
        2u64.saturating_pow(attempt)
    } else {
        1
    };
    let base = config.base_delay_ms.saturating_mul(factor);

    let spread = (base as f64 * config.jitter_ratio.clamp(0.0, 1.0)) as u64;
    let delay = if spread == 0 {
        base
    } else {
        let offset = rand::thread_rng().gen_range(0..=spread * 2);
        (base + offset).saturating_sub(spread)
    };

    delay.min(config.max_delay_ms)
}

/// 执行带重试的操作
///
/// `is_retryable` 返回 false 的错误立即返回；重试耗尽后返回最后一次错误
pub async fn with_retry<T, E, F, Fut>(
    operation: F,
    config: &RetryConfig,
    is_retryable: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    if !config.is_enabled() {
        return operation().await;
    }

    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= config.max_retries || !is_retryable(&error) {
                    return Err(error);
                }

                let delay = calculate_retry_delay(attempt, config);
                attempt += 1;
                tracing::info!(
                    "请求失败，{}ms 后进行第 {}/{} 次重试: {}",
                    delay,
                    attempt,
                    config.max_retries,
                    error
                );
                sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}
