//! 自动检查节流
//!
//! 根据持久化的上次检查时间决定启动时是否需要自动检查更新；
//! 用户手动触发的检查不经过这里

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::storage::{KeyValueStore, StorageError};

/// 上次检查时间的存储键
pub const LAST_CHECK_KEY: &str = "last_update_check";

/// 默认检查间隔: 24 小时（毫秒）
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 24 * 60 * 60 * 1000;

/// 更新检查调度器
#[derive(Clone)]
pub struct UpdateCheckScheduler {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    check_interval_ms: u64,
}

impl UpdateCheckScheduler {
    pub fn new(store: Arc<dyn KeyValueStore>, check_interval_ms: u64) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), check_interval_ms)
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        check_interval_ms: u64,
    ) -> Self {
        Self {
            store,
            clock,
            check_interval_ms,
        }
    }

    pub fn check_interval_ms(&self) -> u64 {
        self.check_interval_ms
    }

    /// 上次检查时间；未记录或无法解析时为 `None`
    pub fn last_check(&self) -> Option<i64> {
        let raw = self.store.get(LAST_CHECK_KEY)?;
        match raw.trim().parse::<i64>() {
            Ok(ts) => Some(ts),
            Err(_) => {
                tracing::warn!("忽略无法解析的上次检查时间: {:?}", raw);
                None
            }
        }
    }

    /// 是否应该进行自动检查
    pub fn should_check(&self) -> bool {
        match self.last_check() {
            None => true,
            Some(last) => {
                let elapsed = self.clock.now_millis().saturating_sub(last);
                elapsed > i64::try_from(self.check_interval_ms).unwrap_or(i64::MAX)
            }
        }
    }

    /// 记录本次检查时间
    pub fn record_check(&self) -> Result<(), StorageError> {
        let now = self.clock.now_millis();
        tracing::debug!("记录更新检查时间: {}", now);
        self.store.set(LAST_CHECK_KEY, &now.to_string())
    }

    /// 清除检查记录，下次启动时必定检查
    pub fn reset(&self) -> Result<(), StorageError> {
        self.store.remove(LAST_CHECK_KEY)
    }
}

impl std::fmt::Debug for UpdateCheckScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCheckScheduler")
            .field("check_interval_ms", &self.check_interval_ms)
            .field("last_check", &self.last_check())
            .finish()
    }
}
