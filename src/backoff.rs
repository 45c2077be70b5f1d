//! 重试退避策略 - 指数退避，按次显式计算
//!
//! 仅瞬时限流（429 且配额未耗尽）会触发重试；配额耗尽与模型不存在
//! 对本次运行是永久性错误，直接跳到下一个模型。
//! `delay_for` 是纯函数，测试无需真实等待。

use std::time::Duration;

/// 同一模型的默认最大尝试次数
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// 默认基础延迟（秒）
pub const DEFAULT_BASE_DELAY_SECS: u64 = 5;
/// 默认延迟上限（秒）
pub const DEFAULT_MAX_DELAY_SECS: u64 = 60;

/// 重试策略
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 同一模型的最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 首次重试前的基础延迟
    pub base_delay: Duration,
    /// 单次延迟上限
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(DEFAULT_BASE_DELAY_SECS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次失败后的等待时长（attempt 从 1 开始计数）
    ///
    /// base * 2^(attempt-1)，超过 `max_delay` 时截断
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// 第 `attempt` 次失败后是否还允许对同一模型重试
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
