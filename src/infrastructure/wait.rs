//! 有界轮询原语
//!
//! 控制通道不提供就绪信号，所有"等待窗口出现"都通过这里的轮询完成

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// 轮询策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// 总超时
    pub timeout: Duration,
    /// 初始轮询间隔
    pub interval: Duration,
    /// 每次轮询后间隔的放大倍数（1.0 表示固定间隔）
    pub backoff: f64,
    /// 间隔上限
    pub max_interval: Duration,
}

impl PollPolicy {
    pub fn fixed(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            backoff: 1.0,
            max_interval: interval,
        }
    }

    /// 下一次轮询间隔，无法表示的结果（NaN、溢出）按上限处理
    fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff.is_nan() || self.backoff <= 1.0 {
            return current;
        }
        let cap = self.max_interval.max(current);
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff)
            .map_or(cap, |next| next.min(cap))
    }
}

/// 反复执行 `probe` 直到返回 `Some` 或超时
///
/// `probe` 至少执行一次，超时返回 `None`（不是错误，由调用方决定如何处理）
pub async fn wait_until<T, F, Fut>(policy: &PollPolicy, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();
    let mut interval = policy.interval;

    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }

        let elapsed = start.elapsed();
        if elapsed >= policy.timeout {
            return None;
        }

        let remaining = policy.timeout - elapsed;
        settle(interval.min(remaining)).await;
        interval = policy.next_interval(interval);
    }
}

/// 固定等待，零时长直接返回
pub async fn settle(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}
