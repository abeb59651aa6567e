//! 重试与退避
//!
//! 对任意可失败操作做「失败即等待再试」：异步版本只挂起调用方任务（tokio::time::sleep），
//! 同步版本阻塞当前线程。最后一次仍失败时把原始错误交还调用方。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// 重试策略：最多尝试 max_attempts 次，第 n 次失败后等待 base_delay * 2^(n-1)（关闭指数退避时恒为 base_delay）
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            exponential: true,
        }
    }
}

impl RetryPolicy {
    /// 不等待、只尝试一次（测试与离线演示用）
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            exponential: false,
        }
    }

    /// 第 attempt 次（从 0 开始）失败后的等待时长
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.exponential {
            self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
        } else {
            self.base_delay
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// 异步重试：op 每次返回新的 Future
pub async fn retry_async<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt + 1 >= attempts => {
                tracing::error!(op = label, attempts, error = %e, "operation failed after retries");
                return Err(e);
            }
            Err(e) => {
                let wait = policy.delay_for(attempt);
                tracing::warn!(
                    op = label,
                    attempt = attempt + 1,
                    error = %e,
                    wait_ms = wait.as_millis() as u64,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}

/// 同步重试：阻塞当前线程等待，勿在 async 上下文中的热路径调用
pub fn retry_blocking<T, E, F>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if attempt + 1 >= attempts => {
                tracing::error!(op = label, attempts, error = %e, "operation failed after retries");
                return Err(e);
            }
            Err(e) => {
                let wait = policy.delay_for(attempt);
                tracing::warn!(op = label, attempt = attempt + 1, error = %e, "attempt failed, retrying");
                std::thread::sleep(wait);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: attempts,
            base_delay: Duration::from_millis(1),
            exponential: true,
        }
    }

    #[test]
    fn test_delay_exponential_and_flat() {
        let p = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            exponential: true,
        };
        assert_eq!(p.delay_for(0), Duration::from_millis(100));
        assert_eq!(p.delay_for(1), Duration::from_millis(200));
        assert_eq!(p.delay_for(2), Duration::from_millis(400));

        let flat = RetryPolicy { exponential: false, ..p };
        assert_eq!(flat.delay_for(2), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_async_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, String> = retry_async(&fast(3), "flaky", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(format!("boom {n}"))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_async_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_async(&fast(2), "always", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("fail {n}")) }
        })
        .await;
        assert_eq!(result.unwrap_err(), "fail 1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = retry_async(&fast(0), "once", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("nope") }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blocking_retries_then_succeeds() {
        let mut calls = 0;
        let result: Result<u32, String> = retry_blocking(&fast(3), "sync", || {
            calls += 1;
            if calls < 3 {
                Err("not yet".to_string())
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }
}
