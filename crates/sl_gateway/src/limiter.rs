//! 识别请求限流器
//!
//! 外部关键点检测器的并发能力有限，识别请求先取得许可再转发，
//! 排队超过最大等待时间即拒绝，防止请求堆积。

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sl_core::{Result, SignLoomError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// 限流器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// 最大并发识别数
    pub capacity: usize,
    /// 最大排队等待 (毫秒)
    pub max_wait_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 8,
            max_wait_ms: 5000,
        }
    }
}

impl LimiterConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

/// 识别许可，离开作用域时自动归还
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

/// 识别请求限流器
pub struct RequestLimiter {
    /// 并发控制信号量
    semaphore: Arc<Semaphore>,
    /// 配置
    config: LimiterConfig,
}

impl RequestLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.capacity));
        Self { semaphore, config }
    }

    /// 创建默认配置的限流器
    pub fn default_limiter() -> Self {
        Self::new(LimiterConfig::default())
    }

    /// 获取许可 (异步等待，超时即拒绝)
    pub async fn acquire(&self) -> Result<LimiterPermit> {
        let permit = tokio::time::timeout(
            self.config.max_wait(),
            self.semaphore.clone().acquire_owned(),
        )
        .await
        .map_err(|_| SignLoomError::RateLimited("timed out waiting for a detector slot".to_string()))?
        .map_err(|_| SignLoomError::RateLimited("limiter closed".to_string()))?;

        Ok(LimiterPermit { _permit: permit })
    }

    /// 尝试获取许可 (非阻塞)
    pub fn try_acquire(&self) -> Result<LimiterPermit> {
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => Ok(LimiterPermit { _permit: permit }),
            Err(_) => Err(SignLoomError::RateLimited(
                "no detector slot available".to_string(),
            )),
        }
    }

    /// 当前可用许可数
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 获取配置
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }
}

impl Default for RequestLimiter {
    fn default() -> Self {
        Self::default_limiter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let limiter = RequestLimiter::default_limiter();
        let permit = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available(), 7);
        drop(permit);
        assert_eq!(limiter.available(), 8);
    }

    #[tokio::test]
    async fn test_exhaustion() {
        let limiter = RequestLimiter::new(LimiterConfig {
            capacity: 2,
            max_wait_ms: 50,
        });

        let _a = limiter.try_acquire().unwrap();
        let _b = limiter.try_acquire().unwrap();

        assert!(limiter.try_acquire().is_err());
        let err = limiter.acquire().await.unwrap_err();
        assert!(matches!(err, SignLoomError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_waiter_gets_released_permit() {
        let limiter = Arc::new(RequestLimiter::new(LimiterConfig {
            capacity: 1,
            max_wait_ms: 1000,
        }));
        let held = limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.is_ok() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        assert!(waiter.await.unwrap());
    }
}
