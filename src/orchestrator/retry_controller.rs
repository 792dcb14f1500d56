//! 重试控制器 - 编排层
//!
//! 对单个职位做有限次重试，结论性状态（applied / already_applied / not_supported）立即停止。

use std::time::Duration;

use tracing::{info, warn};

use crate::models::{ApplicantProfile, ApplicationResult, JobPosting};
use crate::services::humanizer::{pause, uniform};
use crate::workflow::AttemptRunner;

/// 重试退避策略：第 i 次重试前等待 uniform(min, max) × (i + 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay_min: Duration,
    pub delay_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay_min: Duration::from_secs(3),
            delay_max: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// 不等待（测试用）
    pub fn immediate() -> Self {
        Self {
            delay_min: Duration::ZERO,
            delay_max: Duration::ZERO,
        }
    }

    /// 第 `attempt_index` 次尝试失败后的等待时间（从 0 开始）
    pub fn backoff(&self, attempt_index: u32) -> Duration {
        uniform((self.delay_min, self.delay_max)) * (attempt_index + 1)
    }
}

/// 重试控制器
pub struct RetryController<R> {
    runner: R,
    policy: RetryPolicy,
}

impl<R: AttemptRunner> RetryController<R> {
    pub fn new(runner: R, policy: RetryPolicy) -> Self {
        Self { runner, policy }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// 最多执行 `max_retries + 1` 次，返回最后一次结果（带已消耗的重试次数）
    pub async fn run_with_retry(
        &self,
        job: &JobPosting,
        profile: &ApplicantProfile,
        max_retries: u32,
    ) -> ApplicationResult {
        let mut last = None;

        for attempt in 0..=max_retries {
            info!(
                "[职位 {}] 🔄 第 {}/{} 次尝试",
                job.id,
                attempt + 1,
                max_retries + 1
            );

            let result = self
                .runner
                .run_attempt(job, profile)
                .await
                .with_retry_count(attempt);

            if result.status().is_conclusive() {
                return result;
            }

            if attempt < max_retries {
                let delay = self.policy.backoff(attempt);
                warn!(
                    "[职位 {}] 第 {} 次尝试未成功 ({})，{:.1} 秒后重试",
                    job.id,
                    attempt + 1,
                    result.status(),
                    delay.as_secs_f64()
                );
                pause(delay).await;
            }
            last = Some(result);
        }

        last.unwrap_or_else(|| {
            ApplicationResult::failed(job, "超过最大重试次数").with_retry_count(max_retries)
        })
    }
}
