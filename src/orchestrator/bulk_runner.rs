//! 批量投递 - 编排层
//!
//! 随机抽取至多 `max_applications` 个职位逐个投递，动态调整间隔，成功数达到上限即停止。
//! 单个职位的失败（包括 panic）只体现在结果里，不会中断整批。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{error, info, warn};

use crate::models::{ApplicantProfile, ApplicationResult, JobPosting};
use crate::orchestrator::cancel::CancelToken;
use crate::orchestrator::retry_controller::RetryController;
use crate::workflow::AttemptRunner;

/// 投递间隔策略
#[derive(Debug, Clone, PartialEq)]
pub struct PacingPolicy {
    /// 基础间隔
    pub base_interval: Duration,
    /// 正常情况下的倍数区间
    pub calm_factor: (f64, f64),
    /// 成功率较高时的倍数区间
    pub cautious_factor: (f64, f64),
    /// 成功率超过该值时使用 `cautious_factor`
    pub cautious_threshold: f64,
    /// 每次成功后的额外冷却
    pub success_cooldown: (Duration, Duration),
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(15),
            calm_factor: (1.0, 2.0),
            cautious_factor: (2.0, 4.0),
            cautious_threshold: 0.8,
            success_cooldown: (Duration::from_secs(30), Duration::from_secs(60)),
        }
    }
}

impl PacingPolicy {
    /// 不等待（测试用）
    pub fn immediate() -> Self {
        Self {
            base_interval: Duration::ZERO,
            success_cooldown: (Duration::ZERO, Duration::ZERO),
            ..Self::default()
        }
    }

    /// 下一次投递前的间隔
    pub fn next_interval(&self, successes: usize, attempted: usize, rng: &mut impl Rng) -> Duration {
        let rate = successes as f64 / attempted.max(1) as f64;
        let (lo, hi) = if rate > self.cautious_threshold {
            self.cautious_factor
        } else {
            self.calm_factor
        };
        let factor = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
        self.base_interval.mul_f64(factor.max(0.0))
    }

    /// 成功后的冷却时间
    pub fn cooldown(&self, rng: &mut impl Rng) -> Duration {
        let (lo, hi) = self.success_cooldown;
        if hi > lo {
            rng.gen_range(lo..=hi)
        } else {
            lo
        }
    }
}

/// 批量投递报告
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    /// 按实际投递顺序排列
    pub results: Vec<ApplicationResult>,
    /// 是否因取消而提前结束
    pub cancelled: bool,
}

impl BulkReport {
    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.success()).count()
    }

    pub fn failures(&self) -> usize {
        self.results.len() - self.successes()
    }
}

/// 批量投递器
pub struct BulkRunner<R> {
    controller: RetryController<R>,
    pacing: PacingPolicy,
}

impl<R: AttemptRunner> BulkRunner<R> {
    pub fn new(controller: RetryController<R>, pacing: PacingPolicy) -> Self {
        Self { controller, pacing }
    }

    pub fn controller(&self) -> &RetryController<R> {
        &self.controller
    }

    /// 批量投递
    ///
    /// 随机抽取至多 `max_applications` 个职位；成功数达到上限或抽中的职位用尽时结束，
    /// 取消时返回已完成的结果。
    pub async fn run_bulk(
        &self,
        jobs: &[JobPosting],
        profile: &ApplicantProfile,
        max_applications: usize,
        max_retries: u32,
        cancel: &CancelToken,
    ) -> BulkReport {
        let mut report = BulkReport::default();
        if max_applications == 0 || jobs.is_empty() {
            return report;
        }

        // 随机抽取至多 max_applications 个职位
        let order = {
            let mut order: Vec<&JobPosting> = jobs.iter().collect();
            order.shuffle(&mut rand::thread_rng());
            order.truncate(max_applications);
            order
        };
        let total = order.len();
        info!(
            "🚀 开始批量投递: 从 {} 个职位中抽取 {} 个，目标成功 {} 个",
            jobs.len(),
            total,
            max_applications
        );

        let mut successes = 0usize;
        for (index, job) in order.into_iter().enumerate() {
            if successes >= max_applications {
                break;
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if index > 0 {
                let interval = self
                    .pacing
                    .next_interval(successes, index, &mut rand::thread_rng());
                if !sleep_or_cancel(interval, cancel).await {
                    report.cancelled = true;
                    break;
                }
            }

            info!(
                "[职位 {}] 📋 处理第 {}/{} 个: {}",
                job.id,
                index + 1,
                total,
                job.label()
            );

            let attempt = AssertUnwindSafe(self.controller.run_with_retry(job, profile, max_retries))
                .catch_unwind();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                outcome = attempt => Some(outcome),
            };

            let result = match outcome {
                Some(Ok(result)) => result,
                Some(Err(panic)) => {
                    let message = panic_message(panic.as_ref());
                    error!("[职位 {}] 💥 投递过程异常终止: {}", job.id, message);
                    ApplicationResult::failed(job, format!("投递过程异常终止: {}", message))
                }
                None => {
                    warn!("[职位 {}] ⏹️ 投递被取消", job.id);
                    report
                        .results
                        .push(ApplicationResult::failed(job, "投递被取消"));
                    report.cancelled = true;
                    break;
                }
            };

            let succeeded = result.success();
            report.results.push(result);

            if succeeded {
                successes += 1;
                info!("✅ 投递成功 ({}/{})", successes, max_applications);
                if successes < max_applications {
                    let cooldown = self.pacing.cooldown(&mut rand::thread_rng());
                    if !sleep_or_cancel(cooldown, cancel).await {
                        report.cancelled = true;
                        break;
                    }
                }
            }
        }

        info!(
            "🎉 批量投递结束: 成功 {} / 尝试 {}",
            report.successes(),
            report.results.len()
        );
        report
    }
}

/// 等待指定时间，期间被取消时返回 false
async fn sleep_or_cancel(duration: Duration, cancel: &CancelToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知错误".to_string()
    }
}
