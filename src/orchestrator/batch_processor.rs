//! 批量投递入口 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责资源管理和一次批量投递的完整生命周期。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：加载职位、求职者资料和平台策略
//! 2. **会话管理**：获取浏览器会话，无论成功失败都会释放
//! 3. **取消处理**：Ctrl+C 触发协作式取消，已完成的结果照常保存
//! 4. **结果输出**：追加写入 JSONL 结果文件
//! 5. **全局统计**：汇总成功 / 失败数量
//!
//! ## 设计特点
//!
//! - **资源所有者**：唯一持有浏览器会话的模块
//! - **向下委托**：委托 BulkRunner 处理职位列表

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::browser::{SessionHint, SessionManager};
use crate::config::Config;
use crate::models::{load_jobs, load_profile, ApplicantProfile, JobPosting};
use crate::orchestrator::bulk_runner::{BulkReport, BulkRunner};
use crate::orchestrator::cancel::CancelToken;
use crate::orchestrator::retry_controller::RetryController;
use crate::services::{FieldLocator, RandomHumanizer, ResultWriter, StrategyRegistry};
use crate::utils::logging;
use crate::workflow::ApplicationFlow;

/// 应用主结构
pub struct App {
    config: Config,
    registry: Arc<StrategyRegistry>,
    jobs: Vec<JobPosting>,
    profile: ApplicantProfile,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(config.max_applications, config.max_retries);

        let registry = match &config.strategies_file {
            Some(path) => StrategyRegistry::load_file(path).await?,
            None => StrategyRegistry::builtin(),
        };

        info!("\n📁 正在加载职位与求职者资料...");
        let jobs = load_jobs(&config.jobs_file).await?;
        let profile = load_profile(&config.profile_file).await?;
        logging::log_jobs_loaded(jobs.len(), profile.present_fields().len());

        Ok(Self {
            config,
            registry: Arc::new(registry),
            jobs,
            profile,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<BulkReport> {
        if self.jobs.is_empty() {
            warn!("⚠️ 没有找到可投递的职位，程序结束");
            return Ok(BulkReport::default());
        }

        let cancel = CancelToken::new();
        let ctrl_c = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("⏹️ 收到中断信号，正在停止...");
                    cancel.cancel();
                }
            })
        };

        let manager = SessionManager::new(self.config.browser_mode());
        let hint = SessionHint {
            label: "bulk".to_string(),
            region: self.config.session_region.clone(),
        };
        let session = match manager.acquire(&hint).await {
            Ok(session) => session,
            Err(e) => {
                ctrl_c.abort();
                return Err(e).context("无法获取浏览器会话");
            }
        };

        let report = {
            let flow = ApplicationFlow::new(
                &session,
                Arc::clone(&self.registry),
                FieldLocator::new(self.config.locator_timeouts()),
                RandomHumanizer,
                self.config.flow_settings(),
            );
            let runner = BulkRunner::new(
                RetryController::new(flow, self.config.retry_policy()),
                self.config.pacing_policy(),
            );
            runner
                .run_bulk(
                    &self.jobs,
                    &self.profile,
                    self.config.max_applications,
                    self.config.max_retries,
                    &cancel,
                )
                .await
        };

        manager.release(session).await;
        ctrl_c.abort();

        self.save_results(&report).await;
        self.print_stats(&report);
        Ok(report)
    }

    /// 保存结果；写入失败只记录日志，不影响已完成的投递
    async fn save_results(&self, report: &BulkReport) {
        let writer = ResultWriter::with_path(self.config.results_file.clone());
        match writer.append(&report.results).await {
            Ok(count) => info!("✓ 已写入 {} 条结果", count),
            Err(e) => error!("❌ 写入结果失败: {:#}", e),
        }
    }

    fn print_stats(&self, report: &BulkReport) {
        for result in report.results.iter().filter(|r| !r.success()) {
            if let Some(message) = result.error_message() {
                info!(
                    "[职位 {}] {}: {}",
                    result.job_id(),
                    result.status(),
                    logging::truncate_text(message, 80)
                );
            }
        }
        if report.cancelled {
            warn!("⚠️ 批量投递被中断，统计只包含已完成的职位");
        }
        logging::print_final_stats(
            report.successes(),
            report.failures(),
            report.results.len(),
            &self.config.results_file.display().to_string(),
        );
    }
}
