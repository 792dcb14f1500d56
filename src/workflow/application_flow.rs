//! 单次投递流程 - 流程层
//!
//! 核心职责：定义"投递一个职位"的完整状态机
//!
//! 状态顺序：
//! 1. Start → Navigated：打开职位页面（检查是否已投递）
//! 2. Navigated → ApplyTriggered：点击申请按钮（判定投递方式、检查验证码）
//! 3. ApplyTriggered → FormFilled：逐个填写字段，勾选同意条款
//! 4. FormFilled → Submitted：点击提交按钮，找不到时按回车
//! 5. Submitted → Finished：检测成功信号
//!
//! 任何步骤的错误都在这里被捕获并转换为 `failed` 结果，页面总会被关闭。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Url;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::ApplyError;
use crate::infrastructure::{ElementHandle, ElementKind, PageDriver, PageSource};
use crate::models::{
    ApplicantProfile, ApplicationMethod, ApplicationResult, ApplicationStatus, JobPosting,
    SemanticField,
};
use crate::services::humanizer::pause;
use crate::services::success_detector::matches_phrase;
use crate::services::{
    FieldLocator, HumanizationProfile, Humanizer, PlatformStrategy, StrategyRegistry,
    SuccessDetector, Target,
};
use crate::workflow::attempt_ctx::{ApplicationAttempt, AttemptState};

/// 同意条款类复选框的关键词
const CONSENT_KEYWORDS: [&str; 4] = ["agree", "terms", "privacy", "consent"];

/// 确认成功时的置信度
const CONFIRMED_CONFIDENCE: f64 = 0.9;

/// 流程参数
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// 页面加载超时
    pub navigation_timeout: Duration,
    /// 整次投递超时
    pub attempt_timeout: Duration,
    /// 点击申请、提交后等待页面稳定的时间
    pub settle: Duration,
    /// 截图目录，为空时不截图
    pub screenshots_dir: Option<PathBuf>,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(180),
            settle: Duration::from_secs(3),
            screenshots_dir: None,
        }
    }
}

impl FlowSettings {
    /// 不等待页面稳定（测试用）
    pub fn immediate() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(30),
            settle: Duration::ZERO,
            screenshots_dir: None,
        }
    }
}

/// 单次投递的产出：结果 + 经过的状态
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub result: ApplicationResult,
    pub trail: Vec<AttemptState>,
}

/// 执行一次投递的能力（重试控制器依赖它）
#[allow(async_fn_in_trait)]
pub trait AttemptRunner {
    /// 执行一次投递，永不失败：所有错误都体现在结果里
    async fn run_attempt(&self, job: &JobPosting, profile: &ApplicantProfile) -> ApplicationResult;
}

/// 状态机的终止结论
struct Verdict {
    status: ApplicationStatus,
    message: Option<String>,
    confidence: f64,
}

impl Verdict {
    fn new(status: ApplicationStatus, message: Option<String>, confidence: f64) -> Self {
        Self {
            status,
            message,
            confidence,
        }
    }

    fn failed(error: ApplyError) -> Self {
        Self::new(ApplicationStatus::Failed, Some(error.to_string()), 0.0)
    }
}

/// 单次投递流程
///
/// - 不持有浏览器，只从 `PageSource` 借页面
/// - 只依赖业务能力（services）
pub struct ApplicationFlow<S, H> {
    source: S,
    registry: Arc<StrategyRegistry>,
    locator: FieldLocator,
    humanizer: H,
    detector: SuccessDetector,
    settings: FlowSettings,
}

impl<S: PageSource, H: Humanizer> ApplicationFlow<S, H> {
    pub fn new(
        source: S,
        registry: Arc<StrategyRegistry>,
        locator: FieldLocator,
        humanizer: H,
        settings: FlowSettings,
    ) -> Self {
        Self {
            source,
            registry,
            locator,
            humanizer,
            detector: SuccessDetector::new(settings.settle),
            settings,
        }
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    /// 执行一次完整投递
    pub async fn execute(&self, job: &JobPosting, profile: &ApplicantProfile) -> AttemptOutcome {
        let strategy = self.registry.resolve(&job.platform);
        info!(
            "[职位 {}] 🎯 开始投递: {} (策略: {})",
            job.id,
            job.label(),
            strategy.key
        );

        let page = match self.source.open_page().await {
            Ok(page) => page,
            Err(e) => {
                error!("[职位 {}] ❌ 无法打开页面: {:#}", job.id, e);
                return AttemptOutcome {
                    result: ApplicationResult::failed(job, format!("无法打开页面: {:#}", e)),
                    trail: vec![
                        AttemptState::Start,
                        AttemptState::Finished(ApplicationStatus::Failed),
                    ],
                };
            }
        };

        let mut attempt = ApplicationAttempt::new(job, page, strategy);
        let limit = self.settings.attempt_timeout;
        let driven = timeout(limit, self.drive(&mut attempt, job, profile)).await;
        let verdict = match driven {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                warn!("{} ❌ {}", attempt, e);
                Verdict::failed(e)
            }
            Err(_) => {
                warn!("{} ⏱️ 投递超时", attempt);
                Verdict::failed(ApplyError::Timeout(limit))
            }
        };

        attempt.advance(AttemptState::Finished(verdict.status));
        let screenshot = self.capture(&attempt.page, job, verdict.status).await;
        let method = attempt.method;
        let (page, filled, trail) = attempt.into_parts();

        match timeout(self.settings.navigation_timeout, page.close()).await {
            Ok(Ok(())) => debug!("[职位 {}] 页面已关闭", job.id),
            Ok(Err(e)) => warn!("[职位 {}] 关闭页面失败: {}", job.id, e),
            Err(_) => warn!("[职位 {}] 关闭页面超时", job.id),
        }

        let result = ApplicationResult::new(
            job,
            verdict.status,
            verdict.message,
            method,
            verdict.confidence,
        )
        .with_filled_fields(filled)
        .with_screenshot(screenshot);

        match result.status() {
            ApplicationStatus::Applied => info!("[职位 {}] ✅ 投递成功", job.id),
            status => info!(
                "[职位 {}] 投递结束: {} {}",
                job.id,
                status,
                result.error_message().unwrap_or_default()
            ),
        }

        AttemptOutcome { result, trail }
    }

    async fn drive<P: PageDriver>(
        &self,
        attempt: &mut ApplicationAttempt<P>,
        job: &JobPosting,
        profile: &ApplicantProfile,
    ) -> Result<Verdict, ApplyError> {
        let strategy = Arc::clone(&attempt.strategy);
        let humanization = strategy.humanization;

        // ========== Start → Navigated ==========
        self.navigate(&attempt.page, job).await?;
        attempt.advance(AttemptState::Navigated);
        pause(self.humanizer.action_pause(&humanization)).await;

        if let Ok(text) = attempt.page.body_text().await {
            if let Some(phrase) = matches_phrase(&text, &strategy.already_applied_phrases) {
                info!("{} ℹ️ 已投递过该职位", attempt);
                return Ok(Verdict::new(
                    ApplicationStatus::AlreadyApplied,
                    Some(format!("页面提示已投递: {}", phrase)),
                    CONFIRMED_CONFIDENCE,
                ));
            }
        }

        // ========== Navigated → ApplyTriggered ==========
        let Some(apply) = self
            .locator
            .locate(&attempt.page, Target::ApplyTrigger, &strategy.apply_locators)
            .await
        else {
            if strategy.requires_dedicated_flow {
                info!("{} ℹ️ 平台需要专用流程，跳过", attempt);
                return Ok(Verdict::new(
                    ApplicationStatus::NotSupported,
                    Some(format!("平台 {} 需要专用投递流程", strategy.key)),
                    0.0,
                ));
            }
            return Err(ApplyError::ElementNotFound("申请按钮".to_string()));
        };

        self.click(&attempt.page, &apply.handle, &humanization)
            .await
            .map_err(|e| ApplyError::unclassified(format!("点击申请按钮失败: {:#}", e)))?;
        attempt.advance(AttemptState::ApplyTriggered);
        pause(self.settings.settle).await;

        attempt.method = self.classify_method(&attempt.page, job, &strategy).await;
        debug!("{} 投递方式: {:?}", attempt, attempt.method);

        for locator in &strategy.captcha_locators {
            if let Ok(Some(_)) = attempt.page.probe(locator).await {
                warn!("{} 🤖 检测到验证码", attempt);
                return Ok(Verdict::new(
                    ApplicationStatus::RequiresManual,
                    Some("页面出现验证码，需要人工处理".to_string()),
                    0.0,
                ));
            }
        }

        // ========== ApplyTriggered → FormFilled ==========
        self.fill_form(attempt, profile, &strategy).await;
        attempt.advance(AttemptState::FormFilled);
        info!(
            "{} 📝 已填写 {} 个字段",
            attempt,
            attempt.filled_fields().len()
        );

        // ========== FormFilled → Submitted ==========
        self.submit(&attempt.page, &strategy).await?;
        attempt.advance(AttemptState::Submitted);

        // ========== Submitted → Finished ==========
        match self.detector.detect(&attempt.page, &strategy).await {
            Some(signal) => {
                info!("{} 🎉 检测到成功信号: {}", attempt, signal);
                Ok(Verdict::new(
                    ApplicationStatus::Applied,
                    None,
                    CONFIRMED_CONFIDENCE,
                ))
            }
            None => Ok(Verdict::new(
                ApplicationStatus::Failed,
                Some("未确认提交成功".to_string()),
                0.0,
            )),
        }
    }

    async fn navigate<P: PageDriver>(&self, page: &P, job: &JobPosting) -> Result<(), ApplyError> {
        let navigation_error = |reason: String| ApplyError::Navigation {
            url: job.url.clone(),
            reason,
        };

        job.parsed_url()
            .map_err(|e| navigation_error(e.to_string()))?;

        let limit = self.settings.navigation_timeout;
        match timeout(limit, page.goto(&job.url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(navigation_error(format!("{:#}", e))),
            Err(_) => Err(navigation_error(format!("超过 {:?} 未加载完成", limit))),
        }
    }

    /// 停顿后在元素内随机位置点击
    async fn click<P: PageDriver>(
        &self,
        page: &P,
        handle: &ElementHandle,
        humanization: &HumanizationProfile,
    ) -> anyhow::Result<()> {
        pause(self.humanizer.action_pause(humanization)).await;
        page.click(handle, self.humanizer.click_offset()).await
    }

    /// 仍在职位所在站点或平台自身域名 → 平台内投递，否则为外部 ATS
    async fn classify_method<P: PageDriver>(
        &self,
        page: &P,
        job: &JobPosting,
        strategy: &PlatformStrategy,
    ) -> ApplicationMethod {
        let host = page
            .current_url()
            .await
            .ok()
            .and_then(|url| Url::parse(&url).ok())
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase));

        match host {
            None => ApplicationMethod::Unknown,
            Some(host) if job.host().as_deref() == Some(host.as_str()) => {
                ApplicationMethod::NativeForm
            }
            Some(host) if strategy.is_native_host(&host) => ApplicationMethod::NativeForm,
            Some(_) => ApplicationMethod::External,
        }
    }

    async fn fill_form<P: PageDriver>(
        &self,
        attempt: &mut ApplicationAttempt<P>,
        profile: &ApplicantProfile,
        strategy: &PlatformStrategy,
    ) {
        for field in SemanticField::FILL_ORDER {
            let Some(value) = profile.value_for(field) else {
                continue;
            };

            match self.fill_field(&attempt.page, strategy, field, &value).await {
                Ok(true) => {
                    debug!("{} ✓ 已填写 {}", attempt, field);
                    attempt.record_filled(field);
                    pause(self.humanizer.action_pause(&strategy.humanization)).await;
                }
                Ok(false) => {}
                Err(e) => warn!("{} ⚠️ {}", attempt, e),
            }
        }

        match attempt.page.check_boxes_labelled(&CONSENT_KEYWORDS).await {
            Ok(0) => {}
            Ok(count) => info!("{} ☑️ 勾选了 {} 个同意条款", attempt, count),
            Err(e) => debug!("{} 勾选同意条款失败: {}", attempt, e),
        }
    }

    /// 返回 Ok(false) 表示字段被跳过（找不到元素或简历文件不存在）
    async fn fill_field<P: PageDriver>(
        &self,
        page: &P,
        strategy: &PlatformStrategy,
        field: SemanticField,
        value: &str,
    ) -> Result<bool, ApplyError> {
        if field.is_file() && !Path::new(value).exists() {
            warn!("简历文件不存在，跳过上传: {}", value);
            return Ok(false);
        }

        let candidates = strategy.field_candidates(field);
        let Some(found) = self
            .locator
            .locate(page, Target::Field(field), &candidates)
            .await
        else {
            debug!("未找到字段 {}，跳过", field);
            return Ok(false);
        };

        let handle = found.handle;
        let fill_error = |reason: String| ApplyError::FormFill {
            field: field.to_string(),
            reason,
        };

        if !handle.enabled {
            return Err(fill_error("字段不可编辑".to_string()));
        }

        match (field.is_file(), handle.kind) {
            (true, ElementKind::FileInput) => {
                page.upload_file(&handle, Path::new(value))
                    .await
                    .map_err(|e| fill_error(format!("{:#}", e)))?;
            }
            (false, ElementKind::Select) => {
                let selected = page
                    .select_option(&handle, value)
                    .await
                    .map_err(|e| fill_error(format!("{:#}", e)))?;
                if !selected {
                    return Err(fill_error(format!("没有与 '{}' 匹配的选项", value)));
                }
            }
            (false, ElementKind::TextInput | ElementKind::TextArea) => {
                self.type_text(page, &handle, value, &strategy.humanization)
                    .await
                    .map_err(|e| fill_error(format!("{:#}", e)))?;
            }
            (_, kind) => {
                return Err(fill_error(format!("元素类型 {:?} 不匹配", kind)));
            }
        }
        Ok(true)
    }

    /// 逐字输入，每次按键之间随机停顿
    async fn type_text<P: PageDriver>(
        &self,
        page: &P,
        handle: &ElementHandle,
        value: &str,
        humanization: &HumanizationProfile,
    ) -> anyhow::Result<()> {
        page.focus_and_clear(handle).await?;
        let mut buf = [0u8; 4];
        for ch in value.chars() {
            page.insert_text(ch.encode_utf8(&mut buf)).await?;
            pause(self.humanizer.keystroke_pause(humanization)).await;
        }
        Ok(())
    }

    /// 点击提交按钮；找不到或点击失败时在当前焦点按回车
    async fn submit<P: PageDriver>(
        &self,
        page: &P,
        strategy: &PlatformStrategy,
    ) -> Result<(), ApplyError> {
        match self
            .locator
            .locate(page, Target::SubmitTrigger, &strategy.submit_locators)
            .await
        {
            Some(found) => match self.click(page, &found.handle, &strategy.humanization).await {
                Ok(()) => return Ok(()),
                Err(e) => warn!("点击提交按钮失败，改用回车提交: {:#}", e),
            },
            None => debug!("未找到提交按钮，改用回车提交"),
        }

        page.press_enter()
            .await
            .map_err(|e| ApplyError::Submission(format!("回车提交失败: {:#}", e)))
    }

    /// 保存最终页面截图（配置了截图目录时）
    async fn capture<P: PageDriver>(
        &self,
        page: &P,
        job: &JobPosting,
        status: ApplicationStatus,
    ) -> Option<String> {
        let dir = self.settings.screenshots_dir.as_ref()?;
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("无法创建截图目录 {}: {}", dir.display(), e);
            return None;
        }

        let safe_id: String = job
            .id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = dir.join(format!(
            "{}_{}_{}.png",
            safe_id,
            status,
            Utc::now().format("%Y%m%d%H%M%S")
        ));

        match timeout(self.settings.navigation_timeout, page.screenshot(&path)).await {
            Ok(Ok(())) => Some(path.display().to_string()),
            Ok(Err(e)) => {
                warn!("[职位 {}] 截图失败: {:#}", job.id, e);
                None
            }
            Err(_) => {
                warn!("[职位 {}] 截图超时", job.id);
                None
            }
        }
    }
}

impl<S: PageSource, H: Humanizer> AttemptRunner for ApplicationFlow<S, H> {
    async fn run_attempt(&self, job: &JobPosting, profile: &ApplicantProfile) -> ApplicationResult {
        self.execute(job, profile).await.result
    }
}
