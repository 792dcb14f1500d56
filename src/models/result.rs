use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::field::SemanticField;
use crate::models::job::JobPosting;

/// 投递结果状态（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Failed,
    RequiresManual,
    AlreadyApplied,
    NotSupported,
}

impl ApplicationStatus {
    /// 结论性状态：得到后不再重试
    pub fn is_conclusive(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Applied
                | ApplicationStatus::AlreadyApplied
                | ApplicationStatus::NotSupported
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Failed => "failed",
            ApplicationStatus::RequiresManual => "requires_manual",
            ApplicationStatus::AlreadyApplied => "already_applied",
            ApplicationStatus::NotSupported => "not_supported",
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 投递方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationMethod {
    /// 在招聘平台自身的表单中完成
    NativeForm,
    /// 跳转到第三方 ATS 页面
    External,
    #[default]
    Unknown,
}

/// 单个职位的投递结果
///
/// 构造后不可修改，由外部持久化模块保存。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationResult {
    job_id: String,
    job_url: String,
    success: bool,
    status: ApplicationStatus,
    error_message: Option<String>,
    retry_count: u32,
    completed_at: DateTime<Utc>,
    application_method: ApplicationMethod,
    confidence_score: f64,
    #[serde(default)]
    filled_fields: Vec<SemanticField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    screenshot_path: Option<String>,
}

impl ApplicationResult {
    /// 通用构造函数，置信度会被限制在 [0, 1]
    pub fn new(
        job: &JobPosting,
        status: ApplicationStatus,
        error_message: Option<String>,
        application_method: ApplicationMethod,
        confidence_score: f64,
    ) -> Self {
        let confidence_score = if confidence_score.is_finite() {
            confidence_score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            job_id: job.id.clone(),
            job_url: job.url.clone(),
            success: status == ApplicationStatus::Applied,
            status,
            error_message: error_message.filter(|m| !m.trim().is_empty()),
            retry_count: 0,
            completed_at: Utc::now(),
            application_method,
            confidence_score,
            filled_fields: Vec::new(),
            screenshot_path: None,
        }
    }

    /// 失败结果
    pub fn failed(job: &JobPosting, message: impl Into<String>) -> Self {
        Self::new(
            job,
            ApplicationStatus::Failed,
            Some(message.into()),
            ApplicationMethod::Unknown,
            0.0,
        )
    }

    /// 附带已填写字段
    pub fn with_filled_fields(mut self, fields: Vec<SemanticField>) -> Self {
        self.filled_fields = fields;
        self
    }

    /// 附带截图路径
    pub fn with_screenshot(mut self, path: Option<String>) -> Self {
        self.screenshot_path = path;
        self
    }

    /// 返回一个记录了重试次数的新结果
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn job_url(&self) -> &str {
        &self.job_url
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn application_method(&self) -> ApplicationMethod {
        self.application_method
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn filled_fields(&self) -> &[SemanticField] {
        &self.filled_fields
    }

    pub fn screenshot_path(&self) -> Option<&str> {
        self.screenshot_path.as_deref()
    }
}
