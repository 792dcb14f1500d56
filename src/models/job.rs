use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 职位信息（由外部抓取模块提供，编排器只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    /// 投递页面链接，必须是绝对 URL
    pub url: String,
    /// 来源平台名称，大小写不敏感
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
}

impl JobPosting {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            platform: platform.into(),
            title: String::new(),
            company: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>, company: impl Into<String>) -> Self {
        self.title = title.into();
        self.company = company.into();
        self
    }

    /// 校验职位记录
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::MissingJobId {
                url: self.url.clone(),
            });
        }
        self.parsed_url().map(|_| ())
    }

    /// 解析投递链接，只接受 http(s) 绝对地址
    pub fn parsed_url(&self) -> Result<Url, ConfigError> {
        let invalid = || ConfigError::InvalidJobUrl {
            job_id: self.id.clone(),
            url: self.url.clone(),
        };
        let url = Url::parse(self.url.trim()).map_err(|_| invalid())?;
        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(url),
            _ => Err(invalid()),
        }
    }

    /// 投递链接的主机名（小写）
    pub fn host(&self) -> Option<String> {
        self.parsed_url()
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_ascii_lowercase()))
    }

    /// 日志显示用的简短描述
    pub fn label(&self) -> String {
        match (self.title.is_empty(), self.company.is_empty()) {
            (false, false) => format!("{} @ {}", self.title, self.company),
            (false, true) => self.title.clone(),
            _ => self.id.clone(),
        }
    }
}
