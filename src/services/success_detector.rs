//! 投递成功检测 - 业务能力层

use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::infrastructure::{Locator, PageDriver};
use crate::services::humanizer::pause;
use crate::services::strategy_registry::PlatformStrategy;

/// 成功提示元素
const SUCCESS_ELEMENTS: [&str; 5] = [
    r#"[class*="success" i]"#,
    r#"[class*="confirmation" i]"#,
    r#"[class*="thank" i]"#,
    ".submitted",
    ".thank-you",
];

/// 成功页面地址中的关键词
const SUCCESS_URL_KEYWORDS: [&str; 4] = ["success", "confirmation", "thank", "submitted"];

/// 命中的成功信号
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessSignal {
    Phrase(String),
    Element(String),
    UrlKeyword(String),
}

impl std::fmt::Display for SuccessSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuccessSignal::Phrase(p) => write!(f, "短语 '{}'", p),
            SuccessSignal::Element(s) => write!(f, "元素 {}", s),
            SuccessSignal::UrlKeyword(k) => write!(f, "地址关键词 '{}'", k),
        }
    }
}

/// 成功检测服务
#[derive(Debug, Clone)]
pub struct SuccessDetector {
    settle: Duration,
}

impl SuccessDetector {
    /// `settle`: 提交后等待页面稳定的时间
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }

    /// 依次检查：成功短语 → 成功样式元素 → 地址关键词
    pub async fn detect<P: PageDriver>(
        &self,
        page: &P,
        strategy: &PlatformStrategy,
    ) -> Option<SuccessSignal> {
        pause(self.settle).await;

        match page.body_text().await {
            Ok(text) => {
                if let Some(phrase) = matches_phrase(&text, &strategy.success_phrases) {
                    return Some(SuccessSignal::Phrase(phrase.to_string()));
                }
            }
            Err(e) => debug!("读取页面文本失败: {}", e),
        }

        for selector in SUCCESS_ELEMENTS {
            if let Ok(Some(_)) = page.probe(&Locator::css(selector)).await {
                return Some(SuccessSignal::Element(selector.to_string()));
            }
        }

        match page.current_url().await {
            Ok(url) => {
                let url = url.to_lowercase();
                SUCCESS_URL_KEYWORDS
                    .iter()
                    .find(|keyword| url.contains(*keyword))
                    .map(|keyword| SuccessSignal::UrlKeyword(keyword.to_string()))
            }
            Err(e) => {
                debug!("读取页面地址失败: {}", e);
                None
            }
        }
    }
}

/// 小写并把连续空白压缩为单个空格
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 短语的整词匹配规则：`sent` 不会命中 `consent`
fn phrase_pattern(phrase: &str) -> Option<Regex> {
    let needle = normalize_text(phrase);
    let first = needle.chars().next()?;
    let last = needle.chars().next_back()?;

    let body = needle
        .split(' ')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let lead = if first.is_alphanumeric() { r"\b" } else { "" };
    let tail = if last.is_alphanumeric() { r"\b" } else { "" };

    match Regex::new(&format!("(?i){}{}{}", lead, body, tail)) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!("短语 '{}' 无法生成匹配规则: {}", phrase, e);
            None
        }
    }
}

/// 返回文本中出现的第一个短语（大小写、空白不敏感，按整词匹配）
pub fn matches_phrase<'a>(text: &str, phrases: &'a [String]) -> Option<&'a str> {
    let haystack = normalize_text(text);
    phrases
        .iter()
        .map(String::as_str)
        .find(|phrase| phrase_pattern(phrase).is_some_and(|re| re.is_match(&haystack)))
}
