//! 字段定位服务 - 业务能力层
//!
//! 只负责"在页面上找到某个语义目标"，不填写、不点击。
//!
//! 定位分两层，先命中者胜出：
//! 1. 平台策略声明的定位器（原样使用），精确层超时
//! 2. 关键词 × 通用属性模板合成的选择器，模糊层超时

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::infrastructure::{ElementHandle, Locator, PageDriver};
use crate::models::SemanticField;

/// 定位目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// 表单字段
    Field(SemanticField),
    /// 申请按钮
    ApplyTrigger,
    /// 提交按钮
    SubmitTrigger,
}

impl Target {
    /// 目标的静态关键词
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Target::ApplyTrigger => &["apply"],
            Target::SubmitTrigger => &["submit", "send"],
            Target::Field(field) => field_keywords(field),
        }
    }

    /// 按钮类目标只接受可用元素
    pub fn is_trigger(self) -> bool {
        matches!(self, Target::ApplyTrigger | Target::SubmitTrigger)
    }

    /// 日志与错误信息中的名称
    pub fn describe(self) -> String {
        match self {
            Target::ApplyTrigger => "申请按钮".to_string(),
            Target::SubmitTrigger => "提交按钮".to_string(),
            Target::Field(field) => format!("字段 {}", field),
        }
    }
}

fn field_keywords(field: SemanticField) -> &'static [&'static str] {
    match field {
        SemanticField::Email => &["email", "e-mail", "mail"],
        SemanticField::Phone => &["phone", "mobile", "tel"],
        SemanticField::FirstName => &["first", "given", "fname"],
        SemanticField::LastName => &["last", "family", "surname", "lname"],
        SemanticField::FullName => &["name", "full"],
        SemanticField::LinkedinUrl => &["linkedin", "profile", "social"],
        SemanticField::PortfolioUrl => &["portfolio", "website", "url"],
        SemanticField::SalaryExpectation => &["salary", "compensation", "pay", "wage"],
        SemanticField::Availability => &["start", "available", "notice"],
        SemanticField::CoverLetter => &["cover", "letter", "message", "intro"],
        SemanticField::Experience => &["experience", "years"],
        SemanticField::Education => &["education", "degree"],
        SemanticField::Location => &["location", "city"],
        SemanticField::Resume => &["resume", "cv", "upload", "attach"],
    }
}

/// 字段的内置精确定位器（排在平台覆盖之后使用）
pub fn default_field_locators(field: SemanticField) -> Vec<Locator> {
    let selectors: &[&str] = match field {
        SemanticField::Email => &[
            r#"input[type="email"]"#,
            r#"input[name*="email"]"#,
            r#"input[id*="email"]"#,
            r#"input[placeholder*="email"]"#,
        ],
        SemanticField::Phone => &[
            r#"input[type="tel"]"#,
            r#"input[name*="phone"]"#,
            r#"input[id*="phone"]"#,
            r#"input[placeholder*="phone"]"#,
        ],
        SemanticField::FirstName => &[
            r#"input[name*="first"]"#,
            r#"input[id*="first"]"#,
            r#"input[placeholder*="first"]"#,
        ],
        SemanticField::LastName => &[
            r#"input[name*="last"]"#,
            r#"input[id*="last"]"#,
            r#"input[placeholder*="last"]"#,
        ],
        SemanticField::FullName => &[
            r#"input[name*="name"]"#,
            r#"input[id*="name"]"#,
            r#"input[placeholder*="name"]"#,
        ],
        SemanticField::LinkedinUrl => &[
            r#"input[name*="linkedin"]"#,
            r#"input[id*="linkedin"]"#,
            r#"input[placeholder*="linkedin"]"#,
        ],
        SemanticField::PortfolioUrl => &[
            r#"input[name*="portfolio"]"#,
            r#"input[id*="portfolio"]"#,
            r#"input[placeholder*="portfolio"]"#,
        ],
        SemanticField::SalaryExpectation => &[
            r#"input[name*="salary"]"#,
            r#"input[id*="salary"]"#,
            r#"input[placeholder*="salary"]"#,
        ],
        SemanticField::Availability => &[
            r#"input[name*="start"]"#,
            r#"input[id*="start"]"#,
            r#"select[name*="availability"]"#,
        ],
        SemanticField::CoverLetter => &[
            r#"textarea[name*="cover"]"#,
            r#"textarea[id*="cover"]"#,
            r#"textarea[placeholder*="cover"]"#,
        ],
        SemanticField::Experience => &[
            r#"select[name*="experience"]"#,
            r#"select[id*="experience"]"#,
        ],
        SemanticField::Education => &[
            r#"select[name*="education"]"#,
            r#"select[id*="education"]"#,
        ],
        SemanticField::Location => &[
            r#"input[name*="location"]"#,
            r#"select[name*="location"]"#,
        ],
        SemanticField::Resume => &[
            r#"input[type="file"]"#,
            r#"input[name*="resume"]"#,
            r#"input[id*="resume"]"#,
            r#"input[name*="cv"]"#,
        ],
    };
    selectors.iter().map(|s| Locator::css(*s)).collect()
}

/// 由关键词合成的模糊定位器（属性包含关键词，大小写不敏感）
pub fn fuzzy_locators(target: Target) -> Vec<Locator> {
    let (tags, attrs): (&[&str], &[&str]) = if target.is_trigger() {
        (&["button", "a", "input"], &["id", "class", "aria-label", "value"])
    } else {
        (&["input", "textarea", "select"], &["name", "id", "placeholder"])
    };

    let mut locators = Vec::new();
    for keyword in target.keywords() {
        for tag in tags {
            for attr in attrs {
                locators.push(Locator::css(format!(
                    r#"{}[{}*="{}" i]"#,
                    tag, attr, keyword
                )));
            }
        }
        if target.is_trigger() {
            locators.push(Locator::text("button", *keyword));
            locators.push(Locator::text("a", *keyword));
        }
    }
    locators
}

/// 定位超时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorTimeouts {
    /// 精确层总超时（不超过 5 秒）
    pub exact: Duration,
    /// 模糊层总超时
    pub fuzzy: Duration,
    /// 轮询间隔
    pub poll: Duration,
}

impl Default for LocatorTimeouts {
    fn default() -> Self {
        Self {
            exact: Duration::from_secs(3),
            fuzzy: Duration::from_secs(1),
            poll: Duration::from_millis(250),
        }
    }
}

impl LocatorTimeouts {
    /// 每层只探测一遍，不等待（测试用）
    pub fn immediate() -> Self {
        Self {
            exact: Duration::ZERO,
            fuzzy: Duration::ZERO,
            poll: Duration::ZERO,
        }
    }
}

/// 命中的层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Keyword,
}

/// 定位结果
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedElement {
    pub handle: ElementHandle,
    /// 命中的定位器
    pub locator: Locator,
    pub tier: MatchTier,
}

/// 字段定位服务
#[derive(Debug, Clone, Default)]
pub struct FieldLocator {
    timeouts: LocatorTimeouts,
}

impl FieldLocator {
    pub fn new(timeouts: LocatorTimeouts) -> Self {
        let exact = timeouts.exact.min(Duration::from_secs(5));
        Self {
            timeouts: LocatorTimeouts { exact, ..timeouts },
        }
    }

    pub fn timeouts(&self) -> LocatorTimeouts {
        self.timeouts
    }

    /// 定位目标元素，两层都未命中时返回 None
    pub async fn locate<P: PageDriver>(
        &self,
        page: &P,
        target: Target,
        candidates: &[Locator],
    ) -> Option<LocatedElement> {
        let require_enabled = target.is_trigger();

        if let Some((handle, locator)) = self
            .poll_tier(page, candidates, self.timeouts.exact, require_enabled)
            .await
        {
            debug!("精确命中 {}: {}", target.describe(), locator);
            return Some(LocatedElement {
                handle,
                locator,
                tier: MatchTier::Exact,
            });
        }

        let fuzzy = fuzzy_locators(target);
        if let Some((handle, locator)) = self
            .poll_tier(page, &fuzzy, self.timeouts.fuzzy, require_enabled)
            .await
        {
            debug!("关键词命中 {}: {}", target.describe(), locator);
            return Some(LocatedElement {
                handle,
                locator,
                tier: MatchTier::Keyword,
            });
        }

        debug!("未找到 {}", target.describe());
        None
    }

    /// 在超时内轮询一组定位器，至少完整探测一遍
    async fn poll_tier<P: PageDriver>(
        &self,
        page: &P,
        locators: &[Locator],
        timeout: Duration,
        require_enabled: bool,
    ) -> Option<(ElementHandle, Locator)> {
        if locators.is_empty() {
            return None;
        }

        let deadline = Instant::now() + timeout;
        loop {
            for locator in locators {
                match page.probe(locator).await {
                    Ok(Some(handle)) if !require_enabled || handle.enabled => {
                        return Some((handle, locator.clone()));
                    }
                    Ok(_) => {}
                    Err(e) => debug!("探测 {} 失败: {}", locator, e),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let wait = self.timeouts.poll.min(deadline - now);
            if wait.is_zero() {
                return None;
            }
            sleep(wait).await;
        }
    }
}
