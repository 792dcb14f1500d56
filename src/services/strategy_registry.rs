//! 平台策略注册表 - 业务能力层
//!
//! 策略是数据而不是代码：每个平台只声明定位器、成功短语和拟人化参数，
//! 状态机对所有平台使用同一套流程。

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, FileError};
use crate::infrastructure::Locator;
use crate::models::SemanticField;
use crate::services::field_locator::default_field_locators;

/// 兜底策略的键
pub const GENERIC_KEY: &str = "generic";

/// 平台名称别名 → 标准键
static PLATFORM_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "ziprecruiter" => "zip_recruiter",
    "zip-recruiter" => "zip_recruiter",
    "zip recruiter" => "zip_recruiter",
    "linked-in" => "linkedin",
    "linked in" => "linkedin",
    "google_jobs" => "google",
    "google jobs" => "google",
    "indeed.com" => "indeed",
    "glassdoor.com" => "glassdoor",
    "bayt.com" => "bayt",
    "naukri.com" => "naukri",
    "lever.co" => "lever",
    "greenhouse.io" => "greenhouse",
    "myworkdayjobs" => "workday",
    "bamboo_hr" => "bamboohr",
    "smart_recruiters" => "smartrecruiters",
};

/// 拟人化参数（毫秒，闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanizationProfile {
    pub action_delay_ms: (u64, u64),
    pub keystroke_delay_ms: (u64, u64),
}

impl Default for HumanizationProfile {
    fn default() -> Self {
        Self {
            action_delay_ms: (500, 1500),
            keystroke_delay_ms: (50, 150),
        }
    }
}

impl HumanizationProfile {
    pub fn action_delay(&self) -> (Duration, Duration) {
        ordered_range(self.action_delay_ms)
    }

    pub fn keystroke_delay(&self) -> (Duration, Duration) {
        ordered_range(self.keystroke_delay_ms)
    }
}

fn ordered_range((a, b): (u64, u64)) -> (Duration, Duration) {
    (Duration::from_millis(a.min(b)), Duration::from_millis(a.max(b)))
}

/// 平台策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStrategy {
    pub key: String,
    /// 申请按钮定位器（按顺序尝试）
    #[serde(default)]
    pub apply_locators: Vec<Locator>,
    /// 提交按钮定位器（按顺序尝试）
    #[serde(default)]
    pub submit_locators: Vec<Locator>,
    /// 成功短语（大小写不敏感）
    #[serde(default)]
    pub success_phrases: Vec<String>,
    #[serde(default)]
    pub already_applied_phrases: Vec<String>,
    #[serde(default)]
    pub captcha_locators: Vec<Locator>,
    /// 字段定位器覆盖，排在内置定位器之前
    #[serde(default)]
    pub field_overrides: BTreeMap<SemanticField, Vec<Locator>>,
    #[serde(default)]
    pub humanization: HumanizationProfile,
    /// 需要专用流程（本系统不支持），找不到申请入口时返回 not_supported
    #[serde(default)]
    pub requires_dedicated_flow: bool,
    /// 视为"平台内投递"的主机名
    #[serde(default)]
    pub native_hosts: Vec<String>,
}

impl PlatformStrategy {
    /// 字段的候选定位器：平台覆盖在前，内置定位器在后
    pub fn field_candidates(&self, field: SemanticField) -> Vec<Locator> {
        let mut candidates = self
            .field_overrides
            .get(&field)
            .cloned()
            .unwrap_or_default();
        for locator in default_field_locators(field) {
            if !candidates.contains(&locator) {
                candidates.push(locator);
            }
        }
        candidates
    }

    /// 主机名是否属于平台自身
    pub fn is_native_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.native_hosts.iter().any(|native| {
            let native = native.to_ascii_lowercase();
            host == native || host.ends_with(&format!(".{}", native))
        })
    }

    /// 空列表从兜底策略继承
    fn inherit_from(mut self, generic: &PlatformStrategy) -> Self {
        fn fill<T: Clone>(target: &mut Vec<T>, source: &[T]) {
            if target.is_empty() {
                *target = source.to_vec();
            }
        }
        fill(&mut self.apply_locators, &generic.apply_locators);
        fill(&mut self.submit_locators, &generic.submit_locators);
        fill(&mut self.success_phrases, &generic.success_phrases);
        fill(&mut self.already_applied_phrases, &generic.already_applied_phrases);
        fill(&mut self.captcha_locators, &generic.captcha_locators);
        self
    }
}

/// 策略文件结构
///
/// ```toml
/// [[platforms]]
/// key = "acme_jobs"
/// apply_locators = ["#apply", { tag = "button", text = "Apply" }]
/// success_phrases = ["thanks for applying"]
/// native_hosts = ["jobs.acme.test"]
/// ```
#[derive(Debug, Deserialize)]
struct StrategyFile {
    #[serde(default)]
    platforms: Vec<PlatformStrategy>,
}

/// 平台策略注册表（进程启动时构建，之后只读）
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<PlatformStrategy>>,
    generic: Arc<PlatformStrategy>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StrategyRegistry {
    /// 内置策略
    pub fn builtin() -> Self {
        let generic = Arc::new(generic_strategy());
        let strategies = builtin_platforms()
            .into_iter()
            .map(|s| s.inherit_from(&generic))
            .map(|s| (s.key.clone(), Arc::new(s)))
            .collect();
        Self {
            strategies,
            generic,
        }
    }

    /// 在内置策略基础上合并 TOML 文本中的平台
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: StrategyFile = toml::from_str(content)?;
        let mut registry = Self::builtin();
        for strategy in file.platforms {
            registry.insert(strategy);
        }
        Ok(registry)
    }

    /// 从策略文件加载
    pub async fn load_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let registry = Self::from_toml_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source: e,
            })
        })?;

        info!(
            "✓ 从 {} 加载了平台策略，共 {} 个平台",
            path.display(),
            registry.strategies.len()
        );
        Ok(registry)
    }

    /// 新增或替换一个平台
    pub fn insert(&mut self, mut strategy: PlatformStrategy) {
        strategy.key = normalize_key(&strategy.key);
        if strategy.key == GENERIC_KEY {
            let merged = strategy.inherit_from(&self.generic);
            self.generic = Arc::new(merged);
            debug!("已替换兜底策略");
            return;
        }
        let merged = strategy.inherit_from(&self.generic);
        debug!("已注册平台策略: {}", merged.key);
        self.strategies.insert(merged.key.clone(), Arc::new(merged));
    }

    /// 按平台名查找策略，大小写不敏感，找不到时返回兜底策略（不会失败）
    pub fn resolve(&self, platform: &str) -> Arc<PlatformStrategy> {
        let key = normalize_key(platform);
        match self.strategies.get(&key) {
            Some(strategy) => Arc::clone(strategy),
            None => {
                debug!("平台 '{}' 未注册，使用兜底策略", platform);
                Arc::clone(&self.generic)
            }
        }
    }

    pub fn generic(&self) -> Arc<PlatformStrategy> {
        Arc::clone(&self.generic)
    }

    /// 已注册平台键（不含兜底策略），已排序
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

/// 规范化平台名：去空白、小写、解析别名
pub fn normalize_key(platform: &str) -> String {
    let key = platform.trim().to_lowercase();
    match PLATFORM_ALIASES.get(key.as_str()) {
        Some(alias) => (*alias).to_string(),
        None => key,
    }
}

fn css(selectors: &[&str]) -> Vec<Locator> {
    selectors.iter().map(|s| Locator::css(*s)).collect()
}

fn phrases(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn generic_strategy() -> PlatformStrategy {
    let mut apply_locators = css(&[r#"button[class*="apply"]"#]);
    apply_locators.extend([
        Locator::text("button", "Apply"),
        Locator::text("a", "Apply"),
        Locator::text("button", "Submit Application"),
    ]);
    apply_locators.extend(css(&[
        r#"input[type="submit"][value*="Apply"]"#,
        ".apply-button",
        "#apply-button",
        r#"[data-testid*="apply"]"#,
        r#"[data-test*="apply"]"#,
    ]));

    let mut submit_locators = css(&[r#"button[type="submit"]"#, r#"input[type="submit"]"#]);
    submit_locators.extend([
        Locator::text("button", "Submit"),
        Locator::text("button", "Send Application"),
        Locator::text("button", "Send"),
    ]);
    submit_locators.extend(css(&[".submit-button", "#submit-button"]));

    PlatformStrategy {
        key: GENERIC_KEY.to_string(),
        apply_locators,
        submit_locators,
        // 只用多词短语，单词容易误中（consent、Applied Materials）
        success_phrases: phrases(&[
            "application submitted",
            "application sent",
            "application received",
            "application has been submitted",
            "application was submitted",
            "thank you for applying",
            "thanks for applying",
            "successfully applied",
            "successfully submitted",
        ]),
        already_applied_phrases: phrases(&[
            "you have already applied",
            "you applied",
            "already applied",
            "application already submitted",
        ]),
        captcha_locators: css(&[
            r#"iframe[src*="recaptcha"]"#,
            r#"iframe[src*="hcaptcha"]"#,
            ".g-recaptcha",
            ".h-captcha",
            "#captcha",
        ]),
        field_overrides: BTreeMap::new(),
        humanization: HumanizationProfile::default(),
        requires_dedicated_flow: false,
        native_hosts: Vec::new(),
    }
}

/// 平台骨架：列表留空的部分从兜底策略继承
fn platform(key: &str, native_hosts: &[&str]) -> PlatformStrategy {
    PlatformStrategy {
        key: key.to_string(),
        apply_locators: Vec::new(),
        submit_locators: Vec::new(),
        success_phrases: Vec::new(),
        already_applied_phrases: Vec::new(),
        captcha_locators: Vec::new(),
        field_overrides: BTreeMap::new(),
        humanization: HumanizationProfile::default(),
        requires_dedicated_flow: false,
        native_hosts: native_hosts.iter().map(|h| h.to_string()).collect(),
    }
}

fn builtin_platforms() -> Vec<PlatformStrategy> {
    let indeed = PlatformStrategy {
        apply_locators: {
            let mut locators = css(&[r#"button[aria-label*="Apply"]"#]);
            locators.extend([
                Locator::text("button", "Apply now"),
                Locator::text("button", "Apply"),
                Locator::text("a", "Apply now"),
                Locator::text("a", "Apply"),
            ]);
            locators.extend(css(&[
                r#"[data-testid="apply-button"]"#,
                ".jobsearch-ApplyButton",
                ".jobsearch-JobComponent-footer button",
            ]));
            locators
        },
        success_phrases: phrases(&[
            "application submitted",
            "application sent",
            "thank you for applying",
            "your application has been submitted",
        ]),
        field_overrides: BTreeMap::from([
            (
                SemanticField::FullName,
                css(&[r#"input[name="applicant.name"]"#]),
            ),
            (
                SemanticField::Email,
                css(&[r#"input[name="applicant.emailAddress"]"#]),
            ),
            (
                SemanticField::Phone,
                css(&[r#"input[name="applicant.phoneNumber"]"#]),
            ),
        ]),
        humanization: HumanizationProfile {
            action_delay_ms: (1000, 3000),
            keystroke_delay_ms: (50, 150),
        },
        ..platform("indeed", &["indeed.com"])
    };

    let linkedin = PlatformStrategy {
        apply_locators: {
            let mut locators = css(&[r#"button[aria-label*="Easy Apply"]"#]);
            locators.push(Locator::text("button", "Easy Apply"));
            locators.extend(css(&[
                ".jobs-apply-button",
                ".jobs-s-apply button",
                r#"[data-control-name="jobdetails_topcard_inapply"]"#,
            ]));
            locators
        },
        success_phrases: phrases(&[
            "application submitted",
            "your application has been sent",
            "thanks for applying",
        ]),
        requires_dedicated_flow: true,
        ..platform("linkedin", &["linkedin.com"])
    };

    let glassdoor = PlatformStrategy {
        apply_locators: {
            let mut locators = css(&[
                r#"button[data-test="applyButton"]"#,
                r#"[data-test="easyApply"]"#,
            ]);
            locators.push(Locator::text("button", "Easy Apply"));
            locators.push(Locator::text("button", "Apply"));
            locators
        },
        success_phrases: phrases(&[
            "application submitted",
            "application sent",
            "thank you for applying",
        ]),
        ..platform("glassdoor", &["glassdoor.com"])
    };

    let google = PlatformStrategy {
        apply_locators: vec![
            Locator::text("a", "Apply on"),
            Locator::text("a", "Apply"),
            Locator::text("button", "Apply"),
        ],
        success_phrases: phrases(&["application submitted", "application sent"]),
        ..platform("google", &["google.com"])
    };

    let zip_recruiter = PlatformStrategy {
        apply_locators: {
            let mut locators = css(&[
                r#"button[class*="quick_apply"]"#,
                r#"[data-testid="apply-button"]"#,
            ]);
            locators.push(Locator::text("button", "1-Click Apply"));
            locators.push(Locator::text("button", "Apply"));
            locators
        },
        success_phrases: phrases(&["application submitted", "application sent"]),
        ..platform("zip_recruiter", &["ziprecruiter.com"])
    };

    let bayt = PlatformStrategy {
        apply_locators: {
            let mut locators = css(&["#applyLink", r#"a[data-js-aid="applyButton"]"#]);
            locators.push(Locator::text("a", "Apply"));
            locators
        },
        success_phrases: phrases(&[
            "successfully applied",
            "application submitted",
            "thank you for applying",
        ]),
        ..platform("bayt", &["bayt.com"])
    };

    let naukri = PlatformStrategy {
        apply_locators: {
            let mut locators = css(&["#apply-button", r#"button[class*="apply-button"]"#]);
            locators.push(Locator::text("button", "Apply"));
            locators
        },
        success_phrases: phrases(&[
            "applied successfully",
            "application submitted",
            "thank you for applying",
        ]),
        ..platform("naukri", &["naukri.com"])
    };

    let lever = PlatformStrategy {
        apply_locators: {
            let mut locators = css(&["a.postings-btn", ".template-btn-submit"]);
            locators.push(Locator::text("a", "Apply for this job"));
            locators
        },
        submit_locators: css(&["#btn-submit", r#"button[type="submit"]"#]),
        success_phrases: phrases(&["application submitted", "thank you for applying"]),
        field_overrides: BTreeMap::from([
            (SemanticField::FullName, css(&[r#"input[name="name"]"#])),
            (
                SemanticField::LinkedinUrl,
                css(&[r#"input[name="urls[LinkedIn]"]"#]),
            ),
            (
                SemanticField::PortfolioUrl,
                css(&[r#"input[name="urls[Portfolio]"]"#]),
            ),
            (SemanticField::Resume, css(&["#resume-upload-input"])),
        ]),
        ..platform("lever", &["lever.co"])
    };

    let greenhouse = PlatformStrategy {
        apply_locators: {
            let mut locators = css(&["#apply_button", r##"a[href="#app"]"##]);
            locators.push(Locator::text("button", "Apply"));
            locators
        },
        submit_locators: css(&["#submit_app", r#"button[type="submit"]"#]),
        success_phrases: phrases(&[
            "application has been submitted",
            "thank you for applying",
            "application submitted",
        ]),
        field_overrides: BTreeMap::from([
            (SemanticField::FirstName, css(&["#first_name"])),
            (SemanticField::LastName, css(&["#last_name"])),
            (SemanticField::Email, css(&["#email"])),
            (SemanticField::Phone, css(&["#phone"])),
        ]),
        ..platform("greenhouse", &["greenhouse.io"])
    };

    let workday = PlatformStrategy {
        apply_locators: {
            let mut locators = css(&[r#"a[data-automation-id="adventureButton"]"#]);
            locators.push(Locator::text("a", "Apply"));
            locators
        },
        submit_locators: css(&[
            r#"button[data-automation-id="bottom-navigation-next-button"]"#,
            r#"button[type="submit"]"#,
        ]),
        success_phrases: phrases(&["application submitted", "successfully submitted"]),
        humanization: HumanizationProfile {
            action_delay_ms: (1000, 2500),
            keystroke_delay_ms: (60, 180),
        },
        ..platform("workday", &["myworkdayjobs.com", "workday.com"])
    };

    let bamboohr = PlatformStrategy {
        apply_locators: {
            let mut locators = css(&[r#"button[class*="ApplyButton"]"#]);
            locators.push(Locator::text("button", "Apply for This Job"));
            locators
        },
        submit_locators: css(&[r#"button[type="submit"]"#]),
        success_phrases: phrases(&["application submitted", "thank you for your interest"]),
        ..platform("bamboohr", &["bamboohr.com"])
    };

    let smartrecruiters = PlatformStrategy {
        apply_locators: {
            let mut locators = css(&[r#"a[data-test="apply-button"]"#, ".js-btn-apply"]);
            locators.push(Locator::text("button", "I'm interested"));
            locators
        },
        submit_locators: css(&[r#"button[data-test="footer-submit"]"#, r#"button[type="submit"]"#]),
        success_phrases: phrases(&["application submitted", "thank you for applying"]),
        ..platform("smartrecruiters", &["smartrecruiters.com"])
    };

    vec![
        indeed,
        linkedin,
        glassdoor,
        google,
        zip_recruiter,
        bayt,
        naukri,
        lever,
        greenhouse,
        workday,
        bamboohr,
        smartrecruiters,
    ]
}
