//! 测试公共工具：内存页面与脚本化投递器
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use auto_apply::infrastructure::{ElementHandle, ElementKind, Locator, PageDriver, PageSource};
use auto_apply::models::{ApplicationMethod, ApplicationResult, ApplicationStatus};
use auto_apply::{ApplicantProfile, AttemptRunner, JobPosting};

/// 假页面上的一个元素
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub kind: ElementKind,
    pub enabled: bool,
    /// 下拉框选项
    pub options: Vec<String>,
}

impl FakeElement {
    pub fn of(kind: ElementKind) -> Self {
        Self {
            kind,
            enabled: true,
            options: Vec::new(),
        }
    }

    pub fn disabled(kind: ElementKind) -> Self {
        Self {
            enabled: false,
            ..Self::of(kind)
        }
    }

    pub fn select(options: &[&str]) -> Self {
        Self {
            options: options.iter().map(|s| s.to_string()).collect(),
            ..Self::of(ElementKind::Select)
        }
    }
}

/// 一个站点的行为脚本
#[derive(Debug, Clone, Default)]
pub struct FakeSite {
    pub elements: HashMap<Locator, FakeElement>,
    pub apply: Option<Locator>,
    pub submit: Option<Locator>,
    /// 提交前的页面文本
    pub body: String,
    /// 提交后的页面文本
    pub body_after_submit: String,
    /// 点击申请后跳转的地址
    pub url_after_apply: Option<String>,
    pub url_after_submit: Option<String>,
    pub navigation_error: Option<String>,
    /// 导航耗时
    pub navigation_delay: Duration,
    pub open_error: Option<String>,
    pub enter_fails: bool,
    pub consent_boxes: usize,
    /// 同一元素的其他选择器（例如 name="first_name" 同时命中 first 与 name）
    pub aliases: HashMap<Locator, Locator>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: Locator, element: FakeElement) -> Self {
        self.elements.insert(locator, element);
        self
    }

    pub fn with_apply(mut self, locator: Locator) -> Self {
        self.elements
            .insert(locator.clone(), FakeElement::of(ElementKind::Button));
        self.apply = Some(locator);
        self
    }

    pub fn with_submit(mut self, locator: Locator) -> Self {
        self.elements
            .insert(locator.clone(), FakeElement::of(ElementKind::Button));
        self.submit = Some(locator);
        self
    }

    pub fn with_alias(mut self, alias: Locator, element: Locator) -> Self {
        self.aliases.insert(alias, element);
        self
    }

    pub fn with_body(mut self, before: &str, after_submit: &str) -> Self {
        self.body = before.to_string();
        self.body_after_submit = after_submit.to_string();
        self
    }
}

/// 页面操作记录，所有页面共享
#[derive(Debug, Default)]
pub struct FakeLog {
    pub opened: usize,
    pub closed: usize,
    pub clicks: Vec<String>,
    pub typed: HashMap<String, String>,
    /// 每个元素被聚焦清空的次数
    pub focus_counts: HashMap<String, usize>,
    pub selected: HashMap<String, String>,
    pub uploads: Vec<PathBuf>,
    pub enter_presses: usize,
    pub consent_checked: usize,
}

#[derive(Debug, Default)]
struct PageState {
    url: String,
    applied: bool,
    submitted: bool,
    focused: Option<String>,
    filled: HashSet<String>,
}

pub struct FakePage {
    site: FakeSite,
    log: Arc<Mutex<FakeLog>>,
    state: Mutex<PageState>,
}

impl FakePage {
    fn element_for(&self, selector: &str) -> Option<(&Locator, &FakeElement)> {
        self.site
            .elements
            .iter()
            .find(|(locator, _)| locator.to_string() == selector)
    }

    fn mark_filled(&self, element: &ElementHandle) {
        self.state
            .lock()
            .unwrap()
            .filled
            .insert(element.selector.clone());
    }
}

impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<()> {
        if !self.site.navigation_delay.is_zero() {
            tokio::time::sleep(self.site.navigation_delay).await;
        }
        if let Some(reason) = &self.site.navigation_error {
            return Err(anyhow!("{}", reason));
        }
        self.state.lock().unwrap().url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn probe(&self, locator: &Locator) -> Result<Option<ElementHandle>> {
        let locator = self.site.aliases.get(locator).unwrap_or(locator);
        let Some(element) = self.site.elements.get(locator) else {
            return Ok(None);
        };
        let selector = locator.to_string();
        if self.state.lock().unwrap().filled.contains(&selector) {
            return Ok(None);
        }
        Ok(Some(ElementHandle {
            selector,
            kind: element.kind,
            enabled: element.enabled,
        }))
    }

    async fn click(&self, element: &ElementHandle, _offset: (f64, f64)) -> Result<()> {
        self.log.lock().unwrap().clicks.push(element.selector.clone());
        let is = |locator: &Option<Locator>| {
            locator
                .as_ref()
                .is_some_and(|l| l.to_string() == element.selector)
        };

        let mut state = self.state.lock().unwrap();
        if is(&self.site.apply) && !state.applied {
            state.applied = true;
            if let Some(url) = &self.site.url_after_apply {
                state.url = url.clone();
            }
        } else if is(&self.site.submit) {
            state.submitted = true;
            if let Some(url) = &self.site.url_after_submit {
                state.url = url.clone();
            }
        }
        Ok(())
    }

    async fn focus_and_clear(&self, element: &ElementHandle) -> Result<()> {
        self.element_for(&element.selector)
            .ok_or_else(|| anyhow!("元素已不存在: {}", element.selector))?;
        self.mark_filled(element);
        self.state.lock().unwrap().focused = Some(element.selector.clone());
        let mut log = self.log.lock().unwrap();
        *log.focus_counts.entry(element.selector.clone()).or_default() += 1;
        log.typed.insert(element.selector.clone(), String::new());
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> Result<()> {
        let focused = self
            .state
            .lock()
            .unwrap()
            .focused
            .clone()
            .ok_or_else(|| anyhow!("没有聚焦的元素"))?;
        self.log
            .lock()
            .unwrap()
            .typed
            .entry(focused)
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, value: &str) -> Result<bool> {
        let (_, fake) = self
            .element_for(&element.selector)
            .ok_or_else(|| anyhow!("元素已不存在: {}", element.selector))?;
        let matched = fake
            .options
            .iter()
            .find(|option| option.eq_ignore_ascii_case(value.trim()))
            .cloned();
        match matched {
            Some(option) => {
                self.mark_filled(element);
                self.log
                    .lock()
                    .unwrap()
                    .selected
                    .insert(element.selector.clone(), option);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upload_file(&self, element: &ElementHandle, path: &Path) -> Result<()> {
        self.mark_filled(element);
        self.log.lock().unwrap().uploads.push(path.to_path_buf());
        Ok(())
    }

    async fn check_boxes_labelled(&self, _keywords: &[&str]) -> Result<usize> {
        let count = self.site.consent_boxes;
        self.log.lock().unwrap().consent_checked += count;
        Ok(count)
    }

    async fn press_enter(&self) -> Result<()> {
        if self.site.enter_fails {
            return Err(anyhow!("焦点元素不接受回车"));
        }
        self.log.lock().unwrap().enter_presses += 1;
        let mut state = self.state.lock().unwrap();
        state.submitted = true;
        if let Some(url) = &self.site.url_after_submit {
            state.url = url.clone();
        }
        Ok(())
    }

    async fn body_text(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        Ok(if state.submitted {
            self.site.body_after_submit.clone()
        } else {
            self.site.body.clone()
        })
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        std::fs::write(path, b"png")?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// 每次打开一个按 `FakeSite` 行为的新页面
#[derive(Clone)]
pub struct FakePageSource {
    site: FakeSite,
    log: Arc<Mutex<FakeLog>>,
}

impl FakePageSource {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site,
            log: Arc::new(Mutex::new(FakeLog::default())),
        }
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, FakeLog> {
        self.log.lock().unwrap()
    }
}

impl PageSource for FakePageSource {
    type Page = FakePage;

    async fn open_page(&self) -> Result<FakePage> {
        if let Some(reason) = &self.site.open_error {
            return Err(anyhow!("{}", reason));
        }
        self.log.lock().unwrap().opened += 1;
        Ok(FakePage {
            site: self.site.clone(),
            log: Arc::clone(&self.log),
            state: Mutex::new(PageState::default()),
        })
    }
}

/// 按预设顺序返回状态的投递器，脚本用尽后重复 `fallback`
pub struct ScriptedRunner {
    script: Mutex<VecDeque<ApplicationStatus>>,
    fallback: ApplicationStatus,
    calls: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new(script: &[ApplicationStatus], fallback: ApplicationStatus) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(status: ApplicationStatus) -> Self {
        Self::new(&[], status)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AttemptRunner for ScriptedRunner {
    async fn run_attempt(&self, job: &JobPosting, _profile: &ApplicantProfile) -> ApplicationResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let status = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        scripted_result(job, status)
    }
}

/// 按职位决定行为的投递器
pub struct FnRunner<F> {
    decide: F,
    calls: AtomicUsize,
}

impl<F> FnRunner<F>
where
    F: Fn(&JobPosting) -> ApplicationStatus,
{
    pub fn new(decide: F) -> Self {
        Self {
            decide,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> AttemptRunner for FnRunner<F>
where
    F: Fn(&JobPosting) -> ApplicationStatus,
{
    async fn run_attempt(&self, job: &JobPosting, _profile: &ApplicantProfile) -> ApplicationResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let status = (self.decide)(job);
        scripted_result(job, status)
    }
}

/// 一直挂起直到被取消的投递器
pub struct HangingRunner;

impl AttemptRunner for HangingRunner {
    async fn run_attempt(&self, job: &JobPosting, _profile: &ApplicantProfile) -> ApplicationResult {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        scripted_result(job, ApplicationStatus::Applied)
    }
}

pub fn scripted_result(job: &JobPosting, status: ApplicationStatus) -> ApplicationResult {
    match status {
        ApplicationStatus::Applied | ApplicationStatus::AlreadyApplied => {
            ApplicationResult::new(job, status, None, ApplicationMethod::NativeForm, 0.9)
        }
        other => ApplicationResult::new(
            job,
            other,
            Some(format!("脚本状态: {}", other)),
            ApplicationMethod::Unknown,
            0.0,
        ),
    }
}

pub fn jobs(count: usize, platform: &str) -> Vec<JobPosting> {
    (1..=count)
        .map(|i| {
            JobPosting::new(
                i.to_string(),
                format!("https://example.test/job/{}", i),
                platform,
            )
        })
        .collect()
}
