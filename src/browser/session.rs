//! 浏览器会话管理
//!
//! 一个会话对应一个隔离的浏览器上下文（独立 cookie 与存储）和一个随机身份，
//! 在会话内顺序执行多次投递，每次投递使用一个新页面。

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::browser::{
    BrowserContextId, GrantPermissionsParams, PermissionType,
};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetGeolocationOverrideParams, SetLocaleOverrideParams,
    SetTimezoneOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::{Browser, Page};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::identity::BrowserIdentity;
use crate::browser::launcher::{connect_browser, launch_browser, LaunchOptions};
use crate::error::{AppError, BrowserError};
use crate::infrastructure::{ChromePage, PageSource};

/// 获取浏览器的方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserMode {
    /// 自行启动浏览器进程，释放时关闭
    Launch(LaunchOptions),
    /// 连接到用户已打开的浏览器，释放时只销毁本会话的上下文
    Connect { port: u16 },
}

/// 会话提示
#[derive(Debug, Clone, Default)]
pub struct SessionHint {
    /// 日志显示用的名称
    pub label: String,
    /// 固定地区（us-east / us-central / us-west / uk），为空时随机
    pub region: Option<String>,
}

/// 会话管理器
#[derive(Debug, Clone)]
pub struct SessionManager {
    mode: BrowserMode,
}

/// 一个已获取的浏览器会话
pub struct Session {
    label: String,
    browser: Browser,
    handler: JoinHandle<()>,
    context_id: Option<BrowserContextId>,
    identity: BrowserIdentity,
    owned: bool,
}

impl SessionManager {
    pub fn new(mode: BrowserMode) -> Self {
        Self { mode }
    }

    /// 获取一个新会话：浏览器 + 隔离上下文 + 随机身份
    pub async fn acquire(&self, hint: &SessionHint) -> Result<Session> {
        let (mut browser, handler, owned) = match &self.mode {
            BrowserMode::Launch(options) => {
                let (browser, handler) = launch_browser(options).await?;
                (browser, handler, true)
            }
            BrowserMode::Connect { port } => {
                let (browser, handler) = connect_browser(*port).await?;
                (browser, handler, false)
            }
        };

        let identity = BrowserIdentity::random(hint.region.as_deref(), &mut rand::thread_rng());

        let context_id = match browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                handler.abort();
                return Err(AppError::Browser(BrowserError::ContextCreationFailed {
                    source: Box::new(e),
                })
                .into());
            }
        };

        let grant = GrantPermissionsParams::builder()
            .permissions(vec![PermissionType::Geolocation])
            .browser_context_id(context_id.clone())
            .build();
        match grant {
            Ok(params) => {
                if let Err(e) = browser.execute(params).await {
                    warn!("授予定位权限失败: {}", e);
                }
            }
            Err(e) => warn!("构造定位权限参数失败: {}", e),
        }

        info!(
            "✓ 会话 [{}] 已就绪: {} / {}",
            hint.label, identity.region.key, identity.region.timezone
        );
        debug!("User-Agent: {}", identity.user_agent);

        Ok(Session {
            label: hint.label.clone(),
            browser,
            handler,
            context_id: Some(context_id),
            identity,
            owned,
        })
    }

    /// 释放会话：销毁上下文，按需关闭浏览器。失败只记录日志。
    pub async fn release(&self, session: Session) {
        session.shutdown().await;
    }
}

impl Session {
    pub fn identity(&self) -> &BrowserIdentity {
        &self.identity
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    async fn shutdown(mut self) {
        if let Some(context_id) = self.context_id.take() {
            if let Err(e) = self.browser.dispose_browser_context(context_id).await {
                warn!("销毁浏览器上下文失败 [{}]: {}", self.label, e);
            }
        }

        if self.owned {
            if let Err(e) = self.browser.close().await {
                warn!("关闭浏览器失败 [{}]: {}", self.label, e);
            }
            if let Err(e) = self.browser.wait().await {
                warn!("等待浏览器进程退出失败 [{}]: {}", self.label, e);
            }
        }

        self.handler.abort();
        info!("✓ 会话 [{}] 已释放", self.label);
    }

    /// 对新页面应用身份伪装
    async fn apply_identity(&self, page: &Page) -> Result<()> {
        let region = &self.identity.region;

        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(self.identity.user_agent.clone())
            .accept_language(region.accept_language())
            .build()
            .map_err(anyhow::Error::msg)?;
        page.execute(user_agent).await?;

        let (width, height) = self.identity.viewport;
        page.execute(SetDeviceMetricsOverrideParams::new(width, height, 1.0, false))
            .await?;

        page.execute(SetTimezoneOverrideParams::new(region.timezone))
            .await?;

        page.execute(
            SetLocaleOverrideParams::builder()
                .locale(region.locale)
                .build(),
        )
        .await?;

        page.execute(
            SetGeolocationOverrideParams::builder()
                .latitude(region.latitude)
                .longitude(region.longitude)
                .accuracy(100.0)
                .build(),
        )
        .await?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            self.identity.stealth_script(),
        ))
        .await?;

        Ok(())
    }
}

impl PageSource for Session {
    type Page = ChromePage;

    async fn open_page(&self) -> Result<ChromePage> {
        let mut target = CreateTargetParams::builder().url("about:blank");
        if let Some(context_id) = &self.context_id {
            target = target.browser_context_id(context_id.clone());
        }
        let target = target.build().map_err(anyhow::Error::msg)?;

        let page = self.browser.new_page(target).await.map_err(|e| {
            AppError::Browser(BrowserError::PageCreationFailed {
                source: Box::new(e),
            })
        })?;

        // 先包装，身份设置失败时页面也会被关闭
        let chrome_page = ChromePage::new(page);
        self.apply_identity(chrome_page.page())
            .await
            .context("设置浏览器身份失败")?;
        Ok(chrome_page)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // 未显式释放时至少停止事件处理任务
        self.handler.abort();
    }
}
