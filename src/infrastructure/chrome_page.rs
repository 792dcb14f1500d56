//! Chrome 页面驱动 - 基础设施层
//!
//! 持有一次投递独占的 Page，只暴露"操作页面"的能力，不认识职位与求职者。

use anyhow::{bail, Context, Result};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::layout::Point;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::{debug, warn};

use crate::infrastructure::page_driver::{ElementHandle, ElementKind, Locator, PageDriver};

/// 定位到的元素上写入的引用属性
const REF_ATTR: &str = "data-autoapply-ref";
/// 已填写元素上的标记属性
const FILLED_ATTR: &str = "data-autoapply-filled";

/// Chrome 页面驱动
///
/// 未显式关闭就被丢弃时（例如投递被取消），会在后台关闭页面。
pub struct ChromePage {
    page: Page,
    closed: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProbeHit {
    found: bool,
    reference: String,
    tag: String,
    input_type: String,
    enabled: bool,
}

impl ChromePage {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            closed: false,
        }
    }

    /// 获取 page 的引用（用于其他操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 对单个元素执行脚本片段，`el` 为目标元素；元素不存在时返回 false
    async fn with_element(&self, selector: &str, body: &str) -> Result<JsonValue> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({selector});
                if (!el) return false;
                {body}
            }})()
            "#,
            selector = serde_json::to_string(selector)?,
            body = body,
        );
        self.eval(js_code).await
    }
}

impl PageDriver for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("导航到 {} 失败", url))?;
        debug!("已导航到: {}", url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn probe(&self, locator: &Locator) -> Result<Option<ElementHandle>> {
        let (selector, needle) = match locator {
            Locator::Css(selector) => (selector.clone(), None),
            Locator::Text { tag, text } => (tag.clone(), Some(text.to_lowercase())),
        };

        let js_code = format!(
            r#"
            (() => {{
                const selector = {selector};
                const needle = {needle};
                let nodes;
                try {{
                    nodes = Array.from(document.querySelectorAll(selector));
                }} catch (e) {{
                    return {{ found: false }};
                }}
                for (const el of nodes) {{
                    if (el.hasAttribute('{filled}')) continue;
                    if (needle !== null) {{
                        const label = (el.innerText || el.value || el.getAttribute('aria-label') || '').toLowerCase();
                        if (!label.includes(needle)) continue;
                    }}
                    const tag = el.tagName.toLowerCase();
                    const inputType = (el.getAttribute('type') || '').toLowerCase();
                    const style = window.getComputedStyle(el);
                    const rect = el.getBoundingClientRect();
                    const visible = style.display !== 'none' && style.visibility !== 'hidden'
                        && rect.width > 0 && rect.height > 0;
                    if (!visible && !(tag === 'input' && inputType === 'file')) continue;
                    let reference = el.getAttribute('{reference}');
                    if (!reference) {{
                        window.__autoApplySeq = (window.__autoApplySeq || 0) + 1;
                        reference = String(window.__autoApplySeq);
                        el.setAttribute('{reference}', reference);
                    }}
                    return {{
                        found: true,
                        reference: reference,
                        tag: tag,
                        input_type: inputType,
                        enabled: !el.disabled && !el.readOnly && el.getAttribute('aria-disabled') !== 'true',
                    }};
                }}
                return {{ found: false }};
            }})()
            "#,
            selector = serde_json::to_string(&selector)?,
            needle = serde_json::to_string(&needle)?,
            filled = FILLED_ATTR,
            reference = REF_ATTR,
        );

        let hit: ProbeHit = self.eval_as(js_code).await?;
        if !hit.found {
            return Ok(None);
        }

        Ok(Some(ElementHandle {
            selector: format!(r#"[{}="{}"]"#, REF_ATTR, hit.reference),
            kind: ElementKind::classify(&hit.tag, &hit.input_type),
            enabled: hit.enabled,
        }))
    }

    async fn click(&self, element: &ElementHandle, offset: (f64, f64)) -> Result<()> {
        let target = self
            .page
            .find_element(element.selector.as_str())
            .await
            .with_context(|| format!("元素已失效: {}", element.selector))?;
        target.scroll_into_view().await?;

        // 在元素内部随机位置点击，取不到包围盒时退回普通点击
        match target.bounding_box().await {
            Ok(bbox) if bbox.width > 0.0 && bbox.height > 0.0 => {
                let point = Point::new(
                    bbox.x + bbox.width * offset.0.clamp(0.0, 1.0),
                    bbox.y + bbox.height * offset.1.clamp(0.0, 1.0),
                );
                self.page.click(point).await?;
            }
            _ => {
                target.click().await?;
            }
        }
        Ok(())
    }

    async fn focus_and_clear(&self, element: &ElementHandle) -> Result<()> {
        let body = format!(
            r#"
            el.scrollIntoView({{ block: 'center' }});
            el.focus();
            if ('value' in el) {{
                el.value = '';
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            }}
            el.setAttribute('{filled}', '1');
            return true;
            "#,
            filled = FILLED_ATTR,
        );
        let focused = self.with_element(&element.selector, &body).await?;
        if focused.as_bool() != Some(true) {
            bail!("元素已失效: {}", element.selector);
        }
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> Result<()> {
        self.page.execute(InsertTextParams::new(text)).await?;
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, value: &str) -> Result<bool> {
        let body = format!(
            r#"
            if (!el.options) return false;
            const wanted = {wanted};
            const option = Array.from(el.options).find(o =>
                (o.value || '').toLowerCase() === wanted ||
                (o.text || '').toLowerCase().includes(wanted));
            if (!option) return false;
            el.value = option.value;
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            el.setAttribute('{filled}', '1');
            return true;
            "#,
            wanted = serde_json::to_string(&value.to_lowercase())?,
            filled = FILLED_ATTR,
        );
        let selected = self.with_element(&element.selector, &body).await?;
        Ok(selected.as_bool() == Some(true))
    }

    async fn upload_file(&self, element: &ElementHandle, path: &Path) -> Result<()> {
        let target = self
            .page
            .find_element(element.selector.as_str())
            .await
            .with_context(|| format!("元素已失效: {}", element.selector))?;

        let params = SetFileInputFilesParams::builder()
            .files(vec![path.to_string_lossy().to_string()])
            .backend_node_id(target.backend_node_id)
            .build()
            .map_err(anyhow::Error::msg)?;
        self.page.execute(params).await?;

        let body = format!("el.setAttribute('{}', '1'); return true;", FILLED_ATTR);
        self.with_element(&element.selector, &body).await?;
        Ok(())
    }

    async fn check_boxes_labelled(&self, keywords: &[&str]) -> Result<usize> {
        let js_code = format!(
            r#"
            (() => {{
                const keywords = {keywords};
                let count = 0;
                for (const el of document.querySelectorAll('input[type="checkbox"]')) {{
                    if (el.checked || el.disabled) continue;
                    const parts = [el.getAttribute('aria-label') || '', el.name || '', el.id || ''];
                    if (el.labels) {{
                        for (const label of el.labels) parts.push(label.innerText || '');
                    }}
                    if (el.parentElement) parts.push(el.parentElement.innerText || '');
                    const text = parts.join(' ').toLowerCase();
                    if (keywords.some(k => text.includes(k))) {{
                        el.click();
                        count += 1;
                    }}
                }}
                return count;
            }})()
            "#,
            keywords = serde_json::to_string(keywords)?,
        );
        self.eval_as(js_code).await
    }

    async fn press_enter(&self) -> Result<()> {
        let events = [
            (DispatchKeyEventType::KeyDown, Some("\r")),
            (DispatchKeyEventType::KeyUp, None),
        ];
        for (event_type, text) in events {
            let mut builder = DispatchKeyEventParams::builder()
                .r#type(event_type)
                .key("Enter")
                .code("Enter")
                .windows_virtual_key_code(13)
                .native_virtual_key_code(13);
            if let Some(text) = text {
                builder = builder.text(text);
            }
            let params = builder.build().map_err(anyhow::Error::msg)?;
            self.page.execute(params).await?;
        }
        Ok(())
    }

    async fn body_text(&self) -> Result<String> {
        self.eval_as("document.body ? document.body.innerText : ''")
            .await
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .with_context(|| format!("保存截图失败: {}", path.display()))?;
        Ok(())
    }

    async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.page.clone().close().await?;
        Ok(())
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let page = self.page.clone();
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        warn!("后台关闭页面失败: {}", e);
                    }
                });
            }
            Err(_) => warn!("页面未关闭且没有可用的运行时"),
        }
    }
}
