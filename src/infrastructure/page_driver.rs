//! 页面驱动抽象 - 基础设施层
//!
//! 状态机只通过 `PageDriver` 操作页面，生产环境由 `ChromePage` 实现，测试中可替换为内存实现。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 元素定位方式
///
/// 在 TOML 中既可以写成 CSS 字符串，也可以写成 `{ tag = "button", text = "Apply" }`。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locator {
    /// CSS 选择器
    Css(String),
    /// 指定标签、可见文本包含 `text`（大小写不敏感）
    Text { tag: String, text: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::Text {
            tag: tag.into(),
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(selector) => f.write_str(selector),
            Locator::Text { tag, text } => write!(f, "{}:has-text(\"{}\")", tag, text),
        }
    }
}

/// 元素类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// 普通文本输入框
    TextInput,
    TextArea,
    Select,
    FileInput,
    Checkbox,
    /// 按钮、链接、submit 类型的 input
    Button,
    Other,
}

impl ElementKind {
    /// 根据标签名和 input 类型判断元素类别
    pub fn classify(tag: &str, input_type: &str) -> Self {
        match (tag.to_ascii_lowercase().as_str(), input_type.to_ascii_lowercase().as_str()) {
            ("textarea", _) => ElementKind::TextArea,
            ("select", _) => ElementKind::Select,
            ("input", "file") => ElementKind::FileInput,
            ("input", "checkbox") | ("input", "radio") => ElementKind::Checkbox,
            ("input", "submit") | ("input", "button") | ("input", "image") => ElementKind::Button,
            ("input", _) => ElementKind::TextInput,
            ("button", _) | ("a", _) => ElementKind::Button,
            _ => ElementKind::Other,
        }
    }
}

/// 已在页面上定位到的元素
///
/// `selector` 是驱动为该元素生成的稳定选择器，后续操作都通过它进行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub selector: String,
    pub kind: ElementKind,
    pub enabled: bool,
}

/// 页面操作能力
///
/// 一个实例只对应一次投递使用的一个页面，不在多次投递之间复用。
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    /// 导航到指定地址（超时由调用方控制）
    async fn goto(&self, url: &str) -> Result<()>;

    /// 当前页面地址
    async fn current_url(&self) -> Result<String>;

    /// 查找第一个可见且本次投递中尚未填写过的匹配元素（文件输入框允许隐藏）
    async fn probe(&self, locator: &Locator) -> Result<Option<ElementHandle>>;

    /// 在元素内的相对位置 `(x, y)`（0~1）点击
    async fn click(&self, element: &ElementHandle, offset: (f64, f64)) -> Result<()>;

    /// 聚焦并清空输入框，同时标记为已填写
    async fn focus_and_clear(&self, element: &ElementHandle) -> Result<()>;

    /// 向当前焦点元素输入文本
    async fn insert_text(&self, text: &str) -> Result<()>;

    /// 按文本或值选择下拉框选项，返回是否选中
    async fn select_option(&self, element: &ElementHandle, value: &str) -> Result<bool>;

    /// 为文件输入框设置文件
    async fn upload_file(&self, element: &ElementHandle, path: &Path) -> Result<()>;

    /// 勾选标签中包含任一关键词的复选框，返回勾选数量
    async fn check_boxes_labelled(&self, keywords: &[&str]) -> Result<usize>;

    /// 在当前焦点处按下回车
    async fn press_enter(&self) -> Result<()>;

    /// 页面可见文本
    async fn body_text(&self) -> Result<String>;

    /// 保存整页截图
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// 关闭页面
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// 页面来源
///
/// 每次投递开始时打开一个新页面，避免残留 DOM 状态。
#[allow(async_fn_in_trait)]
pub trait PageSource {
    type Page: PageDriver;

    async fn open_page(&self) -> Result<Self::Page>;
}

impl<T: PageSource> PageSource for &T {
    type Page = T::Page;

    async fn open_page(&self) -> Result<Self::Page> {
        (**self).open_page().await
    }
}
