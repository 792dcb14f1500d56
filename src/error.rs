use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 单次投递过程中的错误
    #[error("投递错误: {0}")]
    Apply(#[from] ApplyError),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建隔离上下文失败
    #[error("创建浏览器上下文失败: {source}")]
    ContextCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreationFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器配置失败
    #[error("浏览器配置失败: {0}")]
    ConfigurationFailed(String),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 职位链接不是合法的绝对 URL
    #[error("职位 {job_id} 的链接不合法: {url}")]
    InvalidJobUrl { job_id: String, url: String },
    /// 职位缺少标识
    #[error("职位缺少 id: {url}")]
    MissingJobId { url: String },
}

/// 单次投递中可能出现的错误
///
/// 这些错误全部在投递边界被捕获，转换为 `ApplicationResult`，不会继续向上传播。
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApplyError {
    /// 页面无法访问或加载超时
    #[error("页面加载失败 ({url}): {reason}")]
    Navigation { url: String, reason: String },
    /// 找不到申请按钮或提交按钮
    #[error("未找到{0}")]
    ElementNotFound(String),
    /// 字段存在但无法填写（例如被禁用）
    #[error("无法填写字段 {field}: {reason}")]
    FormFill { field: String, reason: String },
    /// 提交表单失败
    #[error("提交失败: {0}")]
    Submission(String),
    /// 整个投递超时
    #[error("投递超时 (限制 {0:?})")]
    Timeout(Duration),
    /// 其他未分类错误
    #[error("未分类错误: {0}")]
    Unclassified(String),
}

impl ApplyError {
    /// 把底层驱动错误包装为未分类错误
    pub fn unclassified(err: impl std::fmt::Display) -> Self {
        ApplyError::Unclassified(err.to_string())
    }
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::PageCreationFailed {
            source: Box::new(err),
        }
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建浏览器启动错误
    pub fn browser_launch_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Browser(BrowserError::LaunchFailed {
            source: Box::new(source),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
