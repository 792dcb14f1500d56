//! # Auto Apply
//!
//! 一个用于自动化职位投递的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `browser/` - 启动 / 连接浏览器，会话与身份伪装
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `ChromePage` - 一次投递独占的页面，实现 `PageDriver`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个页面
//! - `FieldLocator` - 两层定位（策略定位器 → 关键词模板）
//! - `StrategyRegistry` - 平台策略查找，找不到时兜底
//! - `SuccessDetector` - 成功短语 / 元素 / 地址检测
//! - `ResultWriter` - 写 JSONL 结果能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"投递一个职位"的完整状态机
//! - `ApplicationAttempt` - 上下文封装（页面 + 策略 + 已填字段）
//! - `ApplicationFlow` - 流程编排（navigate → apply → fill → submit → detect）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 应用入口，管理会话与结果
//! - `orchestrator/bulk_runner` - 批量投递，随机顺序与动态间隔
//! - `orchestrator/retry_controller` - 单个职位的有限次重试
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{Session, SessionHint, SessionManager};
pub use config::Config;
pub use error::{AppError, AppResult, ApplyError};
pub use infrastructure::{ChromePage, Locator, PageDriver, PageSource};
pub use models::{ApplicantProfile, ApplicationResult, ApplicationStatus, JobPosting};
pub use orchestrator::{App, BulkReport, BulkRunner, CancelToken, RetryController};
pub use services::StrategyRegistry;
pub use workflow::{ApplicationFlow, AttemptRunner, AttemptState};
