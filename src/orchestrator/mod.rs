//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量投递和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 应用入口
//! - 管理应用生命周期（初始化、运行、清理）
//! - 获取并释放浏览器会话
//! - 输出全局统计信息
//!
//! ### `bulk_runner` - 批量投递
//! - 随机顺序、动态间隔、成功数上限
//! - 捕获单个职位的 panic，支持取消
//!
//! ### `retry_controller` - 单个职位的重试
//! - 有限次重试、递增随机退避
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (持有 Session)
//!     ↓
//! bulk_runner (处理 Vec<JobPosting>)
//!     ↓
//! retry_controller (处理单个 JobPosting，多次尝试)
//!     ↓
//! workflow::ApplicationFlow (一次尝试)
//!     ↓
//! services (能力层：locator / registry / detector)
//!     ↓
//! infrastructure (基础设施：ChromePage)
//! ```

pub mod batch_processor;
pub mod bulk_runner;
pub mod cancel;
pub mod retry_controller;

// 重新导出主要类型
pub use batch_processor::App;
pub use bulk_runner::{BulkReport, BulkRunner, PacingPolicy};
pub use cancel::CancelToken;
pub use retry_controller::{RetryController, RetryPolicy};
