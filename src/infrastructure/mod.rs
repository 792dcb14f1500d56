//! 基础设施层
//!
//! 持有稀缺资源（Page），只暴露能力

pub mod chrome_page;
pub mod page_driver;

pub use chrome_page::ChromePage;
pub use page_driver::{ElementHandle, ElementKind, Locator, PageDriver, PageSource};
