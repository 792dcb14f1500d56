pub mod field_locator;
pub mod humanizer;
pub mod result_writer;
pub mod strategy_registry;
pub mod success_detector;

pub use field_locator::{FieldLocator, LocatedElement, LocatorTimeouts, MatchTier, Target};
pub use humanizer::{Humanizer, NoDelay, RandomHumanizer};
pub use result_writer::ResultWriter;
pub use strategy_registry::{HumanizationProfile, PlatformStrategy, StrategyRegistry};
pub use success_detector::{SuccessDetector, SuccessSignal};
