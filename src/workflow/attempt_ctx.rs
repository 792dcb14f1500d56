//! 单次投递上下文
//!
//! 封装"我正在投递哪个职位、用哪个页面和策略、已经走到哪一步"

use std::fmt::Display;
use std::sync::Arc;

use crate::models::{ApplicationMethod, ApplicationStatus, JobPosting, SemanticField};
use crate::services::PlatformStrategy;

/// 状态机状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Start,
    Navigated,
    ApplyTriggered,
    FormFilled,
    Submitted,
    Finished(ApplicationStatus),
}

/// 单次投递的临时状态
///
/// 由一次状态机调用独占，投递结束即丢弃
pub struct ApplicationAttempt<P> {
    pub job_id: String,
    pub platform: String,
    pub page: P,
    pub strategy: Arc<PlatformStrategy>,
    /// 点击申请按钮后判定的投递方式
    pub method: ApplicationMethod,
    filled_fields: Vec<SemanticField>,
    trail: Vec<AttemptState>,
}

impl<P> ApplicationAttempt<P> {
    pub fn new(job: &JobPosting, page: P, strategy: Arc<PlatformStrategy>) -> Self {
        Self {
            job_id: job.id.clone(),
            platform: strategy.key.clone(),
            page,
            strategy,
            method: ApplicationMethod::Unknown,
            filled_fields: Vec::new(),
            trail: vec![AttemptState::Start],
        }
    }

    /// 进入下一个状态
    pub fn advance(&mut self, state: AttemptState) {
        tracing::debug!("{} → {:?}", self, state);
        self.trail.push(state);
    }

    pub fn state(&self) -> AttemptState {
        self.trail.last().copied().unwrap_or(AttemptState::Start)
    }

    pub fn trail(&self) -> &[AttemptState] {
        &self.trail
    }

    pub fn record_filled(&mut self, field: SemanticField) {
        if !self.filled_fields.contains(&field) {
            self.filled_fields.push(field);
        }
    }

    pub fn filled_fields(&self) -> &[SemanticField] {
        &self.filled_fields
    }

    /// 拆出页面，其余状态作为记录返回
    pub fn into_parts(self) -> (P, Vec<SemanticField>, Vec<AttemptState>) {
        (self.page, self.filled_fields, self.trail)
    }
}

impl<P> Display for ApplicationAttempt<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[职位#{} 平台#{}]", self.job_id, self.platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::StrategyRegistry;

    #[test]
    fn trail_starts_at_start_and_records_fields_once() {
        let job = JobPosting::new("7", "https://example.test/job/7", "genericboard");
        let strategy = StrategyRegistry::builtin().resolve(&job.platform);
        let mut attempt = ApplicationAttempt::new(&job, (), strategy);

        assert_eq!(attempt.state(), AttemptState::Start);
        attempt.advance(AttemptState::Navigated);
        attempt.record_filled(SemanticField::Email);
        attempt.record_filled(SemanticField::Email);

        assert_eq!(attempt.state(), AttemptState::Navigated);
        assert_eq!(attempt.filled_fields(), &[SemanticField::Email]);
        assert_eq!(attempt.to_string(), "[职位#7 平台#generic]");
    }
}
