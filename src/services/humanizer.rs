//! 拟人化节奏 - 业务能力层
//!
//! 只负责"给出下一次停顿多久、点哪里"，真正的等待由调用方完成。

use std::time::Duration;

use rand::Rng;

use crate::services::strategy_registry::HumanizationProfile;

/// 拟人化节奏
pub trait Humanizer: Send + Sync {
    /// 两个动作之间的停顿
    fn action_pause(&self, profile: &HumanizationProfile) -> Duration;

    /// 两次按键之间的停顿
    fn keystroke_pause(&self, profile: &HumanizationProfile) -> Duration;

    /// 点击位置在元素内的相对偏移 (x, y)，取值 0~1
    fn click_offset(&self) -> (f64, f64);
}

/// 随机节奏（生产环境）
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomHumanizer;

impl Humanizer for RandomHumanizer {
    fn action_pause(&self, profile: &HumanizationProfile) -> Duration {
        uniform(profile.action_delay())
    }

    fn keystroke_pause(&self, profile: &HumanizationProfile) -> Duration {
        uniform(profile.keystroke_delay())
    }

    fn click_offset(&self) -> (f64, f64) {
        let mut rng = rand::thread_rng();
        (rng.gen_range(0.3..=0.7), rng.gen_range(0.3..=0.7))
    }
}

/// 无停顿（测试用）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Humanizer for NoDelay {
    fn action_pause(&self, _profile: &HumanizationProfile) -> Duration {
        Duration::ZERO
    }

    fn keystroke_pause(&self, _profile: &HumanizationProfile) -> Duration {
        Duration::ZERO
    }

    fn click_offset(&self) -> (f64, f64) {
        (0.5, 0.5)
    }
}

/// 在 [min, max] 内均匀取值
pub fn uniform((min, max): (Duration, Duration)) -> Duration {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

/// 停顿；零时长直接返回
pub async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_pauses_stay_within_profile() {
        let profile = HumanizationProfile {
            action_delay_ms: (100, 200),
            keystroke_delay_ms: (5, 10),
        };
        for _ in 0..50 {
            let action = RandomHumanizer.action_pause(&profile);
            assert!(action >= Duration::from_millis(100) && action <= Duration::from_millis(200));
            let key = RandomHumanizer.keystroke_pause(&profile);
            assert!(key >= Duration::from_millis(5) && key <= Duration::from_millis(10));
            let (x, y) = RandomHumanizer.click_offset();
            assert!((0.3..=0.7).contains(&x) && (0.3..=0.7).contains(&y));
        }
    }

    #[test]
    fn no_delay_is_zero() {
        let profile = HumanizationProfile::default();
        assert_eq!(NoDelay.action_pause(&profile), Duration::ZERO);
        assert_eq!(NoDelay.keystroke_pause(&profile), Duration::ZERO);
    }

    #[test]
    fn uniform_handles_degenerate_range() {
        let d = Duration::from_millis(7);
        assert_eq!(uniform((d, d)), d);
    }
}
