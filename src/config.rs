use std::path::PathBuf;
use std::time::Duration;

use crate::browser::{BrowserMode, LaunchOptions};
use crate::error::ConfigError;
use crate::orchestrator::{PacingPolicy, RetryPolicy};
use crate::services::LocatorTimeouts;
use crate::workflow::FlowSettings;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- 浏览器 ---
    /// 连接已打开的浏览器（true）还是自行启动（false）
    pub connect_existing_browser: bool,
    /// 浏览器调试端口（连接模式）
    pub browser_debug_port: u16,
    /// 浏览器可执行文件路径（启动模式），为空时自动查找
    pub chrome_executable: Option<PathBuf>,
    pub headless: bool,
    /// 会话地区（us-east / us-central / us-west / uk），为空时随机
    pub session_region: Option<String>,

    // --- 输入输出 ---
    /// 职位列表 TOML 文件
    pub jobs_file: PathBuf,
    /// 求职者资料 TOML 文件
    pub profile_file: PathBuf,
    /// 额外平台策略 TOML 文件
    pub strategies_file: Option<PathBuf>,
    /// 结果输出（JSONL）
    pub results_file: PathBuf,
    /// 输出日志文件
    pub output_log_file: String,
    /// 截图目录
    pub screenshots_dir: Option<PathBuf>,

    // --- 投递 ---
    pub max_applications: usize,
    pub max_retries: u32,
    pub navigation_timeout_secs: u64,
    pub attempt_timeout_secs: u64,
    pub settle_ms: u64,
    pub locator_exact_timeout_ms: u64,
    pub locator_fuzzy_timeout_ms: u64,
    pub retry_delay_min_secs: u64,
    pub retry_delay_max_secs: u64,
    pub pacing_base_secs: u64,
    pub success_cooldown_min_secs: u64,
    pub success_cooldown_max_secs: u64,

    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_existing_browser: false,
            browser_debug_port: 9222,
            chrome_executable: None,
            headless: true,
            session_region: None,
            jobs_file: PathBuf::from("jobs.toml"),
            profile_file: PathBuf::from("profile.toml"),
            strategies_file: None,
            results_file: PathBuf::from("applications.jsonl"),
            output_log_file: "output.txt".to_string(),
            screenshots_dir: None,
            max_applications: 50,
            max_retries: 3,
            navigation_timeout_secs: 30,
            attempt_timeout_secs: 180,
            settle_ms: 3000,
            locator_exact_timeout_ms: 3000,
            locator_fuzzy_timeout_ms: 1000,
            retry_delay_min_secs: 3,
            retry_delay_max_secs: 8,
            pacing_base_secs: 15,
            success_cooldown_min_secs: 30,
            success_cooldown_max_secs: 60,
            verbose_logging: false,
        }
    }
}

/// 解析单个环境变量的值
fn parse_env_value<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: name.to_string(),
            value: value.to_string(),
            expected_type: std::any::type_name::<T>().to_string(),
        })
}

/// 读取并解析环境变量，未设置或无法解析时使用默认值
fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => parse_env_value(name, &value).unwrap_or_else(|e| {
            tracing::warn!("⚠️ {}，使用默认值", e);
            default
        }),
        Err(_) => default,
    }
}

/// 浏览器模式：`launch` 或 `connect`
fn parse_browser_mode(value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "connect" => Ok(true),
        "launch" => Ok(false),
        _ => Err(ConfigError::EnvVarParseFailed {
            var_name: "BROWSER_MODE".to_string(),
            value: value.to_string(),
            expected_type: "launch | connect".to_string(),
        }),
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            connect_existing_browser: match std::env::var("BROWSER_MODE") {
                Ok(value) => parse_browser_mode(&value).unwrap_or_else(|e| {
                    tracing::warn!("⚠️ {}，使用默认值", e);
                    default.connect_existing_browser
                }),
                Err(_) => default.connect_existing_browser,
            },
            browser_debug_port: env_parse("BROWSER_DEBUG_PORT", default.browser_debug_port),
            chrome_executable: env_path("CHROME_EXECUTABLE").or(default.chrome_executable),
            headless: env_parse("HEADLESS", default.headless),
            session_region: std::env::var("SESSION_REGION")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or(default.session_region),
            jobs_file: env_path("JOBS_FILE").unwrap_or(default.jobs_file),
            profile_file: env_path("PROFILE_FILE").unwrap_or(default.profile_file),
            strategies_file: env_path("STRATEGIES_FILE").or(default.strategies_file),
            results_file: env_path("RESULTS_FILE").unwrap_or(default.results_file),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            screenshots_dir: env_path("SCREENSHOTS_DIR").or(default.screenshots_dir),
            max_applications: env_parse("MAX_APPLICATIONS", default.max_applications),
            max_retries: env_parse("MAX_RETRIES", default.max_retries),
            navigation_timeout_secs: env_parse("NAVIGATION_TIMEOUT_SECS", default.navigation_timeout_secs),
            attempt_timeout_secs: env_parse("ATTEMPT_TIMEOUT_SECS", default.attempt_timeout_secs),
            settle_ms: env_parse("SETTLE_MS", default.settle_ms),
            locator_exact_timeout_ms: env_parse("LOCATOR_EXACT_TIMEOUT_MS", default.locator_exact_timeout_ms),
            locator_fuzzy_timeout_ms: env_parse("LOCATOR_FUZZY_TIMEOUT_MS", default.locator_fuzzy_timeout_ms),
            retry_delay_min_secs: env_parse("RETRY_DELAY_MIN_SECS", default.retry_delay_min_secs),
            retry_delay_max_secs: env_parse("RETRY_DELAY_MAX_SECS", default.retry_delay_max_secs),
            pacing_base_secs: env_parse("PACING_BASE_SECS", default.pacing_base_secs),
            success_cooldown_min_secs: env_parse("SUCCESS_COOLDOWN_MIN_SECS", default.success_cooldown_min_secs),
            success_cooldown_max_secs: env_parse("SUCCESS_COOLDOWN_MAX_SECS", default.success_cooldown_max_secs),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging),
        }
    }

    pub fn browser_mode(&self) -> BrowserMode {
        if self.connect_existing_browser {
            BrowserMode::Connect {
                port: self.browser_debug_port,
            }
        } else {
            BrowserMode::Launch(LaunchOptions {
                headless: self.headless,
                chrome_executable: self.chrome_executable.clone(),
            })
        }
    }

    pub fn flow_settings(&self) -> FlowSettings {
        FlowSettings {
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
            settle: Duration::from_millis(self.settle_ms),
            screenshots_dir: self.screenshots_dir.clone(),
        }
    }

    pub fn locator_timeouts(&self) -> LocatorTimeouts {
        LocatorTimeouts {
            exact: Duration::from_millis(self.locator_exact_timeout_ms),
            fuzzy: Duration::from_millis(self.locator_fuzzy_timeout_ms),
            ..LocatorTimeouts::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay_min: Duration::from_secs(self.retry_delay_min_secs),
            delay_max: Duration::from_secs(self.retry_delay_max_secs),
        }
    }

    pub fn pacing_policy(&self) -> PacingPolicy {
        PacingPolicy {
            base_interval: Duration::from_secs(self.pacing_base_secs),
            success_cooldown: (
                Duration::from_secs(self.success_cooldown_min_secs),
                Duration::from_secs(self.success_cooldown_max_secs),
            ),
            ..PacingPolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.max_applications, 50);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.flow_settings().navigation_timeout, Duration::from_secs(30));
        assert_eq!(config.locator_timeouts().exact, Duration::from_secs(3));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.pacing_policy(), PacingPolicy::default());
    }

    #[test]
    fn unparsable_env_value_is_a_config_error() {
        assert_eq!(parse_env_value::<u32>("MAX_RETRIES", " 5 ").ok(), Some(5));

        let err = parse_env_value::<u32>("MAX_RETRIES", "many").unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::EnvVarParseFailed { var_name, value, .. }
                if var_name == "MAX_RETRIES" && value == "many"
        ));
        assert!(err.to_string().contains("u32"));

        assert!(parse_env_value::<bool>("HEADLESS", "yes").is_err());
    }

    #[test]
    fn browser_mode_values() {
        assert_eq!(parse_browser_mode("Connect").ok(), Some(true));
        assert_eq!(parse_browser_mode(" launch ").ok(), Some(false));
        assert!(matches!(
            parse_browser_mode("attach"),
            Err(ConfigError::EnvVarParseFailed { .. })
        ));
    }

    #[test]
    fn browser_mode_follows_flag() {
        let mut config = Config::default();
        assert!(matches!(config.browser_mode(), BrowserMode::Launch(_)));

        config.connect_existing_browser = true;
        config.browser_debug_port = 2001;
        assert_eq!(config.browser_mode(), BrowserMode::Connect { port: 2001 });
    }
}
