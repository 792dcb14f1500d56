//! 浏览器身份（指纹）随机化

use rand::seq::SliceRandom;
use rand::Rng;

/// 固定视口尺寸
pub const VIEWPORT: (i64, i64) = (1920, 1080);

/// user-agent 池，只放 Chromium 系，与 window.chrome 和 WebGL 伪装保持一致
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

/// 地区：语言、时区与地理位置保持一致
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub key: &'static str,
    pub locale: &'static str,
    pub timezone: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

pub const REGIONS: [Region; 4] = [
    Region {
        key: "us-east",
        locale: "en-US",
        timezone: "America/New_York",
        latitude: 40.7128,
        longitude: -74.0060,
    },
    Region {
        key: "us-central",
        locale: "en-US",
        timezone: "America/Chicago",
        latitude: 41.8781,
        longitude: -87.6298,
    },
    Region {
        key: "us-west",
        locale: "en-US",
        timezone: "America/Los_Angeles",
        latitude: 34.0522,
        longitude: -118.2437,
    },
    Region {
        key: "uk",
        locale: "en-GB",
        timezone: "Europe/London",
        latitude: 51.5074,
        longitude: -0.1278,
    },
];

impl Region {
    /// 按名称查找地区（大小写不敏感）
    pub fn find(key: &str) -> Option<Region> {
        let key = key.trim();
        REGIONS
            .iter()
            .find(|region| region.key.eq_ignore_ascii_case(key))
            .copied()
    }

    /// Accept-Language 请求头
    pub fn accept_language(&self) -> String {
        let primary = self.locale.split('-').next().unwrap_or("en");
        format!("{},{};q=0.9", self.locale, primary)
    }
}

/// 一个会话使用的浏览器身份
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserIdentity {
    pub user_agent: String,
    pub viewport: (i64, i64),
    pub region: Region,
}

impl BrowserIdentity {
    /// 随机生成身份；指定了合法地区时固定地区
    pub fn random(region_hint: Option<&str>, rng: &mut impl Rng) -> Self {
        let user_agent = USER_AGENTS
            .choose(rng)
            .copied()
            .unwrap_or(USER_AGENTS[0])
            .to_string();

        let region = match region_hint.and_then(Region::find) {
            Some(region) => region,
            None => {
                if let Some(hint) = region_hint {
                    tracing::warn!("未知地区 '{}'，改为随机选择", hint);
                }
                REGIONS.choose(rng).copied().unwrap_or(REGIONS[0])
            }
        };

        Self {
            user_agent,
            viewport: VIEWPORT,
            region,
        }
    }

    /// 页面加载前注入的反自动化检测脚本
    pub fn stealth_script(&self) -> String {
        let primary = self.region.locale.split('-').next().unwrap_or("en");
        STEALTH_SCRIPT
            .replace("__LOCALE__", self.region.locale)
            .replace("__LANG__", primary)
    }
}

const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });

Object.defineProperty(navigator, 'languages', { get: () => ['__LOCALE__', '__LANG__'] });

Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });

window.chrome = { runtime: {}, loadTimes: function() {}, csi: function() {}, app: {} };

if (window.navigator.permissions && window.navigator.permissions.query) {
    const originalQuery = window.navigator.permissions.query.bind(window.navigator.permissions);
    window.navigator.permissions.query = (parameters) => (
        parameters.name === 'notifications'
            ? Promise.resolve({ state: Notification.permission })
            : originalQuery(parameters)
    );
}

if (window.WebGLRenderingContext) {
    const getParameter = WebGLRenderingContext.prototype.getParameter;
    WebGLRenderingContext.prototype.getParameter = function(parameter) {
        if (parameter === 37445) return 'Intel Inc.';
        if (parameter === 37446) return 'Intel Iris OpenGL Engine';
        return getParameter.call(this, parameter);
    };
}

document.addEventListener('DOMContentLoaded', function() {
    setInterval(() => {
        document.dispatchEvent(new MouseEvent('mousemove', {
            bubbles: true,
            cancelable: true,
            clientX: Math.random() * window.innerWidth,
            clientY: Math.random() * window.innerHeight,
        }));
    }, Math.random() * 5000 + 1000);
});
"#;
