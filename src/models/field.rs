use serde::{Deserialize, Serialize};

/// 语义字段
///
/// 与具体网站的 HTML 结构无关的抽象表单字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    /// 邮箱
    Email,
    /// 电话
    Phone,
    /// 名
    FirstName,
    /// 姓
    LastName,
    /// 全名
    FullName,
    /// LinkedIn 主页
    LinkedinUrl,
    /// 作品集 / 个人网站
    PortfolioUrl,
    /// 期望薪资
    SalaryExpectation,
    /// 到岗时间
    Availability,
    /// 求职信
    CoverLetter,
    /// 工作年限（下拉框）
    Experience,
    /// 学历（下拉框）
    Education,
    /// 所在地（下拉框）
    Location,
    /// 简历文件
    Resume,
}

impl SemanticField {
    /// 填表顺序
    ///
    /// 姓、名排在全名之前，避免 `name` 关键词先占用 `first_name` 输入框；简历上传放在最后。
    pub const FILL_ORDER: [SemanticField; 14] = [
        SemanticField::Email,
        SemanticField::Phone,
        SemanticField::FirstName,
        SemanticField::LastName,
        SemanticField::FullName,
        SemanticField::LinkedinUrl,
        SemanticField::PortfolioUrl,
        SemanticField::SalaryExpectation,
        SemanticField::Availability,
        SemanticField::CoverLetter,
        SemanticField::Experience,
        SemanticField::Education,
        SemanticField::Location,
        SemanticField::Resume,
    ];

    /// 字段的标准键名（与配置文件中的键一致）
    pub fn key(self) -> &'static str {
        match self {
            SemanticField::Email => "email",
            SemanticField::Phone => "phone",
            SemanticField::FirstName => "first_name",
            SemanticField::LastName => "last_name",
            SemanticField::FullName => "full_name",
            SemanticField::LinkedinUrl => "linkedin_url",
            SemanticField::PortfolioUrl => "portfolio_url",
            SemanticField::SalaryExpectation => "salary_expectation",
            SemanticField::Availability => "availability",
            SemanticField::CoverLetter => "cover_letter",
            SemanticField::Experience => "experience",
            SemanticField::Education => "education",
            SemanticField::Location => "location",
            SemanticField::Resume => "resume",
        }
    }

    /// 从键名解析字段
    pub fn from_key(key: &str) -> Option<Self> {
        Self::FILL_ORDER
            .iter()
            .copied()
            .find(|field| field.key().eq_ignore_ascii_case(key.trim()))
    }

    /// 是否是文件上传字段
    pub fn is_file(self) -> bool {
        matches!(self, SemanticField::Resume)
    }
}

impl std::fmt::Display for SemanticField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}
