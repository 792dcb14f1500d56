use serde::{Deserialize, Serialize};

use crate::models::field::SemanticField;

/// 求职者资料（只读输入）
///
/// 没有必填字段：空值或缺失值表示"跳过该字段"。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicantProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub cover_letter: Option<String>,
    pub salary_expectation: Option<String>,
    pub availability: Option<String>,
    pub experience_years: Option<String>,
    pub education_level: Option<String>,
    pub location: Option<String>,
    /// 简历文件路径
    pub resume_path: Option<String>,
}

impl ApplicantProfile {
    /// 只包含邮箱的资料
    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }

    /// 获取语义字段对应的值，空白值视为缺失
    pub fn value_for(&self, field: SemanticField) -> Option<String> {
        let raw = match field {
            SemanticField::Email => self.email.as_deref(),
            SemanticField::Phone => self.phone.as_deref(),
            SemanticField::FirstName => self.first_name.as_deref(),
            SemanticField::LastName => self.last_name.as_deref(),
            SemanticField::FullName => {
                return non_blank(self.full_name.as_deref()).or_else(|| self.joined_name())
            }
            SemanticField::LinkedinUrl => self.linkedin_url.as_deref(),
            SemanticField::PortfolioUrl => self.portfolio_url.as_deref(),
            SemanticField::SalaryExpectation => self.salary_expectation.as_deref(),
            SemanticField::Availability => self.availability.as_deref(),
            SemanticField::CoverLetter => self.cover_letter.as_deref(),
            SemanticField::Experience => self.experience_years.as_deref(),
            SemanticField::Education => self.education_level.as_deref(),
            SemanticField::Location => self.location.as_deref(),
            SemanticField::Resume => self.resume_path.as_deref(),
        };
        non_blank(raw)
    }

    /// 资料中有值的字段（按填表顺序）
    pub fn present_fields(&self) -> Vec<SemanticField> {
        SemanticField::FILL_ORDER
            .into_iter()
            .filter(|field| self.value_for(*field).is_some())
            .collect()
    }

    fn joined_name(&self) -> Option<String> {
        let first = non_blank(self.first_name.as_deref())?;
        let last = non_blank(self.last_name.as_deref())?;
        Some(format!("{} {}", first, last))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
