use crate::models::job::JobPosting;
use crate::models::profile::ApplicantProfile;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 职位文件结构
///
/// ```toml
/// [[jobs]]
/// id = "job-1"
/// url = "https://boards.example.test/job/1"
/// platform = "greenhouse"
/// ```
#[derive(Debug, Deserialize)]
struct JobsFile {
    #[serde(default)]
    jobs: Vec<JobPosting>,
}

/// 从 TOML 文本解析职位列表，非法的职位会被跳过
pub fn parse_jobs(content: &str) -> Result<Vec<JobPosting>> {
    let file: JobsFile = toml::from_str(content).context("无法解析职位列表")?;

    let mut jobs = Vec::with_capacity(file.jobs.len());
    for job in file.jobs {
        match job.validate() {
            Ok(()) => jobs.push(job),
            Err(e) => tracing::warn!("跳过非法职位: {}", e),
        }
    }
    Ok(jobs)
}

/// 从 TOML 文件加载职位列表
pub async fn load_jobs(path: &Path) -> Result<Vec<JobPosting>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取职位文件: {}", path.display()))?;

    let jobs = parse_jobs(&content)
        .with_context(|| format!("无法解析职位文件: {}", path.display()))?;

    tracing::info!("成功加载 {} 个职位", jobs.len());
    Ok(jobs)
}

/// 从 TOML 文本解析求职者资料
pub fn parse_profile(content: &str) -> Result<ApplicantProfile> {
    toml::from_str(content).context("无法解析求职者资料")
}

/// 从 TOML 文件加载求职者资料
pub async fn load_profile(path: &Path) -> Result<ApplicantProfile> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取资料文件: {}", path.display()))?;

    let profile = parse_profile(&content)
        .with_context(|| format!("无法解析资料文件: {}", path.display()))?;

    if let Some(resume) = profile.resume_path.as_deref().filter(|p| !p.trim().is_empty()) {
        if !Path::new(resume).exists() {
            tracing::warn!("简历文件不存在，将跳过上传: {}", resume);
        }
    }

    Ok(profile)
}
