//! 结果写入服务 - 业务能力层
//!
//! 只负责"把投递结果追加到 JSONL 文件"，不关心流程

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::error::{AppError, FileError};
use crate::models::ApplicationResult;

/// 结果写入服务
///
/// 每条结果一行 JSON，供外部持久化模块读取
pub struct ResultWriter {
    path: PathBuf,
}

impl ResultWriter {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from("applications.jsonl"),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一批结果，返回写入条数
    pub async fn append(&self, results: &[ApplicationResult]) -> Result<usize> {
        if results.is_empty() {
            return Ok(0);
        }

        let mut buffer = String::new();
        for result in results {
            buffer.push_str(&serde_json::to_string(result)?);
            buffer.push('\n');
        }

        let write_failed = |source: std::io::Error| {
            AppError::File(FileError::WriteFailed {
                path: self.path.display().to_string(),
                source,
            })
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_failed)?;
        file.write_all(buffer.as_bytes()).map_err(write_failed)?;

        debug!("写入 {} 条结果到 {}", results.len(), self.path.display());
        Ok(results.len())
    }
}

impl Default for ResultWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobPosting;

    #[tokio::test]
    async fn appends_one_line_per_result() {
        let path = std::env::temp_dir().join(format!(
            "auto_apply_results_{}.jsonl",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let writer = ResultWriter::with_path(&path);
        let job = JobPosting::new("job-1", "https://example.test/job/1", "generic");
        let results = vec![
            ApplicationResult::failed(&job, "未找到申请按钮"),
            ApplicationResult::failed(&job, "投递超时").with_retry_count(2),
        ];

        assert_eq!(writer.append(&results).await.unwrap(), 2);
        assert_eq!(writer.append(&results[..1]).await.unwrap(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);

        let parsed: ApplicationResult = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.retry_count(), 2);
        assert_eq!(parsed.job_id(), "job-1");

        let _ = std::fs::remove_file(&path);
    }
}
