//! 占位文件写入服务 - 业务能力层
//!
//! 只负责"写一个空的 Eqn{n}_failed.eps"能力，不关心流程

use crate::error::FileError;
use crate::workflow::equation_ctx::EquationCtx;
use std::path::PathBuf;
use tokio::fs;
use tracing::warn;

/// 占位文件写入服务
///
/// 占位文件保持编号连续，事后通过文件名后缀即可看出哪些公式失败
#[derive(Debug, Default)]
pub struct PlaceholderWriter;

impl PlaceholderWriter {
    pub fn new() -> Self {
        Self
    }

    /// 写入零字节占位文件
    pub async fn write(&self, ctx: &EquationCtx) -> Result<PathBuf, FileError> {
        let path = ctx.failed_path();
        fs::write(&path, b"")
            .await
            .map_err(|e| FileError::write(&path, e))?;

        warn!("{} ⚠️ 已保存失败占位文件: {}", ctx, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_empty_failed_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = EquationCtx::new(2, 3, 2, dir.path());

        let path = PlaceholderWriter::new().write(&ctx).await.unwrap();

        assert_eq!(path, dir.path().join("Eqn2_failed.eps"));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_missing_output_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = EquationCtx::new(1, 1, 1, &dir.path().join("missing"));
        assert!(PlaceholderWriter::new().write(&ctx).await.is_err());
    }
}
