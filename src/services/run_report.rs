//! 运行日志写入服务 - 业务能力层
//!
//! 在输出目录中记录每个公式的处理结果，便于事后核对

use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::artifact::OutputArtifact;
use crate::workflow::equation_ctx::EquationCtx;

/// 运行日志
pub struct RunReport {
    path: PathBuf,
}

impl RunReport {
    /// 创建日志文件并写入表头
    pub fn create(path: impl Into<PathBuf>, xml_file: &Path, total: usize) -> Result<Self> {
        let path = path.into();
        let header = format!(
            "{}\nMathML → EPS 转换日志 - {}\n输入: {}\n公式总数: {}\n{}\n\n",
            "=".repeat(60),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            xml_file.display(),
            total,
            "=".repeat(60)
        );
        fs::write(&path, header)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 记录单个公式的结果
    pub fn record(&self, ctx: &EquationCtx, outcome: &Outcome<'_>) -> Result<()> {
        let line = match outcome {
            Outcome::Done(artifact) if artifact.is_placeholder() => {
                format!("公式 {} | {} | 失败\n", ctx.ordinal, artifact.file_name())
            }
            Outcome::Done(artifact) => {
                format!("公式 {} | {} | 成功\n", ctx.ordinal, artifact.file_name())
            }
            Outcome::Lost(reason) => {
                format!("公式 {} | Eqn{} | 无输出: {}\n", ctx.ordinal, ctx.index, reason)
            }
        };
        debug!("写入运行日志: {}", line.trim_end());
        self.append(&line)
    }

    /// 追加一行汇总
    pub fn finish(&self, rendered: usize, failed: usize, total: usize) -> Result<()> {
        self.append(&format!(
            "\n{}\n完成时间: {}\n成功: {}/{}\n失败: {}\n",
            "─".repeat(60),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            rendered,
            total,
            failed
        ))
    }

    fn append(&self, text: &str) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// 单个公式写入运行日志的结果
pub enum Outcome<'a> {
    /// 已产生输出文件（真实或占位）
    Done(&'a OutputArtifact),
    /// 连占位文件都没能写出
    Lost(&'a str),
}
