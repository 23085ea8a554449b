//! 公式处理上下文
//!
//! 封装"我正在处理第几个公式、它应该写到哪里"这一信息

use crate::workflow::sequencer::EquationSequence;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// 公式处理上下文
#[derive(Debug, Clone)]
pub struct EquationCtx {
    /// 在检查点文件中的序号（从1开始，仅用于日志显示）
    pub ordinal: usize,

    /// 总公式数（仅用于日志显示）
    pub total: usize,

    /// 分配到的输出编号
    pub index: usize,

    /// 输出目录
    pub output_dir: PathBuf,
}

impl EquationCtx {
    pub fn new(ordinal: usize, total: usize, index: usize, output_dir: &Path) -> Self {
        Self {
            ordinal,
            total,
            index,
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// 成功时的文件名，同时也是偏好报告中的查找键
    pub fn eps_name(&self) -> String {
        EquationSequence::output_name(self.index, false)
    }

    pub fn eps_path(&self) -> PathBuf {
        self.output_dir.join(self.eps_name())
    }

    pub fn failed_path(&self) -> PathBuf {
        self.output_dir
            .join(EquationSequence::output_name(self.index, true))
    }
}

impl Display for EquationCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[公式 {}/{} → Eqn{}]", self.ordinal, self.total, self.index)
    }
}
