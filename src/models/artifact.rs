//! 输出文件

use std::path::{Path, PathBuf};

/// 单个公式的输出结果
///
/// 每个处理过的公式恰好对应一个输出文件：真实渲染的 `Eqn{n}.eps`
/// 或零字节占位文件 `Eqn{n}_failed.eps`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputArtifact {
    Rendered { index: usize, path: PathBuf },
    Placeholder { index: usize, path: PathBuf },
}

impl OutputArtifact {
    pub fn index(&self) -> usize {
        match self {
            OutputArtifact::Rendered { index, .. } | OutputArtifact::Placeholder { index, .. } => {
                *index
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            OutputArtifact::Rendered { path, .. } | OutputArtifact::Placeholder { path, .. } => {
                path
            }
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, OutputArtifact::Placeholder { .. })
    }

    /// 文件名（用于日志）
    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}
