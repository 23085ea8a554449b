//! 公式编号序列
//!
//! 成功与失败共用同一序列：第 n 个处理的公式总是对应编号 n 的输出文件

/// 公式编号计数器
///
/// 从 1 开始，每处理一个公式（无论成败）恰好前进一次，不会回退或重置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationSequence {
    next: usize,
}

impl EquationSequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// 返回当前编号并前进
    pub fn next_index(&mut self) -> usize {
        let index = self.next;
        self.next += 1;
        index
    }

    /// 下一个将要分配的编号
    pub fn current(&self) -> usize {
        self.next
    }

    /// 根据编号和结果生成输出文件名
    pub fn output_name(index: usize, failed: bool) -> String {
        if failed {
            format!("Eqn{}_failed.eps", index)
        } else {
            format!("Eqn{}.eps", index)
        }
    }
}

impl Default for EquationSequence {
    fn default() -> Self {
        Self::new()
    }
}
