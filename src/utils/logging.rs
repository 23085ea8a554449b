/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use std::path::Path;
use tracing::{info, warn};

use crate::workflow::equation_ctx::EquationCtx;

/// 记录程序启动信息
///
/// # 参数
/// - `xml_file`: 输入 XML 文件
/// - `output_dir`: EPS 输出目录
pub fn log_startup(xml_file: &Path, output_dir: &Path) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - MathML 转 EPS");
    info!("📄 输入文件: {}", xml_file.display());
    info!("📁 输出目录: {}", output_dir.display());
    info!("{}", "=".repeat(60));
}

/// 记录公式提取信息
pub fn log_blocks_found(total: usize) {
    info!("🔍 找到 {} 个 MathML 公式", total);
}

/// 记录单个公式开始处理
pub fn log_equation_start(ctx: &EquationCtx) {
    info!("\n{}", "─".repeat(30));
    info!("--- 正在处理第 {}/{} 个公式 (Eqn{}) ---", ctx.ordinal, ctx.total, ctx.index);
}

/// 打印最终统计信息
///
/// # 参数
/// - `rendered`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `failed_names`: 失败的输出文件名
/// - `log_file_path`: 运行日志路径
pub fn print_final_stats(
    rendered: usize,
    failed: usize,
    total: usize,
    failed_names: &[String],
    log_file_path: Option<&Path>,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", rendered, total);
    info!("❌ 失败: {}", failed);
    if !failed_names.is_empty() {
        warn!("失败的公式: {}", failed_names.join(", "));
    }
    info!("{}", "=".repeat(60));
    if let Some(path) = log_file_path {
        info!("\n日志已保存至: {}", path.display());
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
