//! MathML 提取与检查点文件

use crate::models::math_block::MathBlock;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// 带 altimg 的 `<math>` 块
///
/// 非贪婪、单层匹配：嵌套的 `<math>` 会在第一个 `</math>` 处截断
const MATH_BLOCK_PATTERN: &str = r#"(?s)<math[^>]*altimg="([^"]+)"[^>]*>(.*?)</math>"#;

/// 按文档顺序提取所有 MathML 块
///
/// 没有匹配时返回空列表，由调用方决定是否致命
pub fn extract_math_blocks(xml_content: &str) -> Result<Vec<MathBlock>> {
    let re = Regex::new(MATH_BLOCK_PATTERN)?;

    let blocks = re
        .captures_iter(xml_content)
        .map(|caps| MathBlock::new(&caps[1], &caps[2]))
        .collect::<Vec<_>>();

    debug!("提取到 {} 个 MathML 块", blocks.len());
    Ok(blocks)
}

/// 从 XML 文件加载 MathML 块
pub async fn load_math_blocks(xml_path: &Path) -> Result<Vec<MathBlock>> {
    let content = fs::read_to_string(xml_path)
        .await
        .with_context(|| format!("无法读取XML文件: {}", xml_path.display()))?;

    extract_math_blocks(&content)
}

/// 将所有 MathML 块写入检查点文件，每行一个
pub async fn write_checkpoint(blocks: &[MathBlock], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("无法创建目录: {}", parent.display()))?;
    }

    let mut content = String::new();
    for block in blocks {
        content.push_str(&block.normalized());
        content.push('\n');
    }

    fs::write(path, content)
        .await
        .with_context(|| format!("无法写入检查点文件: {}", path.display()))?;

    info!("📄 已保存所有 MathML 块到: {}", path.display());
    Ok(())
}

/// 读取检查点文件，跳过空行
pub async fn read_checkpoint(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取检查点文件: {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
