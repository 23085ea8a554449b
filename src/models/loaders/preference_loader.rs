//! 公式偏好报告加载

use crate::models::preference::PreferenceMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// 解析制表符分隔的偏好报告
///
/// 每行 `<EPS 文件名>\t<偏好名>[\t...]`，少于两列的行直接跳过
pub fn parse_preferences(content: &str) -> PreferenceMap {
    let mut map = PreferenceMap::new();

    for (line_no, line) in content.lines().enumerate() {
        let parts: Vec<&str> = line.trim().split('\t').collect();
        if parts.len() < 2 {
            if !line.trim().is_empty() {
                debug!("跳过偏好报告第 {} 行: 列数不足", line_no + 1);
            }
            continue;
        }
        map.insert(parts[0].trim(), parts[1].trim());
    }

    map
}

/// 从文件加载偏好映射
///
/// 文件缺失或无法读取时返回空映射并记录警告，不影响后续处理
pub async fn load_preferences(report_file: &Path) -> PreferenceMap {
    if !report_file.exists() {
        warn!("⚠️ 未找到偏好报告文件: {}", report_file.display());
        return PreferenceMap::new();
    }

    match fs::read_to_string(report_file).await {
        Ok(content) => {
            let map = parse_preferences(&content);
            info!("✓ 已加载 {} 条公式偏好", map.len());
            map
        }
        Err(e) => {
            warn!(
                "⚠️ 无法读取偏好报告文件 {}: {}",
                report_file.display(),
                e
            );
            PreferenceMap::new()
        }
    }
}
