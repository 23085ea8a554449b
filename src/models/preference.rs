//! 公式偏好映射

use std::collections::HashMap;

/// 预期输出文件名 → MathType 偏好名称
///
/// 启动时构建一次，之后只读。缺少条目是正常情况，不是错误。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceMap {
    entries: HashMap<String, String>,
}

impl PreferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, eps_name: impl Into<String>, preference: impl Into<String>) {
        self.entries.insert(eps_name.into(), preference.into());
    }

    /// 按输出文件名精确查找，不做模糊匹配
    pub fn get(&self, eps_name: &str) -> Option<&str> {
        self.entries.get(eps_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for PreferenceMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
