//! MathML 公式块

use std::fmt::Display;

/// 从 XML 中提取出的单个 `<math>` 块
///
/// 提取后不可变，在文档中的位置即其处理顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathBlock {
    /// altimg 属性值（原文档中的替代图片引用）
    pub altimg: String,
    /// `<math>` 与 `</math>` 之间的内容
    pub body: String,
}

impl MathBlock {
    pub fn new(altimg: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            altimg: altimg.into(),
            body: body.into(),
        }
    }

    /// 重建的 MathML 标记，只保留 altimg 属性
    pub fn markup(&self) -> String {
        format!(r#"<math altimg="{}">{}</math>"#, self.altimg, self.body)
    }

    /// 单行形式（去掉换行和首尾空白），用于检查点文件
    pub fn normalized(&self) -> String {
        self.markup().trim().replace(['\r', '\n'], "")
    }
}

impl Display for MathBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[altimg={} 长度={}]", self.altimg, self.body.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_is_single_line() {
        let block = MathBlock::new("eq1.png", "\n  <mi>x</mi>\r\n  <mo>=</mo>\n");
        assert_eq!(
            block.normalized(),
            r#"<math altimg="eq1.png">  <mi>x</mi>  <mo>=</mo></math>"#
        );
    }
}
