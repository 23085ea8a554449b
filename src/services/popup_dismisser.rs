//! 弹窗关闭服务 - 业务能力层
//!
//! 失败后的兜底：找到卡住流程的对话框并尝试关闭。只是启发式的，不保证成功。

use crate::error::RenderError;
use crate::infrastructure::ui_channel::WindowInfo;
use crate::services::renderer::RenderEngine;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// 弹窗识别与关闭策略
///
/// 可以替换为更可靠的识别方式而不影响编排层
#[async_trait]
pub trait DismissStrategy: Send + Sync {
    /// 该窗口是否是需要关闭的弹窗
    fn is_popup(&self, window: &WindowInfo) -> bool;

    /// 尝试关闭弹窗，默认聚焦后发送 ESC
    async fn dismiss(
        &self,
        engine: &dyn RenderEngine,
        window: &WindowInfo,
    ) -> Result<(), RenderError> {
        engine.dismiss(window).await
    }
}

/// 按标题关键字识别弹窗（不区分大小写）
pub struct KeywordStrategy {
    keywords: Vec<String>,
}

impl KeywordStrategy {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl Default for KeywordStrategy {
    fn default() -> Self {
        Self::new(["error", "math", "warning", "confirm", "save", "server"])
    }
}

#[async_trait]
impl DismissStrategy for KeywordStrategy {
    fn is_popup(&self, window: &WindowInfo) -> bool {
        let title = window.title.to_lowercase();
        self.keywords.iter().any(|k| title.contains(k.as_str()))
    }
}

/// 弹窗关闭服务
///
/// 职责：
/// - 枚举被控应用的顶层窗口
/// - 交给策略识别并关闭第一个可关闭的弹窗
/// - 不关心公式编号，不写文件
pub struct PopupDismisser {
    strategy: Box<dyn DismissStrategy>,
}

impl PopupDismisser {
    pub fn new(strategy: Box<dyn DismissStrategy>) -> Self {
        Self { strategy }
    }

    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(Box::new(KeywordStrategy::new(keywords)))
    }

    /// 关闭第一个匹配的弹窗
    ///
    /// # 返回
    /// 成功关闭返回 true；没有匹配的窗口或全部关闭失败返回 false
    pub async fn dismiss_popup(&self, engine: &dyn RenderEngine) -> bool {
        let windows = match engine.windows().await {
            Ok(windows) => windows,
            Err(e) => {
                warn!("⚠️ 检测弹窗时出错: {}", e);
                return false;
            }
        };

        for window in windows.iter().filter(|w| self.strategy.is_popup(w)) {
            info!("检测到弹窗: '{}'", window.title);
            debug!("弹窗详情: {:?}", window);

            match self.strategy.dismiss(engine, window).await {
                Ok(()) => {
                    info!("已向弹窗 '{}' 发送 ESC", window.title);
                    return true;
                }
                Err(e) => {
                    warn!("⚠️ 无法关闭弹窗 '{}': {}", window.title, e);
                }
            }
        }

        info!("没有检测到需要关闭的弹窗");
        false
    }
}

impl Default for PopupDismisser {
    fn default() -> Self {
        Self::new(Box::new(KeywordStrategy::default()))
    }
}
