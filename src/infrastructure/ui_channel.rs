//! UI 控制通道 - 基础设施层
//!
//! 对外部 UI 自动化能力（窗口枚举、按键注入、菜单、剪贴板）的最小抽象。
//! 不认识 MathML / EPS，也不处理流程。

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// 顶层窗口句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// 顶层窗口信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    pub class_name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// UI 控制通道
///
/// 职责：
/// - 连接/启动被控应用程序
/// - 枚举该应用程序的顶层窗口
/// - 注入按键、菜单、编辑框文本、按钮点击
/// - 写系统剪贴板
///
/// 所有操作都可能失败，且没有就绪信号
#[async_trait]
pub trait UiChannel: Send + Sync {
    /// 连接已运行的进程，未运行时返回 `Ok(false)`
    async fn attach(&self, process_name: &str) -> Result<bool>;

    /// 启动新的进程
    async fn launch(&self, executable: &Path) -> Result<()>;

    /// 当前被控应用程序的所有顶层窗口
    async fn windows(&self) -> Result<Vec<WindowInfo>>;

    /// 将窗口置于前台
    async fn focus(&self, window: WindowHandle) -> Result<()>;

    /// 向前台窗口发送按键序列（如 `^a{BACKSPACE}`）
    async fn send_keys(&self, keys: &str) -> Result<()>;

    /// 写入系统剪贴板
    async fn set_clipboard(&self, text: &str) -> Result<()>;

    /// 选择菜单项，路径以 `->` 分隔（如 `File->Save As`）
    async fn menu_select(&self, window: WindowHandle, path: &str) -> Result<()>;

    /// 设置窗口中编辑框的文本
    async fn set_edit_text(&self, window: WindowHandle, text: &str) -> Result<()>;

    /// 点击窗口中指定文字的按钮
    async fn click_button(&self, window: WindowHandle, label: &str) -> Result<()>;
}
