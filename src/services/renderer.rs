//! MathType 渲染控制 - 业务能力层
//!
//! 只负责"驱动 MathType 完成一步操作"的能力，不关心公式编号和失败处理

use crate::config::{ms, Config, TimingConfig};
use crate::error::{ConfigError, RenderError};
use crate::infrastructure::ui_channel::{UiChannel, WindowInfo};
use crate::infrastructure::wait::{settle, wait_until};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 渲染引擎能力接口
///
/// 编排层只依赖这个接口，测试时可以替换为模拟实现
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// 连接已运行的实例，否则启动新实例
    async fn acquire(&self) -> Result<(), RenderError>;

    /// 有界轮询查找主窗口，超时返回 `None`
    async fn locate_main_window(&self) -> Option<WindowInfo>;

    /// 将窗口置于前台
    async fn focus(&self, window: &WindowInfo) -> Result<(), RenderError>;

    /// 清空当前内容并通过剪贴板粘贴 MathML
    async fn inject_content(&self, mathml: &str) -> Result<(), RenderError>;

    /// 应用命名偏好，返回是否成功应用（菜单调用失败不视为错误）
    async fn apply_preference(&self, preference: &str) -> Result<bool, RenderError>;

    /// 另存为 EPS
    async fn save_as(&self, target: &Path) -> Result<(), RenderError>;

    /// 关闭当前公式窗口，失败只记录日志
    async fn close_current(&self);

    /// 枚举应用程序的所有顶层窗口
    async fn windows(&self) -> Result<Vec<WindowInfo>, RenderError>;

    /// 聚焦窗口并发送 ESC
    async fn dismiss(&self, window: &WindowInfo) -> Result<(), RenderError>;
}

/// MathType 的窗口特征与菜单配置
#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub executable: PathBuf,
    pub process_name: String,
    pub main_window_title: String,
    pub main_window_class: String,
    pub save_dialog: Regex,
    pub confirm_save: Regex,
    pub preference_dialog: Regex,
}

impl RendererSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            executable: config.mathtype_path.clone(),
            process_name: config.process_name.clone(),
            main_window_title: config.main_window_title.clone(),
            main_window_class: config.main_window_class.clone(),
            save_dialog: compile(&config.save_dialog_pattern)?,
            confirm_save: compile(&config.confirm_save_pattern)?,
            preference_dialog: compile(&config.preference_dialog_pattern)?,
        })
    }

    fn is_main_window(&self, window: &WindowInfo) -> bool {
        window.title.contains(&self.main_window_title)
            && window.class_name == self.main_window_class
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// MathType 渲染控制器
///
/// 职责：
/// - 持有 UI 控制通道
/// - 把"粘贴 / 应用偏好 / 保存 / 关闭"翻译为按键、菜单和对话框操作
/// - 不出现公式编号
/// - 不处理失败恢复
pub struct RendererController<C: UiChannel> {
    channel: C,
    settings: RendererSettings,
    timings: TimingConfig,
}

impl<C: UiChannel> RendererController<C> {
    pub fn new(channel: C, settings: RendererSettings, timings: TimingConfig) -> Self {
        Self {
            channel,
            settings,
            timings,
        }
    }

    pub fn from_config(channel: C, config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            channel,
            RendererSettings::from_config(config)?,
            config.timings.clone(),
        ))
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// 轮询查找标题匹配的可见窗口
    async fn find_window(&self, pattern: &Regex, timeout_ms: u64) -> Option<WindowInfo> {
        let channel = &self.channel;
        wait_until(&self.timings.poll(timeout_ms), || async move {
            channel
                .windows()
                .await
                .ok()?
                .into_iter()
                .find(|w| w.visible && pattern.is_match(&w.title))
        })
        .await
    }

    /// 偏好对话框是可选的，出现则点击 OK
    async fn confirm_preference_dialog(&self) {
        let Some(dialog) = self
            .find_window(
                &self.settings.preference_dialog,
                self.timings.preference_dialog_timeout_ms,
            )
            .await
        else {
            return;
        };

        match self.channel.click_button(dialog.handle, "OK").await {
            Ok(()) => info!("已在偏好对话框中点击 OK"),
            Err(e) => debug!("偏好对话框点击 OK 失败: {:#}", e),
        }
    }

    /// 覆盖确认对话框是可选的，出现则点击 Yes
    async fn confirm_overwrite(&self) {
        let Some(confirm) = self
            .find_window(
                &self.settings.confirm_save,
                self.timings.overwrite_confirm_timeout_ms,
            )
            .await
        else {
            return;
        };

        match self.channel.click_button(confirm.handle, "Yes").await {
            Ok(()) => info!("已确认覆盖保存"),
            Err(e) => debug!("覆盖确认点击 Yes 失败: {:#}", e),
        }
    }
}

#[async_trait]
impl<C: UiChannel> RenderEngine for RendererController<C> {
    async fn acquire(&self) -> Result<(), RenderError> {
        match self.channel.attach(&self.settings.process_name).await {
            Ok(true) => {
                info!("✓ 已连接到运行中的 MathType");
                return Ok(());
            }
            Ok(false) => debug!("MathType 未运行"),
            Err(e) => debug!("连接 MathType 失败: {:#}", e),
        }

        self.channel
            .launch(&self.settings.executable)
            .await
            .map_err(|e| RenderError::ApplicationUnavailable {
                message: format!("{:#}", e),
            })?;
        info!("🚀 已启动新的 MathType 实例");
        settle(ms(self.timings.launch_settle_ms)).await;
        Ok(())
    }

    async fn locate_main_window(&self) -> Option<WindowInfo> {
        let channel = &self.channel;
        let settings = &self.settings;
        wait_until(&self.timings.poll(self.timings.window_timeout_ms), || async move {
            channel
                .windows()
                .await
                .ok()?
                .into_iter()
                .find(|w| settings.is_main_window(w))
        })
        .await
    }

    async fn focus(&self, window: &WindowInfo) -> Result<(), RenderError> {
        self.channel
            .focus(window.handle)
            .await
            .map_err(|e| RenderError::channel("focus", e))
    }

    async fn inject_content(&self, mathml: &str) -> Result<(), RenderError> {
        let paste_failed = |e: anyhow::Error| RenderError::PasteFailed {
            message: format!("{:#}", e),
        };

        self.channel
            .send_keys("^a{BACKSPACE}")
            .await
            .map_err(paste_failed)?;
        settle(ms(self.timings.clear_settle_ms)).await;

        self.channel.set_clipboard(mathml).await.map_err(paste_failed)?;
        self.channel.send_keys("^v").await.map_err(paste_failed)?;
        settle(ms(self.timings.paste_settle_ms)).await;

        Ok(())
    }

    async fn apply_preference(&self, preference: &str) -> Result<bool, RenderError> {
        let Some(main) = self.locate_main_window().await else {
            warn!("⚠️ 应用偏好时未找到 MathType 窗口");
            return Ok(false);
        };

        self.focus(&main).await?;
        self.channel
            .send_keys("^a")
            .await
            .map_err(|e| RenderError::channel("send_keys", e))?;
        settle(ms(self.timings.select_settle_ms)).await;

        let menu_path = format!("Preferences->{}", preference);
        if let Err(e) = self.channel.menu_select(main.handle, &menu_path).await {
            let err = RenderError::PreferenceFailed {
                preference: preference.to_string(),
                message: format!("{:#}", e),
            };
            warn!("⚠️ {}", err);
            return Ok(false);
        }

        info!("✓ 已应用偏好: {}", preference);
        settle(ms(self.timings.preference_settle_ms)).await;
        self.confirm_preference_dialog().await;
        Ok(true)
    }

    async fn save_as(&self, target: &Path) -> Result<(), RenderError> {
        let main = self
            .locate_main_window()
            .await
            .ok_or(RenderError::MainWindowNotFound { stage: "保存 EPS" })?;

        self.channel
            .menu_select(main.handle, "File->Save As")
            .await
            .map_err(|e| RenderError::channel("menu_select", e))?;
        settle(ms(self.timings.save_menu_settle_ms)).await;

        let dialog = self
            .find_window(&self.settings.save_dialog, self.timings.save_dialog_timeout_ms)
            .await
            .ok_or(RenderError::SaveDialogTimeout {
                timeout_ms: self.timings.save_dialog_timeout_ms,
            })?;

        self.channel
            .set_edit_text(dialog.handle, &target.to_string_lossy())
            .await
            .map_err(|e| RenderError::channel("set_edit_text", e))?;
        settle(ms(self.timings.path_settle_ms)).await;

        self.channel
            .click_button(dialog.handle, "Save")
            .await
            .map_err(|e| RenderError::channel("click_button", e))?;
        settle(ms(self.timings.save_settle_ms)).await;

        self.confirm_overwrite().await;

        info!("✅ 已保存 EPS: {}", target.display());
        Ok(())
    }

    async fn close_current(&self) {
        let Some(main) = self.locate_main_window().await else {
            return;
        };

        let closed = match self.channel.focus(main.handle).await {
            Ok(()) => self.channel.send_keys("^w").await,
            Err(e) => Err(e),
        };

        match closed {
            Ok(()) => {
                settle(ms(self.timings.close_settle_ms)).await;
                info!("已关闭当前 MathType 窗口");
            }
            Err(e) => warn!("⚠️ 无法关闭 MathType 窗口: {:#}", e),
        }
    }

    async fn windows(&self) -> Result<Vec<WindowInfo>, RenderError> {
        self.channel
            .windows()
            .await
            .map_err(|e| RenderError::channel("windows", e))
    }

    async fn dismiss(&self, window: &WindowInfo) -> Result<(), RenderError> {
        self.channel
            .focus(window.handle)
            .await
            .map_err(|e| RenderError::channel("focus", e))?;
        self.channel
            .send_keys("{ESC}")
            .await
            .map_err(|e| RenderError::channel("send_keys", e))?;
        settle(ms(self.timings.dismiss_settle_ms)).await;
        Ok(())
    }
}
