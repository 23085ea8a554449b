//! 公式处理流程 - 流程层
//!
//! 核心职责：定义"一个公式"的正常处理流程
//!
//! 流程顺序：
//! 1. 粘贴 MathML
//! 2. 应用偏好（可选）
//! 3. 另存为 EPS
//! 4. 关闭公式窗口
//!
//! 任何一步出错都直接返回错误，由编排层负责兜底

use std::fmt::Display;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::RenderError;
use crate::models::artifact::OutputArtifact;
use crate::models::preference::PreferenceMap;
use crate::services::renderer::RenderEngine;
use crate::utils::logging::truncate_text;
use crate::workflow::equation_ctx::EquationCtx;

/// 单个公式的处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquationState {
    Pending,
    Injected,
    PreferenceApplied,
    Saved,
    Closed,
    Failed,
    Recovered,
    PlaceholderWritten,
}

impl Display for EquationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EquationState::Pending => "待处理",
            EquationState::Injected => "已粘贴",
            EquationState::PreferenceApplied => "已应用偏好",
            EquationState::Saved => "已保存",
            EquationState::Closed => "已关闭",
            EquationState::Failed => "失败",
            EquationState::Recovered => "已尝试恢复",
            EquationState::PlaceholderWritten => "已写占位文件",
        };
        f.write_str(name)
    }
}

/// 公式处理流程
///
/// - 编排单个公式的正常流程
/// - 决定是否应用偏好
/// - 不持有任何资源（MathType 由调用方传入）
/// - 不推进编号、不写占位文件
pub struct EquationFlow {
    verbose_logging: bool,
}

impl EquationFlow {
    pub fn new(config: &Config) -> Self {
        Self {
            verbose_logging: config.verbose_logging,
        }
    }

    pub async fn run(
        &self,
        engine: &dyn RenderEngine,
        mathml: &str,
        ctx: &EquationCtx,
        preferences: &PreferenceMap,
    ) -> Result<OutputArtifact, RenderError> {
        let mut state = EquationState::Pending;
        self.log_mathml(ctx, mathml);

        // ========== 1. 粘贴 ==========
        engine.inject_content(mathml).await?;
        transition(ctx, &mut state, EquationState::Injected);

        // ========== 2. 偏好 ==========
        let eps_name = ctx.eps_name();
        match preferences.get(&eps_name) {
            Some(preference) => {
                if engine.apply_preference(preference).await? {
                    transition(ctx, &mut state, EquationState::PreferenceApplied);
                }
            }
            None => {
                warn!(
                    "{} ⚠️ 未找到 {} 的偏好，不应用偏好直接保存",
                    ctx, eps_name
                );
            }
        }

        // ========== 3. 保存 ==========
        let path = ctx.eps_path();
        engine.save_as(&path).await?;
        transition(ctx, &mut state, EquationState::Saved);

        // ========== 4. 关闭 ==========
        engine.close_current().await;
        transition(ctx, &mut state, EquationState::Closed);

        info!("{} ✓ 公式处理完成", ctx);
        Ok(OutputArtifact::Rendered {
            index: ctx.index,
            path,
        })
    }

    fn log_mathml(&self, ctx: &EquationCtx, mathml: &str) {
        if self.verbose_logging {
            debug!("{} MathML: {}", ctx, mathml);
        } else {
            info!("{} MathML: {}", ctx, truncate_text(mathml, 80));
        }
    }
}

/// 记录状态迁移
pub fn transition(ctx: &EquationCtx, state: &mut EquationState, next: EquationState) {
    debug!("{} 状态: {} → {}", ctx, state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ui_channel::WindowInfo;
    use async_trait::async_trait;
    use std::io;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingEngine {
        save_fails: bool,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingEngine {
        fn log(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RenderEngine for RecordingEngine {
        async fn acquire(&self) -> Result<(), RenderError> {
            Ok(())
        }
        async fn locate_main_window(&self) -> Option<WindowInfo> {
            None
        }
        async fn focus(&self, _window: &WindowInfo) -> Result<(), RenderError> {
            Ok(())
        }
        async fn inject_content(&self, mathml: &str) -> Result<(), RenderError> {
            self.log(format!("inject {}", mathml));
            Ok(())
        }
        async fn apply_preference(&self, preference: &str) -> Result<bool, RenderError> {
            self.log(format!("preference {}", preference));
            Ok(true)
        }
        async fn save_as(&self, target: &Path) -> Result<(), RenderError> {
            if self.save_fails {
                return Err(RenderError::SaveDialogTimeout { timeout_ms: 0 });
            }
            let name = target.file_name().unwrap_or_default().to_string_lossy();
            self.log(format!("save {}", name));
            Ok(())
        }
        async fn close_current(&self) {
            self.log("close");
        }
        async fn windows(&self) -> Result<Vec<WindowInfo>, RenderError> {
            Ok(Vec::new())
        }
        async fn dismiss(&self, _window: &WindowInfo) -> Result<(), RenderError> {
            Ok(())
        }
    }

    /// 收集 tracing 输出的写入器
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture_warnings() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    fn ctx(index: usize) -> EquationCtx {
        EquationCtx::new(index, 3, index, Path::new("out"))
    }

    #[tokio::test]
    async fn test_mapped_preference_is_applied_before_save() {
        let engine = RecordingEngine::default();
        let preferences: PreferenceMap =
            [("Eqn2.eps".to_string(), "Large".to_string())].into_iter().collect();

        let artifact = EquationFlow::new(&Config::default())
            .run(&engine, "<math/>", &ctx(2), &preferences)
            .await
            .unwrap();

        assert_eq!(
            engine.calls(),
            vec!["inject <math/>", "preference Large", "save Eqn2.eps", "close"]
        );
        assert_eq!(artifact.index(), 2);
        assert!(!artifact.is_placeholder());
    }

    #[tokio::test]
    async fn test_unmapped_equation_skips_preference() {
        let engine = RecordingEngine::default();
        EquationFlow::new(&Config::default())
            .run(&engine, "<math/>", &ctx(1), &PreferenceMap::new())
            .await
            .unwrap();

        assert_eq!(engine.calls(), vec!["inject <math/>", "save Eqn1.eps", "close"]);
    }

    #[tokio::test]
    async fn test_save_failure_stops_before_close() {
        let engine = RecordingEngine {
            save_fails: true,
            ..Default::default()
        };
        let err = EquationFlow::new(&Config::default())
            .run(&engine, "<math/>", &ctx(3), &PreferenceMap::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::SaveDialogTimeout { .. }));
        assert_eq!(engine.calls(), vec!["inject <math/>"]);
    }

    #[tokio::test]
    async fn test_unmapped_equation_logs_warning() {
        let (logs, _guard) = capture_warnings();
        let engine = RecordingEngine::default();
        let preferences: PreferenceMap =
            [("Eqn2.eps".to_string(), "Large".to_string())].into_iter().collect();
        let flow = EquationFlow::new(&Config::default());

        flow.run(&engine, "<math/>", &ctx(2), &preferences).await.unwrap();
        assert!(!logs.text().contains("的偏好"), "有偏好时不应警告");

        flow.run(&engine, "<math/>", &ctx(1), &preferences).await.unwrap();
        let text = logs.text();
        assert!(text.contains("WARN"), "{}", text);
        assert!(text.contains("未找到 Eqn1.eps 的偏好"), "{}", text);
    }
}
