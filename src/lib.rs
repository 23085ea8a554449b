//! # MathML to EPS
//!
//! 把 XML 中的 MathML 公式逐个交给 MathType 渲染，批量导出为 EPS 文件
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（UI 桥接进程），只暴露能力
//! - `UiChannel` - 窗口枚举、按键、菜单、剪贴板
//! - `wait` - 有界轮询原语
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不出现公式编号流程
//! - `RendererController` - 驱动 MathType（粘贴 / 偏好 / 保存 / 关闭）
//! - `PopupDismisser` - 关闭卡住的弹窗
//! - `PlaceholderWriter` - 写失败占位文件
//! - `RunReport` - 写运行日志
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个公式"的完整处理流程
//! - `EquationCtx` - 上下文封装（序号 + 输出编号）
//! - `EquationSequence` - 输出编号序列
//! - `EquationFlow` - 流程编排（粘贴 → 偏好 → 保存 → 关闭）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 启动检查与资源管理
//! - `orchestrator/equation_processor` - 逐个处理公式并隔离失败
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, TimingConfig};
pub use error::{ConfigError, FileError, RenderError, StartupError};
pub use infrastructure::{BridgeChannel, UiChannel, WindowHandle, WindowInfo};
pub use models::{MathBlock, OutputArtifact, PreferenceMap};
pub use orchestrator::{preflight, App, EquationProcessor, RunStats};
pub use services::{PopupDismisser, RenderEngine, RendererController};
pub use workflow::{EquationCtx, EquationFlow, EquationSequence};
