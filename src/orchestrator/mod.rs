//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责启动检查和公式调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 转换任务入口
//! - 启动前置检查（致命错误在此终止）
//! - 管理 MathType 连接和 UI 桥接程序
//! - 写检查点、加载偏好
//! - 输出全局统计信息
//!
//! ### `equation_processor` - 公式批处理器
//! - 按顺序遍历所有公式
//! - 分配编号（成功与失败共用一个序列）
//! - 截住单个公式的错误，写占位文件
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理整个 XML)
//!     ↓
//! equation_processor (处理 Vec<公式>)
//!     ↓
//! workflow::EquationFlow (处理单个公式)
//!     ↓
//! services (能力层：renderer / popup / placeholder / report)
//!     ↓
//! infrastructure (基础设施：UiChannel / wait)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管启动和资源，equation_processor 管逐个公式
//! 2. **资源隔离**：只有编排层持有渲染引擎
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **失败隔离**：单个公式的错误不会越过 equation_processor

pub mod batch_processor;
pub mod equation_processor;

// 重新导出主要类型
pub use batch_processor::{preflight, App};
pub use equation_processor::{EquationProcessor, RunStats};
