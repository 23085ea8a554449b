//! 转换任务入口 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责启动检查和资源管理。
//!
//! ## 核心功能
//!
//! 1. **启动检查**：XML 存在、MathType 存在、至少提取到一个公式，任何一项失败都直接退出
//! 2. **资源初始化**：检查剪贴板、启动 UI 桥接程序、创建渲染控制器
//! 3. **准备数据**：写检查点文件、加载偏好报告
//! 4. **连接 MathType**：整个运行过程中只连接一次
//! 5. **向下委托**：委托 equation_processor 逐个处理公式
//! 6. **全局统计**：输出最终结果

use crate::config::Config;
use crate::error::StartupError;
use crate::infrastructure::BridgeChannel;
use crate::models::{
    load_math_blocks, load_preferences, read_checkpoint, write_checkpoint, MathBlock,
};
use crate::orchestrator::equation_processor::{EquationProcessor, RunStats};
use crate::services::{PopupDismisser, RenderEngine, RendererController, RunReport};
use crate::utils::logging::{log_blocks_found, log_startup, print_final_stats};
use crate::workflow::EquationSequence;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    xml_file: PathBuf,
    output_dir: PathBuf,
    blocks: Vec<MathBlock>,
    engine: Box<dyn RenderEngine>,
    dismisser: PopupDismisser,
}

impl App {
    /// 初始化应用
    ///
    /// 启动检查失败时返回 `StartupError`，此时不会产生任何输出文件
    pub async fn initialize(config: Config, xml_file: PathBuf) -> Result<Self> {
        let blocks = preflight(&config, &xml_file).await?;

        BridgeChannel::probe_clipboard()?;
        let channel = BridgeChannel::spawn(
            &config.ui_bridge_command,
            &config.ui_bridge_args,
            crate::config::ms(config.timings.bridge_request_timeout_ms),
        )?;
        let controller = RendererController::from_config(channel, &config)?;

        Ok(Self::with_engine(config, xml_file, blocks, Box::new(controller)))
    }

    /// 使用指定的渲染引擎创建应用（跳过桥接程序）
    pub fn with_engine(
        config: Config,
        xml_file: PathBuf,
        blocks: Vec<MathBlock>,
        engine: Box<dyn RenderEngine>,
    ) -> Self {
        let output_dir = config.resolve_output_dir(&xml_file);
        let dismisser = PopupDismisser::with_keywords(&config.popup_keywords);
        Self {
            config,
            xml_file,
            output_dir,
            blocks,
            engine,
            dismisser,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunStats> {
        log_startup(&self.xml_file, &self.output_dir);
        log_blocks_found(self.blocks.len());

        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("无法创建输出目录: {}", self.output_dir.display()))?;

        // 检查点文件即实际处理的内容
        write_checkpoint(&self.blocks, &self.config.checkpoint_file).await?;
        let equations = read_checkpoint(&self.config.checkpoint_file).await?;

        let preferences = load_preferences(&self.config.report_file).await;

        // 连接 MathType（只连接一次）
        self.engine.acquire().await?;
        match self.engine.locate_main_window().await {
            Some(main) => {
                if let Err(e) = self.engine.focus(&main).await {
                    warn!("⚠️ 无法聚焦 MathType 窗口: {}", e);
                }
            }
            None => warn!("⚠️ 启动时未找到 MathType 主窗口"),
        }

        let report = match RunReport::create(
            self.config.run_log_path(),
            &self.xml_file,
            equations.len(),
        ) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("⚠️ 无法创建运行日志: {:#}", e);
                None
            }
        };

        let processor = EquationProcessor::new(
            self.engine.as_ref(),
            &self.dismisser,
            &self.config,
            &self.output_dir,
        );
        let processor = match &report {
            Some(report) => processor.with_report(report),
            None => processor,
        };

        let mut sequence = EquationSequence::new();
        let stats = processor
            .process_all(&equations, &preferences, &mut sequence)
            .await;
        info!("下一个可用编号: {}", sequence.current());

        if let Some(report) = &report {
            if let Err(e) = report.finish(stats.rendered, stats.failed, stats.total) {
                warn!("⚠️ 无法写入运行日志汇总: {:#}", e);
            }
        }

        print_final_stats(
            stats.rendered,
            stats.failed,
            stats.total,
            &stats.failed_names(),
            report.as_ref().map(RunReport::path),
        );

        Ok(stats)
    }
}

/// 启动前置检查
///
/// 按顺序检查：XML 文件存在 → MathType 存在 → 至少一个公式
pub async fn preflight(config: &Config, xml_file: &Path) -> Result<Vec<MathBlock>> {
    if !xml_file.exists() {
        return Err(StartupError::InputNotFound {
            path: xml_file.to_path_buf(),
        }
        .into());
    }

    if !config.mathtype_path.exists() {
        return Err(StartupError::RendererNotFound {
            path: config.mathtype_path.clone(),
        }
        .into());
    }

    let blocks = load_math_blocks(xml_file).await?;
    if blocks.is_empty() {
        return Err(StartupError::NoMathBlocks {
            path: xml_file.to_path_buf(),
        }
        .into());
    }

    Ok(blocks)
}
