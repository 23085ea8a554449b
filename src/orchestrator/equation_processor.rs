//! 公式批处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责按顺序处理所有公式，是公式级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **遍历公式**：严格按顺序逐个处理，同一时间只有一个公式在 MathType 中
//! 2. **编号分配**：每个公式从序列中取一个编号，无论成败都只取一次
//! 3. **失败隔离**：单个公式的任何错误都在这里截住，不会中止整个批次
//! 4. **兜底处理**：尝试关闭弹窗，写入 `Eqn{n}_failed.eps` 占位文件
//! 5. **统计输出**：记录成功/失败数量

use crate::config::{ms, Config};
use crate::error::RenderError;
use crate::infrastructure::wait::settle;
use crate::models::artifact::OutputArtifact;
use crate::models::preference::PreferenceMap;
use crate::services::{Outcome, PlaceholderWriter, PopupDismisser, RenderEngine, RunReport};
use crate::utils::logging::log_equation_start;
use crate::workflow::equation_flow::transition;
use crate::workflow::{EquationCtx, EquationFlow, EquationSequence, EquationState};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// 批处理统计
#[derive(Debug, Default)]
pub struct RunStats {
    pub total: usize,
    pub rendered: usize,
    pub failed: usize,
    /// 连占位文件都没能写出的公式数
    pub lost: usize,
    /// 按编号顺序排列的输出文件
    pub artifacts: Vec<OutputArtifact>,
}

impl RunStats {
    /// 失败公式的占位文件名
    pub fn failed_names(&self) -> Vec<String> {
        self.artifacts
            .iter()
            .filter(|a| a.is_placeholder())
            .map(OutputArtifact::file_name)
            .collect()
    }
}

/// 公式批处理器
///
/// 持有对 MathType 引擎的借用，不持有 MathType 本身
pub struct EquationProcessor<'a> {
    engine: &'a dyn RenderEngine,
    dismisser: &'a PopupDismisser,
    flow: EquationFlow,
    placeholder: PlaceholderWriter,
    report: Option<&'a RunReport>,
    output_dir: PathBuf,
    between_equations: Duration,
}

impl<'a> EquationProcessor<'a> {
    pub fn new(
        engine: &'a dyn RenderEngine,
        dismisser: &'a PopupDismisser,
        config: &Config,
        output_dir: &Path,
    ) -> Self {
        Self {
            engine,
            dismisser,
            flow: EquationFlow::new(config),
            placeholder: PlaceholderWriter::new(),
            report: None,
            output_dir: output_dir.to_path_buf(),
            between_equations: ms(config.timings.between_equations_ms),
        }
    }

    /// 同时写入运行日志
    pub fn with_report(mut self, report: &'a RunReport) -> Self {
        self.report = Some(report);
        self
    }

    /// 按顺序处理所有公式
    ///
    /// # 参数
    /// - `equations`: 每个元素是一个单行 MathML
    /// - `preferences`: 输出文件名 → 偏好名
    /// - `sequence`: 编号序列，由调用方持有，处理完后指向下一个可用编号
    pub async fn process_all(
        &self,
        equations: &[String],
        preferences: &PreferenceMap,
        sequence: &mut EquationSequence,
    ) -> RunStats {
        let total = equations.len();
        let mut stats = RunStats {
            total,
            ..Default::default()
        };

        // ========== 遍历所有公式 ==========
        for (index, mathml) in equations.iter().enumerate() {
            let ordinal = index + 1;
            match self.process_one(ordinal, total, mathml, preferences, sequence).await {
                Some(artifact) if artifact.is_placeholder() => {
                    stats.failed += 1;
                    stats.artifacts.push(artifact);
                }
                Some(artifact) => {
                    stats.rendered += 1;
                    stats.artifacts.push(artifact);
                }
                None => {
                    stats.failed += 1;
                    stats.lost += 1;
                }
            }

            settle(self.between_equations).await;
        }

        info!("\n✅ 所有 MathML 公式处理完毕");
        stats
    }

    /// 处理单个公式，错误不会传播到这里之外
    async fn process_one(
        &self,
        ordinal: usize,
        total: usize,
        mathml: &str,
        preferences: &PreferenceMap,
        sequence: &mut EquationSequence,
    ) -> Option<OutputArtifact> {
        let ctx = EquationCtx::new(ordinal, total, sequence.next_index(), &self.output_dir);
        log_equation_start(&ctx);

        let result = match self.flow.run(self.engine, mathml, &ctx, preferences).await {
            Ok(artifact) => Ok(artifact),
            Err(e) => self.recover(&ctx, &e).await,
        };

        match result {
            Ok(artifact) => {
                self.record(&ctx, &Outcome::Done(&artifact));
                Some(artifact)
            }
            Err(reason) => {
                self.record(&ctx, &Outcome::Lost(&reason));
                None
            }
        }
    }

    /// 失败兜底：关闭弹窗 → 写占位文件
    async fn recover(&self, ctx: &EquationCtx, err: &RenderError) -> Result<OutputArtifact, String> {
        let mut state = EquationState::Failed;
        error!("{} ❌ 处理公式出错: {}", ctx, err);

        if self.dismisser.dismiss_popup(self.engine).await {
            info!("{} 弹窗已关闭，继续下一个公式", ctx);
        } else {
            warn!("{} 没有可关闭的弹窗，继续下一个公式", ctx);
        }
        transition(ctx, &mut state, EquationState::Recovered);

        match self.placeholder.write(ctx).await {
            Ok(path) => {
                transition(ctx, &mut state, EquationState::PlaceholderWritten);
                Ok(OutputArtifact::Placeholder {
                    index: ctx.index,
                    path,
                })
            }
            Err(e) => {
                error!("{} ❌ 无法写入占位文件: {}", ctx, e);
                Err(e.to_string())
            }
        }
    }

    fn record(&self, ctx: &EquationCtx, outcome: &Outcome<'_>) {
        if let Some(report) = self.report {
            if let Err(e) = report.record(ctx, outcome) {
                warn!("{} ⚠️ 无法写入运行日志: {:#}", ctx, e);
            }
        }
    }
}
