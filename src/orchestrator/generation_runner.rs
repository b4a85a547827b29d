//! 题目生成编排 - 编排层
//!
//! ## 职责
//!
//! 1. **加载**：读取知识数据与系统指令
//! 2. **分块**：按块构建生成请求
//! 3. **顺序处理**：逐块委托 `ChunkFlow`，块与块之间固定等待
//! 4. **输出**：合格题目写入 `<output_dir>/<genre_id>.tsv`
//! 5. **统计**：汇总成功/失败分块与写出题数
//!
//! 不并发提交分块；单块失败只记录，继续下一块。

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::clients::QuestionGenerator;
use crate::error::{AppError, AppResult};
use crate::models::loaders::{load_knowledge_file, load_system_instruction, write_tsv, WriteMode};
use crate::models::{GenreCatalog, QuestionRecord};
use crate::services::prompt_builder::{GenerationMode, PromptBuilder};
use crate::utils::logging;
use crate::workflow::{ChunkCtx, ChunkFlow, ChunkResult};

/// 一次生成任务的参数
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub knowledge_file: PathBuf,
    pub mode: GenerationMode,
    pub chunk_size: NonZeroUsize,
    pub output_dir: PathBuf,
    pub system_instruction_file: PathBuf,
    pub cooldown: Duration,
}

/// 生成统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub total_chunks: usize,
    pub processed_chunks: usize,
    pub failed_chunks: usize,
    pub questions_written: usize,
    pub rejected_rows: usize,
    /// 输出文件，dry run 或没有写出任何题目时为 None
    pub output_file: Option<PathBuf>,
}

/// 题目生成编排器
pub struct GenerationRunner<'a> {
    catalog: &'a GenreCatalog,
    options: GenerationOptions,
}

impl<'a> GenerationRunner<'a> {
    pub fn new(catalog: &'a GenreCatalog, options: GenerationOptions) -> Self {
        Self { catalog, options }
    }

    /// 输出文件路径
    pub fn output_path(&self, genre_id: &str) -> PathBuf {
        self.options.output_dir.join(format!("{}.tsv", genre_id))
    }

    /// 运行生成任务
    ///
    /// # 参数
    /// - `generator`: 生成服务；为 `None` 时只构建提示词（dry run），不发出任何请求
    ///
    /// # 返回
    /// 返回生成统计。输入错误（文件缺失、格式错误）直接返回 Err。
    pub async fn run(&self, generator: Option<&dyn QuestionGenerator>) -> AppResult<GenerationSummary> {
        let knowledge = load_knowledge_file(&self.options.knowledge_file).await?;
        let genre_id = knowledge.genre_id.clone();
        if !self.catalog.contains(&genre_id) {
            warn!("⚠️ 未登记的分类 {}，分类名称使用分类ID", genre_id);
        }

        let builder = PromptBuilder::new(
            self.catalog,
            &genre_id,
            self.options.mode,
            self.options.chunk_size,
        );
        let requests = builder.build_requests(&knowledge.items);

        logging::log_startup(
            "题目生成",
            &[
                ("分类", format!("{} ({})", genre_id, self.catalog.genre_name(&genre_id))),
                ("知识条数", knowledge.items.len().to_string()),
                ("分块", format!("{} 块 × 最多 {} 条", requests.len(), self.options.chunk_size)),
                ("模式", self.options.mode.to_string()),
            ],
        );

        let mut summary = GenerationSummary {
            total_chunks: requests.len(),
            ..Default::default()
        };

        if requests.is_empty() {
            warn!("⚠️ 知识数据为空，没有需要生成的分块");
            return Ok(summary);
        }

        let Some(generator) = generator else {
            for request in &requests {
                info!(
                    "[DRY RUN] 块 {}/{}: {} 条知识, 提示词 {} 字符",
                    request.chunk_index,
                    requests.len(),
                    request.item_count,
                    request.user_prompt.chars().count()
                );
            }
            return Ok(summary);
        };

        let system_instruction = load_system_instruction(&self.options.system_instruction_file).await?;
        let flow = ChunkFlow::new(generator, &system_instruction);
        let output = self.output_path(&genre_id);
        let mut write_mode = WriteMode::Truncate;

        for request in &requests {
            let ctx = ChunkCtx::new(&genre_id, request.chunk_index, requests.len());
            logging::log_chunk_start(ctx.chunk_index, ctx.total_chunks, request.item_count);

            match flow.run(request, &ctx).await {
                ChunkResult::Parsed(report) => {
                    summary.processed_chunks += 1;
                    summary.rejected_rows += report.error_count();
                    if !report.accepted.is_empty() {
                        self.write_records(&output, &report.accepted, write_mode).await?;
                        write_mode = WriteMode::Append;
                        summary.questions_written += report.accepted_count();
                        summary.output_file = Some(output.clone());
                        info!("{} 💾 写出 {} 道题", ctx, report.accepted_count());
                    }
                }
                ChunkResult::Failed(_) => summary.failed_chunks += 1,
            }

            if !ctx.is_last() && !self.options.cooldown.is_zero() {
                tokio::time::sleep(self.options.cooldown).await;
            }
        }

        logging::print_generation_stats(
            summary.processed_chunks,
            summary.failed_chunks,
            summary.questions_written,
            summary.output_file.as_deref().and_then(Path::to_str),
        );

        Ok(summary)
    }

    async fn write_records(
        &self,
        output: &Path,
        records: &[QuestionRecord],
        mode: WriteMode,
    ) -> AppResult<()> {
        if let Some(dir) = output.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::file_write_failed(dir.display().to_string(), e))?;
        }
        write_tsv(records, output, mode).await
    }
}
