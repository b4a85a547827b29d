//! 分块处理流程 - 流程层
//!
//! 核心职责：定义"一个知识分块"的完整处理流程
//!
//! 流程顺序：
//! 1. 调用生成服务
//! 2. 解析并校验响应
//! 3. 返回合格题目与行级诊断
//!
//! 生成服务失败不会向上传播，只记为该分块失败，由编排层继续下一块。

use tracing::{error, info};

use crate::clients::QuestionGenerator;
use crate::services::prompt_builder::GenerationRequest;
use crate::services::response_parser::{parse_response, ParseReport};
use crate::utils::truncate_text;
use crate::workflow::chunk_ctx::ChunkCtx;

/// 分块处理结果
#[derive(Debug, Clone)]
pub enum ChunkResult {
    /// 生成并解析成功（可能含行级错误）
    Parsed(ParseReport),
    /// 生成或提取失败
    Failed(String),
}

/// 分块处理流程
///
/// - 只处理单个分块
/// - 不写文件、不关心分块之间的等待
pub struct ChunkFlow<'a> {
    generator: &'a dyn QuestionGenerator,
    system_instruction: &'a str,
}

impl<'a> ChunkFlow<'a> {
    /// 创建新的分块处理流程
    pub fn new(generator: &'a dyn QuestionGenerator, system_instruction: &'a str) -> Self {
        Self {
            generator,
            system_instruction,
        }
    }

    pub async fn run(&self, request: &GenerationRequest, ctx: &ChunkCtx) -> ChunkResult {
        info!("{} 🤖 调用生成服务...", ctx);

        let response = match self
            .generator
            .generate(self.system_instruction, &request.user_prompt)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("{} ❌ 生成失败: {}", ctx, e);
                return ChunkResult::Failed(e.to_string());
            }
        };

        info!(
            "{} ✓ 收到响应 ({} 字符): {}",
            ctx,
            response.chars().count(),
            truncate_text(&response, 50)
        );

        match parse_response(&response) {
            Ok(report) => ChunkResult::Parsed(report),
            Err(e) => {
                error!("{} ❌ 响应解析失败: {}", ctx, e);
                ChunkResult::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;

    struct FixedGenerator(Option<&'static str>);

    #[async_trait]
    impl QuestionGenerator for FixedGenerator {
        async fn generate(&self, _system: &str, _user: &str) -> AppResult<String> {
            match self.0 {
                Some(text) => Ok(text.to_string()),
                None => Err(AppError::llm_api_failed("test-model", "timeout")),
            }
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            chunk_index: 1,
            item_count: 1,
            user_prompt: "prompt".to_string(),
        }
    }

    #[tokio::test]
    async fn test_generator_failure_is_chunk_failure() {
        let generator = FixedGenerator(None);
        let flow = ChunkFlow::new(&generator, "");
        let result = flow.run(&request(), &ChunkCtx::new("JP01", 1, 1)).await;
        assert!(matches!(result, ChunkResult::Failed(ref reason) if reason.contains("timeout")));
    }

    #[tokio::test]
    async fn test_response_is_parsed() {
        let generator = FixedGenerator(Some(
            "```tsv\nsubject\tgenre_id\tgenre_name\tquestion_text\tchoices\tcorrect_index\tcorrect_answer\njp\tJP01\t漢字・語彙\tq\t[\"A\",\"B\",\"C\",\"D\"]\t1\tB\n```",
        ));
        let flow = ChunkFlow::new(&generator, "system");
        match flow.run(&request(), &ChunkCtx::new("JP01", 1, 1)).await {
            ChunkResult::Parsed(report) => assert_eq!(report.accepted_count(), 1),
            ChunkResult::Failed(reason) => panic!("unexpected failure: {}", reason),
        }
    }
}
