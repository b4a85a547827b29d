//! 分块提示词构建 - 业务能力层
//!
//! 只负责把知识数据切块并渲染为生成请求，不调用生成服务。

use serde_json::Value;
use std::num::NonZeroUsize;

use crate::models::GenreCatalog;

/// 生成模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// 每条知识生成一题
    Standard,
    /// 每条知识生成多题，使用多种干扰项策略
    #[default]
    Max,
}

impl GenerationMode {
    fn instruction(self) -> &'static str {
        match self {
            GenerationMode::Max => "【最大化プラン】で問題を生成してください。\n\
1つの知識データから複数の問題を作成し、多角的生成テクニック（正逆の転換、定義と名称の転換など）を駆使してください。",
            GenerationMode::Standard => "【標準プラン】で問題を生成してください。\n\
各知識データから1問ずつ、シンプルな問題を作成してください。",
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMode::Standard => write!(f, "standard"),
            GenerationMode::Max => write!(f, "max"),
        }
    }
}

/// 生成服务必须遵守的质量要求（原文嵌入提示词）
pub const QUALITY_REQUIREMENTS: &str = "## 品質要件（必須）
1. **選択肢の多様性**: 同じ知識から複数問作る場合でも、毎回異なるダミー選択肢を使うこと
2. **選択肢内の重複禁止**: 1つの問題内で同じ選択肢を2回以上使わない（例: [\"A\",\"B\",\"B\",\"C\"] は禁止）
3. **選択肢は必ず4つ**: 3つ以下や5つ以上は禁止
4. **高品質なダミー**: 正解と同じカテゴリから選ぶ（漢字問題なら似た漢字、歴史なら同時代の人物など）";

const OUTPUT_FORMAT: &str = "## 出力形式
- 確認は不要です。直接TSVを出力してください。
- ヘッダー行を含めてください。
- コードブロック（```tsv ... ```）で囲んでください。";

/// 知识数据的一个分块，只保留源顺序
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeChunk<'a> {
    /// 分块序号（从1开始）
    pub index: usize,
    pub items: &'a [Value],
}

/// 按 `chunk_size` 切块，最后一块可以更短
pub fn chunk_items(items: &[Value], chunk_size: NonZeroUsize) -> Vec<KnowledgeChunk<'_>> {
    items
        .chunks(chunk_size.get())
        .enumerate()
        .map(|(i, items)| KnowledgeChunk {
            index: i + 1,
            items,
        })
        .collect()
}

/// 发给生成服务的一次请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub chunk_index: usize,
    pub item_count: usize,
    pub user_prompt: String,
}

/// 提示词构建器
#[derive(Debug, Clone)]
pub struct PromptBuilder<'c> {
    catalog: &'c GenreCatalog,
    genre_id: String,
    mode: GenerationMode,
    chunk_size: NonZeroUsize,
}

impl<'c> PromptBuilder<'c> {
    pub fn new(
        catalog: &'c GenreCatalog,
        genre_id: impl Into<String>,
        mode: GenerationMode,
        chunk_size: NonZeroUsize,
    ) -> Self {
        Self {
            catalog,
            genre_id: genre_id.into(),
            mode,
            chunk_size,
        }
    }

    /// 为所有分块构建请求，空输入得到空列表
    pub fn build_requests(&self, items: &[Value]) -> Vec<GenerationRequest> {
        chunk_items(items, self.chunk_size)
            .into_iter()
            .map(|chunk| self.build_request(&chunk))
            .collect()
    }

    /// 为单个分块构建请求
    pub fn build_request(&self, chunk: &KnowledgeChunk<'_>) -> GenerationRequest {
        GenerationRequest {
            chunk_index: chunk.index,
            item_count: chunk.items.len(),
            user_prompt: self.render_prompt(chunk.items),
        }
    }

    fn render_prompt(&self, items: &[Value]) -> String {
        let genre_name = self.catalog.genre_name(&self.genre_id);
        let subject = self.catalog.subject_code(&self.genre_id);
        let items_json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());

        format!(
            "以下の知識データから4択クイズを生成してください。

## 指示
{mode_instruction}

## メタ情報
- subject: {subject}
- genre_id: {genre_id}
- genre_name: {genre_name}

{quality}

{output_format}

## 知識データ（{count}件）
```json
{items_json}
```
",
            mode_instruction = self.mode.instruction(),
            subject = subject,
            genre_id = self.genre_id,
            genre_name = genre_name,
            quality = QUALITY_REQUIREMENTS,
            output_format = OUTPUT_FORMAT,
            count = items.len(),
            items_json = items_json,
        )
    }
}
