//! 文档 JSON 块提取 - 业务能力层
//!
//! 从 Markdown 文档里取出 ```json 代码块，去掉 Markdown 转义，
//! 再把各块的 `questions` 按块顺序合并为一个文档。

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{info, warn};

static JSON_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("JSON代码块正则不合法")
});

/// 按固定顺序还原的 Markdown 转义序列
const MARKDOWN_ESCAPES: [(&str, &str); 5] = [
    ("\\_", "_"),
    ("\\[", "["),
    ("\\]", "]"),
    ("\\*", "*"),
    ("\\`", "`"),
];

/// 还原 Markdown 转义，不考虑嵌套上下文
pub fn unescape_markdown(text: &str) -> String {
    MARKDOWN_ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// 惰性提取文档中所有 JSON 块（已去转义）
pub fn extract_blocks(document: &str) -> impl Iterator<Item = String> + '_ {
    JSON_BLOCK
        .captures_iter(document)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_markdown(m.as_str()))
}

/// 合并后的题库文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedDocument {
    pub action: String,
    pub subject: String,
    pub title: String,
    pub questions: Vec<Value>,
}

impl MergedDocument {
    const DEFAULT_ACTION: &'static str = "create_book";
    const DEFAULT_SUBJECT: &'static str = "jp";
    const DEFAULT_TITLE: &'static str = "Unknown";

    /// 从第一个成功解析的块取元信息，缺失时使用默认值
    fn with_metadata(first: Option<&Value>) -> Self {
        let field = |name: &str, default: &str| {
            first
                .and_then(|v| v.get(name))
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        Self {
            action: field("action", Self::DEFAULT_ACTION),
            subject: field("subject", Self::DEFAULT_SUBJECT),
            title: field("title", Self::DEFAULT_TITLE),
            questions: Vec::new(),
        }
    }
}

/// 单个块的处理结果（块序号从1开始）
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome {
    /// 追加了 n 道题
    Added { block: usize, count: usize },
    /// 没有 questions 数组，跳过
    NoQuestions { block: usize },
    /// JSON 解析失败，跳过
    Invalid { block: usize, reason: String },
}

/// 合并结果
#[derive(Debug, Clone)]
pub struct DocumentMerge {
    pub document: MergedDocument,
    pub outcomes: Vec<BlockOutcome>,
}

/// 合并文档中的所有 JSON 块
///
/// 没有找到任何块时返回 `None`（空结果，不是错误）。
/// 解析失败或缺少 questions 的块会被跳过并记录原因。
pub fn merge_document(document: &str) -> Option<DocumentMerge> {
    let parsed: Vec<Result<Value, String>> = extract_blocks(document)
        .map(|block| serde_json::from_str::<Value>(&block).map_err(|e| e.to_string()))
        .collect();

    if parsed.is_empty() {
        warn!("⚠️ 未找到JSON代码块");
        return None;
    }

    info!("找到 {} 个JSON代码块，开始合并...", parsed.len());

    let first = parsed.iter().find_map(|r| r.as_ref().ok());
    let mut merged = MergedDocument::with_metadata(first);
    let mut outcomes = Vec::with_capacity(parsed.len());

    for (idx, result) in parsed.into_iter().enumerate() {
        let block = idx + 1;
        let outcome = match result {
            Ok(mut value) => match value.get_mut("questions").map(Value::take) {
                Some(Value::Array(questions)) => {
                    let count = questions.len();
                    merged.questions.extend(questions);
                    info!("  块 {}: 追加 {} 道题", block, count);
                    BlockOutcome::Added { block, count }
                }
                _ => {
                    warn!("  块 {}: 不包含 questions 数组，跳过", block);
                    BlockOutcome::NoQuestions { block }
                }
            },
            Err(reason) => {
                warn!("  块 {}: JSON解析失败: {}", block, reason);
                BlockOutcome::Invalid { block, reason }
            }
        };
        outcomes.push(outcome);
    }

    Some(DocumentMerge {
        document: merged,
        outcomes,
    })
}
