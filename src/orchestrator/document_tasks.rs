//! 文档离线处理 - 编排层
//!
//! - `merge_file`：Markdown 文档 → 合并后的题库 JSON
//! - `shuffle_file`：题库 JSON → 选项乱序后的 JSON
//!
//! 两者都只读写本地文件，不调用任何外部服务。

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::services::block_extractor::{merge_document, BlockOutcome};
use crate::services::shuffler::{ChoiceShuffler, IndexDistribution};

/// 合并结果摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    /// 输出文件，未找到任何 JSON 块时为 None
    pub output_file: Option<PathBuf>,
    pub question_count: usize,
    pub skipped_blocks: usize,
}

/// `<dir>/<stem><suffix>.json`
fn sibling_json(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}.json", stem, suffix))
}

async fn write_pretty_json(path: &Path, value: &impl serde::Serialize) -> AppResult<()> {
    let display = path.display().to_string();
    let text = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, text)
        .await
        .map_err(|e| AppError::file_write_failed(&display, e))
}

/// 合并 Markdown 文档中的 JSON 块并写出
///
/// # 参数
/// - `input`: Markdown 文档
/// - `output`: 输出路径，缺省为同目录下的 `<stem>.json`
pub async fn merge_file(input: &Path, output: Option<&Path>) -> AppResult<MergeSummary> {
    let display = input.display().to_string();
    let text = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| AppError::file_read_failed(&display, e))?;

    let Some(merge) = merge_document(&text) else {
        return Ok(MergeSummary {
            output_file: None,
            question_count: 0,
            skipped_blocks: 0,
        });
    };

    let skipped_blocks = merge
        .outcomes
        .iter()
        .filter(|o| !matches!(o, BlockOutcome::Added { .. }))
        .count();
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sibling_json(input, ""));

    write_pretty_json(&output, &merge.document).await?;

    info!("\n✅ 完成!");
    info!("  题目总数: {}", merge.document.questions.len());
    info!("  标题: {}", merge.document.title);
    info!("  科目: {}", merge.document.subject);
    info!("  输出: {}", output.display());
    if skipped_blocks > 0 {
        warn!("  跳过的块: {}", skipped_blocks);
    }

    Ok(MergeSummary {
        output_file: Some(output),
        question_count: merge.document.questions.len(),
        skipped_blocks,
    })
}

/// 乱序题库 JSON 中所有题目的选项并写出
///
/// # 参数
/// - `input`: 题库 JSON（带 `questions` 的对象或题目数组）
/// - `output`: 输出路径，缺省为同目录下的 `<stem>_shuffled.json`
/// - `seed`: 随机种子，指定时结果可复现
///
/// # 返回
/// 返回乱序后正确答案位置的分布
pub async fn shuffle_file(input: &Path, output: Option<&Path>, seed: Option<u64>) -> AppResult<IndexDistribution> {
    let display = input.display().to_string();
    let text = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| AppError::file_read_failed(&display, e))?;
    let mut document: Value =
        serde_json::from_str(&text).map_err(|e| AppError::invalid_json(&display, e))?;

    let mut shuffler = ChoiceShuffler::new(seed);
    let distribution = shuffler.shuffle_document(&mut document);

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sibling_json(input, "_shuffled"));
    write_pretty_json(&output, &document).await?;

    info!("✅ 乱序完成: {} 题 → {}", distribution.total(), output.display());
    for line in distribution.to_string().lines() {
        info!("{}", line);
    }

    Ok(distribution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sibling_json() {
        assert_eq!(
            sibling_json(Path::new("books/jp_kanji.md"), ""),
            PathBuf::from("books/jp_kanji.json")
        );
        assert_eq!(
            sibling_json(Path::new("books/jp_kanji.json"), "_shuffled"),
            PathBuf::from("books/jp_kanji_shuffled.json")
        );
    }

    #[tokio::test]
    async fn test_merge_file_writes_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("book.md");
        tokio::fs::write(
            &input,
            "```json\n{\"title\":\"漢字\",\"questions\":[{\"q\":1}]}\n```\n```json\n{broken}\n```",
        )
        .await
        .unwrap();

        let summary = merge_file(&input, None).await.unwrap();
        assert_eq!(summary.question_count, 1);
        assert_eq!(summary.skipped_blocks, 1);

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("book.json")).unwrap()).unwrap();
        assert_eq!(written["title"], "漢字");
        assert_eq!(written["subject"], "jp");
    }

    #[tokio::test]
    async fn test_merge_file_without_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.md");
        tokio::fs::write(&input, "# no blocks").await.unwrap();
        let summary = merge_file(&input, None).await.unwrap();
        assert_eq!(summary.output_file, None);
        assert!(!dir.path().join("empty.json").exists());
    }

    #[tokio::test]
    async fn test_shuffle_file_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("book.json");
        let book = json!({
            "title": "T",
            "questions": [
                {"choice_1": "A", "choice_2": "B", "choice_3": "C", "choice_4": "D", "correct_index": 2},
                {"choice_1": "E", "choice_2": "F", "choice_3": "G", "choice_4": "H", "correct_index": 4}
            ]
        });
        tokio::fs::write(&input, book.to_string()).await.unwrap();

        let first_out = dir.path().join("first.json");
        let second_out = dir.path().join("second.json");
        let distribution = shuffle_file(&input, Some(&first_out), Some(99)).await.unwrap();
        shuffle_file(&input, Some(&second_out), Some(99)).await.unwrap();

        assert_eq!(distribution.total(), 2);
        let first = std::fs::read_to_string(&first_out).unwrap();
        assert_eq!(first, std::fs::read_to_string(&second_out).unwrap());

        let shuffled: Value = serde_json::from_str(&first).unwrap();
        let q = &shuffled["questions"][1];
        let idx = q["correct_index"].as_u64().unwrap();
        assert_eq!(q[format!("choice_{}", idx + 1)], "H");
    }

    #[tokio::test]
    async fn test_shuffle_file_default_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("qs.json");
        tokio::fs::write(&input, "[]").await.unwrap();
        shuffle_file(&input, None, Some(1)).await.unwrap();
        assert!(dir.path().join("qs_shuffled.json").exists());
    }

    #[tokio::test]
    async fn test_missing_input_is_not_found() {
        let err = merge_file(Path::new("/nonexistent/book.md"), None).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Input(crate::error::InputError::NotFound { .. })
        ));
    }
}
