//! 题目导入编排 - 编排层
//!
//! ## 职责
//!
//! 1. **加载**：读取一个或多个来源（TSV / JSON / Markdown 文档）
//! 2. **校验**：每条记录都经过记录模型的校验，失败原因带来源与位置
//! 3. **拒绝**：只要有一条失败，整批不提交
//! 4. **提交**：通过的整批题目一次性交给存储服务
//!
//! 存储服务的失败直接返回给调用方，不做重试。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::clients::{ImportReceipt, QuestionStore};
use crate::error::{AppError, AppResult, BatchError, InputError, RecordDiagnostic};
use crate::models::loaders::{load_import_file, parse_import_json, LoadedRecord};
use crate::models::{Batch, BatchId, QuestionRecord, Subject};
use crate::services::block_extractor::merge_document;
use crate::utils::logging;

/// 一个来源加载出的记录
#[derive(Debug, Clone)]
pub struct SourceRecords {
    /// 来源描述（文件路径）
    pub source: String,
    pub records: Vec<LoadedRecord>,
}

/// 加载单个来源
///
/// Markdown 文档先提取并合并其中的 JSON 块，再按 JSON 导入；
/// 文档中没有任何 JSON 块时返回输入错误。
pub async fn load_source(path: &Path) -> AppResult<SourceRecords> {
    let source = path.display().to_string();
    let is_markdown = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("md"));

    let records = if is_markdown {
        info!("Markdown文档读取中: {}", source);
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::file_read_failed(&source, e))?;
        let merge = merge_document(&text).ok_or_else(|| {
            AppError::Input(InputError::UnexpectedShape {
                path: source.clone(),
                reason: "未找到JSON代码块".to_string(),
            })
        })?;
        let value = serde_json::to_value(&merge.document)?;
        parse_import_json(&value, &source)?
    } else {
        load_import_file(path).await?
    };

    info!("✓ {}: 读取 {} 条记录", source, records.len());
    Ok(SourceRecords { source, records })
}

/// 加载全部来源，任一来源的输入错误都会中止
pub async fn load_sources(paths: &[PathBuf]) -> AppResult<Vec<SourceRecords>> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        sources.push(load_source(path).await?);
    }
    Ok(sources)
}

/// 合并所有来源并校验
///
/// 所有失败的记录（来源 + 从1开始的位置 + 原因）一次性返回，不会只报第一条。
pub fn collect_valid(sources: Vec<SourceRecords>) -> Result<Vec<QuestionRecord>, BatchError> {
    let mut accepted = Vec::new();
    let mut diagnostics = Vec::new();

    for SourceRecords { source, records } in sources {
        for (idx, loaded) in records.into_iter().enumerate() {
            let checked = loaded.and_then(|record| record.validate().map(|_| record));
            match checked {
                Ok(record) => accepted.push(record),
                Err(reason) => diagnostics.push(RecordDiagnostic {
                    source: source.clone(),
                    position: idx + 1,
                    reason,
                }),
            }
        }
    }

    if !diagnostics.is_empty() {
        return Err(BatchError::ValidationFailed { diagnostics });
    }
    if accepted.is_empty() {
        return Err(BatchError::Empty);
    }
    Ok(accepted)
}

/// 按科目统计题数，按科目代码排序
pub fn subject_breakdown(records: &[QuestionRecord]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.subject.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(subject, count)| (subject.to_string(), count))
        .collect()
}

/// 科目显示名：已知科目带上名称，如 `jp (国語)`
fn subject_label(code: &str) -> String {
    match Subject::from_code(code) {
        Some(subject) => format!("{} ({})", code, subject.name()),
        None => code.to_string(),
    }
}

/// 准备导入批次：加载、校验、统计
///
/// # 参数
/// - `paths`: 来源文件
/// - `batch_id`: 调用方提供的批次ID，缺省时按当前时间生成
///
/// # 返回
/// 校验全部通过时返回批次；否则返回错误并打印所有失败原因
pub async fn prepare_batch(paths: &[PathBuf], batch_id: Option<&str>) -> AppResult<Batch> {
    let id = BatchId::or_now(batch_id)?;
    let sources = load_sources(paths).await?;

    let records = match collect_valid(sources) {
        Ok(records) => records,
        Err(e) => {
            if let BatchError::ValidationFailed { diagnostics } = &e {
                error!("❌ 校验错误 ({} 件):", diagnostics.len());
                for diag in diagnostics {
                    error!("  - {}", diag);
                }
            }
            return Err(e.into());
        }
    };

    info!("✓ 校验通过: {} 道题", records.len());
    let labelled: Vec<(String, usize)> = subject_breakdown(&records)
        .into_iter()
        .map(|(code, count)| (subject_label(&code), count))
        .collect();
    logging::print_import_breakdown(records.len(), &labelled);

    Ok(Batch::new(id, records))
}

/// 提交批次（单次网络调用）
pub async fn submit_batch(store: &dyn QuestionStore, batch: &Batch) -> AppResult<ImportReceipt> {
    if batch.is_empty() {
        return Err(BatchError::Empty.into());
    }
    info!("📤 提交批次 {} ({} 道题)...", batch.id, batch.len());

    let receipt = store.import_batch(&batch.id, &batch.records).await.map_err(|e| {
        error!("❌ 导入失败: {}", e);
        e
    })?;

    info!("✅ 导入成功!");
    info!("  批次ID: {}", receipt.batch_id);
    info!("  导入数: {}", receipt.imported_count);
    if !receipt.generated_ids.is_empty() {
        info!(
            "  生成ID: {} ... {}",
            receipt.generated_ids.first().map(String::as_str).unwrap_or_default(),
            receipt.generated_ids.last().map(String::as_str).unwrap_or_default()
        );
    }
    if !receipt.message.is_empty() {
        info!("  消息: {}", receipt.message);
    }
    Ok(receipt)
}

/// 加载、校验并提交
pub async fn import(
    store: &dyn QuestionStore,
    paths: &[PathBuf],
    batch_id: Option<&str>,
) -> AppResult<ImportReceipt> {
    let batch = prepare_batch(paths, batch_id).await?;
    submit_batch(store, &batch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::tests::sample_record;
    use crate::models::ValidationError;

    fn source(name: &str, records: Vec<LoadedRecord>) -> SourceRecords {
        SourceRecords {
            source: name.to_string(),
            records,
        }
    }

    #[test]
    fn test_collect_all_valid() {
        let records = collect_valid(vec![
            source("a.tsv", vec![Ok(sample_record())]),
            source("b.json", vec![Ok(sample_record()), Ok(sample_record())]),
        ])
        .unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_every_failure_is_reported() {
        let err = collect_valid(vec![
            source(
                "a.tsv",
                vec![Ok(sample_record()), Err(ValidationError::ChoiceCount(3))],
            ),
            source(
                "b.json",
                vec![Err(ValidationError::IndexOutOfRange { index: 5, len: 4 })],
            ),
        ])
        .unwrap_err();

        let BatchError::ValidationFailed { diagnostics } = err else {
            panic!("expected validation failure");
        };
        assert_eq!(diagnostics.len(), 2);
        assert_eq!((diagnostics[0].source.as_str(), diagnostics[0].position), ("a.tsv", 2));
        assert_eq!((diagnostics[1].source.as_str(), diagnostics[1].position), ("b.json", 1));
    }

    #[test]
    fn test_record_is_revalidated() {
        let mut tampered = sample_record();
        tampered.correct_index = 7;
        let err = collect_valid(vec![source("x.json", vec![Ok(tampered)])]).unwrap_err();
        assert!(matches!(err, BatchError::ValidationFailed { .. }));
    }

    #[test]
    fn test_empty_sources() {
        assert!(matches!(
            collect_valid(vec![source("x.json", vec![])]),
            Err(BatchError::Empty)
        ));
    }

    #[test]
    fn test_subject_breakdown_sorted() {
        let mut soc = sample_record();
        soc.subject = "soc".to_string();
        let mut math = sample_record();
        math.subject = "math".to_string();
        let breakdown = subject_breakdown(&[soc.clone(), sample_record(), math, soc]);
        assert_eq!(
            breakdown,
            vec![
                ("jp".to_string(), 1),
                ("math".to_string(), 1),
                ("soc".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_subject_label() {
        assert_eq!(subject_label("math"), "math (算数)");
        assert_eq!(subject_label("unknown"), "unknown");
    }

    struct CountingStore(std::sync::atomic::AtomicUsize);

    #[async_trait::async_trait]
    impl QuestionStore for CountingStore {
        async fn import_batch(&self, batch_id: &BatchId, records: &[QuestionRecord]) -> AppResult<ImportReceipt> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(ImportReceipt {
                batch_id: batch_id.to_string(),
                imported_count: records.len(),
                generated_ids: Vec::new(),
                message: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_submitted() {
        let store = CountingStore(Default::default());
        let batch = Batch::new(BatchId::new("batch_manual").unwrap(), Vec::new());
        let err = submit_batch(&store, &batch).await.unwrap_err();
        assert!(matches!(err, AppError::Batch(BatchError::Empty)));
        assert_eq!(store.0.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_batch_id_rejected_before_loading() {
        let err = prepare_batch(&[PathBuf::from("does-not-matter.json")], Some("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Batch(BatchError::BlankBatchId)));
    }
}
