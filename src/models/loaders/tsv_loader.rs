//! TSV 读写
//!
//! `choices` 列是嵌在单元格里的 JSON 数组字符串。读写都经由 `csv`，
//! 以制表符分隔，引号规则与 CSV 相同。

use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, AppResult};
use crate::models::decode::{decode_row, ChoicesFormat};
use crate::models::question::{QuestionRecord, ValidationError, TSV_COLUMNS};
use crate::models::table::TableRow;

/// 加载出的一条记录：成功解码或校验失败
pub type LoadedRecord = Result<QuestionRecord, ValidationError>;

/// 写入模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// 覆盖并写表头
    Truncate,
    /// 追加，不写表头
    Append,
}

/// 单元格内的制表符和换行替换为空格，保证一条记录只占一行
fn sanitize_cell(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

/// 把题目渲染为 TSV 字节，含引号的单元格按 CSV 规则转义
pub fn render_tsv(records: &[QuestionRecord], with_header: bool) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(Vec::new());
    if with_header {
        writer.write_record(TSV_COLUMNS)?;
    }
    for record in records {
        let choices = serde_json::to_string(&record.choices)
            .map_err(|e| csv::Error::from(std::io::Error::other(e)))?;
        writer.write_record([
            sanitize_cell(&record.subject),
            sanitize_cell(&record.genre_id),
            sanitize_cell(&record.genre_name),
            sanitize_cell(&record.question_text),
            sanitize_cell(&choices),
            record.correct_index.to_string(),
            sanitize_cell(&record.correct_answer_text),
            sanitize_cell(record.hint.as_deref().unwrap_or_default()),
            sanitize_cell(record.difficulty.as_deref().unwrap_or_default()),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// 写入 TSV 文件
pub async fn write_tsv(records: &[QuestionRecord], path: &Path, mode: WriteMode) -> AppResult<()> {
    let display = path.display().to_string();
    let bytes = render_tsv(records, mode == WriteMode::Truncate)
        .map_err(|e| AppError::invalid_tsv(&display, e))?;

    let mut file = match mode {
        WriteMode::Truncate => fs::File::create(path).await,
        WriteMode::Append => {
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
        }
    }
    .map_err(|e| AppError::file_write_failed(&display, e))?;

    file.write_all(&bytes)
        .await
        .map_err(|e| AppError::file_write_failed(&display, e))?;
    file.flush()
        .await
        .map_err(|e| AppError::file_write_failed(&display, e))?;

    Ok(())
}

/// 解析 TSV 文本为导入记录，顺序与文件一致
///
/// 短行补空字段；带引号的单元格可以包含制表符。全空的行跳过。
pub fn parse_import_tsv(text: &str) -> Result<Vec<LoadedRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut loaded = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or_default();
        let row = TableRow::from_values(line, &header, record.iter());
        loaded.push(decode_row(&row, ChoicesFormat::JsonOrCommaSeparated));
    }
    Ok(loaded)
}

/// 加载 TSV 导入文件
pub async fn load_tsv(path: &Path) -> AppResult<Vec<LoadedRecord>> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(&display, e))?;
    parse_import_tsv(&content).map_err(|e| AppError::invalid_tsv(&display, e))
}
