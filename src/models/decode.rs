//! 记录解码
//!
//! 把不可信的表格行或 JSON 值转换为 [`QuestionRecord`]，再交给
//! [`QuestionRecord::validate`] 检查不变式。行级缺陷返回 [`ValidationError`]，不抛出。

use serde_json::Value;

use crate::models::question::{validate_choices, QuestionRecord, ValidationError, REQUIRED_FIELDS};
use crate::models::table::TableRow;

/// choices 字段的解析方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoicesFormat {
    /// 必须是 JSON 数组（LLM 响应）
    JsonOnly,
    /// JSON 失败时按逗号切分（手工编辑的 TSV）
    JsonOrCommaSeparated,
}

/// 解码一行表格
///
/// 检查顺序：必填字段 → choices 为 JSON 数组 → 恰好4个 → 无重复 →
/// correct_index 为整数 → 索引范围 → 正确答案一致。
pub fn decode_row(row: &TableRow, format: ChoicesFormat) -> Result<QuestionRecord, ValidationError> {
    for field in REQUIRED_FIELDS {
        if row.non_empty(field).is_none() {
            return Err(ValidationError::MissingField(field));
        }
    }
    // 上面已确认必填字段非空
    let required = |name: &str| row.get(name).unwrap_or_default().to_string();

    let choices = parse_choices_cell(&required("choices"), format)?;
    validate_choices(&choices)?;

    let raw_index = required("correct_index");
    let correct_index = raw_index
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::IndexNotNumber(raw_index.clone()))?;

    let record = QuestionRecord {
        subject: required("subject"),
        genre_id: required("genre_id"),
        genre_name: required("genre_name"),
        question_text: required("question_text"),
        choices,
        correct_index,
        correct_answer_text: required("correct_answer"),
        hint: row.non_empty("hint").map(str::to_string),
        difficulty: row.non_empty("difficulty").map(str::to_string),
        question_id: row.non_empty("question_id").map(str::to_string),
    };
    record.validate()?;
    Ok(record)
}

/// 解析 choices 单元格
pub fn parse_choices_cell(cell: &str, format: ChoicesFormat) -> Result<Vec<String>, ValidationError> {
    match serde_json::from_str::<Value>(cell) {
        Ok(value) => choices_from_value(&value),
        Err(_) if format == ChoicesFormat::JsonOrCommaSeparated => Ok(cell
            .split(',')
            .map(|s| s.trim().to_string())
            .collect()),
        Err(_) => Err(ValidationError::ChoicesNotJson),
    }
}

/// 把 JSON 数组转换为选项文本，数字和布尔值转为文本
fn choices_from_value(value: &Value) -> Result<Vec<String>, ValidationError> {
    let items = value.as_array().ok_or(ValidationError::ChoicesNotArray)?;
    items.iter().map(scalar_text).collect()
}

fn scalar_text(value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ValidationError::ChoiceNotText),
    }
}

/// 解码一个 JSON 题目对象
pub fn decode_json(value: &Value) -> Result<QuestionRecord, ValidationError> {
    for field in REQUIRED_FIELDS {
        match value.get(field) {
            None | Some(Value::Null) => return Err(ValidationError::MissingField(field)),
            Some(Value::String(s)) if s.is_empty() => {
                return Err(ValidationError::MissingField(field))
            }
            _ => {}
        }
    }

    let choices = match &value["choices"] {
        // 也接受 JSON 编码在字符串里的数组（TSV 转出的数据）
        Value::String(s) => parse_choices_cell(s, ChoicesFormat::JsonOnly)?,
        other => choices_from_value(other)?,
    };
    validate_choices(&choices)?;

    let correct_index = match &value["correct_index"] {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ValidationError::IndexNotNumber(n.to_string()))?,
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::IndexNotNumber(s.clone()))?,
        other => return Err(ValidationError::IndexNotNumber(other.to_string())),
    };

    let text = |name: &'static str| -> Result<String, ValidationError> {
        scalar_text(&value[name]).map_err(|_| ValidationError::MissingField(name))
    };
    let optional = |name: &str| {
        value
            .get(name)
            .and_then(|v| scalar_text(v).ok())
            .filter(|s| !s.is_empty())
    };

    let record = QuestionRecord {
        subject: text("subject")?,
        genre_id: text("genre_id")?,
        genre_name: text("genre_name")?,
        question_text: text("question_text")?,
        choices,
        correct_index,
        correct_answer_text: text("correct_answer")?,
        hint: optional("hint"),
        difficulty: optional("difficulty"),
        question_id: optional("question_id"),
    };
    record.validate()?;
    Ok(record)
}
