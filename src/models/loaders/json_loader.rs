use serde_json::Value;
use std::path::Path;
use tokio::fs;

use crate::error::{AppError, AppResult, InputError};
use crate::models::decode::decode_json;
use crate::models::loaders::tsv_loader::LoadedRecord;

/// 解析导入用 JSON：题目数组，或带 `questions` 数组的合并文档
pub fn parse_import_json(value: &Value, path: &str) -> AppResult<Vec<LoadedRecord>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("questions") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(InputError::UnexpectedShape {
                    path: path.to_string(),
                    reason: "JSON对象缺少 questions 数组".to_string(),
                }
                .into())
            }
        },
        _ => {
            return Err(InputError::UnexpectedShape {
                path: path.to_string(),
                reason: "JSON文件必须是题目对象的数组".to_string(),
            }
            .into())
        }
    };

    Ok(items.iter().map(decode_json).collect())
}

/// 加载 JSON 导入文件
pub async fn load_json(path: &Path) -> AppResult<Vec<LoadedRecord>> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(&display, e))?;
    let value: Value =
        serde_json::from_str(&content).map_err(|e| AppError::invalid_json(&display, e))?;
    parse_import_json(&value, &display)
}
