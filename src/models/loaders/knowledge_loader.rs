use serde_json::Value;
use std::path::Path;
use tokio::fs;

use crate::error::{AppError, AppResult, InputError};

/// 知识数据文件
#[derive(Debug, Clone)]
pub struct KnowledgeFile {
    /// 分类ID，取自文件名（`JP01.json` → `JP01`）
    pub genre_id: String,
    /// 知识条目，保持文件中的顺序
    pub items: Vec<Value>,
}

/// 从文件名取分类ID
pub fn genre_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// 加载知识数据 JSON 文件（顶层必须是数组）
pub async fn load_knowledge_file(path: &Path) -> AppResult<KnowledgeFile> {
    let path_display = path.display().to_string();
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_display, e))?;

    let value: Value =
        serde_json::from_str(&content).map_err(|e| AppError::invalid_json(&path_display, e))?;

    let Value::Array(items) = value else {
        return Err(InputError::UnexpectedShape {
            path: path_display,
            reason: "知识数据必须是JSON数组".to_string(),
        }
        .into());
    };

    tracing::info!("成功加载 {} 条知识数据: {}", items.len(), path_display);

    Ok(KnowledgeFile {
        genre_id: genre_id_from_path(path),
        items,
    })
}

/// 读取系统指令文件
pub async fn load_system_instruction(path: &Path) -> AppResult<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))
}
