pub mod json_loader;
pub mod knowledge_loader;
pub mod tsv_loader;

pub use json_loader::{load_json, parse_import_json};
pub use knowledge_loader::{genre_id_from_path, load_knowledge_file, load_system_instruction, KnowledgeFile};
pub use tsv_loader::{load_tsv, parse_import_tsv, render_tsv, write_tsv, LoadedRecord, WriteMode};

use std::path::Path;

use crate::error::{AppResult, InputError};

/// 按扩展名加载导入文件（`.tsv` / `.json`）
pub async fn load_import_file(path: &Path) -> AppResult<Vec<LoadedRecord>> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "tsv" => {
            tracing::info!("TSV文件读取中: {}", path.display());
            load_tsv(path).await
        }
        "json" => {
            tracing::info!("JSON文件读取中: {}", path.display());
            load_json(path).await
        }
        _ => Err(InputError::UnsupportedFormat {
            extension: format!(".{}", extension),
        }
        .into()),
    }
}
