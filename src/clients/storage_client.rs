//! 题目存储服务客户端
//!
//! 存储服务是一个接收 JSON 的 Web App，一次请求提交一整批题目，
//! 全部成功或全部失败。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, StorageError};
use crate::models::{BatchId, QuestionRecord};

/// 存储服务返回的导入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReceipt {
    pub batch_id: String,
    pub imported_count: usize,
    pub generated_ids: Vec<String>,
    pub message: String,
}

/// 题目存储服务
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// 提交一整批题目（单次调用）
    async fn import_batch(
        &self,
        batch_id: &BatchId,
        records: &[QuestionRecord],
    ) -> AppResult<ImportReceipt>;
}

#[derive(Debug, Serialize)]
struct ImportPayload<'a> {
    action: &'static str,
    questions: &'a [QuestionRecord],
    batch_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImportResponse {
    success: bool,
    #[serde(default)]
    batch_id: Option<String>,
    #[serde(default)]
    imported_count: usize,
    #[serde(default)]
    generated_ids: Vec<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ImportResponse {
    fn into_receipt(self, requested: &BatchId) -> Result<ImportReceipt, StorageError> {
        if !self.success {
            let reason = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "未知错误".to_string());
            return Err(StorageError::Rejected(reason));
        }
        Ok(ImportReceipt {
            batch_id: self
                .batch_id
                .unwrap_or_else(|| requested.as_str().to_string()),
            imported_count: self.imported_count,
            generated_ids: self.generated_ids,
            message: self.message.unwrap_or_default(),
        })
    }
}

/// 解析存储服务的响应体
fn parse_response(body: &str, requested: &BatchId) -> Result<ImportReceipt, StorageError> {
    let response: ImportResponse = serde_json::from_str(body).map_err(|e| {
        StorageError::MalformedResponse(format!("{} (响应: {})", e, crate::utils::truncate_text(body, 200)))
    })?;
    response.into_receipt(requested)
}

/// 基于 HTTP 的存储服务客户端
pub struct StorageClient {
    http: reqwest::Client,
    endpoint: String,
}

impl StorageClient {
    /// 创建客户端，超时时间取自配置
    pub fn new(config: &Config) -> AppResult<Self> {
        if config.storage_endpoint_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "storage_endpoint_url".to_string(),
                reason: "未设置 (STORAGE_ENDPOINT_URL)".to_string(),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(config.storage_timeout())
            .build()
            .map_err(|e| AppError::storage_request_failed(&config.storage_endpoint_url, e))?;

        Ok(Self {
            http,
            endpoint: config.storage_endpoint_url.clone(),
        })
    }
}

#[async_trait]
impl QuestionStore for StorageClient {
    async fn import_batch(
        &self,
        batch_id: &BatchId,
        records: &[QuestionRecord],
    ) -> AppResult<ImportReceipt> {
        let payload = ImportPayload {
            action: "import_questions",
            questions: records,
            batch_id: batch_id.as_str(),
        };

        debug!("提交 {} 道题目到 {}", records.len(), self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!("存储请求失败: {}", e);
                AppError::storage_request_failed(&self.endpoint, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::BadStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::storage_request_failed(&self.endpoint, e))?;
        debug!("存储服务响应: {}", crate::utils::truncate_text(&body, 500));

        Ok(parse_response(&body, batch_id)?)
    }
}
