//! 批次标识与批次

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, BatchError};
use crate::models::question::QuestionRecord;

/// 批次ID，格式 `batch_YYYYMMDD_HHMM`（自动生成时）
///
/// 自动生成的ID只精确到分钟，同一分钟内多次导入会得到相同的ID。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    /// 使用调用方提供的ID，空白ID视为错误
    pub fn new(id: impl Into<String>) -> AppResult<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(BatchError::BlankBatchId.into());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// 由给定时间生成
    pub fn from_time<Tz: TimeZone>(time: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self(format!("batch_{}", time.format("%Y%m%d_%H%M")))
    }

    /// 由当前本地时间生成
    pub fn now() -> Self {
        Self::from_time(&Local::now())
    }

    /// 提供了ID就用，否则按当前时间生成
    pub fn or_now(id: Option<&str>) -> AppResult<Self> {
        match id {
            Some(id) => Self::new(id),
            None => Ok(Self::now()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 共享同一生成/导入上下文的一组题目
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: BatchId,
    pub records: Vec<QuestionRecord>,
}

impl Batch {
    pub fn new(id: BatchId, records: Vec<QuestionRecord>) -> Self {
        Self { id, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
