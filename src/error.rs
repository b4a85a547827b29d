use thiserror::Error;

use crate::models::question::ValidationError;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入错误（文件、编码、格式）
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// 生成服务（LLM）错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 存储服务错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 批次级校验错误
    #[error("批次错误: {0}")]
    Batch(#[from] BatchError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 输入错误
#[derive(Debug, Error)]
pub enum InputError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 不支持的文件格式
    #[error("不支持的文件格式: {extension} (仅支持 .tsv / .json / .md)")]
    UnsupportedFormat { extension: String },
    /// JSON 解析失败
    #[error("JSON解析失败 ({path}): {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// TSV 读写失败
    #[error("TSV处理失败 ({path}): {source}")]
    InvalidTsv {
        path: String,
        #[source]
        source: csv::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    InvalidToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 文件结构不符合预期
    #[error("文件结构错误 ({path}): {reason}")]
    UnexpectedShape { path: String, reason: String },
    /// 响应中没有任何可用文本
    #[error("响应中没有可解析的内容")]
    NoCandidateText,
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 构建请求失败
    #[error("构建LLM请求失败: {0}")]
    RequestBuild(String),
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {reason}")]
    ApiCallFailed { model: String, reason: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 存储服务错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 网络请求失败（含超时）
    #[error("存储请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// HTTP 状态码异常
    #[error("存储服务返回 HTTP {status} ({endpoint})")]
    BadStatus { endpoint: String, status: u16 },
    /// 响应无法解析
    #[error("存储服务响应解析失败: {0}")]
    MalformedResponse(String),
    /// 存储服务拒绝了本批次
    #[error("存储服务拒绝导入: {0}")]
    Rejected(String),
}

/// 批次级错误
#[derive(Debug, Error)]
pub enum BatchError {
    /// 存在校验失败的记录，整批拒绝
    #[error("{} 条记录校验失败，整批拒绝提交", diagnostics.len())]
    ValidationFailed { diagnostics: Vec<RecordDiagnostic> },
    /// 没有任何可提交的记录
    #[error("没有可提交的题目")]
    Empty,
    /// 批次ID不合法
    #[error("批次ID不能为空")]
    BlankBatchId,
}

/// 单条记录的校验诊断
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDiagnostic {
    /// 来源（文件路径或描述）
    pub source: String,
    /// 记录在来源中的位置（从1开始）
    pub position: usize,
    /// 失败原因
    pub reason: ValidationError,
}

impl std::fmt::Display for RecordDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} 题目 {}: {}", self.source, self.position, self.reason)
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值不合法
    #[error("配置项 {key} 不合法: {reason}")]
    InvalidValue { key: String, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Input(InputError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Input(InputError::InvalidJson {
            path: String::new(),
            source: err,
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Input(InputError::InvalidToml {
            path: String::new(), // TOML错误通常不包含路径信息
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return AppError::Input(InputError::NotFound { path });
        }
        AppError::Input(InputError::ReadFailed { path, source })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Input(InputError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建JSON解析错误
    pub fn invalid_json(path: impl Into<String>, source: serde_json::Error) -> Self {
        AppError::Input(InputError::InvalidJson {
            path: path.into(),
            source,
        })
    }

    /// 创建TSV读写错误
    pub fn invalid_tsv(path: impl Into<String>, source: csv::Error) -> Self {
        AppError::Input(InputError::InvalidTsv {
            path: path.into(),
            source,
        })
    }

    /// 创建LLM API调用错误
    pub fn llm_api_failed(model: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            reason: reason.to_string(),
        })
    }

    /// 创建存储请求失败错误
    pub fn storage_request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Storage(StorageError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
