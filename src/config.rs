use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult, ConfigError, InputError};
use crate::services::GenerationMode;

const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(20) {
    Some(size) => size,
    None => unreachable!(),
};

/// 程序配置
///
/// 优先级：环境变量 > TOML 配置文件 > 默认值
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    // --- 存储服务配置 ---
    /// 存储服务 Web App 地址
    pub storage_endpoint_url: String,
    /// 导入请求超时（秒）
    pub storage_timeout_secs: u64,
    // --- 生成流程配置 ---
    /// 分块之间的等待时间（毫秒）
    pub chunk_cooldown_ms: u64,
    pub default_chunk_size: NonZeroUsize,
    pub default_mode: GenerationMode,
    /// 系统指令文件
    pub system_instruction_file: PathBuf,
    /// TSV 输出目录
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-3-flash-preview".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 65536,
            storage_endpoint_url: String::new(),
            storage_timeout_secs: 300,
            chunk_cooldown_ms: 1000,
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            default_mode: GenerationMode::Max,
            system_instruction_file: PathBuf::from("KNOWLEDGE/SYSTEM_INSTRUCTION.txt"),
            output_dir: PathBuf::from("data/generated"),
        }
    }
}

// api key 不输出到日志
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let masked = if self.llm_api_key.is_empty() {
            "<未设置>"
        } else {
            "<已隐藏>"
        };
        f.debug_struct("Config")
            .field("llm_api_key", &masked)
            .field("llm_api_base_url", &self.llm_api_base_url)
            .field("llm_model_name", &self.llm_model_name)
            .field("llm_temperature", &self.llm_temperature)
            .field("llm_max_tokens", &self.llm_max_tokens)
            .field("storage_endpoint_url", &self.storage_endpoint_url)
            .field("storage_timeout_secs", &self.storage_timeout_secs)
            .field("chunk_cooldown_ms", &self.chunk_cooldown_ms)
            .field("default_chunk_size", &self.default_chunk_size)
            .field("default_mode", &self.default_mode)
            .field("system_instruction_file", &self.system_instruction_file)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> AppResult<Self> {
        Self::default().with_env()
    }

    /// 默认值 + TOML 文件
    pub async fn from_toml_file(path: &Path) -> AppResult<Self> {
        let display = path.display().to_string();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::file_read_failed(&display, e))?;
        Self::from_toml_str(&content, &display)
    }

    fn from_toml_str(content: &str, path: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(content).map_err(|e| InputError::InvalidToml {
            path: path.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 加载完整配置：可选的 TOML 文件，然后叠加环境变量
    pub async fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path).await?,
            None => Self::default(),
        };
        base.with_env()
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env(self) -> AppResult<Self> {
        let config = Self {
            llm_api_key: env_string("LLM_API_KEY")
                .or_else(|| env_string("GEMINI_API_KEY"))
                .unwrap_or(self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_temperature: env_parse("LLM_TEMPERATURE", "f32")?.unwrap_or(self.llm_temperature),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", "u32")?.unwrap_or(self.llm_max_tokens),
            storage_endpoint_url: env_string("STORAGE_ENDPOINT_URL")
                .unwrap_or(self.storage_endpoint_url),
            storage_timeout_secs: env_parse("STORAGE_TIMEOUT_SECS", "u64")?
                .unwrap_or(self.storage_timeout_secs),
            chunk_cooldown_ms: env_parse("CHUNK_COOLDOWN_MS", "u64")?
                .unwrap_or(self.chunk_cooldown_ms),
            default_chunk_size: env_parse("CHUNK_SIZE", "正整数")?
                .unwrap_or(self.default_chunk_size),
            default_mode: match env_string("GENERATION_MODE") {
                Some(value) => parse_mode(&value)?,
                None => self.default_mode,
            },
            system_instruction_file: env_string("SYSTEM_INSTRUCTION_FILE")
                .map(PathBuf::from)
                .unwrap_or(self.system_instruction_file),
            output_dir: env_string("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(self.output_dir),
        };
        config.validate()?;
        Ok(config)
    }

    /// 检查取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "storage_timeout_secs".to_string(),
                reason: "必须大于0".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err(ConfigError::InvalidValue {
                key: "llm_temperature".to_string(),
                reason: format!("{} 不在 [0, 2] 范围内", self.llm_temperature),
            });
        }
        Ok(())
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.storage_timeout_secs)
    }

    pub fn chunk_cooldown(&self) -> Duration {
        Duration::from_millis(self.chunk_cooldown_ms)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match env_string(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        None => Ok(None),
    }
}

fn parse_mode(value: &str) -> Result<GenerationMode, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "standard" => Ok(GenerationMode::Standard),
        "max" => Ok(GenerationMode::Max),
        _ => Err(ConfigError::EnvVarParseFailed {
            var_name: "GENERATION_MODE".to_string(),
            value: value.to_string(),
            expected_type: "standard | max".to_string(),
        }),
    }
}
