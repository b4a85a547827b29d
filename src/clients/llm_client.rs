//! LLM API 客户端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, LlmError};

/// 题目生成服务
///
/// 输入系统指令与用户提示词，返回生成的原始文本。
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, system_instruction: &str, user_prompt: &str) -> AppResult<String>;
}

/// LLM 客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        if config.llm_api_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "llm_api_key".to_string(),
                reason: "未设置 (LLM_API_KEY 或 GEMINI_API_KEY)".to_string(),
            }
            .into());
        }

        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        })
    }

    fn build_messages(
        &self,
        system_instruction: &str,
        user_prompt: &str,
    ) -> AppResult<Vec<ChatCompletionRequestMessage>> {
        let mut messages = Vec::with_capacity(2);

        // 空的系统指令不发送
        if !system_instruction.trim().is_empty() {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(system_instruction)
                .build()
                .map_err(|e| LlmError::RequestBuild(e.to_string()))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_prompt)
            .build()
            .map_err(|e| LlmError::RequestBuild(e.to_string()))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        Ok(messages)
    }
}

#[async_trait]
impl QuestionGenerator for LlmClient {
    /// 调用 LLM 生成题目
    ///
    /// # 参数
    /// - `system_instruction`: 系统指令（可为空）
    /// - `user_prompt`: 用户提示词
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    async fn generate(&self, system_instruction: &str, user_prompt: &str) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("提示词长度: {} 字符", user_prompt.chars().count());

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(self.build_messages(system_instruction, user_prompt)?)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| LlmError::RequestBuild(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}
