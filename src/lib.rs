//! # Question Pipeline
//!
//! 把知识数据转换为经过校验、选项乱序的四选一题目，并整批导入题目存储服务
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 模型层（Models）
//! - `models/` - 题目记录、批次、分类目录，以及 TSV / JSON / 知识数据的加载
//! - `QuestionRecord::validate` - "合法题目"的唯一定义
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不调用外部服务
//! - `PromptBuilder` - 分块并构建生成请求
//! - `response_parser` - 解析生成响应，行级错误变为诊断
//! - `ChoiceShuffler` - 选项乱序且保持正确答案
//! - `block_extractor` - 提取并合并文档中的 JSON 块
//!
//! ### ③ 外部服务层（Clients）
//! - `QuestionGenerator` / `LlmClient` - 生成服务
//! - `QuestionStore` / `StorageClient` - 存储服务
//!
//! ### ④ 流程层（Workflow）
//! - `ChunkFlow` - "一个分块"的完整流程（生成 → 解析）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `generation_runner` - 顺序处理所有分块并写出 TSV
//! - `import_coordinator` - 多来源校验，整批提交
//! - `document_tasks` - 文档合并与选项乱序
//!
//! ## 模块结构

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{ImportReceipt, QuestionGenerator, QuestionStore};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Batch, BatchId, GenreCatalog, QuestionRecord};
pub use services::{ChoiceShuffler, GenerationMode};
