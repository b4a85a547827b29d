//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责加载输入、调度流程、汇总统计，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `generation_runner` - 题目生成
//! - 加载知识数据，构建分块请求
//! - 顺序委托 `workflow::ChunkFlow`，块间固定等待
//! - 写出 TSV 并输出统计
//!
//! ### `import_coordinator` - 题目导入
//! - 加载多个来源，逐条校验
//! - 有任何失败则整批拒绝
//! - 一次性提交给存储服务
//!
//! ### `document_tasks` - 文档离线处理
//! - Markdown 文档合并、题库选项乱序
//!
//! ## 层次关系
//!
//! ```text
//! generation_runner (处理整个知识文件)
//!     ↓
//! workflow::ChunkFlow (处理单个分块)
//!     ↓
//! services (能力层：prompt / parse / shuffle / extract)
//!     ↓
//! clients (外部服务：LLM / 存储)
//! ```

pub mod document_tasks;
pub mod generation_runner;
pub mod import_coordinator;

// 重新导出主要类型
pub use document_tasks::{merge_file, shuffle_file, MergeSummary};
pub use generation_runner::{GenerationOptions, GenerationRunner, GenerationSummary};
pub use import_coordinator::{import, prepare_batch, submit_batch};
