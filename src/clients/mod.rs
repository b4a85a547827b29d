pub mod llm_client;
pub mod storage_client;

pub use llm_client::{LlmClient, QuestionGenerator};
pub use storage_client::{ImportReceipt, QuestionStore, StorageClient};
