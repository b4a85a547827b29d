//! 分块处理上下文
//!
//! 封装"我正在处理哪个分类的第几块"这一信息

use std::fmt::Display;

/// 分块处理上下文
#[derive(Debug, Clone)]
pub struct ChunkCtx {
    /// 分类ID
    pub genre_id: String,

    /// 分块编号（从1开始）
    pub chunk_index: usize,

    /// 分块总数
    pub total_chunks: usize,
}

impl ChunkCtx {
    /// 创建新的分块上下文
    pub fn new(genre_id: impl Into<String>, chunk_index: usize, total_chunks: usize) -> Self {
        Self {
            genre_id: genre_id.into(),
            chunk_index,
            total_chunks,
        }
    }

    /// 是否为最后一块
    pub fn is_last(&self) -> bool {
        self.chunk_index >= self.total_chunks
    }
}

impl Display for ChunkCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} 块 {}/{}]",
            self.genre_id, self.chunk_index, self.total_chunks
        )
    }
}
