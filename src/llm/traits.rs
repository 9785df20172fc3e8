//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / 剧本 Mock）实现 LlmClient::complete（非流式）。

use async_trait::async_trait;

use crate::transcript::Message;

/// LLM 客户端 trait：输入完整消息序列，输出一条补全文本
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;
}
