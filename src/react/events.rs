//! 会话过程事件：用于 SSE / CLI 展示工具调用、观察、审批请求与回复

use serde::Serialize;

use crate::transcript::Message;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactEvent {
    /// 步数更新（当前第几步）
    StepUpdate { step: usize, max_steps: usize },
    /// 正在调用 LLM 思考
    Thinking,
    /// 调用工具
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    /// 工具执行失败（模型可据此纠正重试）
    ToolFailure { tool: String, reason: String },
    /// 门控工具挂起，等待外部审批
    ApprovalRequired {
        approval_id: String,
        tool: String,
        preview: String,
    },
    /// 最终回复
    Message { text: String },
    /// 整次会话结束（Web 传输层在事件流末尾发出）
    SessionDone {
        response: String,
        pending_approval: Option<String>,
        messages: Vec<Message>,
    },
    /// 错误
    Error { text: String },
}
