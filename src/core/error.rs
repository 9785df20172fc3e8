//! Agent 错误类型
//!
//! 约定：参数 / 枚举值 / 审批 id 类错误只终止当前工具调用，由主循环转为 Observation
//! 让模型自行纠正重试；UpstreamProvider 与 Cancelled 终止整个会话。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（参数校验、剧本阶段、审批、工具、上游 LLM 等）
#[derive(Error, Debug)]
pub enum AgentError {
    /// 工具参数不符合 schema（类型错误、缺字段、邮箱格式等）
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("Unknown approval id: {0}")]
    UnknownApproval(String),

    /// 同一审批 id 被第二次 resolve
    #[error("Approval already resolved: {0}")]
    AlreadyResolved(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    /// LLM 输出不是合法的 {"tool": ..., "args": ...} JSON
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    /// 上游模型服务不可达或出错，整个会话失败
    #[error("Upstream provider error: {0}")]
    UpstreamProvider(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Cancelled")]
    Cancelled,
}

impl AgentError {
    /// 该错误是否只影响当前一次工具调用（主循环可继续，由模型纠正后重试）
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            AgentError::UpstreamProvider(_) | AgentError::ConfigError(_) | AgentError::Cancelled
        )
    }
}
