//! 无头 Agent 运行时
//!
//! 供 CLI / HTTP 前端调用：create_agent_components 构建 Planner / ToolExecutor / 审批门，
//! process_transcript 对一次用户输入跑完整会话并返回最终回复与转写。
//! 审批门可由调用方传入（Web 场景跨请求共享，挂起的审批在进程内存活）。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::approval::ApprovalGate;
use crate::config::AppConfig;
use crate::core::AgentError;
use crate::llm::create_llm_from_config;
use crate::react::{run_session, Planner, ReactEvent, ReactSession, SessionResult};
use crate::tools::{
    tool_call_schema_json, GetSnapshotTool, PageHumanOnCallTool, PrepareF5RedirectTool,
    ReadFileTool, RestartServiceTool, SendF5RedirectEmailTool, ToolExecutor, ToolRegistry,
};
use crate::transcript::Message;

/// 值班 Agent 的行为约定（拼入 system prompt，随后追加工具目录与调用格式）
pub const SYSTEM_PROMPT: &str = r#"You are an AI Servicing Agent that monitors Dynatrace 24/7 and acts as the on-call assistant.

You have tools to:
- getDynatraceSnapshot: read the latest Dynatrace snapshot for the incident phase
- restartService: restart a service
- prepareF5Redirect: draft an email requesting an F5 traffic redirect
- sendF5RedirectEmail: send the email (REQUIRES HUMAN APPROVAL)
- pageHumanOnCall: page the on-call human only when necessary
- readFile: read a document from the file server

Communication requirements:
- Write concise, human-friendly "Investigation Notes" (no hidden chain-of-thought). Explain what you observed, what you tried, and why.
- When you need human authorization (sendF5RedirectEmail), you MUST:
  1) prepareF5Redirect to produce the email draft
  2) call sendF5RedirectEmail with that draft; it returns an approvalId and withholds execution
  3) immediately call pageHumanOnCall explaining what you need approved
  4) once the approval is resolved, call sendF5RedirectEmail again with the same draft plus the approvalId
- Prefer minimizing human wakeups. Page only when approval is required or automated options are exhausted.

Operational behavior (demo story):
- Start by calling getDynatraceSnapshot with scenarioId "dynatrace-3am-demo" and phase "incident".
- If the snapshot shows mixed 4xx/5xx and elevated latency, try restartService in azure-east and then re-check via getDynatraceSnapshot using the recommended next phase.
- If errors return quickly and are sustained 5xx after a recent restart, do NOT restart again. Prepare an F5 redirect (azure-east -> azure-central) and request approval to send the email.
- After the email is sent/approved, re-check via getDynatraceSnapshot with phase "rerouted" and summarize the mitigation + next steps.

To call a tool, reply with a single JSON object {"tool": "...", "args": {...}} and nothing else. To answer the user, reply in plain text."#;

/// 预构建的 Agent 组件：Planner、ToolExecutor 与审批门，可多会话共享
pub struct AgentComponents {
    pub planner: Planner,
    pub executor: ToolExecutor,
    pub gate: Arc<ApprovalGate>,
    pub max_steps: usize,
}

/// 创建 Agent 组件（独占一扇新审批门）
pub fn create_agent_components(cfg: &AppConfig) -> Result<AgentComponents, AgentError> {
    create_agent_components_with_gate(cfg, Arc::new(ApprovalGate::new()))
}

/// 创建 Agent 组件，共享调用方提供的审批门（Web 场景按进程共享）
pub fn create_agent_components_with_gate(
    cfg: &AppConfig,
    gate: Arc<ApprovalGate>,
) -> Result<AgentComponents, AgentError> {
    let llm = create_llm_from_config(cfg)?;

    let mut tools = ToolRegistry::new();
    tools.register(GetSnapshotTool);
    tools.register(RestartServiceTool);
    tools.register(PrepareF5RedirectTool);
    tools.register(SendF5RedirectEmailTool::new(gate.clone()));
    tools.register(PageHumanOnCallTool);
    tools.register(ReadFileTool);

    let system_prompt = format!(
        "{}\n\nAvailable tools:\n{}\n\nTool call format (JSON Schema):\n{}",
        SYSTEM_PROMPT,
        tools.to_schema_json(),
        tool_call_schema_json(),
    );

    Ok(AgentComponents {
        planner: Planner::new(llm, system_prompt),
        executor: ToolExecutor::new(tools, cfg.tools.tool_timeout_secs),
        gate,
        max_steps: cfg.app.max_react_steps,
    })
}

/// 处理单条用户消息：history 是调用方重传的既有转写（服务端不保存会话）
pub async fn process_transcript(
    components: &AgentComponents,
    history: Vec<Message>,
    user_input: &str,
    event_tx: Option<&mpsc::UnboundedSender<ReactEvent>>,
    cancel_token: CancellationToken,
) -> Result<SessionResult, AgentError> {
    let mut session = ReactSession::new(&components.planner, &components.executor, cancel_token)
        .with_max_steps(components.max_steps);
    if let Some(tx) = event_tx {
        session = session.with_event_tx(tx);
    }
    run_session(&session, history, user_input).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_advertise_all_six_tools() {
        let cfg = AppConfig::default();
        let components = create_agent_components(&cfg).unwrap();
        let mut names = components.executor.tool_names();
        names.sort();
        assert_eq!(
            names,
            vec![
                "getDynatraceSnapshot",
                "pageHumanOnCall",
                "prepareF5Redirect",
                "readFile",
                "restartService",
                "sendF5RedirectEmail",
            ]
        );
    }

    #[test]
    fn gated_tool_is_marked_in_the_catalog() {
        let cfg = AppConfig::default();
        let components = create_agent_components(&cfg).unwrap();
        let tool = components.executor.get_tool("sendF5RedirectEmail").unwrap();
        assert!(tool.needs_approval());
        assert!(!components
            .executor
            .get_tool("prepareF5Redirect")
            .unwrap()
            .needs_approval());
    }
}
