//! 会话主循环
//!
//! 问 Planner -> 执行工具 -> 把结果追加为 Observation -> 下一轮，直到模型给出纯文本回复
//! 或步数预算耗尽。失败的工具调用转为 Observation 交回模型纠正；门控工具返回
//! approval-pending 时记录挂起审批 id 并继续（模型通常接着呼叫人工、解释现状后收尾）。

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::AgentError;
use crate::react::{parse_llm_output, Planner, PlannerOutput, ReactEvent};
use crate::tools::ToolExecutor;
use crate::transcript::Message;

/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 会话执行结果：最终回复、完整转写与（若有）挂起的审批 id
#[derive(Debug)]
pub struct SessionResult {
    pub response: String,
    pub messages: Vec<Message>,
    /// 本次会话里最后一个仍在等待裁决的审批 id
    pub pending_approval: Option<String>,
}

/// 会话配置
pub struct ReactSession<'a> {
    pub planner: &'a Planner,
    pub executor: &'a ToolExecutor,
    pub cancel_token: CancellationToken,
    /// 可选：事件推送通道（SSE / CLI 展示）
    pub event_tx: Option<&'a mpsc::UnboundedSender<ReactEvent>>,
    /// 单次会话内最大步数，防止死循环
    pub max_steps: usize,
}

impl<'a> ReactSession<'a> {
    pub fn new(
        planner: &'a Planner,
        executor: &'a ToolExecutor,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            planner,
            executor,
            cancel_token,
            event_tx: None,
            max_steps: 20,
        }
    }

    pub fn with_event_tx(mut self, tx: &'a mpsc::UnboundedSender<ReactEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    fn send_event(&self, event: ReactEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!(
            "{}...",
            s.chars().take(OBSERVATION_PREVIEW_CHARS).collect::<String>()
        )
    } else {
        s.to_string()
    }
}

/// 跑一次会话：history 是调用方重传的既有转写，user_input 是本次新输入
pub async fn run_session(
    session: &ReactSession<'_>,
    history: Vec<Message>,
    user_input: &str,
) -> Result<SessionResult, AgentError> {
    let mut messages = history;
    messages.push(Message::user(user_input));

    let mut pending_approval: Option<String> = None;
    let mut last_output = String::new();

    for step in 0..session.max_steps {
        session.send_event(ReactEvent::StepUpdate {
            step,
            max_steps: session.max_steps,
        });

        if session.cancel_token.is_cancelled() {
            session.send_event(ReactEvent::Error {
                text: "Cancelled".to_string(),
            });
            return Err(AgentError::Cancelled);
        }

        session.send_event(ReactEvent::Thinking);
        let output = match session.planner.plan(&messages).await {
            Ok(o) => o,
            Err(e) => {
                session.send_event(ReactEvent::Error { text: e.to_string() });
                return Err(e);
            }
        };
        last_output = output.clone();

        match parse_llm_output(&output) {
            Ok(PlannerOutput::Response(text)) => {
                messages.push(Message::assistant(text.clone()));
                session.send_event(ReactEvent::Message { text: text.clone() });
                return Ok(SessionResult {
                    response: text,
                    messages,
                    pending_approval,
                });
            }
            Ok(PlannerOutput::ToolCall(call)) => {
                let call_json = serde_json::json!({ "tool": call.tool, "args": call.args });
                messages.push(Message::assistant(call_json.to_string()));
                session.send_event(ReactEvent::ToolCall {
                    tool: call.tool.clone(),
                    args: call.args.clone(),
                });

                match session.executor.execute(&call.tool, call.args.clone()).await {
                    Ok(result) => {
                        let result_json = result.to_string();
                        session.send_event(ReactEvent::Observation {
                            tool: call.tool.clone(),
                            preview: preview(&result_json),
                        });

                        // 门控工具挂起：记录审批 id，让模型决定接下来呼叫谁、如何收尾
                        if result["status"] == "approval-pending" {
                            if let Some(id) = result["approvalId"].as_str() {
                                pending_approval = Some(id.to_string());
                                session.send_event(ReactEvent::ApprovalRequired {
                                    approval_id: id.to_string(),
                                    tool: call.tool.clone(),
                                    preview: preview(&result_json),
                                });
                            }
                        }

                        messages.push(Message::user(format!(
                            "Observation (tool={}): {}",
                            call.tool, result_json
                        )));
                    }
                    Err(e) if e.is_recoverable() => {
                        session.send_event(ReactEvent::ToolFailure {
                            tool: call.tool.clone(),
                            reason: e.to_string(),
                        });
                        messages.push(Message::user(format!(
                            "Tool call failed (tool={}): {}. Correct the arguments and try again, or reply in plain text.",
                            call.tool, e
                        )));
                    }
                    Err(e) => {
                        session.send_event(ReactEvent::Error { text: e.to_string() });
                        return Err(e);
                    }
                }
            }
            Err(AgentError::JsonParseError(e)) => {
                // 格式纠偏：把错误作为下一轮输入，让模型重试
                session.send_event(ReactEvent::ToolFailure {
                    tool: "(parse)".to_string(),
                    reason: e.clone(),
                });
                messages.push(Message::user(format!(
                    "Your last reply could not be parsed as a tool call ({}). Reply with a single JSON object {{\"tool\": ..., \"args\": ...}} or with plain text.",
                    e
                )));
            }
            Err(e) => {
                session.send_event(ReactEvent::Error { text: e.to_string() });
                return Err(e);
            }
        }
    }

    // 步数预算耗尽：带着最后输出收尾，不视为错误
    let response = format!(
        "Reached the step budget ({}). Last model output:\n{}",
        session.max_steps, last_output
    );
    session.send_event(ReactEvent::Message {
        text: response.clone(),
    });
    Ok(SessionResult {
        response,
        messages,
        pending_approval,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmClient;
    use crate::tools::{GetSnapshotTool, ToolRegistry};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 第一轮发一个坏 JSON，第二轮发合法工具调用，第三轮收尾
    struct FlakyClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for FlakyClient {
        async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match n {
                0 => r#"{"tool": "getDynatraceSnapshot", "args": "#.to_string(),
                1 => r#"{"tool": "getDynatraceSnapshot", "args": {"phase": "incident"}}"#
                    .to_string(),
                _ => "The service is degraded; recommending a restart.".to_string(),
            })
        }
    }

    fn executor() -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(GetSnapshotTool);
        ToolExecutor::new(registry, 5)
    }

    #[tokio::test]
    async fn malformed_json_gets_one_corrective_reprompt_and_session_completes() {
        let llm = std::sync::Arc::new(FlakyClient {
            calls: AtomicUsize::new(0),
        });
        let planner = Planner::new(llm, "You are an on-call agent.");
        let executor = executor();
        let session = ReactSession::new(&planner, &executor, CancellationToken::new());

        let result = run_session(&session, Vec::new(), "check orders-api")
            .await
            .unwrap();
        assert!(result.response.contains("restart"));
        // 纠偏提示 + 快照 Observation 都应在转写里
        let transcript: String = result
            .messages
            .iter()
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(transcript.contains("could not be parsed"));
        assert!(transcript.contains("Observation (tool=getDynatraceSnapshot)"));
        assert!(result.pending_approval.is_none());
    }

    /// 永远只发坏工具名的客户端：验证失败调用变成 Observation 而非终止
    struct WrongToolClient;

    #[async_trait]
    impl LlmClient for WrongToolClient {
        async fn complete(&self, messages: &[Message]) -> Result<String, String> {
            let failed_before = messages.iter().any(|m| m.content.contains("Tool call failed"));
            Ok(if failed_before {
                "I could not find that tool; stopping here.".to_string()
            } else {
                r#"{"tool": "rebootDatacenter", "args": {}}"#.to_string()
            })
        }
    }

    #[tokio::test]
    async fn unknown_tool_becomes_an_observation() {
        let planner = Planner::new(std::sync::Arc::new(WrongToolClient), "prompt");
        let executor = executor();
        let session = ReactSession::new(&planner, &executor, CancellationToken::new());

        let result = run_session(&session, Vec::new(), "go").await.unwrap();
        assert!(result.response.contains("stopping here"));
    }

    #[tokio::test]
    async fn cancellation_aborts_the_session() {
        let planner = Planner::new(std::sync::Arc::new(WrongToolClient), "prompt");
        let executor = executor();
        let token = CancellationToken::new();
        token.cancel();
        let session = ReactSession::new(&planner, &executor, token);

        let err = run_session(&session, Vec::new(), "go").await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
    }

    #[tokio::test]
    async fn step_budget_caps_the_loop() {
        /// 永远要求调用快照工具，不收尾
        struct LoopingClient;

        #[async_trait]
        impl LlmClient for LoopingClient {
            async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
                Ok(r#"{"tool": "getDynatraceSnapshot", "args": {"phase": "incident"}}"#.to_string())
            }
        }

        let planner = Planner::new(std::sync::Arc::new(LoopingClient), "prompt");
        let executor = executor();
        let session =
            ReactSession::new(&planner, &executor, CancellationToken::new()).with_max_steps(3);

        let result = run_session(&session, Vec::new(), "go").await.unwrap();
        assert!(result.response.contains("step budget (3)"));
    }
}
