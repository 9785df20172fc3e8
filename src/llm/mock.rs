//! 剧本 Mock 客户端（离线演示与测试用，无需 API）
//!
//! 从转写中的标记串推断剧情进度，按 3 a.m. 事故剧本产出下一步 tool call 或总结文本：
//! 快照(incident) -> 重启 -> 复查(good) -> 复查(bad) -> 草拟改派 -> 门控发信 -> 呼叫人工
//! -> （外部裁决后）重发 -> 验证(rerouted) -> 收尾。拒绝路径以升级呼叫与说明收尾。

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::LlmClient;
use crate::transcript::Message;

const SCENARIO_ID: &str = "dynatrace-3am-demo";

/// 剧本客户端：无状态，所有进度都从转写重建（与「服务端不保存会话」一致）
#[derive(Debug, Default)]
pub struct ScriptedLlmClient;

fn tool_call(tool: &str, args: Value) -> String {
    json!({ "tool": tool, "args": args }).to_string()
}

/// 从转写里取最近出现的审批 id（appr- + uuid）
fn extract_approval_id(text: &str) -> Option<String> {
    let start = text.rfind("appr-")?;
    let tail = &text[start + "appr-".len()..];
    let id: String = tail
        .chars()
        .take_while(|c| c.is_ascii_hexdigit() || *c == '-')
        .collect();
    if id.is_empty() {
        None
    } else {
        Some(format!("appr-{}", id))
    }
}

/// 从最近一条含 emailDraft 的 Observation 里解析邮件草稿
fn extract_email_draft(messages: &[Message]) -> Option<Value> {
    let content = messages
        .iter()
        .rev()
        .map(|m| m.content.as_str())
        .find(|c| c.contains("\"emailDraft\""))?;
    let json_start = content.find('{')?;
    let parsed: Value = serde_json::from_str(&content[json_start..]).ok()?;
    let draft = parsed.get("emailDraft")?.clone();
    draft.get("to").is_some().then_some(draft)
}

impl ScriptedLlmClient {
    fn next_move(&self, messages: &[Message]) -> String {
        let t: String = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        // 邮件已批准发出 -> 验证改派后的现场，再写结案笔记
        if t.contains("\"sent\":true") {
            if t.contains("Traffic is redirected to azure-central") {
                return "Investigation notes: orders-api in azure-east degraded, then went down \
                        after an initially effective restart. I prepared an F5 redirect, obtained \
                        human approval, and the email to the F5 team was sent (see the CHG ticket \
                        in the transcript). The rerouted snapshot confirms traffic is served from \
                        azure-central with error rate back under 1%. Next steps: keep monitoring, \
                        investigate the azure-east root cause, and revert the redirect once the \
                        region is healthy for 30 minutes."
                    .to_string();
            }
            return tool_call(
                "getDynatraceSnapshot",
                json!({ "scenarioId": SCENARIO_ID, "phase": "rerouted" }),
            );
        }

        // 审批被拒 -> 不自动重试，升级给人并收尾
        if t.contains("\"status\":\"denied\"") {
            if !t.contains("\"action\":\"page-human-oncall\"") {
                return tool_call(
                    "pageHumanOnCall",
                    json!({
                        "reason": "F5 redirect email was denied; orders-api is still down in azure-east and needs manual failover guidance.",
                        "severity": "critical",
                    }),
                );
            }
            return "Investigation notes: the F5 redirect email was denied, so I did not send it \
                    and will not retry automatically. orders-api remains down in azure-east; I \
                    have paged the on-call human to take over the failover decision."
                .to_string();
        }

        // 审批挂起：裁决到达则带 approvalId 重发，否则呼叫人工后等待
        if t.contains("\"status\":\"approval-pending\"") {
            let resolved = t.contains("resolved: approved") || t.contains("resolved: denied");
            if resolved {
                if let (Some(id), Some(draft)) =
                    (extract_approval_id(&t), extract_email_draft(messages))
                {
                    return tool_call(
                        "sendF5RedirectEmail",
                        json!({
                            "to": draft["to"],
                            "subject": draft["subject"],
                            "body": draft["body"],
                            "scenarioId": SCENARIO_ID,
                            "nextPhase": "rerouted",
                            "approvalId": id,
                        }),
                    );
                }
            }
            if !t.contains("\"action\":\"page-human-oncall\"") {
                return tool_call(
                    "pageHumanOnCall",
                    json!({
                        "reason": "Approval needed: send the F5 redirect email for orders-api (azure-east -> azure-central). Sustained 5xx after a recent restart.",
                        "severity": "critical",
                    }),
                );
            }
            let id = extract_approval_id(&t).unwrap_or_else(|| "unknown".to_string());
            return format!(
                "I have drafted the F5 redirect and requested approval ({}) to send it, and paged \
                 the on-call human. Waiting for the approval decision before sending the email.",
                id
            );
        }

        // 草稿已就绪 -> 首次发起门控发送（不带 approvalId）
        if t.contains("\"action\":\"prepare-f5-redirect\"") {
            if let Some(draft) = extract_email_draft(messages) {
                return tool_call(
                    "sendF5RedirectEmail",
                    json!({
                        "to": draft["to"],
                        "subject": draft["subject"],
                        "body": draft["body"],
                        "scenarioId": SCENARIO_ID,
                        "nextPhase": "rerouted",
                    }),
                );
            }
        }

        // 复查发现持续 5xx -> 草拟改派
        if t.contains("\"recommendedAction\":\"prepare-f5-redirect\"") {
            return tool_call(
                "prepareF5Redirect",
                json!({
                    "fromRegion": "azure-east",
                    "toRegion": "azure-central",
                    "serviceName": "orders-api",
                    "scenarioId": SCENARIO_ID,
                    "currentPhase": "post-restart-bad",
                }),
            );
        }

        // 重启后首查健康，但剧本提示可能回归 -> 再查一次
        if t.contains("Restart improved success rate") {
            return tool_call(
                "getDynatraceSnapshot",
                json!({ "scenarioId": SCENARIO_ID, "phase": "post-restart-bad" }),
            );
        }

        // 刚重启完 -> 按推荐阶段复查
        if t.contains("\"outcome\":\"restarted\"") {
            return tool_call(
                "getDynatraceSnapshot",
                json!({ "scenarioId": SCENARIO_ID, "phase": "post-restart-good" }),
            );
        }

        // 事故快照建议重启
        if t.contains("\"recommendedAction\":\"restart-service\"") {
            return tool_call(
                "restartService",
                json!({
                    "serviceName": "orders-api",
                    "region": "azure-east",
                    "scenarioId": SCENARIO_ID,
                    "currentPhase": "incident",
                }),
            );
        }

        // 开场：读事故现场快照
        tool_call(
            "getDynatraceSnapshot",
            json!({ "scenarioId": SCENARIO_ID, "phase": "incident" }),
        )
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        Ok(self.next_move(messages))
    }
}
