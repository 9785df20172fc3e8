//! sendF5RedirectEmail 工具：门控外发
//!
//! 演示里唯一具有「真实世界后果」性质的动作，执行前必须经人工审批：
//! - 不带 approvalId 调用：登记一条全新 pending 审批，返回 withheld 结果（sent=false）
//! - 带 approvalId 调用：pending 仍然 withheld；approved 消费裁决、模拟发送并开变更单；
//!   denied 消费裁决并返回拒绝结果（sent=false + 原因）

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::approval::{ApprovalGate, ApprovalStatus};
use crate::core::AgentError;
use crate::scenario::{ScenarioId, ScenarioPhase};
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::Tool;

/// 结果里保留的正文预览长度
const BODY_PREVIEW_CHARS: usize = 240;

fn default_scenario_id() -> String {
    "dynatrace-3am-demo".to_string()
}

fn default_next_phase() -> String {
    "rerouted".to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct SendEmailArgs {
    /// 收件人邮箱
    to: String,
    subject: String,
    body: String,
    #[serde(default = "default_scenario_id")]
    scenario_id: String,
    #[serde(default = "default_next_phase")]
    next_phase: String,
    /// 此前 withheld 结果返回的审批 id；首次调用留空
    #[serde(default)]
    approval_id: Option<String>,
}

/// 粗粒度邮箱格式校验：local@domain.tld，无空白
fn is_valid_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// 变更单号：CHG- + 6 位数字（uuid 派生，演示级别的唯一性）
fn change_ticket_id() -> String {
    let n = 100_000 + (Uuid::new_v4().as_u128() % 900_000) as u32;
    format!("CHG-{}", n)
}

/// 门控发信工具：持有进程内共享的审批门
pub struct SendF5RedirectEmailTool {
    gate: Arc<ApprovalGate>,
}

impl SendF5RedirectEmailTool {
    pub fn new(gate: Arc<ApprovalGate>) -> Self {
        Self { gate }
    }

    fn withheld(&self, approval_id: &str) -> Value {
        serde_json::json!({
            "action": "send-f5-redirect-email",
            "sent": false,
            "status": "approval-pending",
            "approvalId": approval_id,
            "note": "Human approval required before this email is sent. Page the on-call human, \
                     wait for the approval to be resolved, then call this tool again with the approvalId.",
            "at": Utc::now(),
        })
    }
}

#[async_trait]
impl Tool for SendF5RedirectEmailTool {
    fn name(&self) -> &str {
        "sendF5RedirectEmail"
    }

    fn description(&self) -> &str {
        "Send an email to the F5 team to request a traffic redirect (simulated). \
         REQUIRES HUMAN APPROVAL: the first call returns an approvalId and withholds execution; \
         call again with that approvalId once the human has approved."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<SendEmailArgs>()
    }

    fn needs_approval(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> Result<Value, AgentError> {
        let args: SendEmailArgs = parse_args(args)?;
        let _scenario: ScenarioId = args.scenario_id.parse()?;
        let next_phase: ScenarioPhase = args.next_phase.parse()?;
        if !is_valid_email(&args.to) {
            return Err(AgentError::InvalidArguments(format!(
                "'{}' is not a valid email address",
                args.to
            )));
        }

        let Some(approval_id) = args.approval_id else {
            // 每次无 id 的调用都登记全新审批，不复用旧记录
            let request = self
                .gate
                .request(
                    self.name(),
                    serde_json::json!({
                        "to": args.to,
                        "subject": args.subject,
                        "body": args.body,
                        "nextPhase": next_phase,
                    }),
                )
                .await;
            return Ok(self.withheld(&request.id));
        };

        let request = self.gate.consume(&approval_id).await?;
        match request.status {
            ApprovalStatus::Pending => Ok(self.withheld(&approval_id)),
            ApprovalStatus::Approved => Ok(serde_json::json!({
                "action": "send-f5-redirect-email",
                "sent": true,
                "to": args.to,
                "subject": args.subject,
                "bodyPreview": args.body.chars().take(BODY_PREVIEW_CHARS).collect::<String>(),
                "ticketId": change_ticket_id(),
                "nextPhase": next_phase,
                "at": Utc::now(),
            })),
            ApprovalStatus::Denied => Ok(serde_json::json!({
                "action": "send-f5-redirect-email",
                "sent": false,
                "status": "denied",
                "reason": request.reason.unwrap_or_else(|| "Denied by on-call human".to_string()),
                "note": "Do not retry automatically. Escalate via pageHumanOnCall instead.",
                "at": Utc::now(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_args(approval_id: Option<&str>) -> Value {
        let mut args = serde_json::json!({
            "to": "f5-team@company.com",
            "subject": "[URGENT] Request: F5 redirect",
            "body": "Please redirect orders-api traffic azure-east -> azure-central.",
        });
        if let Some(id) = approval_id {
            args["approvalId"] = Value::String(id.to_string());
        }
        args
    }

    #[test]
    fn email_validation_rejects_garbage() {
        assert!(is_valid_email("f5-team@company.com"));
        assert!(!is_valid_email("f5-team"));
        assert!(!is_valid_email("f5 team@company.com"));
        assert!(!is_valid_email("@company.com"));
        assert!(!is_valid_email("f5-team@company"));
    }

    #[test]
    fn ticket_id_is_chg_plus_six_digits() {
        for _ in 0..32 {
            let id = change_ticket_id();
            let digits = id.strip_prefix("CHG-").unwrap();
            assert_eq!(digits.len(), 6);
            assert!(digits.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn first_call_withholds_and_mints_no_ticket() {
        let gate = Arc::new(ApprovalGate::new());
        let tool = SendF5RedirectEmailTool::new(gate.clone());

        let result = tool.execute(send_args(None)).await.unwrap();
        assert_eq!(result["sent"], false);
        assert_eq!(result["status"], "approval-pending");
        assert!(result.get("ticketId").is_none());

        // pending 期间再次带 id 调用依然 withheld
        let id = result["approvalId"].as_str().unwrap().to_string();
        let again = tool.execute(send_args(Some(&id))).await.unwrap();
        assert_eq!(again["status"], "approval-pending");
        assert!(again.get("ticketId").is_none());
    }

    #[tokio::test]
    async fn approved_resolution_sends_and_consumes() {
        let gate = Arc::new(ApprovalGate::new());
        let tool = SendF5RedirectEmailTool::new(gate.clone());

        let withheld = tool.execute(send_args(None)).await.unwrap();
        let id = withheld["approvalId"].as_str().unwrap().to_string();
        gate.resolve(&id, true, None).await.unwrap();

        let result = tool.execute(send_args(Some(&id))).await.unwrap();
        assert_eq!(result["sent"], true);
        let ticket = result["ticketId"].as_str().unwrap();
        assert!(ticket.starts_with("CHG-"));
        assert_eq!(result["nextPhase"], "rerouted");

        // 裁决已消费：同一 id 再调用 / 再裁决都报 UnknownApproval
        let err = tool.execute(send_args(Some(&id))).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownApproval(_)));
        let err = gate.resolve(&id, true, None).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownApproval(_)));
    }

    #[tokio::test]
    async fn denied_resolution_returns_denial_without_ticket() {
        let gate = Arc::new(ApprovalGate::new());
        let tool = SendF5RedirectEmailTool::new(gate.clone());

        let withheld = tool.execute(send_args(None)).await.unwrap();
        let id = withheld["approvalId"].as_str().unwrap().to_string();
        gate.resolve(&id, false, Some("wake up the networking team first".to_string()))
            .await
            .unwrap();

        let result = tool.execute(send_args(Some(&id))).await.unwrap();
        assert_eq!(result["sent"], false);
        assert_eq!(result["status"], "denied");
        assert_eq!(result["reason"], "wake up the networking team first");
        assert!(result.get("ticketId").is_none());
    }

    #[tokio::test]
    async fn malformed_email_fails_validation() {
        let gate = Arc::new(ApprovalGate::new());
        let tool = SendF5RedirectEmailTool::new(gate);
        let err = tool
            .execute(serde_json::json!({
                "to": "not-an-email",
                "subject": "s",
                "body": "b",
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn unknown_approval_id_fails() {
        let gate = Arc::new(ApprovalGate::new());
        let tool = SendF5RedirectEmailTool::new(gate);
        let err = tool.execute(send_args(Some("appr-nope"))).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownApproval(_)));
    }
}
