//! pageHumanOnCall 工具：模拟呼叫值班工程师

use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::core::AgentError;
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::Tool;

fn default_severity() -> String {
    "critical".to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct PageHumanArgs {
    /// 为什么要叫醒人（审批请求、自动手段用尽等）
    reason: String,
    /// warning 或 critical
    #[serde(default = "default_severity")]
    severity: String,
}

/// 呼叫单号：PAGE- + 4 位数字（uuid 派生，演示级别的唯一性）
fn page_id() -> String {
    let n = 1_000 + (Uuid::new_v4().as_u128() % 9_000) as u32;
    format!("PAGE-{}", n)
}

/// 呼叫人工工具
pub struct PageHumanOnCallTool;

#[async_trait]
impl Tool for PageHumanOnCallTool {
    fn name(&self) -> &str {
        "pageHumanOnCall"
    }

    fn description(&self) -> &str {
        "Page the human on-call engineer (simulated). \
         Use only when approval is required or automated actions are exhausted."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<PageHumanArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, AgentError> {
        let args: PageHumanArgs = parse_args(args)?;
        if args.reason.trim().is_empty() {
            return Err(AgentError::InvalidArguments(
                "reason must not be empty".to_string(),
            ));
        }
        if args.severity != "warning" && args.severity != "critical" {
            return Err(AgentError::InvalidArguments(format!(
                "unknown severity '{}', expected warning or critical",
                args.severity
            )));
        }

        Ok(serde_json::json!({
            "action": "page-human-oncall",
            "severity": args.severity,
            "reason": args.reason,
            "pageId": page_id(),
            "at": Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn page_defaults_to_critical_and_mints_id() {
        let result = PageHumanOnCallTool
            .execute(serde_json::json!({"reason": "approval needed for F5 redirect email"}))
            .await
            .unwrap();
        assert_eq!(result["severity"], "critical");
        let id = result["pageId"].as_str().unwrap();
        let digits = id.strip_prefix("PAGE-").unwrap();
        assert_eq!(digits.len(), 4);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn empty_reason_and_bad_severity_are_rejected() {
        let err = PageHumanOnCallTool
            .execute(serde_json::json!({"reason": "  "}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));

        let err = PageHumanOnCallTool
            .execute(serde_json::json!({"reason": "x", "severity": "fatal"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn missing_reason_fails_schema() {
        let err = PageHumanOnCallTool
            .execute(serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));
    }
}
