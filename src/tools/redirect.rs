//! prepareF5Redirect 工具：起草流量改派变更与给 F5 团队的邮件
//!
//! 只起草不发送：低风险的分析与草拟不设门，真正外发（sendF5RedirectEmail）才需要审批。

use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::scenario::{Region, ScenarioId, ScenarioPhase};
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::Tool;

/// 邮件草稿的固定收件人
pub const F5_TEAM_EMAIL: &str = "f5-team@company.com";

fn default_from_region() -> String {
    "azure-east".to_string()
}

fn default_to_region() -> String {
    "azure-central".to_string()
}

fn default_service_name() -> String {
    "orders-api".to_string()
}

fn default_scenario_id() -> String {
    "dynatrace-3am-demo".to_string()
}

fn default_phase() -> String {
    "incident".to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct PrepareRedirectArgs {
    #[serde(default = "default_from_region")]
    from_region: String,
    #[serde(default = "default_to_region")]
    to_region: String,
    #[serde(default = "default_service_name")]
    service_name: String,
    #[serde(default = "default_scenario_id")]
    scenario_id: String,
    #[serde(default = "default_phase")]
    current_phase: String,
}

/// 改派草拟工具
pub struct PrepareF5RedirectTool;

#[async_trait]
impl Tool for PrepareF5RedirectTool {
    fn name(&self) -> &str {
        "prepareF5Redirect"
    }

    fn description(&self) -> &str {
        "Prepare an F5 redirect change (simulated) including an email draft to the F5 team. \
         Drafting only; sending the email requires sendF5RedirectEmail and human approval."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<PrepareRedirectArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, AgentError> {
        let args: PrepareRedirectArgs = parse_args(args)?;
        let _scenario: ScenarioId = args.scenario_id.parse()?;
        let from_region: Region = args
            .from_region
            .parse()
            .map_err(AgentError::InvalidArguments)?;
        let to_region: Region = args
            .to_region
            .parse()
            .map_err(AgentError::InvalidArguments)?;
        let current: ScenarioPhase = args.current_phase.parse()?;

        let subject = format!(
            "[URGENT] Request: F5 redirect {} traffic {} -> {}",
            args.service_name,
            from_region.as_str(),
            to_region.as_str()
        );
        let body = format!(
            "Hello F5 Team,\n\n\
             We are currently in an active incident impacting {service} in {from}.\n\n\
             Summary:\n\
             - Time: {now}\n\
             - Impact: Sustained 5xx errors in {from}\n\
             - Recent action: Service restart attempted ~3 minutes ago; issue recurred\n\n\
             Request:\n\
             Please implement an emergency traffic redirect for {service} from {from} to {to} until further notice.\n\n\
             Rollback plan:\n\
             - Revert redirect once {from} is healthy for 30 minutes and incident commander confirms.\n\n\
             Thank you,\n\
             On-call Servicing Agent (Demo)\n",
            service = args.service_name,
            from = from_region.as_str(),
            to = to_region.as_str(),
            now = Utc::now().to_rfc3339(),
        );

        Ok(serde_json::json!({
            "action": "prepare-f5-redirect",
            "previousPhase": current,
            // 改派生效后的剧本阶段固定是 rerouted
            "nextPhase": ScenarioPhase::Rerouted,
            "changeSummary": {
                "fromRegion": from_region,
                "toRegion": to_region,
                "serviceName": args.service_name,
                "risk": "medium",
                "expectedImpact": "Mitigate customer impact by shifting traffic to healthy region",
            },
            "emailDraft": {
                "to": F5_TEAM_EMAIL,
                "subject": subject,
                "body": body,
            },
            "note": "This action requires human approval before sending the email to the F5 team.",
            "at": Utc::now(),
        }))
    }
}
