//! restartService 工具：模拟重启服务
//!
//! 只有在 incident 阶段重启才把剧情推进到 post-restart-good；其余阶段重启是
//! 无效动作，nextPhase 保持不变（剧本如此：重启解决不了深层依赖故障）。

use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::scenario::{Region, ScenarioId, ScenarioPhase};
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::Tool;

fn default_service_name() -> String {
    "orders-api".to_string()
}

fn default_region() -> String {
    "azure-east".to_string()
}

fn default_scenario_id() -> String {
    "dynatrace-3am-demo".to_string()
}

fn default_phase() -> String {
    "incident".to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct RestartServiceArgs {
    #[serde(default = "default_service_name")]
    service_name: String,
    /// azure-east 或 azure-central
    #[serde(default = "default_region")]
    region: String,
    #[serde(default = "default_scenario_id")]
    scenario_id: String,
    #[serde(default = "default_phase")]
    current_phase: String,
}

/// 模拟重启工具
pub struct RestartServiceTool;

#[async_trait]
impl Tool for RestartServiceTool {
    fn name(&self) -> &str {
        "restartService"
    }

    fn description(&self) -> &str {
        "Restart a service in a region (simulated). \
         Use when the service is degraded and a quick restart might recover it."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<RestartServiceArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, AgentError> {
        let args: RestartServiceArgs = parse_args(args)?;
        let _scenario: ScenarioId = args.scenario_id.parse()?;
        let region: Region = args
            .region
            .parse()
            .map_err(AgentError::InvalidArguments)?;
        let current: ScenarioPhase = args.current_phase.parse()?;

        let next = if current == ScenarioPhase::Incident {
            ScenarioPhase::PostRestartGood
        } else {
            current
        };

        Ok(serde_json::json!({
            "action": "restart-service",
            "serviceName": args.service_name,
            "region": region,
            "outcome": "restarted",
            "note": "Service restarted successfully. Monitor closely; issue may recur if underlying dependency is unhealthy.",
            "previousPhase": current,
            "nextPhase": next,
            "recommendedNextStep": {
                "tool": "getDynatraceSnapshot",
                "phase": next,
            },
            "at": Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn restart_during_incident_advances_phase() {
        let result = RestartServiceTool
            .execute(serde_json::json!({"currentPhase": "incident"}))
            .await
            .unwrap();
        assert_eq!(result["previousPhase"], "incident");
        assert_eq!(result["nextPhase"], "post-restart-good");
        assert_eq!(result["outcome"], "restarted");
        assert_eq!(result["recommendedNextStep"]["phase"], "post-restart-good");
    }

    #[tokio::test]
    async fn restart_outside_incident_is_a_noop_transition() {
        for phase in ["post-restart-good", "post-restart-bad", "rerouted", "resolved"] {
            let result = RestartServiceTool
                .execute(serde_json::json!({"currentPhase": phase}))
                .await
                .unwrap();
            assert_eq!(result["nextPhase"], phase, "phase {}", phase);
        }
    }

    #[tokio::test]
    async fn bad_region_is_rejected() {
        let err = RestartServiceTool
            .execute(serde_json::json!({"region": "azure-west"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));
    }
}
