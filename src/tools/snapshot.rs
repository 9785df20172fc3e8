//! getDynatraceSnapshot 工具：按阶段读取模拟监控快照（只读，无副作用）

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::scenario::{snapshot_for_phase, ScenarioId, ScenarioPhase};
use crate::tools::schema::{args_schema, parse_args};
use crate::tools::Tool;

fn default_scenario_id() -> String {
    "dynatrace-3am-demo".to_string()
}

fn default_phase() -> String {
    "incident".to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct GetSnapshotArgs {
    /// 剧本 id，目前只有 dynatrace-3am-demo
    #[serde(default = "default_scenario_id")]
    scenario_id: String,
    /// 当前剧本阶段；用上一次快照 hints.recommendedNextPhase 或你观察到的最新阶段
    #[serde(default = "default_phase")]
    phase: String,
}

/// 快照读取工具
pub struct GetSnapshotTool;

#[async_trait]
impl Tool for GetSnapshotTool {
    fn name(&self) -> &str {
        "getDynatraceSnapshot"
    }

    fn description(&self) -> &str {
        "Get a Dynatrace snapshot (simulated) for the current incident phase. \
         Pass the latest phase you observed, or the recommendedNextPhase from the last snapshot."
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<GetSnapshotArgs>()
    }

    async fn execute(&self, args: Value) -> Result<Value, AgentError> {
        let args: GetSnapshotArgs = parse_args(args)?;
        let scenario_id: ScenarioId = args.scenario_id.parse()?;
        let phase: ScenarioPhase = args.phase.parse()?;
        let snapshot = snapshot_for_phase(scenario_id, phase);
        serde_json::to_value(snapshot).map_err(|e| AgentError::ToolExecutionFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_to_incident_phase() {
        let result = GetSnapshotTool.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(result["phase"], "incident");
        assert_eq!(result["health"]["status"], "degraded");
        assert_eq!(result["hints"]["recommendedAction"], "restart-service");
    }

    #[tokio::test]
    async fn unknown_phase_fails_before_execution() {
        let err = GetSnapshotTool
            .execute(serde_json::json!({"phase": "meltdown"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::UnknownPhase(_)));
    }

    #[tokio::test]
    async fn unknown_scenario_fails() {
        let err = GetSnapshotTool
            .execute(serde_json::json!({"scenarioId": "other-demo"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::UnknownScenario(_)));
    }
}
