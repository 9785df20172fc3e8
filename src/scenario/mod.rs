//! 事故剧本：scenarioId / phase 枚举与确定性快照生成
//!
//! phase 是调用方持有的「续传令牌」：服务端不保存会话，每次请求显式传入当前阶段，
//! 下一阶段由快照 hints.recommendedNextPhase 建议、由调用方（人或模型）决定是否采纳。

pub mod snapshot;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

pub use snapshot::{
    snapshot_for_phase, Health, HealthStatus, Hints, LogLevel, LogLine, Metrics, RecommendedAction,
    Region, ServiceInfo, Severity, Snapshot, StatusCodeCount, StatusCounts,
};

/// 剧本 id：目前只有一个内置剧本
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioId {
    #[serde(rename = "dynatrace-3am-demo")]
    Dynatrace3amDemo,
}

impl ScenarioId {
    pub fn as_str(&self) -> &'static str {
        "dynatrace-3am-demo"
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioId {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dynatrace-3am-demo" => Ok(ScenarioId::Dynatrace3amDemo),
            other => Err(AgentError::UnknownScenario(other.to_string())),
        }
    }
}

/// 剧本阶段。类型本身不规定先后顺序，合法的前进路径由各阶段快照的 hints 给出
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioPhase {
    Incident,
    PostRestartGood,
    PostRestartBad,
    Rerouted,
    Resolved,
}

impl ScenarioPhase {
    pub const ALL: [ScenarioPhase; 5] = [
        ScenarioPhase::Incident,
        ScenarioPhase::PostRestartGood,
        ScenarioPhase::PostRestartBad,
        ScenarioPhase::Rerouted,
        ScenarioPhase::Resolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioPhase::Incident => "incident",
            ScenarioPhase::PostRestartGood => "post-restart-good",
            ScenarioPhase::PostRestartBad => "post-restart-bad",
            ScenarioPhase::Rerouted => "rerouted",
            ScenarioPhase::Resolved => "resolved",
        }
    }
}

impl fmt::Display for ScenarioPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioPhase {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incident" => Ok(ScenarioPhase::Incident),
            "post-restart-good" => Ok(ScenarioPhase::PostRestartGood),
            "post-restart-bad" => Ok(ScenarioPhase::PostRestartBad),
            "rerouted" => Ok(ScenarioPhase::Rerouted),
            "resolved" => Ok(ScenarioPhase::Resolved),
            other => Err(AgentError::UnknownPhase(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_round_trips_through_str() {
        for phase in ScenarioPhase::ALL {
            assert_eq!(phase.as_str().parse::<ScenarioPhase>().unwrap(), phase);
        }
    }

    #[test]
    fn unknown_phase_is_rejected() {
        let err = "pre-incident".parse::<ScenarioPhase>().unwrap_err();
        assert!(matches!(err, AgentError::UnknownPhase(p) if p == "pre-incident"));
    }

    #[test]
    fn unknown_scenario_is_rejected() {
        let err = "grafana-demo".parse::<ScenarioId>().unwrap_err();
        assert!(matches!(err, AgentError::UnknownScenario(_)));
    }

    #[test]
    fn phase_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ScenarioPhase::PostRestartBad).unwrap();
        assert_eq!(json, "\"post-restart-bad\"");
    }
}
