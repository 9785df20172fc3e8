//! 确定性「Dynatrace」快照生成器
//!
//! 每个阶段的健康度、指标、日志与 hints 全部写死为数据，保证无论哪个模型驱动演示，
//! 剧情都可复现；同一 (scenarioId, phase) 下除时间戳外逐字节一致。
//! hints 只是给调用方的软建议，采不采纳由模型自己决定。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scenario::{ScenarioId, ScenarioPhase};

/// 区域（演示里只有主 / 备两个）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    AzureEast,
    AzureCentral,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::AzureEast => "azure-east",
            Region::AzureCentral => "azure-central",
        }
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "azure-east" => Ok(Region::AzureEast),
            "azure-central" => Ok(Region::AzureCentral),
            other => Err(format!(
                "unknown region '{}', expected azure-east or azure-central",
                other
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Degraded,
    Down,
    Healthy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// 快照推荐动作（与工具名一一对应，monitor / declare-resolved 除外）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendedAction {
    RestartService,
    PrepareF5Redirect,
    SendF5RedirectEmail,
    Monitor,
    DeclareResolved,
}

/// 目标服务标识
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub endpoint: String,
    pub region: Region,
}

/// 健康度摘要
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: HealthStatus,
    pub severity: Severity,
    pub summary: String,
}

/// 状态码直方图（2xx / 4xx / 5xx）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(rename = "2xx")]
    pub ok: u32,
    #[serde(rename = "4xx")]
    pub client_error: u32,
    #[serde(rename = "5xx")]
    pub server_error: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCodeCount {
    pub code: u16,
    pub count: u32,
}

/// 监控窗口内的聚合指标
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub window_minutes: u32,
    pub rpm: u32,
    pub error_rate_pct: f64,
    pub status_counts: StatusCounts,
    pub top_status_codes: Vec<StatusCodeCount>,
    pub p95_latency_ms: u32,
}

/// 单条日志
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub service: String,
    pub region: Region,
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// 给调用方的软建议：推荐动作、推荐下一阶段与理由
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hints {
    pub recommended_action: RecommendedAction,
    pub recommended_next_phase: ScenarioPhase,
    pub rationale: String,
}

/// 一次监控快照：按 (scenarioId, phase) 取值，observedAt 外全部确定
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub scenario_id: ScenarioId,
    pub phase: ScenarioPhase,
    pub observed_at: DateTime<Utc>,
    pub service: ServiceInfo,
    pub health: Health,
    pub metrics: Metrics,
    pub logs: Vec<LogLine>,
    pub hints: Hints,
}

const SERVICE_NAME: &str = "orders-api";
const SERVICE_ENDPOINT: &str = "https://api.company.com/orders";

fn service_info() -> ServiceInfo {
    ServiceInfo {
        name: SERVICE_NAME.to_string(),
        endpoint: SERVICE_ENDPOINT.to_string(),
        region: Region::AzureEast,
    }
}

/// 日志行构造：service / region 固定为演示目标，时间戳与快照同一时刻
fn log_line(
    at: DateTime<Utc>,
    level: LogLevel,
    status_code: u16,
    message: &str,
    trace_id: Option<&str>,
) -> LogLine {
    LogLine {
        timestamp: at,
        level,
        service: SERVICE_NAME.to_string(),
        region: Region::AzureEast,
        status_code,
        message: message.to_string(),
        trace_id: trace_id.map(String::from),
    }
}

fn health(status: HealthStatus, severity: Severity, summary: &str) -> Health {
    Health {
        status,
        severity,
        summary: summary.to_string(),
    }
}

fn hints(action: RecommendedAction, next: ScenarioPhase, rationale: &str) -> Hints {
    Hints {
        recommended_action: action,
        recommended_next_phase: next,
        rationale: rationale.to_string(),
    }
}

/// 按阶段生成快照。五个阶段全覆盖；时钟只读一次，所有时间戳字段取同一时刻。
pub fn snapshot_for_phase(scenario_id: ScenarioId, phase: ScenarioPhase) -> Snapshot {
    let now = Utc::now();
    let (health, metrics, logs, hints) = match phase {
        ScenarioPhase::Incident => (
            health(
                HealthStatus::Degraded,
                Severity::Critical,
                "Elevated 4xx/5xx errors detected. Customers are intermittently failing to create orders.",
            ),
            Metrics {
                window_minutes: 5,
                rpm: 420,
                error_rate_pct: 38.4,
                status_counts: StatusCounts { ok: 259, client_error: 98, server_error: 63 },
                top_status_codes: vec![
                    StatusCodeCount { code: 400, count: 62 },
                    StatusCodeCount { code: 401, count: 21 },
                    StatusCodeCount { code: 500, count: 41 },
                    StatusCodeCount { code: 503, count: 22 },
                ],
                p95_latency_ms: 1870,
            },
            vec![
                log_line(now, LogLevel::Error, 503, "Upstream timeout calling inventory-service", Some("trace-1b7a")),
                log_line(now, LogLevel::Error, 500, "Unhandled exception: null pointer in OrderController", Some("trace-8f21")),
                log_line(now, LogLevel::Warn, 400, "Validation error: missing customerId", Some("trace-2c09")),
                log_line(now, LogLevel::Warn, 401, "Auth token expired", Some("trace-6a3d")),
            ],
            hints(
                RecommendedAction::RestartService,
                ScenarioPhase::PostRestartGood,
                "Mixed 4xx/5xx with latency spike suggests partial degradation; try a fast restart to clear bad state and recover.",
            ),
        ),
        // 剧本刻意安排的回归伏笔：指标看着健康，recommendedNextPhase 却是 post-restart-bad
        ScenarioPhase::PostRestartGood => (
            health(
                HealthStatus::Healthy,
                Severity::Info,
                "Restart improved success rate. Service appears stable (for now).",
            ),
            Metrics {
                window_minutes: 3,
                rpm: 410,
                error_rate_pct: 1.2,
                status_counts: StatusCounts { ok: 405, client_error: 4, server_error: 1 },
                top_status_codes: vec![
                    StatusCodeCount { code: 400, count: 3 },
                    StatusCodeCount { code: 500, count: 1 },
                ],
                p95_latency_ms: 220,
            },
            vec![
                log_line(now, LogLevel::Info, 200, "Order created successfully", Some("trace-7a11")),
                log_line(now, LogLevel::Warn, 400, "Validation error: missing lineItems", Some("trace-9c30")),
            ],
            hints(
                RecommendedAction::Monitor,
                ScenarioPhase::PostRestartBad,
                "Restart was effective but this incident pattern often regresses. Re-check shortly to confirm stability.",
            ),
        ),
        ScenarioPhase::PostRestartBad => (
            health(
                HealthStatus::Down,
                Severity::Critical,
                "Sustained 5xx errors. Service is effectively down in azure-east after recent restart.",
            ),
            Metrics {
                window_minutes: 2,
                rpm: 380,
                error_rate_pct: 96.1,
                status_counts: StatusCounts { ok: 15, client_error: 0, server_error: 365 },
                top_status_codes: vec![
                    StatusCodeCount { code: 500, count: 303 },
                    StatusCodeCount { code: 502, count: 44 },
                    StatusCodeCount { code: 503, count: 18 },
                ],
                p95_latency_ms: 5100,
            },
            vec![
                log_line(now, LogLevel::Error, 500, "DB connection pool exhausted", Some("trace-5eaa")),
                log_line(now, LogLevel::Error, 502, "Bad gateway from upstream ALB", Some("trace-31dd")),
                log_line(now, LogLevel::Error, 503, "Service unavailable - circuit breaker open", Some("trace-12f0")),
            ],
            hints(
                RecommendedAction::PrepareF5Redirect,
                ScenarioPhase::Rerouted,
                "Restart was attempted recently; sustained 5xx suggests deeper dependency/infra issue. Reduce blast radius by redirecting traffic to azure-central.",
            ),
        ),
        ScenarioPhase::Rerouted => (
            health(
                HealthStatus::Healthy,
                Severity::Warning,
                "Traffic is redirected to azure-central. Customer impact mitigated; azure-east remains unhealthy.",
            ),
            Metrics {
                window_minutes: 5,
                rpm: 405,
                error_rate_pct: 0.6,
                status_counts: StatusCounts { ok: 401, client_error: 2, server_error: 2 },
                top_status_codes: vec![
                    StatusCodeCount { code: 400, count: 2 },
                    StatusCodeCount { code: 500, count: 2 },
                ],
                p95_latency_ms: 260,
            },
            vec![
                log_line(now, LogLevel::Info, 200, "Routing policy active: azure-east -> azure-central", None),
                log_line(now, LogLevel::Warn, 500, "Residual 5xx from stale connections; trending down", None),
            ],
            hints(
                RecommendedAction::DeclareResolved,
                ScenarioPhase::Resolved,
                "Customer traffic stabilized via failover. Mark incident mitigated and open follow-up to investigate azure-east root cause.",
            ),
        ),
        // 终态自环
        ScenarioPhase::Resolved => (
            health(
                HealthStatus::Healthy,
                Severity::Info,
                "Incident mitigated. Monitoring indicates stable traffic flow and low error rates.",
            ),
            Metrics {
                window_minutes: 10,
                rpm: 415,
                error_rate_pct: 0.2,
                status_counts: StatusCounts { ok: 414, client_error: 1, server_error: 0 },
                top_status_codes: vec![StatusCodeCount { code: 400, count: 1 }],
                p95_latency_ms: 240,
            },
            vec![log_line(now, LogLevel::Info, 200, "All systems nominal (demo).", None)],
            hints(
                RecommendedAction::DeclareResolved,
                ScenarioPhase::Resolved,
                "Stable metrics across the monitoring window.",
            ),
        ),
    };

    Snapshot {
        scenario_id,
        phase,
        observed_at: now,
        service: service_info(),
        health,
        metrics,
        logs,
        hints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 抹掉时间戳后比较，验证内容确定性
    fn normalized(snapshot: &Snapshot) -> serde_json::Value {
        let mut v = serde_json::to_value(snapshot).unwrap();
        v["observedAt"] = serde_json::Value::Null;
        if let Some(logs) = v["logs"].as_array_mut() {
            for line in logs {
                line["timestamp"] = serde_json::Value::Null;
            }
        }
        v
    }

    #[test]
    fn snapshot_is_deterministic_per_phase_except_timestamps() {
        for phase in ScenarioPhase::ALL {
            let a = snapshot_for_phase(ScenarioId::Dynatrace3amDemo, phase);
            let b = snapshot_for_phase(ScenarioId::Dynatrace3amDemo, phase);
            assert_eq!(normalized(&a), normalized(&b), "phase {}", phase);
        }
    }

    #[test]
    fn incident_phase_recommends_restart() {
        let s = snapshot_for_phase(ScenarioId::Dynatrace3amDemo, ScenarioPhase::Incident);
        assert_eq!(s.health.status, HealthStatus::Degraded);
        assert_eq!(s.health.severity, Severity::Critical);
        assert_eq!(s.hints.recommended_action, RecommendedAction::RestartService);
        assert_eq!(s.hints.recommended_next_phase, ScenarioPhase::PostRestartGood);
        assert!(s.metrics.error_rate_pct > 30.0);
    }

    #[test]
    fn post_restart_good_foreshadows_regression() {
        let s = snapshot_for_phase(ScenarioId::Dynatrace3amDemo, ScenarioPhase::PostRestartGood);
        assert_eq!(s.health.status, HealthStatus::Healthy);
        assert_eq!(s.hints.recommended_action, RecommendedAction::Monitor);
        // 剧本安排：健康的表象下，推荐下一阶段是回归
        assert_eq!(s.hints.recommended_next_phase, ScenarioPhase::PostRestartBad);
    }

    #[test]
    fn post_restart_bad_recommends_redirect() {
        let s = snapshot_for_phase(ScenarioId::Dynatrace3amDemo, ScenarioPhase::PostRestartBad);
        assert_eq!(s.health.status, HealthStatus::Down);
        assert_eq!(s.hints.recommended_action, RecommendedAction::PrepareF5Redirect);
        assert_eq!(s.hints.recommended_next_phase, ScenarioPhase::Rerouted);
    }

    #[test]
    fn resolved_phase_is_terminal_self_loop() {
        let s = snapshot_for_phase(ScenarioId::Dynatrace3amDemo, ScenarioPhase::Resolved);
        assert_eq!(s.hints.recommended_next_phase, ScenarioPhase::Resolved);
        assert_eq!(s.hints.recommended_action, RecommendedAction::DeclareResolved);
    }

    #[test]
    fn rerouted_is_healthy_with_warning_severity() {
        let s = snapshot_for_phase(ScenarioId::Dynatrace3amDemo, ScenarioPhase::Rerouted);
        assert_eq!(s.health.status, HealthStatus::Healthy);
        assert_eq!(s.health.severity, Severity::Warning);
    }

    #[test]
    fn wire_format_uses_camel_case_and_histogram_keys() {
        let s = snapshot_for_phase(ScenarioId::Dynatrace3amDemo, ScenarioPhase::Incident);
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["scenarioId"], "dynatrace-3am-demo");
        assert_eq!(v["phase"], "incident");
        assert_eq!(v["metrics"]["statusCounts"]["2xx"], 259);
        assert_eq!(v["metrics"]["p95LatencyMs"], 1870);
        assert_eq!(v["logs"][0]["level"], "ERROR");
        assert_eq!(v["logs"][0]["region"], "azure-east");
        assert_eq!(v["hints"]["recommendedAction"], "restart-service");
    }
}
