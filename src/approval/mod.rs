//! 人工审批门
//!
//! 门控工具每次发起调用都会创建一个全新的 pending 审批（不复用）；外部通过
//! resolve(id, approved, reason) 恰好裁决一次，之后由门控工具在下一次调用中
//! 消费裁决结果并丢弃记录。重复裁决报 AlreadyResolved，未知 id 报 UnknownApproval。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::AgentError;

/// 审批状态：未裁决是独立的一态，不用 Option<bool> 表达
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
}

/// 一次审批请求：门控工具的待执行参数 + 裁决状态
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: String,
    /// 申请审批的工具名
    pub tool: String,
    /// 待执行的参数（供审批人查看）
    pub proposal: Value,
    pub status: ApprovalStatus,
    /// 裁决附言（拒绝原因等）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 审批门：进程内共享，按 id 存放审批请求
#[derive(Default)]
pub struct ApprovalGate {
    requests: Mutex<HashMap<String, ApprovalRequest>>,
}

impl ApprovalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建一条全新的 pending 审批并返回其副本
    pub async fn request(&self, tool: &str, proposal: Value) -> ApprovalRequest {
        let request = ApprovalRequest {
            id: format!("appr-{}", Uuid::new_v4()),
            tool: tool.to_string(),
            proposal,
            status: ApprovalStatus::Pending,
            reason: None,
            created_at: Utc::now(),
        };
        let mut requests = self.requests.lock().await;
        requests.insert(request.id.clone(), request.clone());
        tracing::info!(approval_id = %request.id, tool = %request.tool, "approval requested");
        request
    }

    /// 外部裁决：pending -> approved/denied，恰好一次
    pub async fn resolve(
        &self,
        id: &str,
        approved: bool,
        reason: Option<String>,
    ) -> Result<ApprovalStatus, AgentError> {
        let mut requests = self.requests.lock().await;
        let request = requests
            .get_mut(id)
            .ok_or_else(|| AgentError::UnknownApproval(id.to_string()))?;
        if request.status != ApprovalStatus::Pending {
            return Err(AgentError::AlreadyResolved(id.to_string()));
        }
        request.status = if approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Denied
        };
        request.reason = reason;
        tracing::info!(approval_id = %id, status = ?request.status, "approval resolved");
        Ok(request.status)
    }

    /// 查询审批状态（不消费）
    pub async fn get(&self, id: &str) -> Option<ApprovalRequest> {
        self.requests.lock().await.get(id).cloned()
    }

    /// 门控工具取用裁决结果：pending 原样返回；approved/denied 返回并移除记录
    /// （每条审批只能被消费一次，消费后 id 作废）
    pub async fn consume(&self, id: &str) -> Result<ApprovalRequest, AgentError> {
        let mut requests = self.requests.lock().await;
        let request = requests
            .get(id)
            .cloned()
            .ok_or_else(|| AgentError::UnknownApproval(id.to_string()))?;
        if request.status != ApprovalStatus::Pending {
            requests.remove(id);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_flips_pending_exactly_once() {
        let gate = ApprovalGate::new();
        let req = gate.request("sendF5RedirectEmail", serde_json::json!({})).await;
        assert_eq!(req.status, ApprovalStatus::Pending);

        let status = gate.resolve(&req.id, true, None).await.unwrap();
        assert_eq!(status, ApprovalStatus::Approved);

        let err = gate.resolve(&req.id, false, None).await.unwrap_err();
        assert!(matches!(err, AgentError::AlreadyResolved(_)));
    }

    #[tokio::test]
    async fn resolve_unknown_id_fails() {
        let gate = ApprovalGate::new();
        let err = gate.resolve("appr-missing", true, None).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownApproval(_)));
    }

    #[tokio::test]
    async fn consume_keeps_pending_and_discards_resolved() {
        let gate = ApprovalGate::new();
        let req = gate.request("sendF5RedirectEmail", serde_json::json!({})).await;

        // pending：可反复取用，不移除
        let taken = gate.consume(&req.id).await.unwrap();
        assert_eq!(taken.status, ApprovalStatus::Pending);
        assert!(gate.get(&req.id).await.is_some());

        gate.resolve(&req.id, false, Some("too risky".to_string())).await.unwrap();
        let taken = gate.consume(&req.id).await.unwrap();
        assert_eq!(taken.status, ApprovalStatus::Denied);
        assert_eq!(taken.reason.as_deref(), Some("too risky"));

        // 消费后 id 作废
        assert!(gate.get(&req.id).await.is_none());
        let err = gate.resolve(&req.id, true, None).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownApproval(_)));
    }

    #[tokio::test]
    async fn each_invocation_gets_a_fresh_request() {
        let gate = ApprovalGate::new();
        let a = gate.request("sendF5RedirectEmail", serde_json::json!({})).await;
        let b = gate.request("sendF5RedirectEmail", serde_json::json!({})).await;
        assert_ne!(a.id, b.id);
    }
}
