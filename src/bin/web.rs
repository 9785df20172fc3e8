//! OnCall Web 传输层
//!
//! 启动: cargo run --bin oncall-web --features web
//! 浏览器访问 http://127.0.0.1:8080
//!
//! 服务端不保存会话：客户端每次 POST 完整转写；审批门按进程共享，
//! 批准/拒绝通过 /api/approvals/{id} 回填后，客户端带裁决通知重发转写续跑。

#![cfg(feature = "web")]

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use oncall::agent::{create_agent_components_with_gate, process_transcript};
use oncall::approval::ApprovalGate;
use oncall::config::{load_config, AppConfig};
use oncall::core::AgentError;
use oncall::react::ReactEvent;
use oncall::transcript::{Message, Role};

struct AppState {
    cfg: AppConfig,
    /// 审批门进程内共享：挂起的审批跨 HTTP 请求存活
    gate: Arc<ApprovalGate>,
}

#[derive(Debug, Deserialize)]
struct OncallRequest {
    messages: Vec<Message>,
    /// 可选覆盖：openai / local / mock
    provider: Option<String>,
    /// 可选覆盖模型名
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    approved: bool,
    reason: Option<String>,
}

fn status_for(err: &AgentError) -> StatusCode {
    match err {
        AgentError::UnknownApproval(_) => StatusCode::NOT_FOUND,
        AgentError::AlreadyResolved(_) => StatusCode::CONFLICT,
        AgentError::UpstreamProvider(_) => StatusCode::BAD_GATEWAY,
        AgentError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

/// POST /api/oncall：跑一次会话，过程事件以 SSE 推送，末尾带 session_done
async fn oncall_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OncallRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let mut messages = req.messages;
    let last = messages.pop();
    let user_input = match last {
        Some(m) if m.role == Role::User => m.content,
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                "messages must end with a user message".to_string(),
            ))
        }
    };

    let mut cfg = state.cfg.clone();
    if let Some(provider) = req.provider {
        cfg.llm.provider = provider;
    }
    if let Some(model) = req.model {
        cfg.llm.model = model;
    }

    let components = create_agent_components_with_gate(&cfg, state.gate.clone())
        .map_err(|e| (status_for(&e), e.to_string()))?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let result = process_transcript(
            &components,
            messages,
            &user_input,
            Some(&event_tx),
            CancellationToken::new(),
        )
        .await;
        let done = match result {
            Ok(r) => ReactEvent::SessionDone {
                response: r.response,
                pending_approval: r.pending_approval,
                messages: r.messages,
            },
            Err(e) => ReactEvent::Error { text: e.to_string() },
        };
        let _ = event_tx.send(done);
    });

    let stream = futures_util::stream::unfold(event_rx, |mut rx| async move {
        let event = rx.recv().await?;
        let sse = match Event::default().json_data(&event) {
            Ok(e) => e,
            Err(e) => Event::default().event("error").data(e.to_string()),
        };
        Some((Ok::<_, Infallible>(sse), rx))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// POST /api/approvals/{id}：UI 通往工具执行流的唯一可变入口
async fn resolve_approval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let status = state
        .gate
        .resolve(&id, req.approved, req.reason)
        .await
        .map_err(|e| (status_for(&e), e.to_string()))?;
    Ok(Json(serde_json::json!({ "id": id, "status": status })))
}

/// GET /api/approvals/{id}：审批状态查询
async fn approval_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    match state.gate.get(&id).await {
        Some(request) => Ok(Json(serde_json::to_value(request).unwrap_or_default())),
        None => Err((
            StatusCode::NOT_FOUND,
            format!("Unknown approval id: {}", id),
        )),
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    oncall::observability::init();

    let cfg = load_config(None).unwrap_or_default();
    let state = Arc::new(AppState {
        cfg,
        gate: Arc::new(ApprovalGate::new()),
    });

    let app = Router::new()
        .route("/", get(index))
        .route("/api/oncall", post(oncall_handler))
        .route("/api/approvals/:id", post(resolve_approval).get(approval_status))
        .with_state(state);

    let addr = std::env::var("ONCALL_WEB_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    tracing::info!(%addr, "oncall-web listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>On-call Agent Demo</title>
<style>
body { font-family: sans-serif; max-width: 860px; margin: 2rem auto; }
#log { border: 1px solid #ccc; padding: 1rem; height: 420px; overflow-y: auto; white-space: pre-wrap; }
.ev { margin: 2px 0; } .tool { color: #0a58ca; } .obs { color: #666; } .msg { color: #111; font-weight: bold; }
.approval { color: #b02a37; }
</style>
</head>
<body>
<h2>On-call Agent Demo</h2>
<div id="log"></div>
<p>
<input id="input" size="70" value="We're seeing elevated errors on orders-api in azure-east. Please investigate.">
<button onclick="send()">Send</button>
</p>
<script>
let transcript = [];
let pendingApproval = null;
const log = (cls, text) => {
  const div = document.createElement('div');
  div.className = 'ev ' + cls;
  div.textContent = text;
  document.getElementById('log').appendChild(div);
  div.scrollIntoView();
};
async function post(text) {
  transcript.push({ role: 'user', content: text });
  const res = await fetch('/api/oncall', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ messages: transcript }),
  });
  const reader = res.body.getReader();
  const decoder = new TextDecoder();
  let buf = '';
  for (;;) {
    const { done, value } = await reader.read();
    if (done) break;
    buf += decoder.decode(value, { stream: true });
    let idx;
    while ((idx = buf.indexOf('\n\n')) >= 0) {
      const chunk = buf.slice(0, idx); buf = buf.slice(idx + 2);
      const line = chunk.split('\n').find(l => l.startsWith('data:'));
      if (line) handle(JSON.parse(line.slice(5)));
    }
  }
}
function handle(ev) {
  if (ev.type === 'tool_call') log('tool', '-> ' + ev.tool + ' ' + JSON.stringify(ev.args));
  else if (ev.type === 'observation') log('obs', '<- ' + ev.tool + ': ' + ev.preview);
  else if (ev.type === 'tool_failure') log('approval', '!! ' + ev.tool + ': ' + ev.reason);
  else if (ev.type === 'approval_required') { pendingApproval = ev.approval_id; log('approval', 'Approval required: ' + ev.approval_id); }
  else if (ev.type === 'message') log('msg', ev.text);
  else if (ev.type === 'error') log('approval', 'error: ' + ev.text);
  else if (ev.type === 'session_done') {
    transcript = ev.messages;
    if (ev.pending_approval) offerApproval(ev.pending_approval);
  }
}
function offerApproval(id) {
  const div = document.createElement('div');
  div.className = 'ev approval';
  const mk = (label, approved) => {
    const b = document.createElement('button');
    b.textContent = label;
    b.onclick = async () => {
      await fetch('/api/approvals/' + id, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ approved }),
      });
      div.remove();
      post('Approval ' + id + ' resolved: ' + (approved ? 'approved' : 'denied') + '. Proceed accordingly.');
    };
    return b;
  };
  div.append('Resolve ' + id + ': ', mk('Approve', true), ' ', mk('Deny', false));
  document.getElementById('log').appendChild(div);
}
function send() {
  const input = document.getElementById('input');
  log('msg', 'you: ' + input.value);
  post(input.value);
  input.value = '';
}
</script>
</body>
</html>
"#;
