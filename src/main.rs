//! OnCall CLI 演示
//!
//! 离线跑完 3 a.m. 事故剧本：mock 后端驱动，审批挂起时自动批准（--deny 走拒绝路径），
//! 过程事件打印到终端。也可通过 config / 环境变量切换 openai / local 后端。

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use oncall::agent::{create_agent_components, process_transcript};
use oncall::config::load_config;
use oncall::react::ReactEvent;

fn print_event(event: &ReactEvent) {
    match event {
        ReactEvent::ToolCall { tool, args } => println!("-> tool call: {} {}", tool, args),
        ReactEvent::Observation { tool, preview } => {
            println!("<- observation ({}): {}", tool, preview)
        }
        ReactEvent::ToolFailure { tool, reason } => {
            println!("!! tool failure ({}): {}", tool, reason)
        }
        ReactEvent::ApprovalRequired { approval_id, .. } => {
            println!("?? approval required: {}", approval_id)
        }
        ReactEvent::Message { text } => println!("\n{}\n", text),
        ReactEvent::Error { text } => eprintln!("error: {}", text),
        _ => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    oncall::observability::init();

    let approve = !std::env::args().any(|a| a == "--deny");

    let cfg = load_config(None).context("Failed to load config")?;
    let components = create_agent_components(&cfg).context("Failed to create agent")?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    println!("== on-call demo: incident in azure-east ==\n");
    let result = process_transcript(
        &components,
        Vec::new(),
        "We're seeing elevated errors on orders-api in azure-east. Please investigate.",
        Some(&event_tx),
        CancellationToken::new(),
    )
    .await
    .context("Session failed")?;

    // 审批挂起：演示里由 CLI 代人裁决，然后把裁决通知连同原转写一起续跑
    if let Some(approval_id) = result.pending_approval {
        let decision = if approve { "approved" } else { "denied" };
        println!("== resolving approval {} as {} ==\n", approval_id, decision);
        components
            .gate
            .resolve(&approval_id, approve, Some(format!("{} via CLI demo", decision)))
            .await
            .context("Failed to resolve approval")?;

        let notice = format!("Approval {} resolved: {}. Proceed accordingly.", approval_id, decision);
        process_transcript(
            &components,
            result.messages,
            &notice,
            Some(&event_tx),
            CancellationToken::new(),
        )
        .await
        .context("Resumed session failed")?;
    }

    drop(event_tx);
    printer.await.ok();
    Ok(())
}
