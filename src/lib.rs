//! OnCall - 值班智能体演示系统
//!
//! 模块划分：
//! - **agent**: 无头 Agent 运行时（组件装配 + 单次会话入口，供 CLI / HTTP 调用）
//! - **approval**: 人工审批门（pending -> approved/denied 状态机）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / 剧本 Mock）
//! - **observability**: tracing 日志初始化
//! - **react**: Planner、过程事件、会话主循环
//! - **scenario**: 事故剧本状态机与确定性监控快照生成器
//! - **tools**: 值班工具箱（快照 / 重启 / 改派草稿 / 审批发信 / 呼叫人工 / 读文档）
//! - **transcript**: 对话转写（消息角色与内容，调用方持有并随请求重传）

pub mod agent;
pub mod approval;
pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod react;
pub mod scenario;
pub mod tools;
pub mod transcript;
