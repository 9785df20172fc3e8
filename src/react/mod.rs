//! 会话编排：Planner、过程事件与主循环

pub mod events;
pub mod loop_;
pub mod planner;

pub use events::ReactEvent;
pub use loop_::{run_session, ReactSession, SessionResult};
pub use planner::{parse_llm_output, Planner, PlannerOutput, ToolCall};
