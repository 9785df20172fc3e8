pub mod docs;
pub mod email;
pub mod executor;
pub mod page;
pub mod redirect;
pub mod registry;
pub mod restart;
pub mod schema;
pub mod snapshot;

pub use docs::ReadFileTool;
pub use email::SendF5RedirectEmailTool;
pub use executor::ToolExecutor;
pub use page::PageHumanOnCallTool;
pub use redirect::PrepareF5RedirectTool;
pub use registry::{Tool, ToolRegistry};
pub use restart::RestartServiceTool;
pub use schema::tool_call_schema_json;
pub use snapshot::GetSnapshotTool;
