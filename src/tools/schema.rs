//! 工具调用 JSON Schema 生成与参数解析
//!
//! 「合法 tool call」的 JSON 结构注入 system prompt，减少 LLM 输出格式错误；
//! 各工具的参数结构体用 schemars 自动生成 parameters_schema。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::AgentError;

/// 工具调用请求格式：与 Planner 解析的 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，如 getDynatraceSnapshot、restartService、pageHumanOnCall
    pub tool: String,
    /// 工具参数，依工具的 parameters schema 而定
    pub args: Value,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

/// 生成某个参数结构体的 JSON Schema（工具 parameters_schema 的实现体）
pub fn args_schema<T: JsonSchema>() -> Value {
    let schema = schemars::gen::SchemaGenerator::default().into_root_schema_for::<T>();
    serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({}))
}

/// 按参数结构体解析 args；类型错误、缺字段等统一转 InvalidArguments
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, AgentError> {
    serde_json::from_value(args).map_err(|e| AgentError::InvalidArguments(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        name: String,
    }

    #[test]
    fn parse_args_reports_invalid_arguments() {
        let err = parse_args::<Probe>(serde_json::json!({"name": 42})).unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));

        let ok: Probe = parse_args(serde_json::json!({"name": "orders-api"})).unwrap();
        assert_eq!(ok.name, "orders-api");
    }

    #[test]
    fn tool_call_schema_mentions_both_fields() {
        let schema = tool_call_schema_json();
        assert!(schema.contains("\"tool\""));
        assert!(schema.contains("\"args\""));
    }
}
