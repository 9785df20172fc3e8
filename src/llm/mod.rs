//! LLM 层：客户端抽象与后端选择

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use mock::ScriptedLlmClient;
pub use openai::OpenAiClient;
pub use traits::LlmClient;

use crate::config::AppConfig;
use crate::core::AgentError;

/// 本地 OpenAI 兼容端点（LM Studio 等）的缺省地址
const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:1234/v1";

/// 按配置选择后端：openai / local / mock
pub fn create_llm_from_config(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, AgentError> {
    match cfg.llm.provider.as_str() {
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                AgentError::ConfigError(
                    "OPENAI_API_KEY is not set but [llm].provider is 'openai'".to_string(),
                )
            })?;
            Ok(Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                Some(&api_key),
            )))
        }
        "local" => {
            let base_url = cfg
                .llm
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_BASE_URL.to_string());
            Ok(Arc::new(OpenAiClient::new(
                Some(&base_url),
                &cfg.llm.model,
                None,
            )))
        }
        "mock" => Ok(Arc::new(ScriptedLlmClient)),
        other => Err(AgentError::ConfigError(format!(
            "unsupported llm provider '{}', expected openai, local or mock",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_provider_needs_no_key() {
        let cfg = AppConfig::default();
        assert!(create_llm_from_config(&cfg).is_ok());
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "google".to_string();
        let err = create_llm_from_config(&cfg).err().unwrap();
        assert!(matches!(err, AgentError::ConfigError(_)));
    }
}
