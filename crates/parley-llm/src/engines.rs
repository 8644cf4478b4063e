use serde::Serialize;
use std::sync::Arc;

use crate::error::SessionError;
use crate::openai::OpenAiCompatClient;
use crate::provider::Provider;

#[derive(Debug, Clone, Serialize)]
pub struct Engine {
    pub id: &'static str,
    pub name: &'static str,
}

struct EngineSpec {
    id: &'static str,
    name: &'static str,
    base_url: &'static str,
}

// All catalog engines expose an OpenAI-compatible chat/completions surface.
const ENGINES: &[EngineSpec] = &[
    EngineSpec { id: "openai", name: "OpenAI", base_url: "https://api.openai.com/v1" },
    EngineSpec { id: "anthropic", name: "Anthropic", base_url: "https://api.anthropic.com/v1" },
    EngineSpec { id: "mistralai", name: "MistralAI", base_url: "https://api.mistral.ai/v1" },
    EngineSpec { id: "google", name: "Google", base_url: "https://generativelanguage.googleapis.com/v1beta/openai" },
    EngineSpec { id: "xai", name: "xAI", base_url: "https://api.x.ai/v1" },
    EngineSpec { id: "groq", name: "Groq", base_url: "https://api.groq.com/openai/v1" },
    EngineSpec { id: "cerebras", name: "Cerebras", base_url: "https://api.cerebras.ai/v1" },
    EngineSpec { id: "deepseek", name: "DeepSeek", base_url: "https://api.deepseek.com/v1" },
];

// Explicit denylist. Tool support is not inferred from any other property.
const NO_TOOL_MODELS: &[&str] = &["deepseek-reasoner"];

pub fn supports_tools(model_id: &str) -> bool {
    !NO_TOOL_MODELS.contains(&model_id)
}

/// Engines whose credential resolves through `lookup` (typically the
/// `<ENGINE>_API_KEY` environment variable).
pub fn available_engines(lookup: impl Fn(&str) -> Option<String>) -> Vec<Engine> {
    ENGINES
        .iter()
        .filter(|spec| lookup(spec.id).is_some())
        .map(|spec| Engine {
            id: spec.id,
            name: spec.name,
        })
        .collect()
}

/// API base URL for a catalog engine.
pub fn base_url(engine_id: &str) -> Option<&'static str> {
    ENGINES
        .iter()
        .find(|spec| spec.id == engine_id)
        .map(|spec| spec.base_url)
}

/// Resolve an engine id and credential into a provider adapter.
pub fn ignite(engine_id: &str, api_key: &str) -> Result<Arc<dyn Provider>, SessionError> {
    let spec = ENGINES
        .iter()
        .find(|spec| spec.id == engine_id)
        .ok_or_else(|| SessionError::UnknownEngine(engine_id.to_string()))?;

    let client = OpenAiCompatClient::new(spec.id, api_key, spec.base_url)
        .map_err(SessionError::Provider)?;

    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denylisted_model_has_no_tools() {
        assert!(!supports_tools("deepseek-reasoner"));
        assert!(supports_tools("deepseek-chat"));
        assert!(supports_tools("gpt-4o"));
    }

    #[test]
    fn engines_filtered_by_credential() {
        let engines = available_engines(|id| {
            if id == "openai" || id == "groq" {
                Some("key".to_string())
            } else {
                None
            }
        });
        let ids: Vec<&str> = engines.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["openai", "groq"]);
    }

    #[test]
    fn unknown_engine_is_rejected() {
        let err = ignite("nope", "key").err().unwrap();
        assert!(matches!(err, SessionError::UnknownEngine(_)));
    }
}
