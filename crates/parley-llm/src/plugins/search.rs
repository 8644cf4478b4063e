use serde_json::Value;

use crate::types::{ParameterKind, PluginParameter};

const SEARCH_API_URL: &str = "https://api.tavily.com/search";

/// Web search backed by the Tavily HTTP API.
#[derive(Clone)]
pub struct SearchPlugin {
    api_key: String,
    http_client: reqwest::Client,
}

impl SearchPlugin {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn parameters(&self) -> Vec<PluginParameter> {
        vec![PluginParameter::required(
            "query",
            ParameterKind::String,
            "The query to search for",
        )]
    }

    pub async fn execute(&self, params: Value) -> Value {
        let query = match params.get("query").and_then(Value::as_str) {
            Some(query) => query,
            None => return serde_json::json!({ "error": "query parameter is required" }),
        };

        let payload = serde_json::json!({
            "api_key": self.api_key,
            "query": query,
            "include_answer": true,
        });

        match self.search(&payload).await {
            Ok(response) => response,
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        }
    }

    async fn search(&self, payload: &Value) -> anyhow::Result<Value> {
        let response = self
            .http_client
            .post(SEARCH_API_URL)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("search API error ({}): {}", status, body);
        }

        Ok(response.json().await?)
    }
}
