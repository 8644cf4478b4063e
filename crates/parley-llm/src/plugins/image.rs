use async_trait::async_trait;
use base64::Engine as _;
use serde_json::Value;
use std::sync::Arc;

use crate::types::{ParameterKind, PluginParameter};

/// Object storage collaborator for generated media. Returns a path the
/// caller can resolve against the server's base URL.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn save(&self, extension: &str, bytes: Vec<u8>) -> anyhow::Result<String>;
}

/// Image generation through an OpenAI-style images endpoint. Attached to a
/// session only when the caller is entitled and an image model is configured.
#[derive(Clone)]
pub struct ImagePlugin {
    base_url: String,
    provider_url: String,
    api_key: String,
    model: String,
    media: Arc<dyn MediaStore>,
    http_client: reqwest::Client,
}

impl ImagePlugin {
    pub fn new(
        base_url: impl Into<String>,
        provider_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            provider_url: provider_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            media,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn parameters(&self) -> Vec<PluginParameter> {
        let mut parameters = vec![PluginParameter::required(
            "prompt",
            ParameterKind::String,
            "The description of the image",
        )];

        if self.model == "dall-e-2" {
            parameters.push(
                PluginParameter::optional("size", ParameterKind::String, "The size of the image")
                    .with_enum(&["256x256", "512x512", "1024x1024"]),
            );
        } else if self.model == "dall-e-3" {
            parameters.push(
                PluginParameter::optional(
                    "quality",
                    ParameterKind::String,
                    "The quality of the image",
                )
                .with_enum(&["standard", "hd"]),
            );
            parameters.push(
                PluginParameter::optional("size", ParameterKind::String, "The size of the image")
                    .with_enum(&["1024x1024", "1792x1024", "1024x1792"]),
            );
            parameters.push(
                PluginParameter::optional("style", ParameterKind::String, "The style of the image")
                    .with_enum(&["vivid", "natural"]),
            );
        }

        parameters
    }

    pub async fn execute(&self, params: Value) -> Value {
        let prompt = match params.get("prompt").and_then(Value::as_str) {
            Some(prompt) => prompt.to_string(),
            None => return serde_json::json!({ "error": "prompt parameter is required" }),
        };

        match self.generate(&prompt, &params).await {
            Ok(path) => serde_json::json!({
                "path": format!("{}{}", self.base_url, path),
                "description": prompt,
            }),
            Err(e) => {
                tracing::warn!("image generation failed: {}", e);
                serde_json::json!({ "error": e.to_string() })
            }
        }
    }

    async fn generate(&self, prompt: &str, params: &Value) -> anyhow::Result<String> {
        let mut payload = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "response_format": "b64_json",
            "n": 1,
        });
        let obj = payload.as_object_mut().expect("payload is an object");
        for key in ["size", "quality", "style"] {
            if let Some(value) = params.get(key) {
                obj.insert(key.to_string(), value.clone());
            }
        }

        let response = self
            .http_client
            .post(format!("{}/images/generations", self.provider_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("image API error ({}): {}", status, body);
        }

        let body: Value = response.json().await?;
        let b64 = body["data"][0]["b64_json"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("image API returned no b64_json payload"))?;

        let bytes = base64::engine::general_purpose::STANDARD.decode(b64)?;
        self.media.save("png", bytes).await
    }
}
