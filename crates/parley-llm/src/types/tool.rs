use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A completed tool invocation attributed to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub params: Value,
    pub result: Value,
}

/// Parameter declared by a tool plugin. Rendered as JSON Schema when the
/// plugin set is sent to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "enum")]
    pub enum_values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Number,
    Boolean,
}

impl PluginParameter {
    pub fn required(name: &str, kind: ParameterKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required: true,
            enum_values: Vec::new(),
        }
    }

    pub fn optional(name: &str, kind: ParameterKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = values.iter().map(|v| v.to_string()).collect();
        self
    }
}

/// Build the OpenAI-style function declaration for a tool.
pub fn function_schema(name: &str, description: &str, parameters: &[PluginParameter]) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for param in parameters {
        let mut spec = serde_json::Map::new();
        spec.insert(
            "type".to_string(),
            serde_json::to_value(param.kind).unwrap_or(Value::Null),
        );
        spec.insert(
            "description".to_string(),
            Value::String(param.description.clone()),
        );
        if !param.enum_values.is_empty() {
            spec.insert(
                "enum".to_string(),
                Value::Array(
                    param
                        .enum_values
                        .iter()
                        .map(|v| Value::String(v.clone()))
                        .collect(),
                ),
            );
        }
        properties.insert(param.name.clone(), Value::Object(spec));
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }

    serde_json::json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            },
        },
    })
}
