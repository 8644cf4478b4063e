use serde_json::Value;

use crate::types::{ParameterKind, PluginParameter};

/// Python execution. Disabled until a sandboxed interpreter is available;
/// kept in the capability set so clients see a stable tool catalog.
#[derive(Clone, Default)]
pub struct PythonPlugin;

impl PythonPlugin {
    pub fn new() -> Self {
        Self
    }

    pub fn parameters(&self) -> Vec<PluginParameter> {
        vec![PluginParameter::required(
            "script",
            ParameterKind::String,
            "The script to run",
        )]
    }

    pub async fn execute(&self, _params: Value) -> Value {
        serde_json::json!({ "error": "Python plugin is disabled" })
    }
}
