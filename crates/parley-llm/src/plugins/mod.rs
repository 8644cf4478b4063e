mod image;
mod python;
mod search;

pub use image::{ImagePlugin, MediaStore};
pub use python::PythonPlugin;
pub use search::SearchPlugin;

use serde_json::Value;

use crate::types::{function_schema, PluginParameter};

/// The closed set of tool capabilities a session can carry.
///
/// Each variant declares its own parameter schema and an `execute` that never
/// fails: tool failures come back as structured `{"error": ...}` values so a
/// broken tool surfaces as a tool result instead of aborting the stream.
#[derive(Clone)]
pub enum ToolPlugin {
    Search(SearchPlugin),
    Python(PythonPlugin),
    Image(ImagePlugin),
}

impl ToolPlugin {
    pub fn enabled(&self) -> bool {
        match self {
            Self::Search(_) => true,
            Self::Python(_) => false,
            Self::Image(_) => true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Search(_) => "search_web",
            Self::Python(_) => "run_python_code",
            Self::Image(_) => "generate_image",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Search(_) => {
                "This tool allows you to search the web for information on a given topic"
            }
            Self::Python(_) => "Execute Python code and return the result",
            Self::Image(_) => {
                "Generate an image based on a prompt. Returns the path of the image saved \
                 on disk and a description of the image. Always embed the image visible in \
                 the final response. Do not just include a link to the image."
            }
        }
    }

    pub fn preparation_description(&self) -> String {
        self.running_description()
    }

    pub fn running_description(&self) -> String {
        match self {
            Self::Search(_) => "Searching the internet…".to_string(),
            Self::Python(_) => "Executing code…".to_string(),
            Self::Image(_) => "Painting pixels…".to_string(),
        }
    }

    pub fn parameters(&self) -> Vec<PluginParameter> {
        match self {
            Self::Search(p) => p.parameters(),
            Self::Python(p) => p.parameters(),
            Self::Image(p) => p.parameters(),
        }
    }

    pub async fn execute(&self, params: Value) -> Value {
        match self {
            Self::Search(p) => p.execute(params).await,
            Self::Python(p) => p.execute(params).await,
            Self::Image(p) => p.execute(params).await,
        }
    }

    /// OpenAI-style function declaration for this plugin.
    pub fn schema(&self) -> Value {
        function_schema(self.name(), self.description(), &self.parameters())
    }
}
