//! Boundary to whatever hosts the tools.
//!
//! The orchestration core only ever needs two things from a tool host: the
//! current list of tools and a way to invoke one of them by name. Everything
//! behind [`ToolCatalog`] (process management, wire protocol, the tools'
//! own logic) is the host's business.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata about a tool, as advertised by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within one catalog snapshot
    pub name: String,
    /// Human-readable description for the model
    #[serde(default)]
    pub description: String,
    /// JSON schema for input parameters
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// One content item of a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    #[serde(other)]
    Other,
}

/// Result of a single tool invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Convenience constructor for a single text item
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Text of the first textual content item; any further items are ignored
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|item| match item {
            ToolContent::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A source of callable tools
#[async_trait]
pub trait ToolCatalog: Send {
    /// Snapshot of the tools available right now
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke a tool by name. Unknown names and host-side failures are errors.
    async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>)
    -> Result<ToolCallResult>;
}
