//! Shared doubles and helpers for chainer integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tempfile::TempDir;

use chainer::catalog::{ToolCallResult, ToolCatalog, ToolDescriptor};
use chainer::provider::{AiProvider, AiResponse, PromptMessage, TokenUsage};

/// Test configuration for binary-level tests
pub struct TestConfig {
    pub temp_dir: TempDir,
}

impl TestConfig {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Command for the freshly built binary with every configuration variable cleared
    pub fn chainer_command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_chainer"));
        command.current_dir(self.temp_path());
        for name in [
            "DASHSCOPE_API_KEY",
            "OPENAI_API_KEY",
            "GEMINI_API_KEY",
            "CHAINER_MODEL",
            "MODEL",
            "BASE_URL",
            "CHAINER_OUTPUT_DIR",
            "CHAINER_LOG_TO_FILE",
            "RUST_LOG",
        ] {
            command.env_remove(name);
        }
        command
    }
}

/// Provider that replays canned replies and records every request
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<Vec<PromptMessage>>>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Arc::new(Mutex::new(
                replies.into_iter().map(|reply| Ok(reply.into())).collect(),
            )),
            requests: Arc::default(),
        }
    }

    /// Queue a transport failure for the next request
    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<Vec<PromptMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<AiResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("[]".to_string()));

        match reply {
            Ok(content) => Ok(AiResponse {
                content,
                usage: TokenUsage::default(),
            }),
            Err(message) => Err(anyhow::anyhow!(message)),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn provider_name(&self) -> &str {
        "Scripted"
    }
}

/// Catalog that answers from fixed per-tool outputs and records calls
#[derive(Debug, Default)]
pub struct RecordingCatalog {
    pub tools: Vec<ToolDescriptor>,
    pub outputs: HashMap<String, VecDeque<String>>,
    pub failing: Vec<String>,
    pub calls: Vec<(String, Map<String, Value>)>,
    pub list_calls: usize,
}

impl RecordingCatalog {
    pub fn with_tools(names: &[&str]) -> Self {
        Self {
            tools: names.iter().map(|name| descriptor(name)).collect(),
            ..Default::default()
        }
    }

    /// Queue an output for the next call of `tool`
    pub fn reply(mut self, tool: &str, output: &str) -> Self {
        self.outputs
            .entry(tool.to_string())
            .or_default()
            .push_back(output.to_string());
        self
    }

    /// Make every call of `tool` fail
    pub fn failing(mut self, tool: &str) -> Self {
        self.failing.push(tool.to_string());
        self
    }

    pub fn called_tools(&self) -> Vec<&str> {
        self.calls.iter().map(|(name, _)| name.as_str()).collect()
    }
}

#[async_trait]
impl ToolCatalog for RecordingCatalog {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
        self.list_calls += 1;
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolCallResult> {
        self.calls.push((name.to_string(), arguments));

        if self.failing.iter().any(|tool| tool == name) {
            anyhow::bail!("tool '{name}' is unavailable");
        }
        if !self.tools.iter().any(|tool| tool.name == name) {
            anyhow::bail!("Unknown tool: {name}");
        }

        let output = self
            .outputs
            .get_mut(name)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| format!("{name} done"));
        Ok(ToolCallResult::text(output))
    }
}

pub fn descriptor(name: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: format!("{name} tool"),
        input_schema: json!({"type": "object", "properties": {}}),
    }
}

pub fn output_dir() -> PathBuf {
    PathBuf::from("./search_results")
}
