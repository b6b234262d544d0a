//! MCP (Model Context Protocol) Client Module
//!
//! Launches an MCP tool server as a subprocess and talks JSON-RPC 2.0 to it
//! over the child's stdin/stdout, one JSON message per line.
//!
//! # Architecture
//!
//! - `initialize` handshake followed by the `notifications/initialized` notification
//! - `tools/list` for discovery (fresh on every call, the server may change its tools)
//! - `tools/call` for execution
//! - every request is bounded by `McpConfig::request_timeout`
//!
//! # Example Usage
//!
//! ```no_run
//! use chainer::mcp_client::{McpClient, McpConfig, McpError};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), McpError> {
//!     let config = McpConfig::for_script(Path::new("./server.py"), Duration::from_secs(120))?;
//!     let mut client = McpClient::connect(config).await?;
//!     let tools = client.list_tools().await?;
//!     println!("Available tools: {:?}", tools);
//!     client.disconnect().await
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::{Duration, timeout};

use crate::catalog::{ToolCallResult, ToolCatalog, ToolDescriptor};
use crate::constants::MCP_PROTOCOL_VERSION;
use crate::logging::{log_debug, log_error, log_info, log_trace, log_warn};

/// Configuration for launching an MCP server
#[derive(Debug, Clone)]
pub struct McpConfig {
    /// Server name used in logs (the script's file name)
    pub server_name: String,
    /// Command to execute
    pub command: String,
    /// Additional arguments for the command
    pub args: Vec<String>,
    /// Upper bound for a single request/response exchange
    pub request_timeout: Duration,
}

impl McpConfig {
    /// Derive the launch command from the script extension:
    /// `.py` runs with `python`, `.js` with `node`, anything else is rejected
    pub fn for_script(script: &Path, request_timeout: Duration) -> Result<Self, McpError> {
        let command = match script.extension().and_then(|ext| ext.to_str()) {
            Some("py") => "python",
            Some("js") => "node",
            _ => {
                return Err(McpError::InvalidConfig(format!(
                    "server script must be a .py or .js file: {}",
                    script.display()
                )));
            }
        };

        let server_name = script
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "server".to_string());

        Ok(Self {
            server_name,
            command: command.to_string(),
            args: vec![script.to_string_lossy().into_owned()],
            request_timeout,
        })
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ListToolsResult {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
    #[serde(rename = "nextCursor", default)]
    next_cursor: Option<String>,
}

type Reader = Box<dyn AsyncBufRead + Unpin + Send>;
type Writer = Box<dyn AsyncWrite + Unpin + Send>;

/// MCP Client for one server connection
pub struct McpClient {
    config: McpConfig,
    reader: Reader,
    writer: Writer,
    /// Child process, absent when running over a caller-supplied transport
    process: Option<Child>,
    /// Bytes of the incoming line read so far; survives a timed-out request
    pending_line: Vec<u8>,
    next_id: u64,
    connected: bool,
}

impl McpClient {
    /// Spawn the server process and perform the `initialize` handshake
    pub async fn connect(config: McpConfig) -> Result<Self, McpError> {
        log_info(&format!(
            "Connecting to MCP server '{}' via stdio: {} {:?}",
            config.server_name, config.command, config.args
        ));

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit()) // Inherit stderr to see server logs
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                log_error(&format!(
                    "Failed to spawn MCP server '{}': {}",
                    config.server_name, e
                ));
                McpError::ConnectionFailed(format!("Failed to spawn process: {}", e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::ConnectionFailed("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::ConnectionFailed("child stdout unavailable".to_string()))?;

        let mut client = Self::with_transport(config, BufReader::new(stdout), stdin);
        client.process = Some(child);
        client.initialize().await?;
        Ok(client)
    }

    /// Build a client over an already-established transport. The handshake is
    /// not performed; call [`McpClient::initialize`] when the peer expects it.
    pub fn with_transport(
        config: McpConfig,
        reader: impl AsyncBufRead + Unpin + Send + 'static,
        writer: impl AsyncWrite + Unpin + Send + 'static,
    ) -> Self {
        Self {
            config,
            reader: Box::new(reader),
            writer: Box::new(writer),
            process: None,
            pending_line: Vec::new(),
            next_id: 1,
            connected: true,
        }
    }

    /// Run the MCP handshake
    pub async fn initialize(&mut self) -> Result<(), McpError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "chainer",
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;

        let server_info = result
            .get("serverInfo")
            .and_then(|info| info.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        log_info(&format!(
            "Connected to MCP server '{}' (reports itself as '{}')",
            self.config.server_name, server_info
        ));

        self.notify("notifications/initialized", json!({})).await
    }

    /// Disconnect from the MCP server
    pub async fn disconnect(&mut self) -> Result<(), McpError> {
        if !self.connected {
            return Ok(());
        }

        log_info(&format!(
            "Disconnecting from MCP server '{}'",
            self.config.server_name
        ));
        self.connected = false;

        // Kill the child process if it exists
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill().await {
                return Err(McpError::Other(format!("Failed to kill process: {}", e)));
            }

            match timeout(Duration::from_secs(5), process.wait()).await {
                Ok(Ok(_)) => {
                    log_info(&format!(
                        "MCP server '{}' process terminated",
                        self.config.server_name
                    ));
                }
                Ok(Err(e)) => {
                    return Err(McpError::Other(format!("Failed to wait for process: {}", e)));
                }
                Err(_) => return Err(McpError::Timeout),
            }
        }

        Ok(())
    }

    /// List all tools the server currently offers, following pagination cursors
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, McpError> {
        log_debug(&format!(
            "Discovering tools from MCP server '{}'",
            self.config.server_name
        ));

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| McpError::Protocol(format!("invalid tools/list result: {e}")))?;

            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        log_info(&format!(
            "Discovered {} tools from server '{}'",
            tools.len(),
            self.config.server_name
        ));

        Ok(tools)
    }

    /// Execute a tool call with the given arguments
    pub async fn call_tool(
        &mut self,
        tool_name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolCallResult, McpError> {
        log_info(&format!(
            "Executing tool '{}' on server '{}'",
            tool_name, self.config.server_name
        ));
        log_debug(&format!("Tool arguments: {}", Value::Object(arguments.clone())));

        let result = self
            .request(
                "tools/call",
                json!({ "name": tool_name, "arguments": arguments }),
            )
            .await?;

        let result: ToolCallResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("invalid tools/call result: {e}")))?;

        log_info(&format!(
            "Tool '{}' execution completed: is_error={}",
            tool_name, result.is_error
        ));

        Ok(result)
    }

    /// Check if the client is connected
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value, McpError> {
        if !self.connected {
            return Err(McpError::NotConnected);
        }

        let id = self.next_id;
        self.next_id += 1;

        let request_timeout = self.config.request_timeout;
        match timeout(request_timeout, self.exchange(id, method, params)).await {
            Ok(result) => result,
            Err(_) => {
                log_error(&format!(
                    "MCP request '{}' timed out after {:?}",
                    method, request_timeout
                ));
                Err(McpError::Timeout)
            }
        }
    }

    async fn exchange(&mut self, id: u64, method: &str, params: Value) -> Result<Value, McpError> {
        self.send(&JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        })
        .await?;

        loop {
            let message = self.read_message().await?;

            let is_response = message.method.is_none()
                && message.id.as_ref().and_then(Value::as_u64) == Some(id);
            if !is_response {
                // Server-initiated notifications and requests
                log_debug(&format!(
                    "Skipping MCP message while waiting for id {}: method={:?}",
                    id, message.method
                ));
                continue;
            }

            if let Some(error) = message.error {
                log_warn(&format!(
                    "MCP request '{}' failed: {} ({})",
                    method, error.message, error.code
                ));
                return Err(McpError::Rpc {
                    code: error.code,
                    message: error.message,
                });
            }

            return Ok(message.result.unwrap_or(Value::Null));
        }
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<(), McpError> {
        self.send(&JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params,
        })
        .await
    }

    async fn send(&mut self, request: &JsonRpcRequest<'_>) -> Result<(), McpError> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| McpError::Protocol(format!("failed to encode request: {e}")))?;
        log_trace(&format!("MCP -> {}", line));
        line.push('\n');

        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::ConnectionFailed(format!("write failed: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| McpError::ConnectionFailed(format!("flush failed: {e}")))
    }

    async fn read_message(&mut self) -> Result<JsonRpcMessage, McpError> {
        loop {
            // read_until keeps partial data in the buffer if the future is dropped
            let read = self
                .reader
                .read_until(b'\n', &mut self.pending_line)
                .await
                .map_err(|e| McpError::ConnectionFailed(format!("read failed: {e}")))?;

            if read == 0 {
                self.connected = false;
                return Err(McpError::ConnectionFailed(
                    "server closed the connection".to_string(),
                ));
            }

            let raw = std::mem::take(&mut self.pending_line);
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            log_trace(&format!("MCP <- {}", line));

            return serde_json::from_str(line)
                .map_err(|e| McpError::Protocol(format!("invalid JSON-RPC message: {e}")));
        }
    }
}

#[async_trait]
impl ToolCatalog for McpClient {
    async fn list_tools(&mut self) -> anyhow::Result<Vec<ToolDescriptor>> {
        Ok(McpClient::list_tools(self).await?)
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> anyhow::Result<ToolCallResult> {
        Ok(McpClient::call_tool(self, name, arguments).await?)
    }
}

/// Error types for MCP client operations
#[derive(Debug)]
pub enum McpError {
    /// Failed to connect to MCP server or the connection broke
    ConnectionFailed(String),
    /// Client is not connected
    NotConnected,
    /// Invalid configuration
    InvalidConfig(String),
    /// The server sent something that is not valid MCP
    Protocol(String),
    /// The server answered with a JSON-RPC error
    Rpc { code: i64, message: String },
    /// Timeout during operation
    Timeout,
    /// Other errors
    Other(String),
}

impl fmt::Display for McpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            McpError::ConnectionFailed(msg) => {
                write!(f, "Failed to connect to MCP server: {}", msg)
            }
            McpError::NotConnected => write!(f, "Not connected to MCP server"),
            McpError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            McpError::Protocol(msg) => write!(f, "MCP protocol error: {}", msg),
            McpError::Rpc { code, message } => write!(f, "MCP server error {}: {}", code, message),
            McpError::Timeout => write!(f, "Operation timed out"),
            McpError::Other(msg) => write!(f, "MCP error: {}", msg),
        }
    }
}

impl std::error::Error for McpError {}
