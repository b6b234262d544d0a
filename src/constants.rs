/// Default model constants
pub const DEFAULT_MODEL: &str = "qwen-plus";
pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Environment variables consulted when building the configuration
pub const MODEL_ENV_VARS: &[&str] = &["CHAINER_MODEL", "MODEL"];
pub const BASE_URL_ENV: &str = "BASE_URL";
pub const API_KEY_ENV_VARS: &[&str] = &["DASHSCOPE_API_KEY", "OPENAI_API_KEY"];
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const OUTPUT_DIR_ENV: &str = "CHAINER_OUTPUT_DIR";
pub const LOG_TO_FILE_ENV: &str = "CHAINER_LOG_TO_FILE";

/// Session constants
pub const DEFAULT_SERVER_SCRIPT: &str = "./server.py";
pub const DEFAULT_OUTPUT_DIR: &str = "./search_results";
pub const QUIT_SENTINEL: &str = "quit";
pub const LOG_DIR_NAME: &str = ".chainer";

/// Seconds to wait for a single MCP request before giving up
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;

/// MCP protocol revision announced during `initialize`
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Get default model from environment variables or default
pub fn get_default_model() -> String {
    MODEL_ENV_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}
