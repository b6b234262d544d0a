//! Natural-language requests turned into chains of MCP tool calls.
//!
//! A model plans which tools to call ([`planner`]), the plan is checked
//! against the live tool catalog ([`plan`]), and the steps run one after
//! another with earlier outputs substituted into later arguments
//! ([`resolver`], [`executor`]). [`session`] wraps this in an interactive loop.

pub mod api_key;
pub mod app;
pub mod artifacts;
pub mod catalog;
pub mod cli;
pub mod constants;
pub mod executor;
pub mod gemini;
pub mod logging;
pub mod mcp_client;
pub mod ollama;
pub mod openai;
pub mod pipeline;
pub mod plan;
pub mod planner;
pub mod provider;
pub mod resolver;
pub mod session;
