//! Typed tool plans and the parser that turns raw model output into one.
//!
//! The model reply is untrusted input. It is only ever used to build a
//! [`Plan`] value; anything that does not deserialize into one yields an
//! empty plan, and [`Plan::validate`] checks tool names against a catalog
//! snapshot before a single step runs.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use crate::catalog::ToolDescriptor;
use crate::logging::{log_debug, log_warn};

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*([\s\S]+?)\s*```").expect("fence pattern is valid")
});

/// One tool invocation of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Tool to invoke
    #[serde(rename = "name")]
    pub tool_name: String,
    /// Raw arguments; string values may be `{{tool_name}}` placeholders
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl PlanStep {
    pub fn new(tool_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Ordered tool invocations; list order is execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check every step against the catalog snapshot the plan was made from
    pub fn validate(&self, catalog: &[ToolDescriptor]) -> Result<(), PlanError> {
        let known: HashSet<&str> = catalog.iter().map(|tool| tool.name.as_str()).collect();

        for (index, step) in self.steps.iter().enumerate() {
            if !known.contains(step.tool_name.as_str()) {
                return Err(PlanError::UnknownTool {
                    step: index + 1,
                    tool_name: step.tool_name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Parse a model reply into a plan.
    ///
    /// Never fails: malformed output degrades to an empty plan and a warning
    /// carrying the parse error and the raw reply.
    pub fn from_model_output(raw: &str) -> Self {
        let payload = extract_json_payload(raw);
        log_debug(&format!("Plan payload: {}", payload));

        match serde_json::from_str::<Value>(payload) {
            Ok(value @ Value::Array(_)) => match serde_json::from_value::<Vec<PlanStep>>(value) {
                Ok(steps) => Self { steps },
                Err(e) => {
                    log_warn(&format!(
                        "Tool plan generation failed: {e}\nRaw reply: {raw}"
                    ));
                    Self::default()
                }
            },
            Ok(_) => {
                log_warn(&format!(
                    "Tool plan generation failed: reply is not a JSON array\nRaw reply: {raw}"
                ));
                Self::default()
            }
            Err(e) => {
                log_warn(&format!(
                    "Tool plan generation failed: {e}\nRaw reply: {raw}"
                ));
                Self::default()
            }
        }
    }
}

/// Strip an optional Markdown code fence around the JSON payload
pub fn extract_json_payload(raw: &str) -> &str {
    let trimmed = raw.trim();
    match FENCED_BLOCK.captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => trimmed,
    }
}

/// Plan rejected before execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A step names a tool the catalog does not offer
    UnknownTool { step: usize, tool_name: String },
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::UnknownTool { step, tool_name } => write!(
                f,
                "Plan step {} uses unknown tool '{}'",
                step, tool_name
            ),
        }
    }
}

impl std::error::Error for PlanError {}
