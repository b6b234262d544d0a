use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::artifacts::SessionArtifacts;
use crate::logging::{log_debug, log_info};

/// Most recent text output of each tool within one query.
/// A second call of the same tool replaces the first entry.
pub type ToolOutputs = HashMap<String, String>;

/// Computes a default argument value from the query's artifacts
pub type DefaultProvider = fn(&SessionArtifacts) -> Value;

/// One entry of the default-argument table
#[derive(Debug, Clone)]
pub struct DefaultRule {
    pub tool_name: String,
    pub argument: String,
    pub provider: DefaultProvider,
}

/// Table of arguments injected when a plan leaves them out
#[derive(Debug, Clone)]
pub struct DefaultArgumentPolicy {
    rules: Vec<DefaultRule>,
}

impl DefaultArgumentPolicy {
    /// Policy with no rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule; later rules for the same tool/argument never override earlier ones
    pub fn with_rule(
        mut self,
        tool_name: impl Into<String>,
        argument: impl Into<String>,
        provider: DefaultProvider,
    ) -> Self {
        self.rules.push(DefaultRule {
            tool_name: tool_name.into(),
            argument: argument.into(),
            provider,
        });
        self
    }

    pub fn rules(&self) -> &[DefaultRule] {
        &self.rules
    }

    /// Fill in absent arguments for `tool_name`
    pub fn apply(
        &self,
        tool_name: &str,
        arguments: &mut Map<String, Value>,
        artifacts: &SessionArtifacts,
    ) {
        for rule in self.rules.iter().filter(|rule| rule.tool_name == tool_name) {
            if !arguments.contains_key(&rule.argument) {
                let value = (rule.provider)(artifacts);
                log_debug(&format!(
                    "Injecting default {}.{} = {}",
                    tool_name, rule.argument, value
                ));
                arguments.insert(rule.argument.clone(), value);
            }
        }
    }
}

/// The sentiment tool writes its report under the query's filename and the
/// mail tool attaches that report unless told otherwise.
impl Default for DefaultArgumentPolicy {
    fn default() -> Self {
        Self::empty()
            .with_rule("analyze_sentiment", "filename", |artifacts| {
                Value::String(artifacts.filename.clone())
            })
            .with_rule("send_email_with_attachment", "attachment_path", |artifacts| {
                Value::String(artifacts.path_display())
            })
    }
}

/// Tool name referenced by a `{{tool_name}}` placeholder, if `value` is one
pub fn placeholder_target(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.len() >= 4 && trimmed.starts_with("{{") && trimmed.ends_with("}}") {
        Some(trimmed.trim_matches(|c: char| c == '{' || c == '}' || c.is_whitespace()))
    } else {
        None
    }
}

/// Substitute placeholders with stored outputs. Placeholders naming a tool
/// that has not produced output yet are left as literal text.
pub fn resolve_placeholders(arguments: &mut Map<String, Value>, outputs: &ToolOutputs) {
    for (key, value) in arguments.iter_mut() {
        let Value::String(text) = value else {
            continue;
        };
        let Some(target) = placeholder_target(text) else {
            continue;
        };

        match outputs.get(target) {
            Some(output) => {
                log_info(&format!(
                    "Resolved argument '{}' from output of '{}' ({} characters)",
                    key,
                    target,
                    output.len()
                ));
                *value = Value::String(output.clone());
            }
            None => {
                log_debug(&format!(
                    "No output for '{}' yet, passing argument '{}' through unchanged",
                    target, key
                ));
            }
        }
    }
}

/// Produce the final arguments for one step
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    policy: DefaultArgumentPolicy,
}

impl ReferenceResolver {
    pub fn new(policy: DefaultArgumentPolicy) -> Self {
        Self { policy }
    }

    pub fn resolve(
        &self,
        tool_name: &str,
        raw_arguments: &Map<String, Value>,
        outputs: &ToolOutputs,
        artifacts: &SessionArtifacts,
    ) -> Map<String, Value> {
        let mut arguments = raw_arguments.clone();
        resolve_placeholders(&mut arguments, outputs);
        self.policy.apply(tool_name, &mut arguments, artifacts);
        arguments
    }
}
