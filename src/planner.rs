use anyhow::{Context, Result};

use crate::catalog::ToolDescriptor;
use crate::logging::{log_debug, log_info};
use crate::plan::Plan;
use crate::provider::{AiProvider, PromptMessage};

/// Turns a natural-language query into a [`Plan`] with one model call
#[derive(Debug)]
pub struct PlanGenerator {
    provider: Box<dyn AiProvider>,
}

impl PlanGenerator {
    pub fn new(provider: Box<dyn AiProvider>) -> Self {
        Self { provider }
    }

    /// Ask the model for a plan over the given catalog snapshot.
    ///
    /// Transport failures are errors; an unparseable reply is an empty plan.
    pub async fn generate_plan(&self, query: &str, catalog: &[ToolDescriptor]) -> Result<Plan> {
        log_debug(&format!(
            "Tool definitions submitted to the model:\n{}",
            serde_json::to_string_pretty(catalog).unwrap_or_default()
        ));

        let messages = [
            PromptMessage::system(build_system_prompt(catalog)),
            PromptMessage::user(query),
        ];

        log_info(&format!(
            "Requesting tool plan from {} model {} ({} tools available)",
            self.provider.provider_name(),
            self.provider.model_name(),
            catalog.len()
        ));

        let response = self
            .provider
            .generate(&messages)
            .await
            .context("Failed to generate tool plan")?;
        log_debug(&format!("Token usage: {}", response.usage.describe()));

        let plan = Plan::from_model_output(&response.content);
        log_info(&format!("Planned {} step(s)", plan.len()));

        Ok(plan)
    }
}

/// Instruction describing the tools and the expected reply format
pub fn build_system_prompt(catalog: &[ToolDescriptor]) -> String {
    let tool_list = catalog
        .iter()
        .map(|tool| format!("- {}: {}", tool.name, tool.description.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a task planning assistant. The user gives a request in natural language.\n\
         You may only choose from the following tools (use the tool names exactly):\n\
         {tool_list}\n\
         If several tools have to be chained, a later step can use the output of an earlier \
         tool by passing {{{{tool_name}}}} as an argument value.\n\
         Reply format: a JSON array where each object has a \"name\" field and an \
         \"arguments\" field.\n\
         Do not reply with natural language and do not use tool names that are not listed."
    )
}
