use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::artifacts::SessionArtifacts;
use crate::catalog::ToolCatalog;
use crate::logging::{log_debug, log_info, log_warn};
use crate::plan::Plan;
use crate::resolver::{ReferenceResolver, ToolOutputs};

/// Audit record of one executed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: String,
    pub tool_call_id: String,
    pub content: String,
}

impl TranscriptEntry {
    pub fn tool(tool_name: &str, content: &str) -> Self {
        Self {
            role: "tool".to_string(),
            tool_call_id: tool_name.to_string(),
            content: content.to_string(),
        }
    }
}

/// Everything one plan run produced
#[derive(Debug, Clone, Default)]
pub struct Execution {
    pub outputs: ToolOutputs,
    pub transcript: Vec<TranscriptEntry>,
    pub summary: String,
}

/// Runs plan steps one after another against a tool catalog
#[derive(Debug, Clone, Default)]
pub struct SequentialExecutor {
    resolver: ReferenceResolver,
}

impl SequentialExecutor {
    pub fn new(resolver: ReferenceResolver) -> Self {
        Self { resolver }
    }

    /// Execute every step in order.
    ///
    /// Each step sees the outputs of all earlier steps. The first failing
    /// tool call aborts the run and its error is returned as is.
    pub async fn execute(
        &self,
        plan: &Plan,
        catalog: &mut dyn ToolCatalog,
        artifacts: &SessionArtifacts,
    ) -> Result<Execution> {
        log_info(&format!("Executing plan with {} step(s)", plan.len()));

        let mut execution = Execution::default();

        for (index, step) in plan.steps.iter().enumerate() {
            let arguments = self.resolver.resolve(
                &step.tool_name,
                &step.arguments,
                &execution.outputs,
                artifacts,
            );

            log_info(&format!(
                "[{}/{}] Calling tool '{}'",
                index + 1,
                plan.len(),
                step.tool_name
            ));
            log_debug(&format!("Resolved arguments: {:?}", arguments));

            let result = catalog
                .call_tool(&step.tool_name, arguments)
                .await
                .with_context(|| format!("Tool '{}' failed", step.tool_name))?;

            if result.is_error {
                log_warn(&format!("Tool '{}' reported an error", step.tool_name));
            }

            let output = result.first_text().unwrap_or_default().to_string();
            log_info(&format!(
                "Tool '{}' returned {} characters",
                step.tool_name,
                output.len()
            ));

            execution
                .transcript
                .push(TranscriptEntry::tool(&step.tool_name, &output));
            execution.outputs.insert(step.tool_name.clone(), output);
        }

        execution.summary = format!("Report saved to: {}", artifacts.path_display());
        Ok(execution)
    }
}
