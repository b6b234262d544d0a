use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::catalog::ToolCatalog;
use crate::constants::QUIT_SENTINEL;
use crate::logging::{log_error, log_info};
use crate::pipeline::Pipeline;

/// Interactive read-eval loop: one query at a time until `quit` or end of input
pub struct SessionLoop<C: ToolCatalog> {
    pipeline: Pipeline<C>,
    show_plan: bool,
}

impl<C: ToolCatalog> SessionLoop<C> {
    pub fn new(pipeline: Pipeline<C>, show_plan: bool) -> Self {
        Self {
            pipeline,
            show_plan,
        }
    }

    pub fn pipeline(&self) -> &Pipeline<C> {
        &self.pipeline
    }

    pub fn into_pipeline(self) -> Pipeline<C> {
        self.pipeline
    }

    /// Drive the session. Errors from individual queries are reported to
    /// `output` and never end the loop; only I/O failures on the session
    /// streams themselves are returned.
    pub async fn run<R, W>(&mut self, mut input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(output, "\n🤖 MCP client started! Type '{QUIT_SENTINEL}' to exit")?;

        let mut processed = 0usize;
        loop {
            write!(output, "\nInput: ")?;
            output.flush()?;

            // Read raw bytes so a badly encoded line fails only that query
            let mut raw = Vec::new();
            let read = input
                .read_until(b'\n', &mut raw)
                .await
                .context("Failed to read query")?;
            if read == 0 {
                log_info("End of input, leaving session");
                break;
            }

            let line = match String::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    log_error(&format!("Rejected query input: {e}"));
                    writeln!(output, "\n⚠️ Error: input is not valid UTF-8: {e}")?;
                    continue;
                }
            };

            let query = line.trim();
            if query.eq_ignore_ascii_case(QUIT_SENTINEL) {
                log_info("Quit requested");
                break;
            }

            match self.handle_query(query, output).await {
                Ok(summary) => writeln!(output, "\n🤖 AI: {summary}")?,
                Err(e) => {
                    log_error(&format!("Query failed: {e:#}"));
                    writeln!(output, "\n⚠️ Error: {e:#}")?;
                }
            }
            processed += 1;
        }

        log_info(&format!("Session ended, {processed} queries processed"));
        Ok(())
    }

    async fn handle_query<W: Write>(&mut self, query: &str, output: &mut W) -> Result<String> {
        let prepared = self.pipeline.prepare(query).await?;

        if self.show_plan {
            writeln!(
                output,
                "\n📋 Plan:\n{}",
                serde_json::to_string_pretty(&prepared.plan)?
            )?;
        }

        let execution = self.pipeline.run(&prepared).await?;
        Ok(execution.summary)
    }
}
