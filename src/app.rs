use anyhow::{Context, Result};
use tokio::io::BufReader;

use crate::cli::Config;
use crate::executor::SequentialExecutor;
use crate::logging::{log_error, log_info};
use crate::mcp_client::{McpClient, McpConfig};
use crate::pipeline::Pipeline;
use crate::planner::PlanGenerator;
use crate::provider::{ProviderConfig, ProviderFactory};
use crate::resolver::ReferenceResolver;
use crate::session::SessionLoop;

pub async fn run_app(config: &Config) -> Result<()> {
    // Configuration errors abort before anything is spawned
    let provider_config =
        ProviderConfig::from_config(config).context("Failed to load model configuration")?;
    let provider = ProviderFactory::create_provider(provider_config)
        .context("Failed to initialize AI provider")?;

    let mcp_config = McpConfig::for_script(&config.server_script, config.tool_timeout)?;
    let mut client = McpClient::connect(mcp_config)
        .await
        .context("Failed to start MCP server")?;

    let tools = client
        .list_tools()
        .await
        .context("Failed to list tools from MCP server")?;
    let tool_names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
    println!("\nConnected to server with tools: {:?}", tool_names);

    let pipeline = Pipeline::new(
        client,
        PlanGenerator::new(provider),
        SequentialExecutor::new(ReferenceResolver::default()),
        config.output_dir.clone(),
    );
    let mut session = SessionLoop::new(pipeline, config.show_plan);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let session_result = session.run(stdin, &mut stdout).await;

    // Always tear the server down, even when the session ended with an I/O error
    let mut client = session.into_pipeline().into_catalog();
    if let Err(e) = client.disconnect().await {
        log_error(&format!("Failed to disconnect from MCP server: {e}"));
    }

    session_result?;
    log_info("Session finished");
    Ok(())
}
