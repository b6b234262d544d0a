use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::artifacts::SessionArtifacts;
use crate::catalog::ToolCatalog;
use crate::executor::{Execution, SequentialExecutor};
use crate::logging::log_info;
use crate::plan::Plan;
use crate::planner::PlanGenerator;

/// A validated plan together with the per-query state it runs against
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub query: String,
    pub artifacts: SessionArtifacts,
    pub plan: Plan,
}

/// Query → plan → execution, for one tool catalog
pub struct Pipeline<C: ToolCatalog> {
    catalog: C,
    planner: PlanGenerator,
    executor: SequentialExecutor,
    output_dir: PathBuf,
}

impl<C: ToolCatalog> Pipeline<C> {
    pub fn new(
        catalog: C,
        planner: PlanGenerator,
        executor: SequentialExecutor,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            catalog,
            planner,
            executor,
            output_dir,
        }
    }

    /// Snapshot the catalog, name the report, and plan the query.
    /// The plan is checked against the same snapshot it was made from.
    pub async fn prepare(&mut self, query: &str) -> Result<PreparedQuery> {
        let tools = self
            .catalog
            .list_tools()
            .await
            .context("Failed to list available tools")?;

        let artifacts = SessionArtifacts::generate(query, &self.output_dir);
        let tagged_query = artifacts.tag_query(query);
        log_info(&format!("Planning query: {}", tagged_query));

        let plan = self.planner.generate_plan(&tagged_query, &tools).await?;
        plan.validate(&tools)?;

        Ok(PreparedQuery {
            query: tagged_query,
            artifacts,
            plan,
        })
    }

    /// Run a prepared plan
    pub async fn run(&mut self, prepared: &PreparedQuery) -> Result<Execution> {
        self.executor
            .execute(&prepared.plan, &mut self.catalog, &prepared.artifacts)
            .await
    }

    /// Plan and run one query
    pub async fn process_query(&mut self, query: &str) -> Result<Execution> {
        let prepared = self.prepare(query).await?;
        self.run(&prepared).await
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn into_catalog(self) -> C {
        self.catalog
    }
}
