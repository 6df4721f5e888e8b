//! `cloudweave rebalance` — runs one capacity engine pass (spec §4.5)

use clap::Args;

use cloudweave_capacity::CapacityEngine;

use crate::context::Context;
use crate::output::OutputFormatter;

#[derive(Debug, Args)]
pub struct RebalanceCommand {
    /// Use an alternate config file path instead of the platform default.
    #[arg(long)]
    config: Option<String>,
}

impl RebalanceCommand {
    pub async fn execute(&self, formatter: &dyn OutputFormatter, json: bool) -> anyhow::Result<()> {
        let ctx = Context::load(self.config.clone()).await?;
        let providers = ctx.providers().await?;

        let engine = CapacityEngine::new(ctx.metadata.clone(), providers, ctx.config.capacity.clone());
        let report = engine.run().await?;

        ctx.seal().await?;

        if json {
            formatter.print_json(&serde_json::json!({
                "files_moved": report.files_moved,
                "bytes_moved": report.bytes_moved,
                "sources_stopped": report.sources_stopped.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "failures": report.failures,
            }));
        } else {
            formatter.success(&format!(
                "rebalance complete: {} file(s) moved, {} bytes moved",
                report.files_moved, report.bytes_moved
            ));
            for account in &report.sources_stopped {
                formatter.warn(&format!("{account} stopped as a source after repeated failures"));
            }
            for failure in &report.failures {
                formatter.warn(failure);
            }
        }

        Ok(())
    }
}
