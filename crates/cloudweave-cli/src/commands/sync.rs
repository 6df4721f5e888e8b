//! `cloudweave sync` — runs one cross-provider convergence pass (I1-I6)
//!
//! Safe mode (I6) comes from `config.yaml`'s `sync.safe_mode` unless
//! `--dry-run` forces it on for this one invocation; either way every
//! mutating operation that would have run is still recorded via the audit
//! sink.

use std::sync::Arc;

use clap::Args;

use cloudweave_audit::{AuditLogger, JsonlAuditSink};
use cloudweave_core::config::Config;
use cloudweave_core::ports::SystemClock;
use cloudweave_sync::SyncEngine;

use crate::context::Context;
use crate::output::OutputFormatter;

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Use an alternate config file path instead of the platform default.
    #[arg(long)]
    config: Option<String>,

    /// Force safe mode on for this run regardless of `sync.safe_mode`.
    #[arg(long)]
    dry_run: bool,
}

impl SyncCommand {
    pub async fn execute(&self, formatter: &dyn OutputFormatter, json: bool) -> anyhow::Result<()> {
        let ctx = Context::load(self.config.clone()).await?;
        let providers = ctx.providers().await?;

        let safe_mode = self.dry_run || ctx.config.sync.safe_mode;
        let audit_path = Config::default_path()
            .parent()
            .map(|dir| dir.join("audit.jsonl"))
            .unwrap_or_else(|| std::path::PathBuf::from("audit.jsonl"));
        let sink = Arc::new(JsonlAuditSink::new(audit_path));
        let audit = Arc::new(AuditLogger::new(sink, safe_mode));

        let engine = SyncEngine::new(
            ctx.metadata.clone(),
            providers,
            audit,
            Arc::new(SystemClock),
            ctx.config.sync.stop_on_error,
        );
        let report = engine.run().await?;

        ctx.seal().await?;

        if json {
            formatter.print_json(&serde_json::json!({
                "safe_mode": safe_mode,
                "soft_deletes_converged": report.soft_deletes_converged,
                "replicas_copied": report.replicas_copied,
                "conflicts_resolved": report.conflicts_resolved,
                "conflicts_failed": report.conflicts_failed,
                "folders_created": report.folders_created,
                "shortcuts_created": report.shortcuts_created,
                "failures": report.failures,
            }));
        } else {
            if safe_mode {
                formatter.info("safe mode: no mutating calls were made, see audit.jsonl for what would have run");
            }
            formatter.success(&format!(
                "sync pass complete: {} soft-deletes converged, {} replicas copied, {} conflicts resolved ({} failed), {} folders created, {} shortcuts created",
                report.soft_deletes_converged,
                report.replicas_copied,
                report.conflicts_resolved,
                report.conflicts_failed,
                report.folders_created,
                report.shortcuts_created,
            ));
            for failure in &report.failures {
                formatter.warn(failure);
            }
        }

        if !report.is_clean() && ctx.config.sync.stop_on_error {
            anyhow::bail!("sync pass reported {} failure(s)", report.failures.len());
        }

        Ok(())
    }
}
