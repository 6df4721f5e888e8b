//! `cloudweave run` — a lightweight run loop
//!
//! Replaces the old FUSE daemon's "run forever" role: no mount, just scan,
//! reconcile, sync, and rebalance on a fixed interval until interrupted.
//! Each tick opens and seals its own store session rather than holding one
//! open for the process lifetime, so a `status`/`config set` run alongside
//! it never contends for the encrypted file.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use cloudweave_audit::{AuditLogger, JsonlAuditSink};
use cloudweave_capacity::CapacityEngine;
use cloudweave_core::config::Config;
use cloudweave_core::ports::SystemClock;
use cloudweave_scan::{Reconciler, Scanner};
use cloudweave_sync::SyncEngine;

use crate::context::Context;
use crate::output::OutputFormatter;

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Use an alternate config file path instead of the platform default.
    #[arg(long)]
    config: Option<String>,
}

impl RunCommand {
    pub async fn execute(&self, formatter: &dyn OutputFormatter) -> anyhow::Result<()> {
        let interval = {
            let probe = Context::load(self.config.clone()).await?;
            Duration::from_secs(probe.config.sync.interval_seconds)
        };

        formatter.info(&format!("run loop starting, interval {}s (ctrl-c to stop)", interval.as_secs()));

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    formatter.info("shutdown requested, stopping after current tick");
                    break;
                }
                result = self.tick(formatter) => {
                    if let Err(e) = result {
                        formatter.error(&format!("tick failed: {e:#}"));
                    }
                }
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    formatter.info("shutdown requested");
                    break;
                }
                () = tokio::time::sleep(interval) => {}
            }
        }

        Ok(())
    }

    async fn tick(&self, formatter: &dyn OutputFormatter) -> anyhow::Result<()> {
        let ctx = Context::load(self.config.clone()).await?;
        let providers = ctx.providers().await?;

        let scanner = Scanner::new(providers.clone(), ctx.metadata.clone(), ctx.config.scan.clone());
        let t0 = chrono::Utc::now();
        let scan_report = scanner.scan_all().await?;
        let reconciler = Reconciler::new(ctx.metadata.clone(), providers.clone());
        let reconcile_report = reconciler.run(t0).await?;
        formatter.info(&format!(
            "scan: {} accounts, {} files, {} folders; reconcile: {} linked, {} promoted, {} deleted",
            scan_report.accounts_scanned,
            scan_report.files_written,
            scan_report.folders_written,
            reconcile_report.replicas_linked,
            reconcile_report.replicas_promoted,
            reconcile_report.rows_marked_deleted,
        ));

        let audit_path = Config::default_path()
            .parent()
            .map(|dir| dir.join("audit.jsonl"))
            .unwrap_or_else(|| std::path::PathBuf::from("audit.jsonl"));
        let sink = Arc::new(JsonlAuditSink::new(audit_path));
        let audit = Arc::new(AuditLogger::new(sink, ctx.config.sync.safe_mode));
        let sync_engine = SyncEngine::new(
            ctx.metadata.clone(),
            providers.clone(),
            audit,
            Arc::new(SystemClock),
            ctx.config.sync.stop_on_error,
        );
        let sync_report = sync_engine.run().await?;
        formatter.info(&format!(
            "sync: {} copied, {} conflicts resolved, {} folders created",
            sync_report.replicas_copied, sync_report.conflicts_resolved, sync_report.folders_created,
        ));

        let capacity_engine = CapacityEngine::new(ctx.metadata.clone(), providers, ctx.config.capacity.clone());
        let rebalance_report = capacity_engine.run().await?;
        formatter.info(&format!(
            "rebalance: {} file(s) moved, {} bytes moved",
            rebalance_report.files_moved, rebalance_report.bytes_moved,
        ));

        ctx.seal().await?;
        Ok(())
    }
}
