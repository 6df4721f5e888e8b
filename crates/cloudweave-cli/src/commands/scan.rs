//! `cloudweave scan` — fan out a scan across every account, then reconcile
//!
//! `T0` is captured before [`Scanner::scan_all`] starts so the reconciler's
//! stale-row tombstoning only retires rows this run genuinely never saw
//! again, not rows a slow scan just hasn't gotten to yet.

use clap::Args;

use cloudweave_scan::{Reconciler, Scanner};

use crate::context::Context;
use crate::output::OutputFormatter;

#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Use an alternate config file path instead of the platform default.
    #[arg(long)]
    config: Option<String>,
}

impl ScanCommand {
    pub async fn execute(&self, formatter: &dyn OutputFormatter, json: bool) -> anyhow::Result<()> {
        let ctx = Context::load(self.config.clone()).await?;
        let providers = ctx.providers().await?;
        let scanner = Scanner::new(providers.clone(), ctx.metadata.clone(), ctx.config.scan.clone());

        let t0 = chrono::Utc::now();
        let scan_report = scanner.scan_all().await?;

        let reconciler = Reconciler::new(ctx.metadata.clone(), providers);
        let reconcile_report = reconciler.run(t0).await?;

        ctx.seal().await?;

        if json {
            formatter.print_json(&serde_json::json!({
                "accounts_scanned": scan_report.accounts_scanned,
                "files_written": scan_report.files_written,
                "folders_written": scan_report.folders_written,
                "account_failures": scan_report.account_failures,
                "logical_files_updated": reconcile_report.logical_files_updated,
                "replicas_linked": reconcile_report.replicas_linked,
                "replicas_promoted": reconcile_report.replicas_promoted,
                "rows_marked_deleted": reconcile_report.rows_marked_deleted,
                "hard_deletes_propagated": reconcile_report.hard_deletes_propagated,
            }));
        } else {
            formatter.success(&format!(
                "scanned {} account(s): {} files, {} folders",
                scan_report.accounts_scanned, scan_report.files_written, scan_report.folders_written
            ));
            for failure in &scan_report.account_failures {
                formatter.warn(failure);
            }
            formatter.info(&format!(
                "reconciled: {} logical files updated, {} replicas linked, {} promoted, {} marked deleted, {} hard deletes propagated",
                reconcile_report.logical_files_updated,
                reconcile_report.replicas_linked,
                reconcile_report.replicas_promoted,
                reconcile_report.rows_marked_deleted,
                reconcile_report.hard_deletes_propagated,
            ));
        }

        Ok(())
    }
}
