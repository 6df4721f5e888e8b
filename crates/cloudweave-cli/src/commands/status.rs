//! `cloudweave status` — account and per-provider usage overview
//!
//! Reports what the metadata store currently believes, without touching
//! any provider; run `scan` first for a fresh picture.

use clap::Args;

use crate::context::Context;
use crate::output::OutputFormatter;

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Use an alternate config file path instead of the platform default.
    #[arg(long)]
    config: Option<String>,
}

impl StatusCommand {
    pub async fn execute(&self, formatter: &dyn OutputFormatter, json: bool) -> anyhow::Result<()> {
        let ctx = Context::load(self.config.clone()).await?;
        let accounts = ctx.accounts().await?;
        let usage = ctx.metadata.usage_by_provider().await?;
        let duplicates = ctx.metadata.duplicate_calculated_ids().await?;

        if json {
            formatter.print_json(&serde_json::json!({
                "accounts": accounts.iter().map(|a| serde_json::json!({
                    "id": a.id().to_string(),
                    "provider": a.provider().to_string(),
                    "role": a.role().to_string(),
                    "state": a.state().to_string(),
                    "quota_used": a.quota_used(),
                    "quota_total": a.quota_total(),
                })).collect::<Vec<_>>(),
                "usage_by_provider": usage.iter().map(|(provider, u)| serde_json::json!({
                    "provider": provider.to_string(),
                    "accounts": u.account_id_count,
                    "used_bytes": u.used_bytes,
                    "total_bytes": u.total_bytes,
                })).collect::<Vec<_>>(),
                "duplicate_calculated_ids": duplicates.len(),
            }));
            return Ok(());
        }

        if accounts.is_empty() {
            formatter.info("no accounts known to the store yet; run scan after provisioning credentials");
            return Ok(());
        }

        formatter.info(&format!("{} account(s):", accounts.len()));
        for account in &accounts {
            let ratio = account.usage_ratio();
            formatter.info(&format!(
                "  {} [{}/{}] {} — {:.1}% used ({}/{})",
                account.id(),
                account.provider(),
                account.role(),
                account.state(),
                ratio * 100.0,
                account.quota_used(),
                account.quota_total(),
            ));
        }

        formatter.info("usage by provider:");
        for (provider, u) in &usage {
            formatter.info(&format!(
                "  {provider}: {} account(s), {}/{} bytes",
                u.account_id_count, u.used_bytes, u.total_bytes
            ));
        }

        if !duplicates.is_empty() {
            formatter.warn(&format!(
                "{} calculated id(s) shared across independent logical files",
                duplicates.len()
            ));
        }

        Ok(())
    }
}
