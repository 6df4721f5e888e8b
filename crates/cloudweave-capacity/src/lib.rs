//! Quota-driven rebalance and free-main capacity engine (spec §4.5)
//!
//! Keeps every account under its high watermark by moving whole files
//! between accounts of the same provider: first draining an overloaded
//! main account onto its backups, then evening out the backups among
//! themselves. Every move prefers a native ownership transfer and falls
//! back to a streamed copy-then-delete when the provider can't do that.

pub mod error;
pub mod quota;
pub mod rebalance;
pub mod transfer;

pub use error::CapacityError;
pub use quota::AccountQuota;
pub use rebalance::{CapacityEngine, RebalanceReport};
pub use transfer::transfer_or_copy;
