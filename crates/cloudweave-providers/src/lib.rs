//! Cloud provider adapters for cloudweave
//!
//! One [`cloudweave_core::ports::CloudProvider`] implementation per
//! provider family — Google Drive, Microsoft OneDrive (via Graph), and a
//! Telegram channel used as a blob store. The scanner, sync engine, and
//! capacity engine only ever talk to the port trait; this crate is where
//! vendor HTTP shapes, OAuth, and rate limiting live.
//!
//! ## Modules
//!
//! - [`auth`] — refresh-token-backed OAuth2 access tokens shared by the
//!   Google and Microsoft adapters
//! - [`error`] — the unified [`error::ProviderError`] taxonomy every
//!   adapter maps its vendor errors onto, plus the shared retry helper
//! - [`google`] — Google Drive v3 adapter
//! - [`microsoft`] — Microsoft Graph adapter
//! - [`telegram`] — Telegram channel-as-blob-store adapter

pub mod auth;
pub mod error;
pub mod google;
pub mod microsoft;
pub mod telegram;

pub use error::ProviderError;
pub use google::GoogleProvider;
pub use microsoft::MicrosoftProvider;
pub use telegram::TelegramProvider;
