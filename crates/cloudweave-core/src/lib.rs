//! Cloudweave Core - Domain model and port traits
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `LogicalFile`, `Replica`, `ReplicaFragment`, `Folder`, `UserAccount`
//! - **Port definitions** - Traits for adapters: `CloudProvider`, `MetadataStore`, `Clock`
//! - **Configuration** - Typed operational config loaded from `config.yaml`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external
//! dependencies. Ports define trait interfaces that adapter crates
//! implement. `cloudweave-scan`, `cloudweave-sync`, and `cloudweave-capacity`
//! orchestrate domain entities through the port interfaces.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use error::CloudweaveError;
