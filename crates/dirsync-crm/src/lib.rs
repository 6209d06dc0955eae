//! # CRM Client
//!
//! Typed access to the Insightly records that declare which projects,
//! tenants and contacts should exist in the directory.
//!
//! - [`models`] - Projects, contacts, categories, pipelines and stages
//! - [`client`] - The `CrmClient` trait and the reqwest-based `InsightlyClient`
//! - [`retry`] - Fixed-backoff retry for reads
//! - [`memory`] - In-memory `CrmClient` that records writes
//! - [`config`] - `InsightlyConfig`
//! - [`error`] - `CrmError`

pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod retry;

pub use client::{CrmClient, InsightlyClient};
pub use config::InsightlyConfig;
pub use error::{CrmError, CrmResult};
pub use memory::MemoryCrm;
