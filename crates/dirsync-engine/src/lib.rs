//! # Reconciliation Engine
//!
//! Keeps the directory's accounts, project groups and tenant groups in
//! agreement with the projects and contacts declared in the CRM.
//!
//! ## Overview
//!
//! A pass reads a CRM snapshot, buckets every project by its pipeline stage,
//! maps each bucket to desired project descriptors and applies them to the
//! directory. Changes that commit are announced by canned mail and, for
//! projects, pushed back to the CRM as status and stage updates. The pass
//! is safe to re-run: an unchanged CRM produces no mutations and no mail.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            SyncEngine                               │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌───────────────┐    ┌───────────────┐    ┌───────────────┐        │
//! │  │     Stage     │───►│ Desired-State │───►│  Reconciler   │        │
//! │  │   Classifier  │    │    Mapper     │    │ create/update │        │
//! │  └───────────────┘    └───────────────┘    │ delete, prune │        │
//! │                                            └───────────────┘        │
//! │                                               │     │     │         │
//! │                           ┌───────────────────┘     │     └───┐     │
//! │                           ▼                         ▼         ▼     │
//! │                   ┌───────────────┐    ┌──────────────┐ ┌─────────┐ │
//! │                   │ Notification  │    │  CRM Status  │ │Directory│ │
//! │                   │  Dispatcher   │    │   Reporter   │ │ (trait) │ │
//! │                   └───────────────┘    └──────────────┘ └─────────┘ │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Crate Organization
//!
//! - [`sanitize`] - Directory-safe names and account name tokens
//! - [`similarity`] - Fuzzy scoring of CRM role labels
//! - [`model`] - Account and project descriptors
//! - [`mapper`] - CRM records to descriptors
//! - [`classifier`] - Stage bands and project buckets
//! - [`reconciler`] - The per-project state machine and orphan pruning
//! - [`dispatcher`] - Events to canned messages
//! - [`crm_status`] - Status, stage and default-tenant writes to the CRM
//! - [`statistics`] / [`report`] - What a pass did
//! - [`engine`] - Whole-pass orchestration
//!
//! ## Usage
//!
//! ```ignore
//! use dirsync_engine::prelude::*;
//!
//! let engine = SyncEngine::new(directory, crm, mailer, EngineConfig::new("dc=example,dc=org"))
//!     .with_incident_sink(redmine);
//! let report = engine.run_pass().await?;
//! for diagnostic in &report.diagnostics {
//!     eprintln!("{} {}: {}", diagnostic.operation, diagnostic.subject, diagnostic.message);
//! }
//! ```

pub mod classifier;
pub mod config;
pub mod crm_status;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod model;
pub mod reconciler;
pub mod report;
pub mod sanitize;
pub mod similarity;
pub mod statistics;

pub mod prelude {
    pub use crate::classifier::{Bucket, StageClassifier};
    pub use crate::config::{CategoryLabels, DirectoryLayout, EngineConfig, RoleMatching, StageBands};
    pub use crate::engine::{CrmSnapshot, SyncEngine};
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::model::{AccountDescriptor, AccountRole, Category, ProjectDescriptor};
    pub use crate::reconciler::{Action, Reconciler};
    pub use crate::report::{Diagnostic, PassReport};
    pub use crate::sanitize::sanitize;
    pub use crate::statistics::{PassStatistics, SyncAction};
}

pub use engine::SyncEngine;
pub use error::{EngineError, EngineResult};
