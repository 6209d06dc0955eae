//! # Notifications
//!
//! Side-effect channels of a sync pass:
//!
//! - [`canned`] - The fixed catalogue of notification templates
//! - [`mailer`] - `Mailer` trait and the lettre-based `SmtpMailer`
//! - [`incident`] - `IncidentSink` trait and the Redmine implementation
//! - [`recording`] - Recording implementations of both
//!
//! The engine decides which template goes to whom and when; this crate only
//! renders and delivers.

pub mod canned;
pub mod error;
pub mod incident;
pub mod mailer;
pub mod recording;

pub use canned::CannedMessage;
pub use error::{NotifyError, NotifyResult};
pub use incident::{Incident, IncidentSink, RedmineConfig, RedmineIncidentSink, Severity};
pub use mailer::{Mail, Mailer, SmtpConfig, SmtpMailer};
pub use recording::{RecordingIncidentSink, RecordingMailer};
