//! Recording mailer and incident sink.
//!
//! They keep everything they are handed, for assertions in tests and for
//! dry runs that must not contact anyone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::canned::CannedMessage;
use crate::error::{NotifyError, NotifyResult};
use crate::incident::{Incident, IncidentSink};
use crate::mailer::{Mail, Mailer};

/// Mailer that records instead of sending.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Mail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail.
    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Recipients of a given template, in send order.
    pub fn recipients_of(&self, template: CannedMessage) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.template == Some(template))
            .map(|m| m.to)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &Mail) -> NotifyResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Smtp("relay refused".into()));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(mail.clone());
        Ok(())
    }
}

/// Incident sink that records instead of filing.
#[derive(Default)]
pub struct RecordingIncidentSink {
    filed: Mutex<Vec<Incident>>,
}

impl RecordingIncidentSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filed(&self) -> Vec<Incident> {
        self.filed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl IncidentSink for RecordingIncidentSink {
    async fn file(&self, incident: &Incident) -> NotifyResult<()> {
        self.filed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(incident.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::Severity;

    #[tokio::test]
    async fn test_recording_mailer() {
        let mailer = RecordingMailer::new();
        mailer
            .send(&CannedMessage::AddedToProject.to_mail("a@example.org", "p"))
            .await
            .unwrap();
        mailer
            .send(&CannedMessage::AddedToTenant.to_mail("b@example.org", "t"))
            .await
            .unwrap();

        assert_eq!(mailer.count(), 2);
        assert_eq!(
            mailer.recipients_of(CannedMessage::AddedToTenant),
            vec!["b@example.org"]
        );

        mailer.fail_sends();
        assert!(mailer
            .send(&CannedMessage::AddedToProject.to_mail("c@example.org", "p"))
            .await
            .is_err());
        assert_eq!(mailer.count(), 2);
    }

    #[tokio::test]
    async fn test_recording_sink() {
        let sink = RecordingIncidentSink::new();
        sink.file(&Incident::new("s", "b", Severity::High))
            .await
            .unwrap();
        assert_eq!(sink.filed()[0].severity, Severity::High);
    }
}
