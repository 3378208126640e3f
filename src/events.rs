//! Progress events emitted while a pipeline runs
//!
//! Producers only ever send on an [`EventSender`]; the consumer (a terminal
//! renderer, a UI bridge or a test) drains the matching receiver on its own
//! schedule. A dropped receiver is not an error for the producer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

/// Sending half of the progress channel
pub type EventSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving half of the progress channel
pub type EventReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Creates a new progress channel
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Which part of the crawl produced a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    /// A sitemap document finished (successfully or not)
    SitemapProcessed,
    /// New page URLs were added to the sample
    PagesDiscovered,
}

/// Snapshot of crawl counters at the moment of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlProgress {
    pub phase: CrawlPhase,
    /// Sitemaps processed so far
    pub processed: usize,
    /// Sitemaps known so far (processed, in flight and queued)
    pub total: usize,
    /// The sitemap this event is about
    pub current_sitemap: String,
    /// Most recently discovered page URL, for discovery events
    pub last_url_found: Option<String>,
    /// Size of the page URL sample
    pub pages_found: usize,
}

/// Status attached to a pipeline log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Running,
    Complete,
    Error,
}

/// One line of the pipeline's analysis log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub status: LogStatus,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, status: LogStatus) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            status,
        }
    }
}

/// An event on the progress channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Crawl(CrawlProgress),
    Log(LogEntry),
}

/// Sends an event, ignoring a closed channel
pub(crate) fn emit(sender: Option<&EventSender>, event: ProgressEvent) {
    if let Some(sender) = sender {
        let _ = sender.send(event);
    }
}

/// Sends a pipeline log entry
pub(crate) fn log(sender: Option<&EventSender>, message: impl Into<String>, status: LogStatus) {
    let entry = LogEntry::new(message, status);
    match status {
        LogStatus::Error => tracing::error!("{}", entry.message),
        _ => tracing::info!("{}", entry.message),
    }
    emit(sender, ProgressEvent::Log(entry));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_channel_is_ignored() {
        let (sender, receiver) = channel();
        drop(receiver);
        emit(Some(&sender), ProgressEvent::Log(LogEntry::new("x", LogStatus::Running)));
        emit(None, ProgressEvent::Log(LogEntry::new("y", LogStatus::Running)));
    }

    #[test]
    fn test_log_delivers_entry() {
        let (sender, mut receiver) = channel();
        log(Some(&sender), "Crawling your sitemap...", LogStatus::Running);

        match receiver.try_recv().unwrap() {
            ProgressEvent::Log(entry) => {
                assert_eq!(entry.message, "Crawling your sitemap...");
                assert_eq!(entry.status, LogStatus::Running);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = ProgressEvent::Crawl(CrawlProgress {
            phase: CrawlPhase::PagesDiscovered,
            processed: 1,
            total: 3,
            current_sitemap: "https://x.com/posts.xml".to_string(),
            last_url_found: Some("https://x.com/a".to_string()),
            pages_found: 1,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "crawl");
        assert_eq!(value["phase"], "pages_discovered");
    }
}
