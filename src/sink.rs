//! Outbound observer interface.
//!
//! The engine reports every confirmed alert to its registered sinks, in
//! detection order, exactly once per id. Sinks are called with the engine
//! lock held and must not block.

use tokio::sync::mpsc;

use crate::alert::{Alert, AlertId};

pub trait AlertSink: Send + Sync {
    fn on_alert_created(&self, alert: &Alert);

    /// The native notification for `id` was shown.
    fn on_alert_forwarded(&self, _id: &AlertId) {}
}

/// Event carried by a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Created(Alert),
    Forwarded(AlertId),
}

/// Adapts the sink interface to an unbounded tokio channel, for hosts that
/// consume alerts on their own task.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SinkEvent) {
        if self.tx.send(event).is_err() {
            log::debug!("ChannelSink: receiver dropped, event discarded");
        }
    }
}

impl AlertSink for ChannelSink {
    fn on_alert_created(&self, alert: &Alert) {
        self.send(SinkEvent::Created(alert.clone()));
    }

    fn on_alert_forwarded(&self, id: &AlertId) {
        self.send(SinkEvent::Forwarded(id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertKey, Priority};
    use chrono::Utc;

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        let alert = Alert::new(
            AlertKey::NewRecord {
                record_id: "b1".to_string(),
            },
            Priority::Low,
            None,
            "New Bid Created",
            "b1 has been added",
            Utc::now(),
        );
        sink.on_alert_created(&alert);
        sink.on_alert_forwarded(&alert.id);

        assert_eq!(rx.try_recv().expect("created"), SinkEvent::Created(alert.clone()));
        assert_eq!(rx.try_recv().expect("forwarded"), SinkEvent::Forwarded(alert.id));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.on_alert_forwarded(&AlertId::from("x"));
    }
}
