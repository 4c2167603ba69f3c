//! Alert feed: the bounded, newest-first list the presentation layer reads.
//!
//! Dismissed alerts are hidden from every read-facing query but keep their
//! slot until truncation evicts them. Clearing the feed never touches the
//! dedup ledger, so cleared alerts do not come back.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::alert::{Alert, AlertId};
use crate::sink::AlertSink;
use crate::store::{self, KvStore, FEED_KEY};

/// Default number of alerts retained.
pub const DEFAULT_FEED_CAPACITY: usize = 50;

pub struct AlertFeed {
    /// Newest first.
    alerts: Vec<Alert>,
    capacity: usize,
    store: Arc<dyn KvStore>,
}

/// Feed shared between the engine (as a sink) and the host's read paths.
pub type SharedFeed = Arc<Mutex<AlertFeed>>;

impl AlertFeed {
    /// Load the persisted feed, truncated to `capacity`. A corrupt feed is
    /// logged and replaced by an empty one.
    pub fn load(store: Arc<dyn KvStore>, capacity: usize) -> Self {
        let alerts: Vec<Alert> = match store::load_json(store.as_ref(), FEED_KEY) {
            Ok(Some(alerts)) => alerts,
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("AlertFeed: failed to load, starting empty: {}", e);
                Vec::new()
            }
        };

        let mut feed = Self {
            alerts,
            capacity: capacity.max(1),
            store,
        };
        feed.truncate();
        feed
    }

    pub fn shared(self) -> SharedFeed {
        Arc::new(Mutex::new(self))
    }

    /// Prepend an alert. Returns false (and changes nothing) when an alert
    /// with the same id is already present.
    pub fn publish(&mut self, alert: Alert) -> bool {
        if self.alerts.iter().any(|a| a.id == alert.id) {
            return false;
        }
        self.alerts.insert(0, alert);
        self.truncate();
        self.persist();
        true
    }

    pub fn mark_read(&mut self, id: &AlertId) -> bool {
        self.update(id, |a| a.read = true)
    }

    /// Returns the number of alerts that changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for alert in self.alerts.iter_mut().filter(|a| !a.read) {
            alert.read = true;
            changed += 1;
        }
        if changed > 0 {
            self.persist();
        }
        changed
    }

    pub fn dismiss(&mut self, id: &AlertId) -> bool {
        self.update(id, |a| a.dismissed = true)
    }

    pub fn mark_forwarded(&mut self, id: &AlertId) -> bool {
        self.update(id, |a| a.forwarded = true)
    }

    pub fn clear_all(&mut self) {
        self.alerts.clear();
        self.persist();
    }

    pub fn get(&self, id: &AlertId) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == *id && a.is_visible())
    }

    /// Visible alerts, newest first.
    pub fn visible(&self) -> Vec<&Alert> {
        self.alerts.iter().filter(|a| a.is_visible()).collect()
    }

    pub fn unread_count(&self) -> usize {
        self.alerts
            .iter()
            .filter(|a| a.is_visible() && !a.read)
            .count()
    }

    /// Unread alerts of high or critical priority.
    pub fn urgent_count(&self) -> usize {
        self.alerts
            .iter()
            .filter(|a| a.is_visible() && !a.read && a.priority.is_urgent())
            .count()
    }

    /// Slots in use, dismissed alerts included.
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn update(&mut self, id: &AlertId, f: impl FnOnce(&mut Alert)) -> bool {
        match self.alerts.iter_mut().find(|a| a.id == *id) {
            Some(alert) => {
                f(alert);
                self.persist();
                true
            }
            None => false,
        }
    }

    /// Evict down to capacity: oldest dismissed alerts go first, then the
    /// oldest overall.
    fn truncate(&mut self) {
        while self.alerts.len() > self.capacity {
            match self.alerts.iter().rposition(|a| a.dismissed) {
                Some(pos) => {
                    self.alerts.remove(pos);
                }
                None => {
                    self.alerts.pop();
                }
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = store::save_json(self.store.as_ref(), FEED_KEY, &self.alerts) {
            log::warn!("AlertFeed: failed to persist feed: {}", e);
        }
    }
}

impl AlertSink for Mutex<AlertFeed> {
    fn on_alert_created(&self, alert: &Alert) {
        self.lock().publish(alert.clone());
    }

    fn on_alert_forwarded(&self, id: &AlertId) {
        self.lock().mark_forwarded(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertKey, Priority};
    use crate::store::testing::BrokenStore;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};

    fn alert(n: usize, priority: Priority) -> Alert {
        Alert::new(
            AlertKey::NewRecord {
                record_id: format!("b{}", n),
            },
            priority,
            None,
            "New Bid Created",
            format!("b{} has been added", n),
            Utc.with_ymd_and_hms(2026, 2, 18, 9, 0, 0).unwrap() + Duration::minutes(n as i64),
        )
    }

    fn id(n: usize) -> AlertId {
        AlertId::from(format!("new-record:b{}", n).as_str())
    }

    fn feed(capacity: usize) -> AlertFeed {
        AlertFeed::load(Arc::new(MemoryStore::new()), capacity)
    }

    #[test]
    fn test_newest_first_and_dedup() {
        let mut f = feed(50);
        assert!(f.publish(alert(1, Priority::Low)));
        assert!(f.publish(alert(2, Priority::Low)));
        assert!(!f.publish(alert(1, Priority::Low)));
        let ids: Vec<&str> = f.visible().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new-record:b2", "new-record:b1"]);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut f = feed(50);
        for n in 0..55 {
            f.publish(alert(n, Priority::Low));
        }
        assert_eq!(f.len(), 50);
        assert!(f.get(&id(4)).is_none());
        assert!(f.get(&id(5)).is_some());
    }

    #[test]
    fn test_dismissed_evicted_before_live_alerts() {
        let mut f = feed(3);
        f.publish(alert(1, Priority::Low));
        f.publish(alert(2, Priority::Low));
        f.publish(alert(3, Priority::Low));
        f.dismiss(&id(2));
        f.publish(alert(4, Priority::Low));
        let ids: Vec<&str> = f.visible().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new-record:b4", "new-record:b3", "new-record:b1"]);
        assert_eq!(f.len(), 3);
    }

    #[test]
    fn test_dismissed_hidden_but_occupies_slot() {
        let mut f = feed(50);
        f.publish(alert(1, Priority::High));
        assert!(f.dismiss(&id(1)));
        assert!(f.visible().is_empty());
        assert!(f.get(&id(1)).is_none());
        assert_eq!(f.len(), 1);
        assert_eq!(f.unread_count(), 0);
        assert!(!f.dismiss(&id(9)));
    }

    #[test]
    fn test_counts() {
        let mut f = feed(50);
        f.publish(alert(1, Priority::Critical));
        f.publish(alert(2, Priority::High));
        f.publish(alert(3, Priority::Medium));
        assert_eq!(f.unread_count(), 3);
        assert_eq!(f.urgent_count(), 2);

        f.mark_read(&id(1));
        assert_eq!(f.unread_count(), 2);
        assert_eq!(f.urgent_count(), 1);

        assert_eq!(f.mark_all_read(), 2);
        assert_eq!(f.unread_count(), 0);
        assert_eq!(f.mark_all_read(), 0);
    }

    #[test]
    fn test_clear_all_and_reload() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let mut f = AlertFeed::load(store.clone(), 50);
        f.publish(alert(1, Priority::Low));
        f.publish(alert(2, Priority::Low));
        f.mark_forwarded(&id(2));

        let reloaded = AlertFeed::load(store.clone(), 50);
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.get(&id(2)).expect("present").forwarded);

        f.clear_all();
        assert!(AlertFeed::load(store, 50).is_empty());
    }

    #[test]
    fn test_reload_truncates_to_smaller_capacity() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let mut f = AlertFeed::load(store.clone(), 50);
        for n in 0..10 {
            f.publish(alert(n, Priority::Low));
        }
        let reloaded = AlertFeed::load(store, 4);
        assert_eq!(reloaded.len(), 4);
        assert!(reloaded.get(&id(9)).is_some());
    }

    #[test]
    fn test_corrupt_feed_starts_empty() {
        let store = MemoryStore::new();
        store.put(FEED_KEY, "not json").expect("put");
        let f = AlertFeed::load(Arc::new(store), 50);
        assert!(f.is_empty());
    }

    #[test]
    fn test_failed_write_keeps_alerts_in_memory() {
        let mut f = AlertFeed::load(Arc::new(BrokenStore), 50);
        assert!(f.publish(alert(1, Priority::High)));
        assert!(f.mark_read(&id(1)));
        let kept = f.get(&id(1)).expect("kept");
        assert!(kept.read);
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn test_feed_as_sink() {
        let shared = feed(50).shared();
        let a = alert(1, Priority::Low);
        shared.on_alert_created(&a);
        shared.on_alert_forwarded(&a.id);
        let guard = shared.lock();
        assert!(guard.get(&a.id).expect("published").forwarded);
    }
}
