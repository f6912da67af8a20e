//! In-memory visitor feed with live updates.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{aggregate_for_log, aggregate_for_map, unique_visitor_count, LogLimit};
use crate::config::SESSION_WINDOW;
use crate::models::{LocationBucket, VisitorRecord};
use crate::notify::NewVisitorNotifier;
use crate::storage::{ChangeEvent, Subscription};

/// What a live change event did to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveUpdateOutcome {
    /// Insert of an unseen session; prepended. The only new-visitor case.
    Arrived,
    /// Insert echoing a session already in the feed; replaced in place.
    Merged,
    /// Update of a known record; replaced in place.
    Replaced,
    /// Update for a record the feed had never seen; added quietly.
    Added,
}

/// The working record set behind the map and log views, newest first.
#[derive(Debug, Clone)]
pub struct VisitorFeed {
    records: Vec<VisitorRecord>,
    window: Duration,
}

impl VisitorFeed {
    pub fn new(mut records: Vec<VisitorRecord>) -> Self {
        sort_newest_first(&mut records);
        VisitorFeed {
            records,
            window: SESSION_WINDOW,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn records(&self) -> &[VisitorRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn buckets(&self) -> Vec<LocationBucket> {
        aggregate_for_map(&self.records)
    }

    pub fn log(&self, limit: LogLimit) -> Vec<VisitorRecord> {
        aggregate_for_log(&self.records, limit)
    }

    pub fn unique_visitors(&self) -> usize {
        unique_visitor_count(&self.records)
    }

    /// Position of the stored row with the same id, if both have one.
    fn position_by_id(&self, record: &VisitorRecord) -> Option<usize> {
        let id = record.id?;
        self.records.iter().position(|r| r.id == Some(id))
    }

    /// Applies one change event, keeping the list newest first.
    ///
    /// An insert replaces the matching row when it carries a known id or
    /// matches a session within the window (an echo of a merge); otherwise
    /// it is prepended. An update replaces the row with the same id, else
    /// the newest row with the same client fingerprint regardless of age.
    pub fn apply_live_update(&mut self, event: ChangeEvent) -> LiveUpdateOutcome {
        let outcome = match event {
            ChangeEvent::Inserted(incoming) => {
                let existing = self.position_by_id(&incoming).or_else(|| {
                    self.records
                        .iter()
                        .position(|r| r.is_same_session(&incoming, self.window))
                });
                match existing {
                    Some(index) => {
                        log::debug!(
                            "Live insert for {} matches a known session; replacing",
                            incoming.network_address
                        );
                        self.records[index] = incoming;
                        LiveUpdateOutcome::Merged
                    }
                    None => {
                        self.records.insert(0, incoming);
                        LiveUpdateOutcome::Arrived
                    }
                }
            }
            ChangeEvent::Updated(incoming) => {
                let key = incoming.session_key();
                let existing = self
                    .position_by_id(&incoming)
                    .or_else(|| self.records.iter().position(|r| r.session_key() == key));
                match existing {
                    Some(index) => {
                        self.records[index] = incoming;
                        LiveUpdateOutcome::Replaced
                    }
                    None => {
                        self.records.push(incoming);
                        LiveUpdateOutcome::Added
                    }
                }
            }
        };
        sort_newest_first(&mut self.records);
        outcome
    }

    /// Applies change events from `subscription` until `shutdown` is
    /// cancelled or the store goes away. Returns the number of events
    /// applied. The subscription is released on return.
    pub async fn follow(
        &mut self,
        mut subscription: Subscription,
        shutdown: CancellationToken,
        notifier: &dyn NewVisitorNotifier,
    ) -> usize {
        let mut applied = 0usize;
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => {
                    log::debug!("Live updates stopped after {} event(s)", applied);
                    break;
                }
                event = subscription.recv() => event,
            };
            let Some(event) = event else {
                log::info!("Visitor store change feed closed");
                break;
            };
            let incoming = event.record().clone();
            if self.apply_live_update(event) == LiveUpdateOutcome::Arrived {
                notifier.notify(&incoming);
            }
            applied += 1;
        }
        applied
    }
}

/// Stable sort, newest observation first.
fn sort_newest_first(records: &mut [VisitorRecord]) {
    records.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::record_at;
    use crate::notify::test_support::RecordingNotifier;
    use tokio::sync::broadcast;

    fn with_id(mut record: VisitorRecord, id: i64) -> VisitorRecord {
        record.id = Some(id);
        record
    }

    #[test]
    fn test_new_feed_sorts_newest_first() {
        let feed = VisitorFeed::new(vec![
            record_at("198.51.100.1", 0),
            record_at("198.51.100.2", 20),
            record_at("198.51.100.3", 10),
        ]);
        let addresses: Vec<&str> = feed
            .records()
            .iter()
            .map(|r| r.network_address.as_str())
            .collect();
        assert_eq!(addresses, vec!["198.51.100.2", "198.51.100.3", "198.51.100.1"]);
    }

    #[test]
    fn test_insert_echo_within_window_replaces_in_place() {
        let mut feed = VisitorFeed::new(vec![
            record_at("203.0.113.7", 10),
            record_at("198.51.100.1", 5),
        ]);

        let outcome =
            feed.apply_live_update(ChangeEvent::Inserted(record_at("203.0.113.7", 25)));

        assert_eq!(outcome, LiveUpdateOutcome::Merged);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.records()[0], record_at("203.0.113.7", 25));
    }

    #[test]
    fn test_insert_outside_window_is_new_arrival() {
        let mut feed = VisitorFeed::new(vec![record_at("203.0.113.7", 0)]);

        let outcome =
            feed.apply_live_update(ChangeEvent::Inserted(record_at("203.0.113.7", 45)));

        assert_eq!(outcome, LiveUpdateOutcome::Arrived);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.records()[0], record_at("203.0.113.7", 45));
    }

    #[test]
    fn test_insert_with_known_id_is_echo() {
        let stored = with_id(record_at("203.0.113.7", 0), 3);
        let mut feed = VisitorFeed::new(vec![stored.clone()]);

        let outcome = feed.apply_live_update(ChangeEvent::Inserted(stored));

        assert_eq!(outcome, LiveUpdateOutcome::Merged);
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn test_update_replaces_regardless_of_age() {
        let mut feed = VisitorFeed::new(vec![
            record_at("198.51.100.1", 200),
            record_at("203.0.113.7", 0),
        ]);

        let outcome =
            feed.apply_live_update(ChangeEvent::Updated(record_at("203.0.113.7", 150)));

        assert_eq!(outcome, LiveUpdateOutcome::Replaced);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.records()[1], record_at("203.0.113.7", 150));
    }

    #[test]
    fn test_update_restores_newest_first_order() {
        let mut feed = VisitorFeed::new(vec![
            record_at("198.51.100.1", 100),
            record_at("203.0.113.7", 0),
        ]);

        feed.apply_live_update(ChangeEvent::Updated(record_at("203.0.113.7", 120)));

        assert_eq!(feed.records()[0].network_address, "203.0.113.7");
        assert_eq!(feed.records()[1].network_address, "198.51.100.1");
    }

    #[test]
    fn test_update_for_unknown_record_is_added() {
        let mut feed = VisitorFeed::new(vec![record_at("198.51.100.1", 100)]);

        let outcome =
            feed.apply_live_update(ChangeEvent::Updated(record_at("203.0.113.7", 50)));

        assert_eq!(outcome, LiveUpdateOutcome::Added);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.records()[1].network_address, "203.0.113.7");
    }

    #[test]
    fn test_views_follow_updates() {
        let mut feed = VisitorFeed::new(vec![record_at("203.0.113.7", 0)]);
        assert_eq!(feed.unique_visitors(), 1);

        feed.apply_live_update(ChangeEvent::Inserted(record_at("198.51.100.1", 5)));

        assert_eq!(feed.unique_visitors(), 2);
        assert_eq!(feed.buckets()[0].visit_count, 2);
        assert_eq!(feed.log(LogLimit::Collapsed).len(), 2);
    }

    #[tokio::test]
    async fn test_follow_notifies_only_new_arrivals() {
        let (sender, receiver) = broadcast::channel(16);
        let subscription = Subscription::new(receiver);
        let mut feed = VisitorFeed::new(vec![record_at("203.0.113.7", 0)]);
        let notifier = RecordingNotifier::default();

        sender
            .send(ChangeEvent::Inserted(record_at("203.0.113.7", 10)))
            .unwrap();
        sender
            .send(ChangeEvent::Inserted(record_at("198.51.100.1", 12)))
            .unwrap();
        sender
            .send(ChangeEvent::Updated(record_at("198.51.100.1", 14)))
            .unwrap();
        drop(sender);

        let applied = feed
            .follow(subscription, CancellationToken::new(), &notifier)
            .await;

        assert_eq!(applied, 3);
        assert_eq!(feed.len(), 2);
        assert_eq!(notifier.count(), 1);
        assert_eq!(
            notifier.seen.lock().unwrap()[0].network_address,
            "198.51.100.1"
        );
    }

    #[tokio::test]
    async fn test_follow_announces_late_arrival_not_head() {
        let (sender, receiver) = broadcast::channel(16);
        let subscription = Subscription::new(receiver);
        let mut feed = VisitorFeed::new(vec![record_at("198.51.100.1", 100)]);
        let notifier = RecordingNotifier::default();

        sender
            .send(ChangeEvent::Inserted(record_at("203.0.113.9", 50)))
            .unwrap();
        drop(sender);

        feed.follow(subscription, CancellationToken::new(), &notifier).await;

        assert_eq!(feed.records()[0].network_address, "198.51.100.1");
        assert_eq!(feed.records()[1].network_address, "203.0.113.9");
        let seen = notifier.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].network_address, "203.0.113.9");
    }

    #[tokio::test]
    async fn test_follow_stops_on_cancellation() {
        let (sender, receiver) = broadcast::channel::<ChangeEvent>(16);
        let subscription = Subscription::new(receiver);
        let mut feed = VisitorFeed::new(Vec::new());
        let notifier = RecordingNotifier::default();
        let shutdown = CancellationToken::new();

        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let applied = feed.follow(subscription, shutdown, &notifier).await;

        assert_eq!(applied, 0);
        // Subscription was released when follow returned
        assert_eq!(sender.receiver_count(), 0);
    }
}
