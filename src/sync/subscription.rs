//! Scoped live-feed subscriptions
//!
//! A [`Subscription`] owns its background listener: dropping it aborts the
//! task, so a view can never leak a listener by forgetting to unsubscribe.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use futures::Stream;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;

use crate::models::ChatMessage;

/// Aborts the listener task when dropped.
struct ListenerGuard(Option<JoinHandle<()>>);

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// Receiver of full message snapshots. Each snapshot replaces the previous.
pub struct Subscription {
    rx: watch::Receiver<Vec<ChatMessage>>,
    /// The current value is a real snapshot not yet handed out.
    primed: bool,
    guard: ListenerGuard,
}

impl Subscription {
    /// Poll `fetch` every `interval` and publish the result when it differs
    /// from the last published snapshot. The first successful fetch is
    /// always published.
    pub fn polling<F, Fut>(interval: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<ChatMessage>>> + Send,
    {
        let (tx, rx) = watch::channel(Vec::new());
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<Vec<ChatMessage>> = None;
            loop {
                ticker.tick().await;
                match fetch().await {
                    Ok(snapshot) => {
                        if last.as_ref() == Some(&snapshot) {
                            continue;
                        }
                        tracing::debug!("Feed snapshot: {} messages", snapshot.len());
                        last = Some(snapshot.clone());
                        if tx.send(snapshot).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Feed poll failed: {:#}", e),
                }
            }
        });

        Self {
            rx,
            primed: false,
            guard: ListenerGuard(Some(handle)),
        }
    }

    /// Wrap a receiver whose current value is already a valid snapshot.
    pub fn from_receiver(rx: watch::Receiver<Vec<ChatMessage>>) -> Self {
        Self {
            rx,
            primed: true,
            guard: ListenerGuard(None),
        }
    }

    /// Wait for the next snapshot. `None` once the publisher is gone.
    pub async fn changed(&mut self) -> Option<Vec<ChatMessage>> {
        if std::mem::take(&mut self.primed) {
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Consume into a stream of snapshots. The listener lives as long as
    /// the stream.
    pub fn into_stream(self) -> impl Stream<Item = Vec<ChatMessage>> + Send + Unpin {
        let Subscription { rx, primed, guard } = self;
        let stream = if primed {
            WatchStream::new(rx)
        } else {
            WatchStream::from_changes(rx)
        };
        stream.map(move |snapshot| {
            let _listener = &guard;
            snapshot
        })
    }
}

/// Holds at most one live subscription, keyed by what it watches.
///
/// Replacing or releasing drops the previous subscription, which stops its
/// listener.
pub struct SubscriptionSlot<K> {
    current: Option<(K, Subscription)>,
}

impl<K: PartialEq> Default for SubscriptionSlot<K> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<K: PartialEq> SubscriptionSlot<K> {
    pub fn replace(&mut self, key: K, subscription: Subscription) {
        self.current = Some((key, subscription));
    }

    pub fn release(&mut self) {
        self.current = None;
    }

    pub fn key(&self) -> Option<&K> {
        self.current.as_ref().map(|(k, _)| k)
    }

    pub fn is_watching(&self, key: &K) -> bool {
        self.key() == Some(key)
    }

    /// Next snapshot from the held subscription. Never resolves when the
    /// slot is empty or its publisher has gone away.
    pub async fn changed(&mut self) -> Vec<ChatMessage> {
        match self.current.as_mut() {
            Some((_, sub)) => match sub.changed().await {
                Some(snapshot) => snapshot,
                None => std::future::pending().await,
            },
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn message(id: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            text: id.to_string(),
            author_id: "a".to_string(),
            author_name: "A".to_string(),
            author_photo_url: String::new(),
            recipient_id: None,
            timestamp: None,
            media: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_publishes_only_changes() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let mut sub = Subscription::polling(Duration::from_secs(1), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                // Same snapshot for the first three polls, then a new one.
                let mut msgs = vec![message("m1")];
                if n >= 3 {
                    msgs.push(message("m2"));
                }
                Ok(msgs)
            }
        });

        let first = sub.changed().await.unwrap();
        assert_eq!(first.len(), 1);
        let second = sub.changed().await.unwrap();
        assert_eq!(second.len(), 2);
        assert!(polls.load(Ordering::SeqCst) >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_survives_errors() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let mut sub = Subscription::polling(Duration::from_millis(100), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    anyhow::bail!("offline");
                }
                Ok(vec![message("m1")])
            }
        });
        assert_eq!(sub.changed().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_listener() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let sub = Subscription::polling(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Vec::new()) }
        });
        tokio::time::sleep(Duration::from_millis(3500)).await;
        let before = polls.load(Ordering::SeqCst);
        assert!(before >= 3);

        drop(sub);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(polls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_receiver_hands_out_current_value_first() {
        let (tx, rx) = watch::channel(vec![message("m1")]);
        let mut sub = Subscription::from_receiver(rx);
        assert_eq!(sub.changed().await.unwrap()[0].id, "m1");

        tx.send(vec![message("m1"), message("m2")]).unwrap();
        assert_eq!(sub.changed().await.unwrap().len(), 2);

        drop(tx);
        assert!(sub.changed().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_yields_snapshots() {
        let (tx, rx) = watch::channel(vec![message("m1")]);
        let mut stream = Subscription::from_receiver(rx).into_stream();
        assert_eq!(stream.next().await.unwrap().len(), 1);
        tx.send(Vec::new()).unwrap();
        assert!(stream.next().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_replace_releases_previous() {
        let old_polls = Arc::new(AtomicUsize::new(0));
        let counter = old_polls.clone();
        let mut slot = SubscriptionSlot::default();
        slot.replace(
            "a_b".to_string(),
            Subscription::polling(Duration::from_secs(1), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Vec::new()) }
            }),
        );
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(slot.is_watching(&"a_b".to_string()));

        let (_tx, rx) = watch::channel(vec![message("c1")]);
        slot.replace("a_c".to_string(), Subscription::from_receiver(rx));
        let frozen = old_polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(old_polls.load(Ordering::SeqCst), frozen);
        assert_eq!(slot.changed().await[0].id, "c1");

        slot.release();
        assert!(slot.key().is_none());
    }
}
