//! Keep a view fresh.
//!
//! Refetches whenever the local store reports a change, and on a fixed
//! interval otherwise. Remote mode has no change feed, so the interval is
//! all it gets.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Api;
use crate::error::Result;
use crate::storage::StoreEvent;

/// Shortest refetch interval; `tokio::time::interval` rejects zero.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spawn a task that runs `fetch` once immediately, then again after each
/// change event or `interval` tick, publishing every successful result.
/// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
///
/// Failed fetches are logged and leave the last value in place. The task
/// stops when `cancel` fires or every receiver is dropped.
pub fn refetch_on_change<T, F, Fut>(
    events: Option<broadcast::Receiver<StoreEvent>>,
    interval: Duration,
    cancel: CancellationToken,
    mut fetch: F,
) -> (watch::Receiver<Option<T>>, JoinHandle<()>)
where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send,
{
    let interval = interval.max(MIN_POLL_INTERVAL);
    let (tx, rx) = watch::channel(None);
    let handle = tokio::spawn(async move {
        let mut events = events;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                event = next_event(&mut events) => {
                    if let Some(event) = event {
                        debug!(item = %event.item_name, action = ?event.action, "Store changed");
                    }
                }
            }

            match fetch().await {
                Ok(value) => {
                    if tx.send(Some(value)).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Refetch failed"),
            }
        }
    });
    (rx, handle)
}

/// Wait for the next change. Pends forever once the feed is gone.
async fn next_event(events: &mut Option<broadcast::Receiver<StoreEvent>>) -> Option<StoreEvent> {
    let Some(rx) = events.as_mut() else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Ok(event) => Some(event),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            debug!(skipped, "Change feed lagged");
            None
        }
        Err(broadcast::error::RecvError::Closed) => {
            *events = None;
            None
        }
    }
}

impl Api {
    /// Watch `fetch` using this facade's change feed, if it has one.
    pub async fn watch<T, F, Fut>(
        &self,
        interval: Duration,
        cancel: CancellationToken,
        fetch: F,
    ) -> (watch::Receiver<Option<T>>, JoinHandle<()>)
    where
        T: Send + Sync + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send,
    {
        refetch_on_change(self.subscribe().await, interval, cancel, fetch)
    }
}
