use futures::{Stream, StreamExt};
use log::{debug, trace};
use std::{future::Future, sync::Arc, time::Duration};
use tokio::{
    sync::{watch, Notify},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::error::ApiResult;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Latest poll outcome; `None` until the first fetch resolves.
pub type PollState<T> = Option<Result<T, String>>;

/// Controls a running poller. Dropping the handle stops polling.
pub struct PollHandle {
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Refetches now instead of waiting for the next tick.
    pub fn invalidate(&self) {
        self.refresh.notify_one();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Fetches immediately, then every `interval` (at least 1 ms), publishing
/// each result. Polling ends when the handle is dropped or every receiver is
/// gone.
pub fn spawn_poller<T, F, Fut>(
    interval: Duration,
    mut fetch: F,
) -> (PollHandle, watch::Receiver<PollState<T>>)
where
    T: Send + Sync + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ApiResult<T>> + Send,
{
    let (tx, rx) = watch::channel(None);
    let refresh = Arc::new(Notify::new());
    let wakeup = refresh.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => trace!("poll tick"),
                _ = wakeup.notified() => {
                    debug!("poll invalidated");
                    ticker.reset();
                }
            }

            let result = fetch().await.map_err(|e| e.to_string());
            if tx.send(Some(result)).is_err() {
                debug!("no poll subscribers left");
                break;
            }
        }
    });

    (PollHandle { refresh, task }, rx)
}

/// Row-level change notification from the backend's change stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: String,
    pub client_id: String,
}

/// Invalidates `handle` for every event that belongs to `user_id`. The events
/// carry no data of their own; the poller refetches. Returns the number of
/// invalidations once the stream ends.
pub async fn forward_changes<S>(mut events: S, user_id: &str, handle: &PollHandle) -> usize
where
    S: Stream<Item = ChangeEvent> + Unpin,
{
    let mut forwarded = 0;
    while let Some(event) = events.next().await {
        if event.client_id == user_id {
            debug!("change on {} for current user", event.table);
            handle.invalidate();
            forwarded += 1;
        }
    }
    forwarded
}
