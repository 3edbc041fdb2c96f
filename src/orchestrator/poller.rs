//! Periodic status polling.
//!
//! A poller fetches the four status resources immediately on activation and then once per
//! period, publishing a [`StatusBoard`] through a watch channel. Each cycle is stamped with
//! an increasing sequence number so a slow response cannot overwrite a newer one.

use crate::api::ForgeApi;
use crate::board::{PollUpdate, ResourceUpdate, StatusBoard};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Owns a running poller. Dropping the handle deactivates it.
pub struct PollerHandle {
    cancel: CancellationToken,
    refresh: Arc<Notify>,
    board: watch::Receiver<StatusBoard>,
    task: Option<JoinHandle<()>>,
}

/// Cloneable trigger for an out-of-band poll cycle.
#[derive(Clone)]
pub struct Refresher {
    notify: Arc<Notify>,
}

impl Refresher {
    pub fn refresh_now(&self) {
        // notify_one keeps a permit if the poller is busy, so the request is not lost.
        self.notify.notify_one();
    }
}

impl PollerHandle {
    pub fn board(&self) -> watch::Receiver<StatusBoard> {
        self.board.clone()
    }

    pub fn refresher(&self) -> Refresher {
        Refresher {
            notify: self.refresh.clone(),
        }
    }

    /// Stop polling. In-flight requests are dropped and their results never applied.
    pub fn deactivate(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("poller deactivated");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// Start polling `api` every `period`. Must be called inside a tokio runtime.
pub fn activate(api: Arc<dyn ForgeApi>, period: Duration) -> PollerHandle {
    let cancel = CancellationToken::new();
    let refresh = Arc::new(Notify::new());
    let (board_tx, board) = watch::channel(StatusBoard::default());
    let task = tokio::spawn(poll_loop(
        api,
        period,
        cancel.clone(),
        refresh.clone(),
        board_tx,
    ));
    PollerHandle {
        cancel,
        refresh,
        board,
        task: Some(task),
    }
}

type InFlight = FuturesUnordered<BoxFuture<'static, PollUpdate>>;

async fn poll_loop(
    api: Arc<dyn ForgeApi>,
    period: Duration,
    cancel: CancellationToken,
    refresh: Arc<Notify>,
    board_tx: watch::Sender<StatusBoard>,
) {
    // The first tick completes immediately, which gives the fetch-on-activation.
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = InFlight::new();
    let mut seq = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                seq += 1;
                start_cycle(&api, seq, &mut in_flight);
                board_tx.send_modify(|b| b.cycles = seq);
            }
            _ = refresh.notified() => {
                seq += 1;
                start_cycle(&api, seq, &mut in_flight);
                board_tx.send_modify(|b| b.cycles = seq);
                ticker.reset();
            }
            Some(update) = in_flight.next(), if !in_flight.is_empty() => {
                let resource = update.update.name();
                if let ResourceUpdate::Workers(Err(e))
                | ResourceUpdate::Pending(Err(e))
                | ResourceUpdate::Completed(Err(e))
                | ResourceUpdate::Metrics(Err(e)) = &update.update
                {
                    tracing::warn!(resource, seq = update.seq, error = %e, "poll failed");
                }
                let update_seq = update.seq;
                board_tx.send_modify(|b| {
                    if !b.apply(update) {
                        tracing::debug!(resource, seq = update_seq, "discarded stale poll result");
                    }
                });
            }
        }
    }
}

fn start_cycle(api: &Arc<dyn ForgeApi>, seq: u64, in_flight: &mut InFlight) {
    tracing::debug!(seq, "poll cycle");
    for fetch in cycle_fetches(api, seq) {
        in_flight.push(fetch);
    }
}

fn cycle_fetches(api: &Arc<dyn ForgeApi>, seq: u64) -> [BoxFuture<'static, PollUpdate>; 4] {
    let err = |e: crate::error::ApiError| e.to_string();
    let (a, b, c, d) = (api.clone(), api.clone(), api.clone(), api.clone());
    [
        async move {
            let update = ResourceUpdate::Workers(a.minion_status().await.map_err(err));
            PollUpdate { seq, update }
        }
        .boxed(),
        async move {
            let update = ResourceUpdate::Pending(b.pending_tasks().await.map_err(err));
            PollUpdate { seq, update }
        }
        .boxed(),
        async move {
            let update = ResourceUpdate::Completed(c.completed_tasks().await.map_err(err));
            PollUpdate { seq, update }
        }
        .boxed(),
        async move {
            let update = ResourceUpdate::Metrics(d.minion_metrics().await.map_err(err));
            PollUpdate { seq, update }
        }
        .boxed(),
    ]
}

/// Run a single cycle to completion without a background task (headless mode).
pub async fn poll_once(api: &Arc<dyn ForgeApi>) -> StatusBoard {
    let mut board = StatusBoard {
        cycles: 1,
        ..Default::default()
    };
    for update in futures::future::join_all(cycle_fetches(api, 1)).await {
        board.apply(update);
    }
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::model::{Metrics, Status, Task};

    const PERIOD: Duration = Duration::from_secs(5);

    fn task(id: &str) -> Task {
        Task {
            task_id: id.into(),
            ..Default::default()
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_immediately_then_every_period() {
        let fake = Arc::new(FakeApi::default());
        let _poller = activate(fake.clone(), PERIOD);
        settle().await;
        assert_eq!(fake.calls("minion_status"), 1);
        assert_eq!(fake.calls("minion_metrics"), 1);

        tokio::time::sleep(PERIOD).await;
        assert_eq!(fake.calls("pending_tasks"), 2);
        assert_eq!(fake.calls("completed_tasks"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivated_before_first_tick_never_fetches_again() {
        let fake = Arc::new(FakeApi::default());
        let mut poller = activate(fake.clone(), PERIOD);
        settle().await;
        poller.deactivate();

        tokio::time::sleep(PERIOD * 4).await;
        assert_eq!(fake.total_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_polling() {
        let fake = Arc::new(FakeApi::default());
        let poller = activate(fake.clone(), PERIOD);
        settle().await;
        drop(poller);
        tokio::time::sleep(PERIOD * 3).await;
        assert_eq!(fake.total_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn late_result_after_deactivation_is_discarded() {
        let fake = Arc::new(FakeApi::default());
        fake.set_pending(vec![task("p1")]);
        fake.delay("pending_tasks", Duration::from_secs(2));
        let mut poller = activate(fake.clone(), PERIOD);
        let board = poller.board();
        settle().await;
        assert!(board.borrow().workers.data.is_some());
        assert!(board.borrow().pending.is_loading());

        poller.deactivate();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(board.borrow().pending.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_resource_keeps_other_snapshots() {
        let fake = Arc::new(FakeApi::default());
        fake.set_pending(vec![task("p1")]);
        fake.set_completed(vec![task("c1")]);
        fake.set_metrics(Metrics {
            cpu_percent: 12.0,
            ..Default::default()
        });
        fake.set_workers(vec![("w1", Status::Idle)]);
        let poller = activate(fake.clone(), PERIOD);
        let board = poller.board();
        settle().await;

        fake.fail("minion_metrics", true);
        tokio::time::sleep(PERIOD).await;

        let b = board.borrow();
        assert_eq!(b.pending()[0].task_id, "p1");
        assert_eq!(b.completed()[0].task_id, "c1");
        assert!(b.pending.error.is_none());
        assert!(b.metrics.error.is_some());
        assert_eq!(b.metrics.data.as_ref().map(|m| m.cpu_percent), Some(12.0));
        assert_eq!(b.cycles, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_now_runs_an_extra_cycle() {
        let fake = Arc::new(FakeApi::default());
        let poller = activate(fake.clone(), Duration::from_secs(60));
        settle().await;
        poller.refresher().refresh_now();
        settle().await;
        assert_eq!(fake.calls("minion_status"), 2);
    }

    #[tokio::test]
    async fn poll_once_fills_every_slot() {
        let fake = Arc::new(FakeApi::default());
        fake.set_workers(vec![("w1", Status::Busy)]);
        fake.fail("completed_tasks", true);
        let api: Arc<dyn ForgeApi> = fake;
        let board = poll_once(&api).await;
        assert_eq!(board.workers().len(), 1);
        assert!(board.pending.data.is_some());
        assert!(board.completed.error.is_some());
        assert!(board.metrics.data.is_some());
    }
}
