//! Periodic delivery loop with start/stop control.
//!
//! The scheduler is either stopped or running. Starting spawns one background
//! task that runs a cycle immediately and then once per interval. Stopping
//! signals that task and returns without waiting: a cycle already in flight
//! finishes on its own and no further cycle starts.
//!
//! The state lock is held only while the flag and the stop handle change,
//! never across a cycle, so `stop` is safe to call from inside one. Cycles are
//! serialised by a separate gate held only by background tasks, so a loop
//! started right after a stop waits for the previous loop's last cycle.

use std::{sync::Arc, time::Duration};

use herald_common::internal;
use parking_lot::Mutex;
use tokio::{
    runtime::Handle,
    sync::{
        Mutex as CycleGate,
        oneshot::{self, error::TryRecvError},
    },
    time::{Instant, MissedTickBehavior},
};

use crate::{error::SchedulerError, sender::MessageSender};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct State {
    running: bool,
    stop: Option<oneshot::Sender<()>>,
}

#[derive(Debug)]
pub struct Scheduler {
    sender: Arc<dyn MessageSender>,
    interval: Duration,
    batch_size: usize,
    state: Mutex<State>,
    gate: Arc<CycleGate<()>>,
}

impl Scheduler {
    /// A stopped scheduler. Intervals below one millisecond are raised to it.
    #[must_use]
    pub fn new(sender: Arc<dyn MessageSender>, interval: Duration, batch_size: usize) -> Self {
        Self {
            sender,
            interval: interval.max(MIN_INTERVAL),
            batch_size,
            state: Mutex::default(),
            gate: Arc::default(),
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Start the loop. Starting a running scheduler does nothing.
    ///
    /// # Errors
    /// Returns [`SchedulerError::NoRuntime`] when called outside a tokio
    /// runtime; the scheduler stays stopped.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        let stop = {
            let mut state = self.state.lock();
            if state.running {
                internal!(level = DEBUG, "Scheduler already running");
                return Ok(());
            }

            let (tx, rx) = oneshot::channel();
            state.running = true;
            state.stop = Some(tx);
            rx
        };

        internal!(
            level = INFO,
            interval_secs = self.interval.as_secs_f64(),
            batch_size = self.batch_size,
            "Scheduler started"
        );

        runtime.spawn(run(
            Arc::clone(&self.sender),
            self.interval,
            self.batch_size,
            Arc::clone(&self.gate),
            stop,
        ));

        Ok(())
    }

    /// Signal the loop to stop. Stopping a stopped scheduler does nothing.
    ///
    /// # Errors
    /// Currently infallible; the `Result` keeps the control contract
    /// symmetric with [`Scheduler::start`].
    pub fn stop(&self) -> Result<(), SchedulerError> {
        let mut state = self.state.lock();
        if !state.running {
            internal!(level = DEBUG, "Scheduler already stopped");
            return Ok(());
        }

        if let Some(stop) = state.stop.take() {
            // The loop may already be gone; nothing to signal then.
            let _ = stop.send(());
        }
        state.running = false;

        internal!(level = INFO, "Scheduler stopped");
        Ok(())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }
}

async fn run(
    sender: Arc<dyn MessageSender>,
    interval: Duration,
    batch_size: usize,
    gate: Arc<CycleGate<()>>,
    mut stop: oneshot::Receiver<()>,
) {
    if !gated_cycle(sender.as_ref(), batch_size, &gate, &mut stop).await {
        internal!(level = DEBUG, "Scheduler stopped before its first cycle");
        return;
    }

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = ticker.tick() => {
                if !gated_cycle(sender.as_ref(), batch_size, &gate, &mut stop).await {
                    break;
                }
            }
        }
    }

    internal!(level = DEBUG, "Scheduler loop exited");
}

/// Run one cycle once no other loop is mid-cycle. Returns `false` without
/// running when the stop signal arrived while waiting.
async fn gated_cycle(
    sender: &dyn MessageSender,
    batch_size: usize,
    gate: &CycleGate<()>,
    stop: &mut oneshot::Receiver<()>,
) -> bool {
    let _turn = gate.lock().await;
    if !matches!(stop.try_recv(), Err(TryRecvError::Empty)) {
        return false;
    }

    cycle(sender, batch_size).await;
    true
}

async fn cycle(sender: &dyn MessageSender, batch_size: usize) {
    match sender.send_messages(batch_size).await {
        Ok(summary) => internal!(
            fetched = summary.fetched,
            delivered = summary.delivered,
            "Scheduled cycle finished"
        ),
        Err(e) => internal!(
            level = ERROR,
            error = %e,
            "Scheduled cycle failed, waiting for next tick"
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::{
        OnceLock,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use herald_store::{Message, StoreError};

    use super::*;
    use crate::{
        error::{DeliveryError, SystemError},
        sender::{CycleSummary, SendOutcome},
    };

    const INTERVAL: Duration = Duration::from_secs(120);

    /// Counts cycles; optionally fails every one.
    #[derive(Debug, Default)]
    struct CountingSender {
        cycles: AtomicUsize,
        fail: bool,
    }

    impl CountingSender {
        fn count(&self) -> usize {
            self.cycles.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MessageSender for CountingSender {
        async fn send_messages(&self, _batch_size: usize) -> Result<CycleSummary, DeliveryError> {
            self.cycles.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SystemError::Fetch(StoreError::Database("down".into())).into());
            }
            Ok(CycleSummary::default())
        }

        async fn send_message(&self, _message: &Message) -> Result<SendOutcome, DeliveryError> {
            Ok(SendOutcome::AlreadySent)
        }
    }

    /// Stops its own scheduler from inside the first cycle.
    #[derive(Debug, Default)]
    struct SelfStoppingSender {
        scheduler: OnceLock<Arc<Scheduler>>,
        cycles: AtomicUsize,
    }

    #[async_trait]
    impl MessageSender for SelfStoppingSender {
        async fn send_messages(&self, _batch_size: usize) -> Result<CycleSummary, DeliveryError> {
            self.cycles.fetch_add(1, Ordering::SeqCst);
            if let Some(scheduler) = self.scheduler.get() {
                scheduler.stop().unwrap();
            }
            Ok(CycleSummary::default())
        }

        async fn send_message(&self, _message: &Message) -> Result<SendOutcome, DeliveryError> {
            Ok(SendOutcome::AlreadySent)
        }
    }

    /// Takes five seconds per cycle and records how many cycles overlap.
    #[derive(Debug, Default)]
    struct SlowSender {
        cycles: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    #[async_trait]
    impl MessageSender for SlowSender {
        async fn send_messages(&self, _batch_size: usize) -> Result<CycleSummary, DeliveryError> {
            self.cycles.fetch_add(1, Ordering::SeqCst);
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_secs(5)).await;

            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(CycleSummary::default())
        }

        async fn send_message(&self, _message: &Message) -> Result<SendOutcome, DeliveryError> {
            Ok(SendOutcome::AlreadySent)
        }
    }

    fn scheduler(sender: &Arc<CountingSender>) -> Scheduler {
        Scheduler::new(sender.clone(), INTERVAL, 2)
    }

    /// Let spawned tasks run without moving the clock.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_runs_immediately_then_every_interval() {
        let sender = Arc::new(CountingSender::default());
        let scheduler = scheduler(&sender);

        scheduler.start().unwrap();
        settle().await;
        assert_eq!(sender.count(), 1);
        assert!(scheduler.is_running());

        tokio::time::sleep(INTERVAL * 3 + Duration::from_millis(1)).await;
        assert_eq!(sender.count(), 4);

        scheduler.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_keeps_a_single_loop() {
        let sender = Arc::new(CountingSender::default());
        let scheduler = scheduler(&sender);

        scheduler.start().unwrap();
        scheduler.start().unwrap();
        assert!(scheduler.is_running());

        tokio::time::sleep(INTERVAL * 2 + Duration::from_millis(1)).await;
        assert_eq!(sender.count(), 3);

        scheduler.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn double_stop_is_harmless() {
        let sender = Arc::new(CountingSender::default());
        let scheduler = scheduler(&sender);

        scheduler.stop().unwrap();
        assert!(!scheduler.is_running());

        scheduler.start().unwrap();
        scheduler.stop().unwrap();
        scheduler.stop().unwrap();
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_first_tick_allows_at_most_one_cycle() {
        let sender = Arc::new(CountingSender::default());
        let scheduler = scheduler(&sender);

        scheduler.start().unwrap();
        scheduler.stop().unwrap();

        tokio::time::sleep(INTERVAL * 5).await;
        assert!(sender.count() <= 1);
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_after_first_cycle_prevents_ticks() {
        let sender = Arc::new(CountingSender::default());
        let scheduler = scheduler(&sender);

        scheduler.start().unwrap();
        settle().await;
        scheduler.stop().unwrap();

        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(sender.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_cycles_do_not_stop_the_timer() {
        let sender = Arc::new(CountingSender {
            fail: true,
            ..CountingSender::default()
        });
        let scheduler = scheduler(&sender);

        scheduler.start().unwrap();
        tokio::time::sleep(INTERVAL * 2 + Duration::from_millis(1)).await;

        assert_eq!(sender.count(), 3);
        assert!(scheduler.is_running());
        scheduler.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop() {
        let sender = Arc::new(CountingSender::default());
        let scheduler = scheduler(&sender);

        scheduler.start().unwrap();
        settle().await;
        scheduler.stop().unwrap();
        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(sender.count(), 1);

        scheduler.start().unwrap();
        settle().await;
        assert_eq!(sender.count(), 2);

        tokio::time::sleep(INTERVAL + Duration::from_millis(1)).await;
        assert_eq!(sender.count(), 3);
        scheduler.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn restart_waits_for_the_cycle_in_flight() {
        let sender = Arc::new(SlowSender::default());
        let scheduler = Scheduler::new(sender.clone(), INTERVAL, 2);

        scheduler.start().unwrap();
        settle().await;
        assert_eq!(sender.active.load(Ordering::SeqCst), 1);

        scheduler.stop().unwrap();
        scheduler.start().unwrap();
        settle().await;

        // Only the old loop's cycle is running; the new loop is queued behind it.
        assert_eq!(sender.cycles.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(sender.cycles.load(Ordering::SeqCst), 2);
        assert_eq!(sender.max_active.load(Ordering::SeqCst), 1);
        assert!(scheduler.is_running());

        scheduler.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_while_queued_behind_a_cycle_runs_nothing() {
        let sender = Arc::new(SlowSender::default());
        let scheduler = Scheduler::new(sender.clone(), INTERVAL, 2);

        scheduler.start().unwrap();
        settle().await;
        scheduler.stop().unwrap();
        scheduler.start().unwrap();
        settle().await;
        scheduler.stop().unwrap();

        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(sender.cycles.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_from_inside_a_cycle_does_not_deadlock() {
        let sender = Arc::new(SelfStoppingSender::default());
        let scheduler = Arc::new(Scheduler::new(sender.clone(), INTERVAL, 1));
        sender.scheduler.set(Arc::clone(&scheduler)).unwrap();

        scheduler.start().unwrap();
        settle().await;
        assert!(!scheduler.is_running());

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(sender.cycles.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_scheduler_ends_the_loop() {
        let sender = Arc::new(CountingSender::default());
        let scheduler = scheduler(&sender);

        scheduler.start().unwrap();
        settle().await;
        drop(scheduler);

        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(sender.count(), 1);
    }

    #[test]
    fn start_outside_a_runtime_fails() {
        let sender = Arc::new(CountingSender::default());
        let scheduler = scheduler(&sender);

        assert!(matches!(scheduler.start(), Err(SchedulerError::NoRuntime)));
        assert!(!scheduler.is_running());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let sender = Arc::new(CountingSender::default());
        let scheduler = Scheduler::new(sender, Duration::ZERO, 2);

        assert_eq!(scheduler.interval(), MIN_INTERVAL);
        assert_eq!(scheduler.batch_size(), 2);
    }
}
