use crate::activity::Activity;
use crate::error::{Result, StreamxError};
use crate::handler::SampleHandler;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, timer not started.
    Idle,
    /// Timer running, waiting for the next tick.
    Armed,
    /// A cycle is in progress.
    Running,
    /// Closed for good.
    Closed,
}

/// Drives a [`SampleHandler`] at a fixed period.
///
/// Every tick creates an [`Activity`] and runs `started` then `stopped` on a
/// blocking thread; the timer waits for the cycle before the next tick, and
/// ticks missed while a cycle overran are skipped.
pub struct Scheduler {
    name: String,
    handler: Arc<SampleHandler>,
    initial_delay: Duration,
    period: Duration,
    state: Arc<Mutex<SchedulerState>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(handler: Arc<SampleHandler>) -> Self {
        let config = handler.config();
        Self {
            name: handler.name().to_string(),
            initial_delay: config.initial_delay(),
            period: config.period(),
            handler,
            state: Arc::new(Mutex::new(SchedulerState::Idle)),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &Arc<SampleHandler> {
        &self.handler
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock()
    }

    /// Starts the timer. Must be called inside a tokio runtime.
    pub fn open(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            match *state {
                SchedulerState::Idle => *state = SchedulerState::Armed,
                SchedulerState::Closed => {
                    return Err(StreamxError::Scheduler(format!("scheduler {} is closed", self.name)))
                }
                SchedulerState::Armed | SchedulerState::Running => {
                    return Err(StreamxError::Config(format!(
                        "scheduler {} is already open",
                        self.name
                    )))
                }
            }
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                *self.state.lock() = SchedulerState::Idle;
                return Err(StreamxError::Scheduler(format!("no tokio runtime: {e}")));
            }
        };

        let handler = self.handler.clone();
        let state = self.state.clone();
        let cancel = self.cancel.clone();
        let name = self.name.clone();
        let start = Instant::now() + self.initial_delay;
        let period = self.period;

        let task = runtime.spawn(async move {
            let mut tick = interval_at(start, period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(sampler = %name, period_ms = period.as_millis() as u64, "Scheduler armed");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tick.tick() => {
                        if let Err(e) = run_cycle(&handler, &state, &name).await {
                            tracing::error!(sampler = %name, error = %e, "Sampling cycle failed");
                        }
                    }
                }
            }
            tracing::debug!(sampler = %name, "Scheduler loop stopped");
        });
        *self.task.lock() = Some(task);
        Ok(())
    }

    /// Runs one cycle now, outside the timer, and returns its activity.
    pub async fn run(&self) -> Result<Activity> {
        run_cycle(&self.handler, &self.state, &self.name).await
    }

    /// Stops the timer, waits for an in-flight cycle and releases the
    /// handler. Calling it again does nothing.
    pub async fn close(&self) {
        {
            let mut state = self.state.lock();
            if *state == SchedulerState::Closed {
                return;
            }
            *state = SchedulerState::Closed;
        }
        self.cancel.cancel();

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(sampler = %self.name, error = %e, "Scheduler task ended abnormally");
            }
        }

        let handler = self.handler.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || handler.cleanup()).await {
            tracing::warn!(sampler = %self.name, error = %e, "Handler cleanup failed");
        }
        tracing::info!(sampler = %self.name, "Scheduler closed");
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }
}

async fn run_cycle(
    handler: &Arc<SampleHandler>,
    state: &Arc<Mutex<SchedulerState>>,
    name: &str,
) -> Result<Activity> {
    let previous = {
        let mut current = state.lock();
        let previous = *current;
        match previous {
            SchedulerState::Closed => {
                return Err(StreamxError::Scheduler(format!("scheduler {name} is closed")))
            }
            SchedulerState::Idle | SchedulerState::Armed => *current = SchedulerState::Running,
            SchedulerState::Running => {}
        }
        previous
    };

    let handler = handler.clone();
    let mut activity = Activity::new(name);
    let result = tokio::task::spawn_blocking(move || {
        handler.started(&mut activity);
        activity.stop();
        handler.stopped(&mut activity);
        activity
    })
    .await;

    {
        let mut current = state.lock();
        if *current == SchedulerState::Running && previous != SchedulerState::Running {
            *current = previous;
        }
    }

    result.map_err(|e| StreamxError::Scheduler(format!("sampling cycle panicked: {e}")))
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("period", &self.period)
            .finish()
    }
}
