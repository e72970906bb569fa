use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::{
    channel::{mpsc, oneshot},
    pin_mut, select, FutureExt,
};
use murmur_api::{AutomationError, FinishReason, WorkerRequest, WorkerSender};
use rand::Rng;

use crate::{Dom, Locators};

/// Set on expand controls once clicked, so each one is clicked at most once
pub const CLICKED_MARKER: &str = "data-murmur-clicked";

#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub scroll_interval_min: Duration,
    pub scroll_interval_max: Duration,

    /// Iterations without any new comment before the loop considers it is done
    pub no_data_threshold: u32,

    pub max_container_retries: u32,
    pub container_retry_delay: Duration,
    pub panel_wait_timeout: Duration,
    pub panel_poll_interval: Duration,
    pub locators: Locators,
}

impl Default for DriverConfig {
    fn default() -> DriverConfig {
        DriverConfig {
            scroll_interval_min: Duration::from_millis(800),
            scroll_interval_max: Duration::from_millis(1200),
            no_data_threshold: 3,
            max_container_retries: 10,
            container_retry_delay: Duration::from_secs(1),
            panel_wait_timeout: Duration::from_secs(3),
            panel_poll_interval: Duration::from_millis(200),
            locators: Locators::default(),
        }
    }
}

impl DriverConfig {
    fn scroll_interval(&self) -> Duration {
        let min = self.scroll_interval_min.as_millis() as u64;
        let max = self.scroll_interval_max.as_millis() as u64;
        if max <= min {
            return self.scroll_interval_min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
    Continue,
    RetryContainer,
    Finished(FinishReason),
}

/// Counters of one loop run, never shared outside of it
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LoopState {
    pub no_data: u32,
    pub last_seen: u64,
    pub container_retries: u32,
}

impl LoopState {
    /// A loop that already saw `collected` comments, which therefore do not count as
    /// progress
    pub fn starting_at(collected: u64) -> LoopState {
        LoopState {
            last_seen: collected,
            ..LoopState::default()
        }
    }

    /// One iteration, minus the wait. `observed` is the highest collected count reported
    /// since the previous iteration.
    pub fn step(&mut self, dom: &dyn Dom, config: &DriverConfig, observed: Option<u64>) -> Step {
        let locators = &config.locators;
        let container = match locators.container.locate(dom) {
            Some(container) => container,
            None => {
                self.container_retries += 1;
                if self.container_retries >= config.max_container_retries {
                    tracing::error!(retries = self.container_retries, "scroll container not found");
                    return Step::Finished(FinishReason::ContainerNotFound);
                }
                tracing::warn!(retry = self.container_retries, "scroll container not found");
                return Step::RetryContainer;
            }
        };
        self.container_retries = 0;

        match observed {
            Some(count) if count > self.last_seen => {
                self.no_data = 0;
                self.last_seen = count;
            }
            _ => self.no_data += 1,
        }
        if self.no_data >= config.no_data_threshold {
            tracing::info!(iterations = self.no_data, "no new comments, finishing");
            return Step::Finished(FinishReason::Exhausted);
        }

        let mut clicked = 0;
        for button in locators.expand_replies.locate_all(dom) {
            if dom.attribute(button, CLICKED_MARKER).is_some() || !dom.is_visible(button) {
                continue;
            }
            dom.set_attribute(button, CLICKED_MARKER, "1");
            dom.click(button);
            clicked += 1;
        }
        if clicked > 0 {
            tracing::debug!(clicked, "expanded replies");
            self.no_data = 0;
        }

        dom.scroll_to_end(container);
        Step::Continue
    }
}

async fn sleep(d: Duration) {
    if let Err(err) = wasm_timer::Delay::new(d).await {
        tracing::warn!(?err, "timer failed, not waiting");
    }
}

struct RunningLoop {
    stop: oneshot::Sender<()>,
    progress: mpsc::UnboundedSender<u64>,
}

/// Page-side automation: opens the comment panel, then scrolls and expands replies
/// until the page stops yielding new comments.
pub struct Driver {
    dom: Arc<dyn Dom>,
    config: DriverConfig,
    worker: WorkerSender,
    running: parking_lot::Mutex<Option<RunningLoop>>,

    /// Highest collected count reported since the last begin
    reported: AtomicU64,
}

impl Driver {
    pub fn new(dom: Arc<dyn Dom>, config: DriverConfig, worker: WorkerSender) -> Driver {
        Driver {
            dom,
            config,
            worker,
            running: parking_lot::Mutex::new(None),
            reported: AtomicU64::new(0),
        }
    }

    pub fn dom(&self) -> &dyn Dom {
        &*self.dom
    }

    pub fn is_running(&self) -> bool {
        // the loop drops its progress receiver when it ends by itself
        matches!(&*self.running.lock(), Some(r) if !r.progress.is_closed())
    }

    /// Returns whether the comment panel had to be opened. Beginning while a loop is
    /// already running only acknowledges.
    pub async fn begin(&self) -> Result<bool, AutomationError> {
        if self.is_running() {
            tracing::info!("collection loop already running");
            return Ok(false);
        }
        self.reported.store(0, Ordering::SeqCst);
        let auto_opened = self.ensure_panel().await?;

        let (stop, stop_receiver) = oneshot::channel();
        let (progress, progress_receiver) = mpsc::unbounded();
        *self.running.lock() = Some(RunningLoop { stop, progress });
        // comments loaded while the panel opened are not progress of the loop
        let baseline = self.reported.load(Ordering::SeqCst);
        tokio::spawn(run_loop(
            self.dom.clone(),
            self.config.clone(),
            self.worker.clone(),
            LoopState::starting_at(baseline),
            progress_receiver,
            stop_receiver,
        ));
        tracing::info!(auto_opened, baseline, "collection loop started");
        Ok(auto_opened)
    }

    /// Idempotent, returns whether a loop was running
    pub fn stop(&self) -> bool {
        match self.running.lock().take() {
            Some(r) => {
                let _ = r.stop.send(());
                !r.progress.is_closed()
            }
            None => false,
        }
    }

    /// Feeds the running loop. Without one, it only raises the baseline of the next loop.
    pub fn report_progress(&self, collected: u64) {
        self.reported.fetch_max(collected, Ordering::SeqCst);
        if let Some(r) = &*self.running.lock() {
            let _ = r.progress.unbounded_send(collected);
        }
    }

    async fn ensure_panel(&self) -> Result<bool, AutomationError> {
        let locators = &self.config.locators;
        if locators.panel.locate_visible(self.dom()).is_some() {
            return Ok(false);
        }
        let control = locators
            .open_control
            .locate_visible(self.dom())
            .ok_or(AutomationError::ControlNotFound)?;
        tracing::info!("opening comment panel");
        self.dom.click(control);

        let deadline = wasm_timer::Instant::now() + self.config.panel_wait_timeout;
        loop {
            if locators.panel.locate_visible(self.dom()).is_some() {
                return Ok(true);
            }
            if wasm_timer::Instant::now() >= deadline {
                tracing::warn!("comment panel did not open");
                return Err(AutomationError::DidNotOpen);
            }
            sleep(self.config.panel_poll_interval).await;
        }
    }
}

async fn run_loop(
    dom: Arc<dyn Dom>,
    config: DriverConfig,
    worker: WorkerSender,
    mut state: LoopState,
    mut progress: mpsc::UnboundedReceiver<u64>,
    stop: oneshot::Receiver<()>,
) {
    let mut stop = stop.fuse();
    loop {
        let mut observed = None;
        while let Ok(Some(count)) = progress.try_next() {
            observed = observed.max(Some(count));
        }

        let wait = match state.step(&*dom, &config, observed) {
            Step::Continue => config.scroll_interval(),
            Step::RetryContainer => config.container_retry_delay,
            Step::Finished(reason) => {
                tracing::info!(?reason, collected = state.last_seen, "collection loop finished");
                if let Err(err) = worker.notify(WorkerRequest::LoopFinished { reason }) {
                    tracing::warn!(?err, "failed telling the worker the loop finished");
                }
                return;
            }
        };

        let delay = sleep(wait).fuse();
        pin_mut!(delay);
        select! {
            _ = stop => {
                tracing::info!("collection loop stopped");
                return;
            }
            _ = delay => (),
        }
    }
}
