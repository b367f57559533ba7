//! # Task Controller
//!
//! Owns the lifecycle of at most one in-flight crawl job: submits it, polls
//! its status on a fixed cadence until it reaches a terminal state, and
//! publishes the current state through a `watch` channel.
//!
//! Every successful submit (and every reset) starts a new *generation*.
//! A poll only mutates state if the generation it was issued under is still
//! current, so late answers for a superseded job are dropped.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::application::controller_error::{ControllerError, ControllerResult};
use crate::domain::{JobRequest, StatusReport, TaskHandle, TaskSnapshot, TaskStatus};
use crate::infrastructure::config::TrackerConfig;
use crate::infrastructure::job_service::{HttpJobService, JobService};

/// Drives one remote job from submission to a terminal status
pub struct TaskController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    service: Arc<dyn JobService>,
    poll_interval: Duration,
    state: watch::Sender<TaskSnapshot>,
    cadence: Mutex<Option<PollingCadence>>,
    active_pollers: Arc<AtomicUsize>,
}

/// The background task polling one generation
struct PollingCadence {
    generation: u64,
    handle: TaskHandle,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Counts a live cadence task for as long as it exists
struct PollerGuard(Arc<AtomicUsize>);

impl PollerGuard {
    fn register(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for PollerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PollingCadence {
    fn stop(&self, reason: &str) {
        debug!(
            "Stopping polling cadence for {} (generation {}): {}",
            self.handle, self.generation, reason
        );
        self.cancel.cancel();
    }
}

impl TaskController {
    /// Creates a controller polling `service` every `poll_interval`
    #[must_use]
    pub fn new(service: Arc<dyn JobService>, poll_interval: Duration) -> Self {
        let (state, _) = watch::channel(TaskSnapshot::default());
        Self {
            inner: Arc::new(ControllerInner {
                service,
                poll_interval,
                state,
                cadence: Mutex::new(None),
                active_pollers: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Creates a controller talking HTTP to the configured service
    pub fn from_config(config: &TrackerConfig) -> ControllerResult<Self> {
        let service = HttpJobService::new(&config.service)?;
        Ok(Self::new(Arc::new(service), config.polling.interval()))
    }

    /// Submits `request` and starts polling the returned handle.
    ///
    /// Any previous job is superseded: its cadence is cancelled and nothing
    /// it still receives is applied. On failure the error is recorded and
    /// returned, and the previous job (if any) is left untouched.
    pub async fn submit(&self, request: JobRequest) -> ControllerResult<TaskHandle> {
        if let Err(err) = request.validate() {
            self.inner.record_error(None, &err);
            return Err(err);
        }

        info!(
            "🚀 Submitting crawl job for {} (max_pages={}, max_workers={}, include_subdomains={})",
            request.url, request.max_pages, request.max_workers, request.include_subdomains
        );

        let handle = match self.inner.service.create_job(&request).await {
            Ok(handle) => handle,
            Err(err) => {
                warn!("Job submission for {} failed: {}", request.url, err);
                let err = ControllerError::from(err);
                self.inner.record_error(None, &err);
                return Err(err);
            }
        };

        let generation = self.inner.activate(handle.clone());
        info!("Tracking task {} (generation {})", handle, generation);
        Ok(handle)
    }

    /// Reads the status of the active job once and applies it.
    ///
    /// Does not touch the cadence. A failure is recorded in the snapshot's
    /// error and returned; the last known status is kept.
    pub async fn poll(&self, handle: &TaskHandle) -> ControllerResult<StatusReport> {
        let generation = {
            let snapshot = self.inner.state.borrow();
            if !snapshot.tracks(handle) {
                return Err(ControllerError::InactiveHandle(handle.clone()));
            }
            snapshot.generation
        };
        let (report, applied) = self.inner.poll_generation(handle, generation).await?;
        if applied && report.status.is_terminal() {
            self.inner.finish_cadence(generation);
        }
        Ok(report)
    }

    /// Current observable state
    #[must_use]
    pub fn snapshot(&self) -> TaskSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TaskSnapshot> {
        self.inner.state.subscribe()
    }

    /// Stream of snapshots, starting with the current one
    #[must_use]
    pub fn updates(&self) -> WatchStream<TaskSnapshot> {
        WatchStream::new(self.subscribe())
    }

    /// Resolves once the tracked job is `COMPLETED` or `FAILED`.
    ///
    /// Never resolves if nothing is submitted and the state never turns
    /// terminal; wrap it in a timeout where that matters.
    pub async fn wait_until_terminal(&self) -> TaskSnapshot {
        let mut receiver = self.subscribe();
        match receiver.wait_for(TaskSnapshot::is_terminal).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Number of live polling cadences (0 or 1 once cancellations settle)
    #[must_use]
    pub fn active_pollers(&self) -> usize {
        self.inner.active_pollers.load(Ordering::SeqCst)
    }

    /// Whether a cadence is registered for the active job
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.inner.lock_cadence().is_some()
    }

    /// Forgets the current job: stops its cadence and clears handle,
    /// status, result and error.
    pub fn reset(&self) {
        let mut slot = self.inner.lock_cadence();
        self.inner.state.send_modify(|snapshot| {
            *snapshot = TaskSnapshot {
                generation: snapshot.generation + 1,
                updated_at: Some(Utc::now()),
                ..TaskSnapshot::default()
            };
        });
        if let Some(cadence) = slot.take() {
            cadence.stop("controller reset");
        }
    }

    /// Stops the cadence without clearing the observable state
    pub fn shutdown(&self) {
        if let Some(cadence) = self.inner.lock_cadence().take() {
            cadence.stop("controller shutdown");
        }
    }

    /// Asks the service whether it is up
    pub async fn check_service_health(&self) -> ControllerResult<bool> {
        Ok(self.inner.service.health().await?)
    }

    /// Absolute download link of the completed job, if any
    #[must_use]
    pub fn resolved_download_url(&self) -> Option<Url> {
        self.inner
            .state
            .borrow()
            .result
            .as_ref()
            .and_then(|result| result.resolve_download_url(self.inner.service.base_url()))
    }

    /// Downloads the completed job's result file to `path`, returning the
    /// number of bytes written.
    pub async fn download_result(&self, path: &Path) -> ControllerResult<usize> {
        let snapshot = self.snapshot();
        let handle = snapshot.handle.clone().ok_or(ControllerError::NoActiveTask)?;
        let link = snapshot
            .result
            .as_ref()
            .and_then(|result| result.download_url.clone())
            .filter(|_| snapshot.status == Some(TaskStatus::Completed))
            .ok_or_else(|| ControllerError::ResultUnavailable(handle.clone()))?;

        let bytes = match self.inner.service.download(&link).await {
            Ok(bytes) => bytes,
            Err(err) => {
                let err = ControllerError::from(err);
                self.inner.record_error(Some(snapshot.generation), &err);
                return Err(err);
            }
        };
        tokio::fs::write(path, &bytes).await?;
        info!("Saved results of {} to {} ({} bytes)", handle, path.display(), bytes.len());
        Ok(bytes.len())
    }
}

impl Drop for TaskController {
    fn drop(&mut self) {
        if let Some(cadence) = self.inner.lock_cadence().take() {
            cadence.stop("controller dropped");
            cadence.task.abort();
        }
    }
}

impl ControllerInner {
    fn lock_cadence(&self) -> MutexGuard<'_, Option<PollingCadence>> {
        self.cadence.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes `handle` the active job under a fresh generation and replaces
    /// the cadence.
    fn activate(self: &Arc<Self>, handle: TaskHandle) -> u64 {
        let mut slot = self.lock_cadence();

        let mut generation = 0;
        self.state.send_modify(|snapshot| {
            generation = snapshot.generation + 1;
            *snapshot = TaskSnapshot {
                generation,
                handle: Some(handle.clone()),
                status: Some(TaskStatus::Pending),
                result: None,
                error: None,
                updated_at: Some(Utc::now()),
            };
        });

        if let Some(previous) = slot.take() {
            previous.stop("superseded by a new submission");
        }
        *slot = Some(self.spawn_cadence(generation, handle));
        generation
    }

    fn spawn_cadence(self: &Arc<Self>, generation: u64, handle: TaskHandle) -> PollingCadence {
        let cancel = CancellationToken::new();
        // interval_at panics on a zero period
        let period = self.poll_interval.max(Duration::from_millis(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let guard = PollerGuard::register(&self.active_pollers);
        let task = tokio::spawn(run_cadence(
            Arc::downgrade(self),
            generation,
            handle.clone(),
            ticker,
            cancel.clone(),
            guard,
        ));

        debug!("Polling {} every {:?} (generation {})", handle, period, generation);
        PollingCadence {
            generation,
            handle,
            cancel,
            task,
        }
    }

    /// Clears the cadence slot if it still belongs to `generation`
    fn release_cadence(&self, generation: u64) {
        let mut slot = self.lock_cadence();
        if slot.as_ref().is_some_and(|c| c.generation == generation) {
            *slot = None;
        }
    }

    /// Stops the cadence of `generation` once its job is terminal
    fn finish_cadence(&self, generation: u64) {
        let mut slot = self.lock_cadence();
        if slot.as_ref().is_some_and(|c| c.generation == generation) {
            if let Some(cadence) = slot.take() {
                cadence.stop("terminal status");
            }
        }
    }

    /// Issues one status read and applies it if `generation` is still current.
    /// The flag reports whether the answer was applied.
    async fn poll_generation(
        &self,
        handle: &TaskHandle,
        generation: u64,
    ) -> ControllerResult<(StatusReport, bool)> {
        match self.service.read_status(handle).await {
            Ok(report) => {
                let applied = self.apply_report(handle, generation, &report);
                if !applied {
                    debug!("Discarded status {} for {} (generation {})", report.status, handle, generation);
                }
                Ok((report, applied))
            }
            Err(err) => {
                let err = ControllerError::from(err);
                if !self.record_error(Some(generation), &err) {
                    debug!("Discarded poll failure for superseded task {}: {}", handle, err);
                }
                Err(err)
            }
        }
    }

    fn apply_report(&self, handle: &TaskHandle, generation: u64, report: &StatusReport) -> bool {
        self.state.send_if_modified(|snapshot| {
            if snapshot.generation != generation || !snapshot.tracks(handle) {
                return false;
            }
            // terminal state is frozen until the next submit
            if snapshot.is_terminal() {
                return false;
            }
            snapshot.status = Some(report.status.clone());
            if let Some(result) = &report.result {
                snapshot.result = Some(result.clone());
            }
            snapshot.error = None;
            snapshot.updated_at = Some(Utc::now());
            true
        })
    }

    /// Records `err` in the snapshot. With `Some(generation)` the write only
    /// happens while that generation is current.
    fn record_error(&self, generation: Option<u64>, err: &ControllerError) -> bool {
        let message = err.to_string();
        self.state.send_if_modified(|snapshot| {
            if generation.is_some_and(|g| g != snapshot.generation) {
                return false;
            }
            snapshot.error = Some(message);
            snapshot.updated_at = Some(Utc::now());
            true
        })
    }
}

async fn run_cadence(
    inner: Weak<ControllerInner>,
    generation: u64,
    handle: TaskHandle,
    mut ticker: Interval,
    cancel: CancellationToken,
    _guard: PollerGuard,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(controller) = inner.upgrade() else {
            break;
        };
        let outcome = controller.poll_generation(&handle, generation).await;
        drop(controller);

        if cancel.is_cancelled() {
            break;
        }
        match outcome {
            Ok((report, true)) if report.status.is_terminal() => {
                info!("✅ Task {} finished with status {}", handle, report.status);
                break;
            }
            Ok((_, true)) => {}
            Ok((_, false)) => break,
            Err(err) if err_is_transient(&err) => {
                warn!("Poll of {} failed, retrying next tick: {}", handle, err);
            }
            Err(err) => {
                warn!("Poll of {} failed: {}", handle, err);
            }
        }
    }

    debug!("Polling cadence for {} ended (generation {})", handle, generation);
    if let Some(controller) = inner.upgrade() {
        controller.release_cadence(generation);
    }
}

fn err_is_transient(err: &ControllerError) -> bool {
    match err {
        ControllerError::Service(service) => service.is_transient(),
        _ => false,
    }
}
