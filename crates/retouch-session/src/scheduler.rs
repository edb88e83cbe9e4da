//! Debounced, coalescing preview scheduling.
//!
//! The interactive thread reports every slider movement through
//! [`PreviewScheduler::settings_changed`] and calls
//! [`PreviewScheduler::poll`] from its event loop. The scheduler makes sure
//! that:
//!
//! - at most one preview run is in flight,
//! - bursts of changes collapse into a single run with the latest
//!   settings (debounce, then coalesce while busy),
//! - a result computed against a source that has since been replaced
//!   never reaches visible state.
//!
//! The transition rules live in [`PreviewState`], a pure state machine
//! with no threads or clocks, so they can be tested deterministically.

use std::time::{Duration, Instant};

use retouch_pipeline::{EditSettings, PipelineError};

use crate::ImageBytes;
use crate::worker::{Completion, Job, PipelineWorker, Token, WorkerGone};

/// Default quiet period before a slider change triggers a preview.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// How long input must be quiet before a run is requested.
    pub debounce: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Where the scheduler is.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Nothing in flight.
    Idle,
    /// A run is in flight; `pending` holds the latest request that arrived
    /// meanwhile.
    Running {
        /// Token of the in-flight run.
        token: Token,
        /// Settings to run next, replaced by each newer request.
        pending: Option<EditSettings>,
    },
}

/// Instruction to start a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispatch {
    /// Token the completion will carry.
    pub token: Token,
    /// Settings to run with.
    pub settings: EditSettings,
}

/// Why a completion was not published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The source was replaced after the run was issued.
    Stale,
    /// Newer settings were queued while the run was in flight.
    Superseded,
    /// The token does not match the in-flight run.
    Unknown,
}

/// What to do with a completion.
#[derive(Debug)]
pub enum Verdict {
    /// Show these bytes.
    Publish(Vec<u8>),
    /// Report this failure to the user.
    Fail(PipelineError),
    /// Drop the result.
    Discard(DiscardReason),
}

/// Outcome of feeding a completion to [`PreviewState::complete`].
#[derive(Debug)]
pub struct Transition {
    /// What to do with the completed result.
    pub verdict: Verdict,
    /// A follow-up run to start, if pending settings were waiting.
    pub dispatch: Option<Dispatch>,
}

/// Pure preview scheduling rules.
#[derive(Debug, Clone)]
pub struct PreviewState {
    phase: Phase,
    /// Highest token issued so far, including invalidations.
    issued: Token,
}

impl Default for PreviewState {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Idle,
            issued: Token::ZERO,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> &Phase {
        &self.phase
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// Highest token issued so far.
    #[must_use]
    pub const fn latest(&self) -> Token {
        self.issued
    }

    /// Ask for a preview with `settings`.
    ///
    /// Returns the run to start when idle. While running, the settings
    /// replace whatever was pending and `None` is returned.
    pub fn request(&mut self, settings: EditSettings) -> Option<Dispatch> {
        if let Phase::Running { pending, .. } = &mut self.phase {
            *pending = Some(settings);
            return None;
        }
        Some(self.dispatch(settings))
    }

    /// Mark every run issued so far as stale.
    ///
    /// Called when the source image is replaced. The in-flight run, if
    /// any, keeps running; its result will be discarded. Pending settings
    /// belonged to the old source and are dropped.
    pub fn invalidate(&mut self) {
        self.issued = self.issued.next();
        if let Phase::Running { pending, .. } = &mut self.phase {
            *pending = None;
        }
    }

    /// Feed a finished run back in.
    pub fn complete(
        &mut self,
        token: Token,
        outcome: Result<Vec<u8>, PipelineError>,
    ) -> Transition {
        let pending = match &mut self.phase {
            Phase::Running {
                token: in_flight,
                pending,
            } if *in_flight == token => pending.take(),
            _ => {
                return Transition {
                    verdict: Verdict::Discard(DiscardReason::Unknown),
                    dispatch: None,
                };
            }
        };

        let stale = token != self.issued;
        self.phase = Phase::Idle;
        let dispatch = pending.map(|settings| self.dispatch(settings));

        let verdict = if stale {
            Verdict::Discard(DiscardReason::Stale)
        } else if dispatch.is_some() {
            if let Err(err) = &outcome {
                log::warn!("preview {token} failed, retrying with newer settings: {err}");
            }
            Verdict::Discard(DiscardReason::Superseded)
        } else {
            match outcome {
                Ok(bytes) => Verdict::Publish(bytes),
                Err(err) => Verdict::Fail(err),
            }
        };

        Transition { verdict, dispatch }
    }

    /// Forget any in-flight run, e.g. after the worker went away.
    pub fn abandon(&mut self) {
        self.phase = Phase::Idle;
        self.invalidate();
    }

    fn dispatch(&mut self, settings: EditSettings) -> Dispatch {
        self.issued = self.issued.next();
        self.phase = Phase::Running {
            token: self.issued,
            pending: None,
        };
        Dispatch {
            token: self.issued,
            settings,
        }
    }
}

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

/// Trailing-edge debounce timer holding the most recent settings.
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    armed: Option<(Instant, EditSettings)>,
}

impl Debouncer {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            armed: None,
        }
    }

    /// Restart the timer with new settings.
    pub fn arm(&mut self, settings: EditSettings, now: Instant) {
        self.armed = Some((now + self.interval, settings));
    }

    /// Take the settings if the quiet period has elapsed.
    pub fn fire(&mut self, now: Instant) -> Option<EditSettings> {
        match self.armed {
            Some((due, settings)) if now >= due => {
                self.armed = None;
                Some(settings)
            }
            _ => None,
        }
    }

    /// When the timer will fire, if armed.
    #[must_use]
    pub fn due_at(&self) -> Option<Instant> {
        self.armed.map(|(due, _)| due)
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }
}

// ---------------------------------------------------------------------------
// Threaded scheduler
// ---------------------------------------------------------------------------

/// A visible preview outcome.
#[derive(Debug)]
pub enum PreviewEvent {
    /// Encoded preview for the current source and latest settings.
    Ready { token: Token, bytes: Vec<u8> },
    /// The current preview could not be produced.
    Failed { token: Token, error: PipelineError },
}

/// Preview scheduler driving a [`PipelineWorker`].
pub struct PreviewScheduler {
    state: PreviewState,
    debounce: Debouncer,
    source: Option<ImageBytes>,
    worker: PipelineWorker,
}

impl PreviewScheduler {
    /// Create a scheduler with its own worker thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the worker thread cannot be spawned.
    pub fn new(config: SchedulerConfig) -> std::io::Result<Self> {
        Ok(Self {
            state: PreviewState::new(),
            debounce: Debouncer::new(config.debounce),
            source: None,
            worker: PipelineWorker::spawn("retouch-preview")?,
        })
    }

    /// Replace the image previews are computed from.
    ///
    /// Any run already in flight becomes stale, and input that has not
    /// been dispatched yet is dropped.
    pub fn replace_source(&mut self, source: ImageBytes) {
        self.source = Some(source);
        self.state.invalidate();
        self.debounce.cancel();
    }

    /// Report a settings change; the run starts once input is quiet.
    pub fn settings_changed(&mut self, settings: EditSettings, now: Instant) {
        self.debounce.arm(settings, now);
    }

    /// Request a preview immediately, bypassing the debounce timer.
    pub fn request(&mut self, settings: EditSettings) {
        self.debounce.cancel();
        if let Some(dispatch) = self.state.request(settings) {
            self.start(dispatch);
        }
    }

    /// Fire the debounce timer if due and drain finished runs.
    ///
    /// Never blocks. Returns the first visible event, if any.
    pub fn poll(&mut self, now: Instant) -> Option<PreviewEvent> {
        if let Some(settings) = self.debounce.fire(now) {
            self.request(settings);
        }
        loop {
            match self.worker.try_completion() {
                Ok(Some(completion)) => {
                    if let Some(event) = self.handle(completion) {
                        return Some(event);
                    }
                }
                Ok(None) => return None,
                Err(gone) => {
                    self.worker_gone(&gone);
                    return None;
                }
            }
        }
    }

    /// Block until a visible event arrives or `timeout` passes.
    ///
    /// Honors the debounce timer while waiting. Intended for tools and
    /// tests; an interactive loop should use [`Self::poll`].
    pub fn wait(&mut self, timeout: Duration) -> Option<PreviewEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if let Some(event) = self.poll(now) {
                return Some(event);
            }
            if now >= deadline || (self.state.is_idle() && self.debounce.due_at().is_none()) {
                return None;
            }
            let wake = self
                .debounce
                .due_at()
                .map_or(deadline, |due| due.min(deadline));
            match self.worker.wait_completion(wake.saturating_duration_since(now)) {
                Ok(Some(completion)) => {
                    if let Some(event) = self.handle(completion) {
                        return Some(event);
                    }
                }
                Ok(None) => {}
                Err(gone) => {
                    self.worker_gone(&gone);
                    return None;
                }
            }
        }
    }

    /// Whether no run is in flight.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Whether a debounced request is waiting to fire.
    #[must_use]
    pub fn has_pending_input(&self) -> bool {
        self.debounce.due_at().is_some()
    }

    fn start(&mut self, dispatch: Dispatch) {
        let Some(source) = self.source.clone() else {
            log::debug!("no source image; dropping preview request {}", dispatch.token);
            self.state.abandon();
            return;
        };
        let job = Job {
            token: dispatch.token,
            source,
            settings: dispatch.settings,
        };
        if let Err(err) = self.worker.submit(job) {
            log::error!("cannot schedule preview {}: {err}", dispatch.token);
            self.state.abandon();
        }
    }

    fn worker_gone(&mut self, gone: &WorkerGone) {
        if !self.state.is_idle() {
            log::error!("preview run lost: {gone}");
            self.state.abandon();
        }
    }

    fn handle(&mut self, completion: Completion) -> Option<PreviewEvent> {
        let Completion { token, outcome } = completion;
        let transition = self.state.complete(token, outcome);
        if let Some(dispatch) = transition.dispatch {
            self.start(dispatch);
        }
        match transition.verdict {
            Verdict::Publish(bytes) => Some(PreviewEvent::Ready { token, bytes }),
            Verdict::Fail(error) => {
                log::warn!("preview {token} failed: {error}");
                Some(PreviewEvent::Failed { token, error })
            }
            Verdict::Discard(reason) => {
                log::debug!("discarding preview {token}: {reason:?}");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::Arc;

    use retouch_pipeline::{FilterKind, RgbImage, codec};

    use super::*;

    fn with_brightness(brightness: f32) -> EditSettings {
        EditSettings {
            brightness,
            ..EditSettings::default()
        }
    }

    fn ok() -> Result<Vec<u8>, PipelineError> {
        Ok(vec![7])
    }

    fn png(rgb: [u8; 3]) -> ImageBytes {
        let img = RgbImage::from_fn(8, 8, |_, _| image::Rgb(rgb));
        Arc::from(codec::encode_png(&img).unwrap())
    }

    // PreviewState

    #[test]
    fn idle_request_dispatches() {
        let mut state = PreviewState::new();
        let dispatch = state.request(with_brightness(1.2)).unwrap();
        assert_eq!(dispatch.settings, with_brightness(1.2));
        assert_eq!(
            state.phase(),
            &Phase::Running {
                token: dispatch.token,
                pending: None
            }
        );
    }

    #[test]
    fn requests_while_running_coalesce_to_latest() {
        let mut state = PreviewState::new();
        let first = state.request(with_brightness(1.1)).unwrap();
        assert!(state.request(with_brightness(1.2)).is_none());
        assert!(state.request(with_brightness(1.3)).is_none());

        let transition = state.complete(first.token, ok());
        assert!(matches!(
            transition.verdict,
            Verdict::Discard(DiscardReason::Superseded)
        ));
        let follow_up = transition.dispatch.unwrap();
        assert_eq!(follow_up.settings, with_brightness(1.3));
        assert!(follow_up.token > first.token);

        let last = state.complete(follow_up.token, ok());
        assert!(matches!(last.verdict, Verdict::Publish(_)));
        assert!(last.dispatch.is_none());
        assert!(state.is_idle());
    }

    #[test]
    fn result_after_source_replacement_is_stale() {
        let mut state = PreviewState::new();
        let t1 = state.request(with_brightness(1.1)).unwrap();
        state.invalidate();
        assert!(state.request(with_brightness(1.2)).is_none());

        let transition = state.complete(t1.token, ok());
        assert!(matches!(
            transition.verdict,
            Verdict::Discard(DiscardReason::Stale)
        ));
        let t2 = transition.dispatch.unwrap();
        assert!(t2.token > t1.token);

        let transition = state.complete(t2.token, ok());
        assert!(matches!(transition.verdict, Verdict::Publish(_)));
    }

    #[test]
    fn invalidation_drops_pending_settings() {
        let mut state = PreviewState::new();
        let t1 = state.request(with_brightness(1.1)).unwrap();
        assert!(state.request(with_brightness(1.2)).is_none());
        state.invalidate();

        let transition = state.complete(t1.token, ok());
        assert!(matches!(
            transition.verdict,
            Verdict::Discard(DiscardReason::Stale)
        ));
        assert!(transition.dispatch.is_none());
        assert!(state.is_idle());
    }

    #[test]
    fn stale_failures_are_not_reported() {
        let mut state = PreviewState::new();
        let t1 = state.request(EditSettings::default()).unwrap();
        state.invalidate();
        let transition = state.complete(t1.token, Err(PipelineError::EmptyInput));
        assert!(matches!(
            transition.verdict,
            Verdict::Discard(DiscardReason::Stale)
        ));
        assert!(transition.dispatch.is_none());
        assert!(state.is_idle());
    }

    #[test]
    fn current_failure_is_reported() {
        let mut state = PreviewState::new();
        let t1 = state.request(EditSettings::default()).unwrap();
        let transition = state.complete(t1.token, Err(PipelineError::EmptyInput));
        assert!(matches!(
            transition.verdict,
            Verdict::Fail(PipelineError::EmptyInput)
        ));
        assert!(state.is_idle());
    }

    #[test]
    fn failure_with_pending_retries() {
        let mut state = PreviewState::new();
        let t1 = state.request(EditSettings::default()).unwrap();
        let _ = state.request(with_brightness(0.5));
        let transition = state.complete(t1.token, Err(PipelineError::EmptyInput));
        assert!(matches!(
            transition.verdict,
            Verdict::Discard(DiscardReason::Superseded)
        ));
        assert_eq!(transition.dispatch.unwrap().settings, with_brightness(0.5));
    }

    #[test]
    fn unknown_token_changes_nothing() {
        let mut state = PreviewState::new();
        let t1 = state.request(EditSettings::default()).unwrap();
        let before = state.phase().clone();
        let transition = state.complete(t1.token.next().next(), ok());
        assert!(matches!(
            transition.verdict,
            Verdict::Discard(DiscardReason::Unknown)
        ));
        assert_eq!(state.phase(), &before);

        // And nothing is accepted while idle.
        let mut idle = PreviewState::new();
        let transition = idle.complete(Token::default(), ok());
        assert!(matches!(
            transition.verdict,
            Verdict::Discard(DiscardReason::Unknown)
        ));
    }

    #[test]
    fn tokens_strictly_increase() {
        let mut state = PreviewState::new();
        let mut last = state.latest();
        for i in 0..5 {
            if i % 2 == 0 {
                state.invalidate();
            }
            if let Some(d) = state.request(EditSettings::default()) {
                assert!(d.token > last);
                last = d.token;
                let _ = state.complete(d.token, ok());
            }
            assert!(state.latest() >= last);
        }
    }

    // Debouncer

    #[test]
    fn debounce_waits_for_quiet() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(150));
        debouncer.arm(with_brightness(1.1), start);
        debouncer.arm(
            with_brightness(1.2),
            start + Duration::from_millis(100),
        );
        // 150ms after the first change, but only 50ms after the second.
        assert!(debouncer.fire(start + Duration::from_millis(150)).is_none());
        assert_eq!(
            debouncer.fire(start + Duration::from_millis(250)),
            Some(with_brightness(1.2))
        );
        assert!(debouncer.fire(start + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn cancel_disarms() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::ZERO);
        debouncer.arm(EditSettings::default(), start);
        debouncer.cancel();
        assert!(debouncer.due_at().is_none());
        assert!(debouncer.fire(start).is_none());
    }

    // PreviewScheduler

    #[test]
    fn scheduler_publishes_pipeline_output() {
        let mut scheduler = PreviewScheduler::new(SchedulerConfig::default()).unwrap();
        let source = png([100, 150, 200]);
        scheduler.replace_source(Arc::clone(&source));

        let settings = EditSettings {
            filter: FilterKind::Grayscale,
            ..EditSettings::default()
        };
        scheduler.request(settings);
        match scheduler.wait(Duration::from_secs(10)) {
            Some(PreviewEvent::Ready { bytes, .. }) => {
                assert_eq!(bytes, retouch_pipeline::run(&source, &settings).unwrap());
            }
            other => panic!("expected a preview, got {other:?}"),
        }
        assert!(scheduler.is_idle());
    }

    #[test]
    fn scheduler_reports_failures() {
        let mut scheduler = PreviewScheduler::new(SchedulerConfig::default()).unwrap();
        scheduler.replace_source(Arc::from(vec![0u8, 1, 2]));
        scheduler.request(EditSettings::default());
        assert!(matches!(
            scheduler.wait(Duration::from_secs(10)),
            Some(PreviewEvent::Failed {
                error: PipelineError::Decode(_),
                ..
            })
        ));
    }

    #[test]
    fn scheduler_debounces_through_wait() {
        let mut scheduler = PreviewScheduler::new(SchedulerConfig {
            debounce: Duration::from_millis(20),
        })
        .unwrap();
        scheduler.replace_source(png([10, 20, 30]));
        let now = Instant::now();
        scheduler.settings_changed(with_brightness(1.5), now);
        assert!(scheduler.has_pending_input());
        // Too early: nothing dispatched yet.
        assert!(scheduler.poll(now).is_none());
        assert!(scheduler.is_idle());

        assert!(matches!(
            scheduler.wait(Duration::from_secs(10)),
            Some(PreviewEvent::Ready { .. })
        ));
        assert!(!scheduler.has_pending_input());
    }

    #[test]
    fn request_without_source_is_dropped() {
        let mut scheduler = PreviewScheduler::new(SchedulerConfig::default()).unwrap();
        scheduler.request(EditSettings::default());
        assert!(scheduler.is_idle());
        assert!(scheduler.wait(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn dead_worker_ends_wait_early() {
        let mut scheduler = PreviewScheduler::new(SchedulerConfig::default()).unwrap();
        scheduler.replace_source(png([60, 60, 60]));
        scheduler.request(EditSettings::default());
        // Take the result behind the scheduler's back, then stop the thread,
        // so the run stays in flight with nothing left to receive.
        let taken = scheduler
            .worker
            .wait_completion(Duration::from_secs(10))
            .unwrap();
        assert!(taken.is_some());
        scheduler.worker.shutdown();
        assert!(!scheduler.is_idle());

        let start = Instant::now();
        assert!(scheduler.wait(Duration::from_secs(10)).is_none());
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(scheduler.is_idle());
    }

    #[test]
    fn dead_worker_is_noticed_by_poll() {
        let mut scheduler = PreviewScheduler::new(SchedulerConfig::default()).unwrap();
        scheduler.replace_source(png([60, 60, 60]));
        scheduler.request(EditSettings::default());
        scheduler
            .worker
            .wait_completion(Duration::from_secs(10))
            .unwrap();
        scheduler.worker.shutdown();

        assert!(scheduler.poll(Instant::now()).is_none());
        assert!(scheduler.is_idle());
    }
}
