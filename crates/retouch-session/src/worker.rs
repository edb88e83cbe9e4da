//! Background thread for off-interactive-thread pipeline runs.
//!
//! [`PipelineWorker`] owns one long-lived thread running
//! [`retouch_pipeline::run`]. Jobs go in over a channel tagged with a
//! [`Token`]; completions come back over a second channel carrying the
//! same token so the caller can detect stale results. The interactive
//! side only ever does non-blocking receives unless it explicitly asks
//! to wait.
//!
//! There is no preemption: a job that has started always runs to
//! completion, and its result is filtered by the receiver.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use retouch_pipeline::{EditSettings, PipelineError};

use crate::ImageBytes;

/// Monotonically increasing identifier of a preview request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u64);

impl Token {
    /// The token before any request has been issued.
    pub const ZERO: Self = Self(0);

    /// The token after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One unit of work: a snapshot of the source bytes and the settings to
/// apply.
#[derive(Debug, Clone)]
pub struct Job {
    /// Request token, echoed back in the [`Completion`].
    pub token: Token,
    /// Read-only source image.
    pub source: ImageBytes,
    /// Settings captured when the job was issued.
    pub settings: EditSettings,
}

/// The result of a [`Job`].
#[derive(Debug)]
pub struct Completion {
    /// Token of the job that produced this result.
    pub token: Token,
    /// Encoded output or the pipeline error.
    pub outcome: Result<Vec<u8>, PipelineError>,
}

/// The worker thread has exited and can no longer accept jobs.
#[derive(Debug, thiserror::Error)]
#[error("pipeline worker thread is no longer running")]
pub struct WorkerGone;

/// A pipeline runner on a dedicated thread.
///
/// Create one per consumer and reuse it for every run. Dropping the
/// worker closes its job queue and joins the thread after the current
/// job (if any) finishes.
pub struct PipelineWorker {
    jobs: Option<Sender<Job>>,
    completions: Receiver<Completion>,
    handle: Option<JoinHandle<()>>,
}

impl PipelineWorker {
    /// Spawn the worker thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be created.
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (job_tx, job_rx) = channel::unbounded::<Job>();
        let (done_tx, done_rx) = channel::unbounded::<Completion>();

        let handle = std::thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                for job in job_rx {
                    log::trace!("worker picked up job {}", job.token);
                    let outcome = retouch_pipeline::run(&job.source, &job.settings);
                    if done_tx
                        .send(Completion {
                            token: job.token,
                            outcome,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                log::debug!("pipeline worker exiting");
            })?;

        Ok(Self {
            jobs: Some(job_tx),
            completions: done_rx,
            handle: Some(handle),
        })
    }

    /// Queue a job.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerGone`] if the worker thread has exited.
    pub fn submit(&self, job: Job) -> Result<(), WorkerGone> {
        self.jobs
            .as_ref()
            .ok_or(WorkerGone)?
            .send(job)
            .map_err(|_| WorkerGone)
    }

    /// Take a finished result without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerGone`] once the thread has exited and every result
    /// it sent has been taken.
    pub fn try_completion(&self) -> Result<Option<Completion>, WorkerGone> {
        match self.completions.try_recv() {
            Ok(completion) => Ok(Some(completion)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerGone),
        }
    }

    /// Block for up to `timeout` waiting for a finished result.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerGone`] as soon as the thread has exited and every
    /// result it sent has been taken.
    pub fn wait_completion(&self, timeout: Duration) -> Result<Option<Completion>, WorkerGone> {
        match self.completions.recv_timeout(timeout) {
            Ok(completion) => Ok(Some(completion)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerGone),
        }
    }

    /// Close the job queue and join the thread.
    ///
    /// The job in progress (if any) finishes and its result stays
    /// receivable. Later submits fail with [`WorkerGone`].
    pub fn shutdown(&mut self) {
        // Closing the queue ends the worker's receive loop.
        self.jobs.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("pipeline worker thread panicked");
        }
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use retouch_pipeline::{RgbImage, codec};

    use super::*;

    fn tiny_png() -> ImageBytes {
        let img = RgbImage::from_fn(4, 4, |_, _| image::Rgb([50, 100, 150]));
        Arc::from(codec::encode_png(&img).unwrap())
    }

    #[test]
    fn tokens_increase() {
        let t = Token::default();
        assert!(t.next() > t);
        assert_eq!(t.next().get(), 1);
        assert_eq!(t.next().to_string(), "#1");
    }

    #[test]
    fn completion_echoes_token() {
        let worker = PipelineWorker::spawn("test-worker").unwrap();
        let token = Token::default().next().next();
        worker
            .submit(Job {
                token,
                source: tiny_png(),
                settings: EditSettings::default(),
            })
            .unwrap();
        let done = worker.wait_completion(Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!(done.token, token);
        assert!(done.outcome.is_ok());
    }

    #[test]
    fn failures_are_returned_not_panicked() {
        let worker = PipelineWorker::spawn("test-worker").unwrap();
        worker
            .submit(Job {
                token: Token::default(),
                source: Arc::from(vec![1u8, 2, 3]),
                settings: EditSettings::default(),
            })
            .unwrap();
        let done = worker.wait_completion(Duration::from_secs(10)).unwrap().unwrap();
        assert!(matches!(done.outcome, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn jobs_complete_in_submission_order() {
        let worker = PipelineWorker::spawn("test-worker").unwrap();
        let first = Token::default().next();
        let second = first.next();
        for token in [first, second] {
            worker
                .submit(Job {
                    token,
                    source: tiny_png(),
                    settings: EditSettings::default(),
                })
                .unwrap();
        }
        let a = worker.wait_completion(Duration::from_secs(10)).unwrap().unwrap();
        let b = worker.wait_completion(Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!((a.token, b.token), (first, second));
    }

    #[test]
    fn try_completion_is_non_blocking() {
        let worker = PipelineWorker::spawn("test-worker").unwrap();
        assert!(worker.try_completion().unwrap().is_none());
    }

    #[test]
    fn shutdown_keeps_last_result_then_reports_gone() {
        let mut worker = PipelineWorker::spawn("test-worker").unwrap();
        worker
            .submit(Job {
                token: Token::ZERO.next(),
                source: tiny_png(),
                settings: EditSettings::IDENTITY,
            })
            .unwrap();
        worker.shutdown();

        let done = worker.wait_completion(Duration::from_secs(10)).unwrap().unwrap();
        assert!(done.outcome.is_ok());

        let start = std::time::Instant::now();
        assert!(worker.wait_completion(Duration::from_secs(10)).is_err());
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(worker.try_completion().is_err());
        assert!(
            worker
                .submit(Job {
                    token: Token::ZERO.next().next(),
                    source: tiny_png(),
                    settings: EditSettings::IDENTITY,
                })
                .is_err()
        );
    }
}
