use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use tracing::{debug, warn};

use crate::error::ScrapeError;
use crate::registrar::IdentifierRegistrar;
use crate::scrape::cancel::ScrapeGeneration;
use crate::scrape::dedup::DedupResolver;
use crate::scrape::model::{WalkLimits, WalkOutcome};
use crate::scrape::walker::walk;
use crate::store::ScrapeStore;
use crate::tree::node::UiNode;

use super::context::ScreenEvent;
use super::engine::{BatchReport, ScrapeEngine};

/// A finished walk waiting for persistence.
#[derive(Debug)]
pub struct ScrapeJob {
    pub event: ScreenEvent,
    pub outcome: WalkOutcome,
    pub generation: u64,
}

struct Envelope {
    job: ScrapeJob,
    reply: Sender<Result<BatchReport, ScrapeError>>,
}

#[derive(Debug)]
pub enum WaitOutcome {
    Done(Result<BatchReport, ScrapeError>),
    /// The batch is still running; it will finish without the caller.
    TimedOut,
}

/// Handle on a submitted batch.
pub struct PendingBatch {
    reply: Receiver<Result<BatchReport, ScrapeError>>,
}

impl PendingBatch {
    pub fn wait(&self, timeout: Duration) -> WaitOutcome {
        match self.reply.recv_timeout(timeout) {
            Ok(result) => WaitOutcome::Done(result),
            Err(RecvTimeoutError::Timeout) => WaitOutcome::TimedOut,
            Err(RecvTimeoutError::Disconnected) => WaitOutcome::Done(Err(ScrapeError::WorkerGone)),
        }
    }
}

// ============================================================================
// ScrapeWorker
// ============================================================================

/// Dedicated persistence thread. Jobs are drained one at a time in
/// submission order, so edge clears and edge writes of two batches never
/// interleave.
pub struct ScrapeWorker {
    sender: Option<Sender<Envelope>>,
    handle: Option<JoinHandle<()>>,
    generation: ScrapeGeneration,
    limits: WalkLimits,
    wait_timeout: Duration,
}

impl ScrapeWorker {
    pub fn spawn<S, R>(
        mut engine: ScrapeEngine<S, R>,
        generation: ScrapeGeneration,
        wait_timeout: Duration,
    ) -> Self
    where
        S: ScrapeStore + Send + 'static,
        R: IdentifierRegistrar + Send + 'static,
    {
        let limits = engine.config().limits;
        let (sender, receiver) = unbounded::<Envelope>();
        let current = generation.clone();

        let handle = std::thread::spawn(move || {
            for Envelope { job, reply } in receiver {
                let result = if current.current() != job.generation {
                    debug!(app_id = %job.event.app_id, generation = job.generation, "dropping superseded batch");
                    Err(ScrapeError::Superseded(job.generation))
                } else {
                    engine.commit(&job.event, job.outcome)
                };

                // The submitter may have stopped waiting.
                let _ = reply.send(result);
            }
        });

        Self {
            sender: Some(sender),
            handle: Some(handle),
            generation,
            limits,
            wait_timeout,
        }
    }

    pub fn generation(&self) -> &ScrapeGeneration {
        &self.generation
    }

    pub fn submit(&self, job: ScrapeJob) -> Result<PendingBatch, ScrapeError> {
        let sender = self.sender.as_ref().ok_or(ScrapeError::WorkerGone)?;
        let (reply, receiver) = bounded(1);

        sender
            .send(Envelope { job, reply })
            .map_err(|_| ScrapeError::WorkerGone)?;

        Ok(PendingBatch { reply: receiver })
    }

    /// Full event path: start a new generation, walk on the calling thread
    /// with a read-side resolver, hand the outcome to the worker and wait a
    /// bounded time for it.
    pub fn handle_event<N, D>(&self, event: ScreenEvent, root: N, resolver: &D) -> WaitOutcome
    where
        N: UiNode,
        D: DedupResolver + ?Sized,
    {
        let cancel = self.generation.begin();

        let outcome = match walk(root, &event.app_id, resolver, &self.limits, &cancel) {
            Ok(outcome) => outcome,
            Err(err) => return WaitOutcome::Done(Err(err.into())),
        };

        let job = ScrapeJob {
            event,
            outcome,
            generation: cancel.generation(),
        };

        match self.submit(job) {
            Ok(pending) => pending.wait(self.wait_timeout),
            Err(err) => WaitOutcome::Done(Err(err)),
        }
    }

    /// Stop accepting jobs, drain the queue and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("scrape worker panicked");
            }
        }
    }
}

impl Drop for ScrapeWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
