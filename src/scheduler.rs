use std::{
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread::JoinHandle,
};

use crossbeam_channel::{bounded, Receiver, Sender};
use miette::{miette, IntoDiagnostic, WrapErr};
use tracing::{debug, error, info};

use crate::{
    job::{DownloadJob, JobContext, JobId, JobOutcome, JobState},
    result::{Error, Result},
    utils::MutexUtils,
};

struct JobHandle {
    id: JobId,
    url: String,
    thread: JoinHandle<JobOutcome>,
}

/// Jobs launched so far. Append-only until shutdown drains it.
struct Registry {
    accepting: bool,
    next_id: JobId,
    jobs: Vec<JobHandle>,
}

/// Runs every submitted URL as a job on its own thread.
///
/// Without a limit, there is no admission control: every submission starts
/// working immediately.
pub struct Scheduler {
    ctx: Arc<JobContext>,
    permits: Option<Permits>,
    in_flight: InFlight,
    registry: Mutex<Registry>,
}

impl Scheduler {
    pub fn new(ctx: JobContext, max_concurrent_jobs: Option<NonZeroUsize>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            permits: max_concurrent_jobs.map(Permits::new),
            in_flight: InFlight::default(),
            registry: Mutex::new(Registry {
                accepting: true,
                next_id: 1,
                jobs: Vec::new(),
            }),
        }
    }

    /// Start a job for the URL and return without waiting for it.
    ///
    /// Return [`Error::ShuttingDown`] once [`Scheduler::shutdown`] has been called.
    pub fn submit(&self, url: &str) -> Result<JobId> {
        self.registry.with_lock(|mut registry| {
            if !registry.accepting {
                return Err(Error::ShuttingDown);
            }

            let id = registry.next_id;
            let job = DownloadJob::new(id, url.to_string(), self.ctx.clone());
            let permits = self.permits.clone();
            // Counted before the thread exists, so it never goes below 0
            let running = self.in_flight.enter();

            let thread = std::thread::Builder::new()
                .name(format!("job-{id}"))
                .spawn(move || {
                    let _running = running;
                    let _permit = permits.as_ref().map(Permits::acquire);
                    job.run()
                })
                .into_diagnostic()
                .wrap_err("Could not start a job thread")?;

            registry.next_id += 1;
            registry.jobs.push(JobHandle {
                id,
                url: url.to_string(),
                thread,
            });
            debug!("Job {id} submitted, {} in total", registry.jobs.len());
            Ok(id)
        })
    }

    /// Number of jobs not yet in a terminal state
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    /// A handle on the in-flight count that stays valid during [`Scheduler::shutdown`]
    pub fn in_flight_counter(&self) -> InFlight {
        self.in_flight.clone()
    }

    /// Refuse new jobs, then wait for every job to reach a terminal state.
    ///
    /// Jobs are never interrupted: this returns once the last one has finished on its own.
    pub fn shutdown(&self) -> ShutdownReport {
        let jobs = self.registry.with_lock(|mut registry| {
            registry.accepting = false;
            std::mem::take(&mut registry.jobs)
        });

        let running = self.in_flight.get();
        if running > 0 {
            info!("Waiting for {running} running job(s) to finish");
        }

        let outcomes = jobs
            .into_iter()
            .map(|JobHandle { id, url, thread }| {
                let outcome = thread.join().unwrap_or_else(|_| {
                    error!("Job {id}: {url} panicked");
                    JobOutcome::Failed {
                        stage: JobState::Failed,
                        error: Error::Miette(miette!("Job thread panicked")),
                    }
                });
                (id, outcome)
            })
            .collect();

        ShutdownReport { outcomes }
    }
}

/// Final outcome of every job, in submission order
#[derive(Debug)]
pub struct ShutdownReport {
    pub outcomes: Vec<(JobId, JobOutcome)>,
}

impl ShutdownReport {
    pub fn completed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_completed())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.completed()
    }
}

/// Shared count of the jobs whose thread has not ended yet
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Running {
        self.0.fetch_add(1, Ordering::SeqCst);
        Running(self.0.clone())
    }
}

/// Decrements the count when dropped, even by a panicking job
struct Running(Arc<AtomicUsize>);

impl Drop for Running {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Caps the number of jobs past the pending state.
///
/// A job holds one slot of the bounded channel while it runs, the
/// others block on sending until a slot is freed.
/// `freed` keeps the channel connected, so sending only ever blocks.
#[derive(Clone)]
struct Permits {
    slots: Sender<()>,
    freed: Receiver<()>,
}

struct Permit {
    freed: Receiver<()>,
}

impl Permits {
    fn new(limit: NonZeroUsize) -> Self {
        let (slots, freed) = bounded(limit.get());
        Self { slots, freed }
    }

    fn acquire(&self) -> Permit {
        if let Err(err) = self.slots.send(()) {
            debug!("Permit channel disconnected, running unrestricted: {err}");
        }
        Permit {
            freed: self.freed.clone(),
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        let _ = self.freed.try_recv();
    }
}
