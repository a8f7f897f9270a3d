use std::{
    fmt::Display,
    path::{Path, PathBuf},
    sync::Arc,
};

use miette::{miette, IntoDiagnostic, WrapErr};
use tracing::{debug, error, info};

use crate::{
    io::move_replace,
    outside::{Muxer, StreamResolver},
    result::{Error, Result},
    sanitize::sanitize,
    types::{Container, StreamPair, StreamVariant, VideoInfo},
    workspace::{Workspace, WorkspaceManager},
};

pub type JobId = u64;

/// Everything a job needs, shared by all the jobs of a scheduler
#[derive(Debug)]
pub struct JobContext {
    pub resolver: Arc<dyn StreamResolver>,
    pub muxer: Arc<dyn Muxer>,
    /// Root of the `<channel>/<title>.<ext>` tree, also holds the workspaces
    pub out_dir: PathBuf,
    pub container: Container,
    workspaces: WorkspaceManager,
}

impl JobContext {
    pub fn new(
        resolver: Arc<dyn StreamResolver>,
        muxer: Arc<dyn Muxer>,
        out_dir: PathBuf,
        container: Container,
    ) -> Self {
        Self {
            resolver,
            muxer,
            workspaces: WorkspaceManager::new(&out_dir),
            out_dir,
            container,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Resolving,
    SelectingStreams,
    Downloading,
    Merging,
    Relocating,
    Cleanup,
    Completed,
    Failed,
}

impl Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Resolving => "resolving",
            JobState::SelectingStreams => "selecting streams",
            JobState::Downloading => "downloading",
            JobState::Merging => "merging",
            JobState::Relocating => "relocating",
            JobState::Cleanup => "cleanup",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How a job ended
#[derive(Debug)]
pub enum JobOutcome {
    Completed { path: PathBuf },
    /// `stage` is the state the job was in when it failed
    Failed { stage: JobState, error: Error },
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}

impl Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Completed { path } => write!(f, "completed, saved to {}", path.display()),
            JobOutcome::Failed { stage, error } => write!(f, "failed while {stage}: {error}"),
        }
    }
}

/// Download, merge and file one video.
///
/// Once a workspace is acquired, it is released whatever the outcome.
#[derive(Debug)]
pub struct DownloadJob {
    id: JobId,
    url: String,
    ctx: Arc<JobContext>,
    state: JobState,
}

impl DownloadJob {
    pub fn new(id: JobId, url: String, ctx: Arc<JobContext>) -> Self {
        Self {
            id,
            url,
            ctx,
            state: JobState::Pending,
        }
    }

    /// Run the job to a terminal state. No step is ever retried.
    pub fn run(mut self) -> JobOutcome {
        info!("Job {}: processing {}", self.id, self.url);

        self.transition(JobState::Resolving);
        let video = match self.resolve() {
            Ok(video) => video,
            Err(err) => return self.fail(err),
        };

        self.transition(JobState::SelectingStreams);
        let Some(pair) = StreamPair::select(&video.variants, self.ctx.container) else {
            return self.fail(Error::NoSuitableStream);
        };
        debug!("Job {}: video {}, audio {}", self.id, pair.video, pair.audio);

        self.transition(JobState::Downloading);
        let workspace = match self.ctx.workspaces.acquire() {
            Ok(workspace) => workspace,
            Err(err) => return self.fail(Error::Transfer(err.into())),
        };

        let result = self.process(&video, &pair, &workspace);

        let stage = self.state;
        self.transition(JobState::Cleanup);
        workspace.release();

        match result {
            Ok(path) => {
                self.transition(JobState::Completed);
                info!(
                    "Job {}: '{}' ({}) saved to {}",
                    self.id,
                    video.title,
                    video.url,
                    path.display()
                );
                JobOutcome::Completed { path }
            }
            Err(error) => {
                // Report the stage that failed rather than the cleanup
                self.state = stage;
                self.fail(error)
            }
        }
    }

    fn resolve(&self) -> Result<VideoInfo> {
        let video = self.ctx.resolver.resolve(&self.url).map_err(|err| match err {
            err @ Error::Miette(_) => Error::Unavailable(err.to_string()),
            err => err,
        })?;

        if !video.available {
            return Err(Error::Unavailable(format!(
                "'{}' is not publicly available",
                video.title
            )));
        }

        debug!(
            "Job {}: '{}' by '{}', {} variants",
            self.id,
            video.title,
            video.channel,
            video.variants.len()
        );
        Ok(video)
    }

    /// The stages working inside the workspace
    fn process(
        &mut self,
        video: &VideoInfo,
        pair: &StreamPair,
        workspace: &Workspace,
    ) -> Result<PathBuf> {
        let container = pair.container();
        let video_file = workspace.video_file(container);
        let audio_file = workspace.audio_file(container);

        self.download(pair, &video_file, &audio_file)
            .map_err(|err| Error::Transfer(err.into()))?;

        self.transition(JobState::Merging);
        let merged = workspace.merged_file(container);
        self.ctx
            .muxer
            .mux(&video_file, &audio_file, &merged)
            .map_err(|err| Error::Merge(err.into()))?;

        self.transition(JobState::Relocating);
        self.relocate(video, &merged, container)
            .map_err(|err| Error::Relocation(err.into()))
    }

    /// Fetch both streams at the same time
    fn download(&self, pair: &StreamPair, video_file: &Path, audio_file: &Path) -> Result<()> {
        std::thread::scope(|scope| {
            let video = std::thread::Builder::new()
                .name(format!("job-{}-video", self.id))
                .spawn_scoped(scope, || self.fetch(&pair.video, video_file))
                .into_diagnostic()
                .wrap_err("Could not start the video download")?;

            let audio = self.fetch(&pair.audio, audio_file);
            let video = video
                .join()
                .map_err(|_| miette!("Video download panicked"))?;

            video.and(audio)
        })
    }

    fn fetch(&self, variant: &StreamVariant, dest: &Path) -> Result<()> {
        if dest.exists() {
            debug!("Job {}: {} already fetched", self.id, dest.display());
            return Ok(());
        }

        debug!("Job {}: fetching {variant}", self.id);
        self.ctx
            .resolver
            .fetch(&self.url, variant, dest)
            .map_err(|err| err.wrap_err_with(|| format!("Could not fetch {variant}")))
    }

    /// Move the merged file to `<out>/<channel>/<title>.<ext>`, replacing any previous file
    fn relocate(&self, video: &VideoInfo, merged: &Path, container: Container) -> Result<PathBuf> {
        let channel_dir = self.ctx.out_dir.join(sanitize(&video.channel));
        // Concurrent jobs of the same channel may race here, which create_dir_all tolerates
        std::fs::create_dir_all(&channel_dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not create {}", channel_dir.display()))?;

        let output = channel_dir.join(format!("{}.{}", sanitize(&video.title), container.ext()));
        move_replace(merged, &output)?;
        Ok(output)
    }

    fn transition(&mut self, next: JobState) {
        debug!("Job {}: {} -> {}", self.id, self.state, next);
        self.state = next;
    }

    fn fail(mut self, error: Error) -> JobOutcome {
        let stage = self.state;
        self.transition(JobState::Failed);

        let outcome = JobOutcome::Failed { stage, error };
        error!("Job {}: {} {outcome}", self.id, self.url);
        outcome
    }
}
