//! In-process stand-ins for the external programs, to run jobs without network.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use miette::IntoDiagnostic;

use crate::{
    job::JobContext,
    outside::{Muxer, StreamResolver},
    result::{bail, Error, Result},
    types::{Container, MediaKind, StreamVariant, VideoInfo},
};

pub fn job_context(out: &Path, resolver: FakeResolver, muxer: FakeMuxer) -> JobContext {
    JobContext::new(
        Arc::new(resolver),
        Arc::new(muxer),
        out.to_path_buf(),
        Container::Mp4,
    )
}

pub fn context(out: &Path, resolver: FakeResolver, muxer: FakeMuxer) -> Arc<JobContext> {
    Arc::new(job_context(out, resolver, muxer))
}

/// Counts the resolutions running at the same time
#[derive(Debug, Default)]
pub struct Gauge {
    active: AtomicUsize,
    max_active: AtomicUsize,
    finished: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
enum Resolution {
    Public,
    Unavailable,
    Private,
    Broken,
}

#[derive(Debug)]
pub struct FakeResolver {
    title: String,
    channel: String,
    resolution: Resolution,
    variants: Vec<StreamVariant>,
    fail_fetch: bool,
    payload: String,
    delay: Duration,
    gauge: Arc<Gauge>,
}

fn variant(format_id: &str, kind: MediaKind, quality: u32) -> StreamVariant {
    StreamVariant {
        format_id: format_id.to_string(),
        container: Container::Mp4,
        kind,
        quality,
        adaptive: kind != MediaKind::Progressive,
    }
}

impl FakeResolver {
    /// A public video offering 144p, 720p and 360p video and 64 and 128 kbps audio
    pub fn new(title: &str, channel: &str) -> Self {
        Self {
            title: title.to_string(),
            channel: channel.to_string(),
            resolution: Resolution::Public,
            variants: vec![
                variant("18", MediaKind::Progressive, 360),
                variant("160", MediaKind::VideoOnly, 144),
                variant("136", MediaKind::VideoOnly, 720),
                variant("134", MediaKind::VideoOnly, 360),
                variant("139", MediaKind::AudioOnly, 64),
                variant("140", MediaKind::AudioOnly, 128),
            ],
            fail_fetch: false,
            payload: String::new(),
            delay: Duration::ZERO,
            gauge: Arc::default(),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.resolution = Resolution::Unavailable;
        self
    }

    pub fn private(mut self) -> Self {
        self.resolution = Resolution::Private;
        self
    }

    pub fn failing_resolution(mut self) -> Self {
        self.resolution = Resolution::Broken;
        self
    }

    pub fn without_audio(mut self) -> Self {
        self.variants.retain(|v| v.kind != MediaKind::AudioOnly);
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    /// Prefix of the data written to fetched files
    pub fn with_payload(mut self, payload: &str) -> Self {
        self.payload = payload.to_string();
        self
    }

    /// Time spent resolving
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_gauge(mut self, gauge: Arc<Gauge>) -> Self {
        self.gauge = gauge;
        self
    }
}

impl StreamResolver for FakeResolver {
    fn resolve(&self, url: &str) -> Result<VideoInfo> {
        self.gauge.enter();
        std::thread::sleep(self.delay);
        self.gauge.leave();

        match self.resolution {
            Resolution::Unavailable => {
                return Err(Error::Unavailable("Video unavailable".to_string()))
            }
            Resolution::Broken => return bail("unable to download webpage"),
            Resolution::Public | Resolution::Private => {}
        }

        Ok(VideoInfo {
            url: url.to_string(),
            title: self.title.clone(),
            channel: self.channel.clone(),
            available: !matches!(self.resolution, Resolution::Private),
            variants: self.variants.clone(),
        })
    }

    fn fetch(&self, _url: &str, variant: &StreamVariant, dest: &Path) -> Result<()> {
        if self.fail_fetch {
            return bail("connection reset by peer");
        }
        std::fs::write(dest, format!("{}{}", self.payload, variant.format_id)).into_diagnostic()?;
        Ok(())
    }
}

/// Writes `<video data>+<audio data>` to the output, or fails like a non-0 exit
#[derive(Debug)]
pub struct FakeMuxer {
    succeed: bool,
}

impl FakeMuxer {
    pub fn succeeding() -> Self {
        Self { succeed: true }
    }

    pub fn failing() -> Self {
        Self { succeed: false }
    }
}

impl Muxer for FakeMuxer {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        if !self.succeed {
            return bail("ffmpeg did run but was not successful");
        }

        let video = std::fs::read_to_string(video).into_diagnostic()?;
        let audio = std::fs::read_to_string(audio).into_diagnostic()?;
        std::fs::write(output, format!("{video}+{audio}")).into_diagnostic()?;
        Ok(())
    }
}
