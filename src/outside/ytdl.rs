use std::{
    ffi::{OsStr, OsString},
    fmt::Debug,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use miette::{IntoDiagnostic, WrapErr};
use serde::Deserialize;

use super::command::{run_command, unsuccessful, Capture};
use crate::{
    result::{Error, Result},
    types::{Container, MediaKind, StreamVariant, VideoInfo},
};

/// Interface for discovering and downloading the streams of a video
pub trait StreamResolver: Send + Sync + Debug {
    /// Get the video metadata and the list of its stream variants.
    ///
    /// Return [`Error::Unavailable`] when the platform refuses to serve the video.
    fn resolve(&self, url: &str) -> Result<VideoInfo>;

    /// Download one stream variant of the video to `dest`.
    fn fetch(&self, url: &str, variant: &StreamVariant, dest: &Path) -> Result<()>;
}

/// Interface for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) program,
/// or its ancestor [youtube-dl](https://github.com/ytdl-org/youtube-dl)
#[derive(Debug)]
pub struct Ytdl {
    program: PathBuf,
}

impl Ytdl {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    /// Run the command and check if it failed with saying the stream is unavailable.
    /// In that case, return [`Error::Unavailable`].
    ///
    /// In other cases, return the output handle.
    fn run_check_availability<F>(&self, f: F, capture: Capture) -> Result<Output>
    where
        F: FnOnce(&mut Command) -> &mut Command,
    {
        let res = run_command(self.program.as_os_str(), f, capture | Capture::STDERR)?;

        let stderr = String::from_utf8_lossy(&res.stderr);
        if let Some(reason) = unavailable_reason(&stderr) {
            Err(Error::Unavailable(reason))
        } else if !res.status.success() {
            Err(unsuccessful(self.program.as_os_str(), &res).into())
        } else {
            Ok(res)
        }
    }
}

impl StreamResolver for Ytdl {
    fn resolve(&self, url: &str) -> Result<VideoInfo> {
        let res = self.run_check_availability(
            |cmd| {
                cmd.arg("-q")
                    .arg("--no-playlist")
                    .arg("--skip-download")
                    .arg("-j")
                    .arg("--")
                    .arg(url)
            },
            Capture::STDOUT,
        )?;

        let output = String::from_utf8_lossy(&res.stdout);
        parse_video_info(url, &output)
            .map_err(|err| err.wrap_err_with(|| "Could not read the video metadata"))
    }

    fn fetch(&self, url: &str, variant: &StreamVariant, dest: &Path) -> Result<()> {
        self.run_check_availability(
            |cmd| {
                cmd.arg("-q")
                    .arg("--no-playlist")
                    .arg("--no-part")
                    .arg("--no-continue")
                    .args(["-f", &variant.format_id])
                    .args([OsStr::new("-o"), dest.as_os_str()])
                    .arg("--")
                    .arg(url)
            },
            Capture::empty(),
        )?;

        if dest.is_file() {
            Ok(())
        } else {
            crate::result::bail(format!(
                "{} reported success but wrote no file",
                self.program.display()
            ))
        }
    }
}

/// Find the line where the program says the video is unavailable, if any
fn unavailable_reason(stderr: &str) -> Option<String> {
    const MARKERS: [&str; 4] = ["unavailable", "private video", "has been removed", "not available"];

    stderr
        .lines()
        .filter_map(|line| line.strip_prefix("ERROR:"))
        .find(|line| {
            let line = line.to_lowercase();
            MARKERS.iter().any(|marker| line.contains(marker))
        })
        .map(|line| line.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    webpage_url: Option<String>,
    title: String,
    channel: Option<String>,
    uploader: Option<String>,
    channel_id: Option<String>,
    availability: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: String,
    ext: String,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    abr: Option<f64>,
    tbr: Option<f64>,
}

impl RawFormat {
    fn has(codec: &Option<String>) -> bool {
        codec.as_deref().is_some_and(|c| c != "none")
    }

    /// Convert to a variant, skipping storyboards and unknown containers
    fn into_variant(self) -> Option<StreamVariant> {
        let container = Container::from_resolver_ext(&self.ext)?;

        let kind = match (Self::has(&self.vcodec), Self::has(&self.acodec)) {
            (true, false) => MediaKind::VideoOnly,
            (false, true) => MediaKind::AudioOnly,
            (true, true) => MediaKind::Progressive,
            (false, false) => return None,
        };

        let quality = match kind {
            MediaKind::AudioOnly => self.abr.or(self.tbr).map_or(0, |kbps| kbps.round() as u32),
            _ => self.height.unwrap_or(0),
        };

        Some(StreamVariant {
            format_id: self.format_id,
            container,
            kind,
            quality,
            adaptive: kind != MediaKind::Progressive,
        })
    }
}

/// Availability values for which the platform will not serve the streams
const UNAVAILABLE: [&str; 4] = ["private", "premium_only", "subscriber_only", "needs_auth"];

/// Parse the JSON document printed by `yt-dlp -j`.
///
/// Formats are kept in the program's order, which lists them by increasing quality.
pub fn parse_video_info(url: &str, json: &str) -> Result<VideoInfo> {
    let raw: RawInfo = serde_json::from_str(json)
        .into_diagnostic()
        .wrap_err("Could not parse JSON")?;

    let available = raw
        .availability
        .as_deref()
        .map_or(true, |a| !UNAVAILABLE.contains(&a));

    let channel = [raw.channel, raw.uploader, raw.channel_id]
        .into_iter()
        .flatten()
        .find(|name| !name.trim().is_empty())
        .unwrap_or_default();

    Ok(VideoInfo {
        url: raw.webpage_url.unwrap_or_else(|| url.to_string()),
        title: raw.title,
        channel,
        available,
        variants: raw
            .formats
            .into_iter()
            .filter_map(RawFormat::into_variant)
            .collect(),
    })
}

/// Candidate program names, most preferred first
pub fn program_names() -> [OsString; 2] {
    [OsString::from("yt-dlp"), OsString::from("youtube-dl")]
}
