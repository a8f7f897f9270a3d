mod command;
mod ffmpeg;
mod ytdl;

use std::{ffi::OsStr, path::PathBuf};

use indoc::indoc;
use miette::miette;
use tracing::debug;

pub use ffmpeg::{Ffmpeg, Muxer};
pub use ytdl::{StreamResolver, Ytdl};

/// Where to get ffmpeg
const FFMPEG_HELP: &str = indoc! {"
    ffmpeg merges the downloaded video and audio streams.
    Install it from https://ffmpeg.org/download.html (or your package manager)
    and make sure the `ffmpeg` executable is in your PATH."};

/// Where to get yt-dlp
const YTDL_HELP: &str = indoc! {"
    yt-dlp lists and downloads the streams of a video.
    Install it from https://github.com/yt-dlp/yt-dlp#installation (or your package manager)
    and make sure the `yt-dlp` executable is in your PATH."};

/// Locate the external programs in the `PATH`.
///
/// Failure is fatal for the whole program: the returned report names the
/// missing program and where to get it.
pub fn load_external_components() -> miette::Result<(Ytdl, Ffmpeg)> {
    load_with(locate)
}

fn load_with<F>(find: F) -> miette::Result<(Ytdl, Ffmpeg)>
where
    F: Fn(&OsStr) -> Option<PathBuf>,
{
    let ffmpeg = find(ffmpeg::program_name());
    let ytdl = ytdl::program_names().iter().find_map(|name| find(name));

    let ffmpeg = ffmpeg.ok_or_else(|| miette!(help = FFMPEG_HELP, "ffmpeg was not found"))?;
    let ytdl = ytdl.ok_or_else(|| miette!(help = YTDL_HELP, "yt-dlp was not found"))?;

    Ok((Ytdl::new(ytdl), Ffmpeg::new(ffmpeg)))
}

fn locate(program: &OsStr) -> Option<PathBuf> {
    match which::which(program) {
        Ok(path) => {
            debug!("Found {} at {}", program.to_string_lossy(), path.display());
            Some(path)
        }
        Err(err) => {
            debug!("{} not found: {err}", program.to_string_lossy());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A `PATH` holding only the given programs
    fn only(programs: &'static [&'static str]) -> impl Fn(&OsStr) -> Option<PathBuf> {
        move |name| {
            programs
                .iter()
                .find(|program| OsStr::new(program) == name)
                .map(|program| PathBuf::from("/usr/bin").join(program))
        }
    }

    fn help(report: &miette::Report) -> String {
        report.help().map(|help| help.to_string()).unwrap_or_default()
    }

    #[test]
    fn every_program_found() {
        assert!(load_with(only(&["ffmpeg", "yt-dlp"])).is_ok());
    }

    #[test]
    fn youtube_dl_replaces_a_missing_yt_dlp() {
        assert!(load_with(only(&["ffmpeg", "youtube-dl"])).is_ok());
    }

    #[test]
    fn missing_ffmpeg_is_named_with_install_help() {
        let err = load_with(only(&["yt-dlp"])).unwrap_err();

        assert_eq!(err.to_string(), "ffmpeg was not found");
        assert!(help(&err).contains("https://ffmpeg.org"), "{}", help(&err));
    }

    #[test]
    fn missing_yt_dlp_is_named_with_install_help() {
        let err = load_with(only(&["ffmpeg"])).unwrap_err();

        assert_eq!(err.to_string(), "yt-dlp was not found");
        assert!(help(&err).contains("yt-dlp/yt-dlp#installation"), "{}", help(&err));
    }

    #[cfg(unix)]
    #[test]
    fn locates_programs_in_the_path() {
        assert!(locate(OsStr::new("sh")).is_some());
        assert!(locate(OsStr::new("tubemux-surely-missing-binary")).is_none());
    }
}
