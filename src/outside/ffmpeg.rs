use std::{
    ffi::{OsStr, OsString},
    fmt::Debug,
    path::{Path, PathBuf},
};

use super::command::{assert_success_command, FFXXX_DEFAULT_ARGS};
use crate::result::Result;

pub trait Muxer: Send + Sync + Debug {
    /// Merge the first video stream of `video` and the first audio stream of `audio`
    /// into `output`, without re-encoding. An existing `output` is overwritten.
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}

/// Interface for the [ffmpeg](https://ffmpeg.org) program
#[derive(Debug)]
pub struct Ffmpeg {
    program: PathBuf,
}

impl Ffmpeg {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

impl Muxer for Ffmpeg {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        assert_success_command(self.program.as_os_str(), |cmd| {
            cmd.args(mux_args(video, audio, output))
        })
    }
}

fn mux_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = FFXXX_DEFAULT_ARGS.into_iter().map(OsString::from).collect();
    args.push("-y".into());
    for input in [video, audio] {
        args.push("-i".into());
        args.push(input.as_os_str().to_owned());
    }
    for arg in ["-map", "0:v:0", "-map", "1:a:0", "-c", "copy"] {
        args.push(arg.into());
    }
    args.push(output.as_os_str().to_owned());
    args
}

pub fn program_name() -> &'static OsStr {
    OsStr::new("ffmpeg")
}
