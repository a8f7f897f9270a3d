use std::{num::NonZeroUsize, path::PathBuf};

use clap::{ArgAction, Parser};

use crate::types::Container;

macro_rules! arg_env {
    ($v:literal) => {
        concat!("TUBEMUX_", $v)
    };
}

/// Paste video URLs, get the best video and audio streams merged into one file,
/// sorted in one directory per channel.
///
/// Type `q`, `quit` or `exit` (or press Ctrl-C) to wait for the running downloads and leave.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Settings file. Defaults to `tubemux.toml` in the current directory, if it exists
    #[arg(long, env = arg_env!("CONFIG"))]
    pub config: Option<PathBuf>,

    /// The path to the output directory. Channel directories are created inside it
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// The container format of the merged files
    #[arg(long, value_enum)]
    pub container: Option<Container>,

    /// Maximum number of downloads running at the same time. Unlimited by default
    #[arg(long)]
    pub jobs: Option<NonZeroUsize>,

    /// Log more details. Can be repeated
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_overrides() {
        let args = Args::try_parse_from([
            "tubemux",
            "--out",
            "/music",
            "--container",
            "webm",
            "--jobs",
            "3",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.out, Some(PathBuf::from("/music")));
        assert_eq!(args.container, Some(Container::Webm));
        assert_eq!(args.jobs, NonZeroUsize::new(3));
        assert_eq!(args.log_level(), tracing::Level::TRACE);
    }

    #[test]
    fn zero_jobs_is_rejected() {
        assert!(Args::try_parse_from(["tubemux", "--jobs", "0"]).is_err());
    }
}
