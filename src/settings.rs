use std::{num::NonZeroUsize, path::PathBuf};

use config::{Config, Environment, File};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Deserialize;

use crate::{cli::Args, types::Container};

const DEFAULT_FILE: &str = "tubemux";
const ENV_PREFIX: &str = "TUBEMUX";

/// Settings resolved from, by increasing priority: defaults, settings file,
/// `TUBEMUX_*` environment variables and command line.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub out_dir: PathBuf,
    pub container: Container,
    #[serde(default)]
    pub max_concurrent_jobs: Option<NonZeroUsize>,
}

impl Settings {
    pub fn load(args: &Args) -> Result<Self> {
        let file = match &args.config {
            // An explicitly given file must exist
            Some(path) => File::from(path.as_path()).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };

        Config::builder()
            .set_default("out_dir", ".")
            .and_then(|b| b.set_default("container", Container::Mp4.ext()))
            .into_diagnostic()?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .set_override_option(
                "out_dir",
                args.out.as_ref().map(|p| p.to_string_lossy().into_owned()),
            )
            .and_then(|b| b.set_override_option("container", args.container.map(Container::ext)))
            .and_then(|b| {
                b.set_override_option("max_concurrent_jobs", args.jobs.map(|n| n.get() as i64))
            })
            .into_diagnostic()?
            .build()
            .into_diagnostic()
            .wrap_err("Could not read the settings")?
            .try_deserialize::<Self>()
            .into_diagnostic()
            .wrap_err("Invalid settings")
    }
}
